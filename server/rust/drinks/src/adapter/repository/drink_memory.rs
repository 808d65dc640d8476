use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::entity::{Drink, DrinkChanges, NewDrink};
use crate::domain::repository::{DrinkRepository, DuplicateTitleError};

/// InMemoryDrinkRepository はデータベース未設定時に使うメモリ上の実装。
/// title の一意性と id の採番は PostgreSQL 実装と同じ振る舞いにそろえる。
pub struct InMemoryDrinkRepository {
    inner: RwLock<Store>,
}

struct Store {
    drinks: Vec<Drink>,
    next_id: i64,
}

impl InMemoryDrinkRepository {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Store {
                drinks: Vec::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemoryDrinkRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DrinkRepository for InMemoryDrinkRepository {
    async fn find_all(&self) -> anyhow::Result<Vec<Drink>> {
        let store = self.inner.read().await;
        Ok(store.drinks.clone())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Drink>> {
        let store = self.inner.read().await;
        Ok(store.drinks.iter().find(|d| d.id == id).cloned())
    }

    async fn create(&self, drink: &NewDrink) -> anyhow::Result<Drink> {
        let mut store = self.inner.write().await;
        if store.drinks.iter().any(|d| d.title == drink.title) {
            return Err(DuplicateTitleError(drink.title.clone()).into());
        }

        let now = Utc::now();
        let created = Drink {
            id: store.next_id,
            title: drink.title.clone(),
            recipe: drink.recipe.clone(),
            created_at: now,
            updated_at: now,
        };
        store.next_id += 1;
        store.drinks.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, changes: &DrinkChanges) -> anyhow::Result<Option<Drink>> {
        let mut store = self.inner.write().await;
        let Some(index) = store.drinks.iter().position(|d| d.id == id) else {
            return Ok(None);
        };

        if let Some(ref title) = changes.title {
            if store.drinks.iter().any(|d| d.id != id && &d.title == title) {
                return Err(DuplicateTitleError(title.clone()).into());
            }
        }

        let drink = &mut store.drinks[index];
        if let Some(ref title) = changes.title {
            drink.title.clone_from(title);
        }
        if let Some(ref recipe) = changes.recipe {
            drink.recipe.clone_from(recipe);
        }
        drink.updated_at = Utc::now();
        Ok(Some(drink.clone()))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut store = self.inner.write().await;
        let before = store.drinks.len();
        store.drinks.retain(|d| d.id != id);
        Ok(store.drinks.len() < before)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
