use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Ingredient はレシピの材料 1 つを表す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Ingredient {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[validate(length(min = 1, max = 40))]
    pub color: String,
    #[validate(range(min = 1))]
    pub parts: u32,
}

/// Drink はドリンクレコード。title は一意。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drink {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 公開用の材料表現。材料名を含まない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortIngredient {
    pub color: String,
    pub parts: u32,
}

/// DrinkShort は公開一覧用のビュー。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrinkShort {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<ShortIngredient>,
}

/// DrinkLong は材料名まで含む詳細ビュー。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrinkLong {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl Drink {
    pub fn short(&self) -> DrinkShort {
        DrinkShort {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .iter()
                .map(|i| ShortIngredient {
                    color: i.color.clone(),
                    parts: i.parts,
                })
                .collect(),
        }
    }

    pub fn long(&self) -> DrinkLong {
        DrinkLong {
            id: self.id,
            title: self.title.clone(),
            recipe: self.recipe.clone(),
        }
    }
}

/// NewDrink はドリンク作成の入力。
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct NewDrink {
    #[validate(length(min = 1, max = 80))]
    pub title: String,
    #[validate(length(min = 1), nested)]
    pub recipe: Vec<Ingredient>,
}

/// DrinkChanges は部分更新の入力。None のフィールドは変更しない。
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct DrinkChanges {
    #[validate(length(min = 1, max = 80))]
    pub title: Option<String>,
    #[validate(length(min = 1), nested)]
    pub recipe: Option<Vec<Ingredient>>,
}

impl DrinkChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.recipe.is_none()
    }
}
