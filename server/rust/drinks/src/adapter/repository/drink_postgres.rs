use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::entity::{Drink, DrinkChanges, Ingredient, NewDrink};
use crate::domain::repository::{DrinkRepository, DuplicateTitleError};

/// DrinkPostgresRepository は DrinkRepository の PostgreSQL 実装。
/// recipe は JSONB 列に材料の配列として格納する。
pub struct DrinkPostgresRepository {
    pool: PgPool,
}

impl DrinkPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DrinkRow {
    id: i64,
    title: String,
    recipe: Json<Vec<Ingredient>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DrinkRow> for Drink {
    fn from(row: DrinkRow) -> Self {
        Drink {
            id: row.id,
            title: row.title,
            recipe: row.recipe.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 一意制約違反を DuplicateTitleError に変換する。
fn map_unique_violation(err: sqlx::Error, title: &str) -> anyhow::Error {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return DuplicateTitleError(title.to_string()).into();
        }
    }
    err.into()
}

#[async_trait]
impl DrinkRepository for DrinkPostgresRepository {
    async fn find_all(&self) -> anyhow::Result<Vec<Drink>> {
        let rows: Vec<DrinkRow> = sqlx::query_as(
            r#"
            SELECT id, title, recipe, created_at, updated_at
            FROM drinks
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Drink>> {
        let row: Option<DrinkRow> = sqlx::query_as(
            r#"
            SELECT id, title, recipe, created_at, updated_at
            FROM drinks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn create(&self, drink: &NewDrink) -> anyhow::Result<Drink> {
        let row: DrinkRow = sqlx::query_as(
            r#"
            INSERT INTO drinks (title, recipe)
            VALUES ($1, $2)
            RETURNING id, title, recipe, created_at, updated_at
            "#,
        )
        .bind(&drink.title)
        .bind(Json(&drink.recipe))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &drink.title))?;

        Ok(row.into())
    }

    async fn update(&self, id: i64, changes: &DrinkChanges) -> anyhow::Result<Option<Drink>> {
        let row: Option<DrinkRow> = sqlx::query_as(
            r#"
            UPDATE drinks
            SET title = COALESCE($2, title),
                recipe = COALESCE($3, recipe),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, recipe, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.title.as_deref())
        .bind(changes.recipe.as_ref().map(Json))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, changes.title.as_deref().unwrap_or_default()))?;

        Ok(row.map(Into::into))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM drinks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
