use std::sync::Arc;

use validator::Validate;

use crate::domain::entity::{Drink, DrinkChanges};
use crate::domain::repository::{DrinkRepository, DuplicateTitleError};

/// UpdateDrinkError はドリンク更新に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum UpdateDrinkError {
    #[error("drink not found: {0}")]
    NotFound(i64),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("drink already exists: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// UpdateDrinkUseCase はドリンクの部分更新ユースケース。
pub struct UpdateDrinkUseCase {
    drink_repo: Arc<dyn DrinkRepository>,
}

impl UpdateDrinkUseCase {
    pub fn new(drink_repo: Arc<dyn DrinkRepository>) -> Self {
        Self { drink_repo }
    }

    /// changes に含まれるフィールドだけを更新する。空の場合は現在の値を返す。
    pub async fn execute(
        &self,
        id: i64,
        changes: &DrinkChanges,
    ) -> Result<Drink, UpdateDrinkError> {
        changes
            .validate()
            .map_err(|e| UpdateDrinkError::Validation(e.to_string()))?;

        let updated = if changes.is_empty() {
            self.drink_repo
                .find_by_id(id)
                .await
                .map_err(|e| UpdateDrinkError::Internal(e.to_string()))?
        } else {
            self.drink_repo.update(id, changes).await.map_err(|e| {
                if e.downcast_ref::<DuplicateTitleError>().is_some() {
                    UpdateDrinkError::Conflict(changes.title.clone().unwrap_or_default())
                } else {
                    UpdateDrinkError::Internal(e.to_string())
                }
            })?
        };

        let drink = updated.ok_or(UpdateDrinkError::NotFound(id))?;
        tracing::info!(drink_id = drink.id, "drink updated");
        Ok(drink)
    }
}
