use std::sync::Arc;

use crate::domain::repository::DrinkRepository;

/// DeleteDrinkError はドリンク削除に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum DeleteDrinkError {
    #[error("drink not found: {0}")]
    NotFound(i64),

    #[error("internal error: {0}")]
    Internal(String),
}

/// DeleteDrinkUseCase はドリンク削除ユースケース。
pub struct DeleteDrinkUseCase {
    drink_repo: Arc<dyn DrinkRepository>,
}

impl DeleteDrinkUseCase {
    pub fn new(drink_repo: Arc<dyn DrinkRepository>) -> Self {
        Self { drink_repo }
    }

    pub async fn execute(&self, id: i64) -> Result<(), DeleteDrinkError> {
        let deleted = self
            .drink_repo
            .delete(id)
            .await
            .map_err(|e| DeleteDrinkError::Internal(e.to_string()))?;

        if !deleted {
            return Err(DeleteDrinkError::NotFound(id));
        }

        tracing::info!(drink_id = id, "drink deleted");
        Ok(())
    }
}
