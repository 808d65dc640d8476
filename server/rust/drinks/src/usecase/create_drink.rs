use std::sync::Arc;

use validator::Validate;

use crate::domain::entity::{Drink, NewDrink};
use crate::domain::repository::{DrinkRepository, DuplicateTitleError};

/// CreateDrinkError はドリンク作成に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum CreateDrinkError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("drink already exists: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// CreateDrinkUseCase はドリンク作成ユースケース。
pub struct CreateDrinkUseCase {
    drink_repo: Arc<dyn DrinkRepository>,
}

impl CreateDrinkUseCase {
    pub fn new(drink_repo: Arc<dyn DrinkRepository>) -> Self {
        Self { drink_repo }
    }

    pub async fn execute(&self, input: &NewDrink) -> Result<Drink, CreateDrinkError> {
        input
            .validate()
            .map_err(|e| CreateDrinkError::Validation(e.to_string()))?;

        let drink = self.drink_repo.create(input).await.map_err(|e| {
            if e.downcast_ref::<DuplicateTitleError>().is_some() {
                CreateDrinkError::Conflict(input.title.clone())
            } else {
                CreateDrinkError::Internal(e.to_string())
            }
        })?;

        tracing::info!(drink_id = drink.id, title = %drink.title, "drink created");
        Ok(drink)
    }
}
