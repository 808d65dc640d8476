use std::sync::Arc;

use crate::domain::entity::Drink;
use crate::domain::repository::DrinkRepository;

/// ListDrinksError はドリンク一覧取得に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum ListDrinksError {
    #[error("internal error: {0}")]
    Internal(String),
}

/// ListDrinksUseCase はドリンク一覧取得ユースケース。
/// 公開一覧と詳細一覧の両方がこのユースケースを使い、ビューの切り替えはハンドラで行う。
pub struct ListDrinksUseCase {
    drink_repo: Arc<dyn DrinkRepository>,
}

impl ListDrinksUseCase {
    pub fn new(drink_repo: Arc<dyn DrinkRepository>) -> Self {
        Self { drink_repo }
    }

    pub async fn execute(&self) -> Result<Vec<Drink>, ListDrinksError> {
        self.drink_repo
            .find_all()
            .await
            .map_err(|e| ListDrinksError::Internal(e.to_string()))
    }
}
