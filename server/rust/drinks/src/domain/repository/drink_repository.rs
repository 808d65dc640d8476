use async_trait::async_trait;

use crate::domain::entity::{Drink, DrinkChanges, NewDrink};

/// DuplicateTitleError は title の一意制約違反を表す。
/// リポジトリ実装は anyhow::Error にこの型を包んで返す。
#[derive(Debug, thiserror::Error)]
#[error("drink title already exists: {0}")]
pub struct DuplicateTitleError(pub String);

/// DrinkRepository はドリンクの永続化のためのリポジトリトレイト。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DrinkRepository: Send + Sync {
    /// すべてのドリンクを id 順で取得する。
    async fn find_all(&self) -> anyhow::Result<Vec<Drink>>;

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Drink>>;

    /// ドリンクを作成する。title が重複する場合は DuplicateTitleError。
    async fn create(&self, drink: &NewDrink) -> anyhow::Result<Drink>;

    /// 指定されたフィールドだけを更新する。対象が無い場合は None。
    async fn update(&self, id: i64, changes: &DrinkChanges) -> anyhow::Result<Option<Drink>>;

    /// ドリンクを削除する。削除した場合は true。
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;

    /// ストアへの疎通確認。
    async fn ping(&self) -> anyhow::Result<()>;
}
