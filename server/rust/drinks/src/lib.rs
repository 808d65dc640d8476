//! coffee-drinks-server: ドリンクメニューの REST API。
//!
//! 一覧は公開、詳細一覧と作成・更新・削除は JWT の permissions で保護する。
//! 認証は coffee-auth、ログ・メトリクスは coffee-telemetry に委譲する。

pub mod adapter;
pub mod domain;
pub mod infrastructure;
pub mod usecase;
