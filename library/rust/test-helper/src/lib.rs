//! coffee-test-helper: 認証まわりのテストで共有するヘルパー。
//!
//! RS256 鍵ペアの生成、テストトークンの署名、JWKS ドキュメントの生成を提供する。
//! `mock-server` feature を有効にすると wiremock ベースの JWKS サーバーも利用できる。

pub mod jwt;
#[cfg(feature = "mock-server")]
pub mod mock_server;

pub use jwt::{unsigned_token, JwtTestHelper, TestClaims, OTHER_KID, TEST_KID};
#[cfg(feature = "mock-server")]
pub use mock_server::JwksMockServer;
