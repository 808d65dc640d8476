//! coffee-auth: JWKS による Bearer トークン検証と権限チェック
//!
//! 発行者の JWKS エンドポイントから公開鍵を取得して RS256 トークンの署名を検証し、
//! permissions クレームに必要な権限が含まれているかを確認する。
//!
//! # 使い方
//!
//! ```ignore
//! use coffee_auth::{AuthConfig, AuthState, JwksVerifier, require_permission};
//! use std::sync::Arc;
//!
//! let config = AuthConfig::new("fsndproject.au.auth0.com", "homepage");
//! let state = AuthState::new(Arc::new(JwksVerifier::from_config(&config)?));
//!
//! let route = post(create_drink)
//!     .route_layer(axum::middleware::from_fn(require_permission(state, "post:drinks")));
//! ```

pub mod claims;
pub mod config;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod permission;
pub mod verifier;

pub use claims::{Audience, Claims, NumericDate};
pub use config::{AuthConfig, AuthConfigError};
pub use error::{AuthError, AuthErrorBody};
pub use extractor::extract_bearer_token;
pub use jwks::{HttpJwksFetcher, JwkKey, JwksFetcher, KeyResolver, KeySet};
pub use middleware::{require_permission, AuthState};
pub use permission::{check_permission, has_permission};
pub use verifier::{JwksVerifier, TokenVerifier};
