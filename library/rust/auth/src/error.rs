//! 認証・認可エラーと、その HTTP レスポンス表現。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// トークン解析失敗時の説明文。
pub(crate) const UNABLE_TO_PARSE: &str = "unable to parse authentication token";
/// ヘッダーに kid が無い場合の説明文。
pub(crate) const AUTHORIZATION_MALFORMED: &str = "authorization malformed";

/// AuthError は認証・認可パイプラインの失敗を表す。
///
/// どの段階で失敗しても必ずこのいずれか一つになり、すべて 401 で応答する。
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header is expected")]
    MissingHeader,

    #[error("authorization header must be in the form 'Bearer <token>'")]
    MalformedHeader,

    #[error("authorization header must start with 'Bearer'")]
    MissingBearerPrefix,

    /// 詳細はログ用。レスポンスには含めない。
    #[error("signing key set is unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("{0}")]
    InvalidHeader(String),

    #[error("unable to find the appropriate key")]
    KeyNotFound,

    #[error("token expired")]
    TokenExpired,

    #[error("incorrect claims, please check the audience and issuer")]
    InvalidClaims,

    #[error("permissions are not included in the token")]
    MissingPermissionsClaim,

    #[error("permission not found")]
    PermissionDenied,
}

impl AuthError {
    /// 機械可読なエラーコードを返す。
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::MissingBearerPrefix => "missing_bearer_prefix",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
            AuthError::InvalidHeader(_) => "invalid_header",
            AuthError::KeyNotFound => "key_not_found",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims => "invalid_claims",
            AuthError::MissingPermissionsClaim => "missing_permissions_claim",
            AuthError::PermissionDenied => "permission_denied",
        }
    }

    /// クライアントに返す説明文を返す。
    pub fn description(&self) -> String {
        match self {
            AuthError::KeySetUnavailable(_) => "unable to fetch signing keys".to_string(),
            other => other.to_string(),
        }
    }

    /// HTTP ステータス。現状はすべて 401 に揃えている。
    pub fn status(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    pub(crate) fn unable_to_parse() -> Self {
        AuthError::InvalidHeader(UNABLE_TO_PARSE.to_string())
    }
}

/// AuthErrorBody はエラーレスポンスの JSON 本文。
#[derive(Debug, Serialize)]
pub struct AuthErrorBody {
    pub code: &'static str,
    pub description: String,
}

impl From<&AuthError> for AuthErrorBody {
    fn from(err: &AuthError) -> Self {
        Self {
            code: err.code(),
            description: err.description(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), Json(AuthErrorBody::from(&self))).into_response()
    }
}
