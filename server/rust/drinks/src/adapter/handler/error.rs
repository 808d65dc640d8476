use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::usecase::{CreateDrinkError, DeleteDrinkError, ListDrinksError, UpdateDrinkError};

/// ErrorResponse は認証以外のエラーレスポンス本文。
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: u16,
    pub message: String,
}

/// ApiError は HTTP ステータスとメッセージの組。
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    /// 詳細はログにだけ残し、クライアントには汎用メッセージを返す。
    pub fn internal(detail: &str) -> Self {
        tracing::error!(error = %detail, "internal server error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.status.as_u16(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::unprocessable(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::not_found("resource not found")
    }
}

impl From<ListDrinksError> for ApiError {
    fn from(err: ListDrinksError) -> Self {
        match err {
            ListDrinksError::Internal(msg) => ApiError::internal(&msg),
        }
    }
}

impl From<CreateDrinkError> for ApiError {
    fn from(err: CreateDrinkError) -> Self {
        match err {
            CreateDrinkError::Validation(msg) => ApiError::unprocessable(msg),
            CreateDrinkError::Conflict(title) => {
                ApiError::unprocessable(format!("drink '{title}' already exists"))
            }
            CreateDrinkError::Internal(msg) => ApiError::internal(&msg),
        }
    }
}

impl From<UpdateDrinkError> for ApiError {
    fn from(err: UpdateDrinkError) -> Self {
        match err {
            UpdateDrinkError::NotFound(id) => ApiError::not_found(format!("drink {id} not found")),
            UpdateDrinkError::Validation(msg) => ApiError::unprocessable(msg),
            UpdateDrinkError::Conflict(title) => {
                ApiError::unprocessable(format!("drink '{title}' already exists"))
            }
            UpdateDrinkError::Internal(msg) => ApiError::internal(&msg),
        }
    }
}

impl From<DeleteDrinkError> for ApiError {
    fn from(err: DeleteDrinkError) -> Self {
        match err {
            DeleteDrinkError::NotFound(id) => ApiError::not_found(format!("drink {id} not found")),
            DeleteDrinkError::Internal(msg) => ApiError::internal(&msg),
        }
    }
}

/// 未定義ルートのフォールバック。
pub async fn not_found() -> ApiError {
    ApiError::not_found("resource not found")
}
