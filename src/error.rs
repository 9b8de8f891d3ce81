//! 统一的 API 错误类型与转换。

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::io::ErrorKind;

use crate::leaderboard::LeaderboardError;
use crate::locking::LockTimeout;
use crate::storage::StorageError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
    Conflict(String),
    /// Extractor rejections that carry their own status (413, 415, 422).
    Rejected(StatusCode, String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &str) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.as_str()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.as_str()),
            ApiError::Rejected(status, msg) => (*status, msg.as_str()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = self.parts();
        (status, msg.to_string()).into_response()
    }
}

/// Same statuses as [`ApiError`], rendered as `{"error": msg}`.
#[derive(Debug)]
pub struct JsonError(pub ApiError);

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        let (status, msg) = self.0.parts();
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

impl From<ApiError> for JsonError {
    fn from(error: ApiError) -> Self {
        JsonError(error)
    }
}

impl From<StorageError> for JsonError {
    fn from(error: StorageError) -> Self {
        JsonError(error.into())
    }
}

impl From<LeaderboardError> for JsonError {
    fn from(error: LeaderboardError) -> Self {
        JsonError(error.into())
    }
}

impl From<LockTimeout> for JsonError {
    fn from(error: LockTimeout) -> Self {
        JsonError(error.into())
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::InvalidPath => ApiError::BadRequest("invalid filename".into()),
            StorageError::Io(err) => match err.kind() {
                ErrorKind::NotFound => ApiError::NotFound("File not found".into()),
                _ => ApiError::Internal(err.to_string()),
            },
        }
    }
}

impl From<LeaderboardError> for ApiError {
    fn from(error: LeaderboardError) -> Self {
        match error {
            LeaderboardError::NotFound => ApiError::NotFound("File not found".into()),
            LeaderboardError::Corrupt(err) => {
                ApiError::Internal(format!("stored leaderboard is corrupt: {err}"))
            }
            LeaderboardError::Io(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<LockTimeout> for ApiError {
    fn from(_: LockTimeout) -> Self {
        ApiError::Conflict("file locked".into())
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        ApiError::Rejected(error.status(), error.body_text())
    }
}

impl From<JsonRejection> for JsonError {
    fn from(rejection: JsonRejection) -> Self {
        JsonError(ApiError::Rejected(rejection.status(), rejection.body_text()))
    }
}
