//! 排行榜同步与单条成绩提交处理器。

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::error::{ApiError, JsonError};
use crate::leaderboard::{self, Entry, LeaderboardDocument, SyncOutcome};
use crate::locking::LockManager;
use crate::storage::Storage;

#[derive(Debug)]
pub struct LeaderboardConfig {
    /// Target of `/saveNewData`, relative to the uploads directory.
    pub file: String,
    pub lock_timeout: Duration,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SyncRequest {
    filename: String,
    #[serde(default)]
    has_data: bool,
    #[serde(default)]
    current_content: Option<Value>,
}

/// 合并客户端排行榜到服务器文件。
///
/// A missing file is still answered with 404 even when it was just created
/// from the request data; clients key off that status.
pub async fn sync_leaderboard(
    Extension(storage): Extension<Arc<Storage>>,
    Extension(lock_manager): Extension<Arc<LockManager>>,
    Extension(config): Extension<Arc<LeaderboardConfig>>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Response, JsonError> {
    let Json(request) = payload?;
    let SyncRequest {
        filename,
        has_data,
        current_content,
    } = request;

    let incoming = match current_content {
        Some(value) if has_data => Some(
            LeaderboardDocument::from_value(value)
                .map_err(|err| ApiError::BadRequest(format!("invalid currentContent: {err}")))?,
        ),
        _ => None,
    };

    let target = storage.resolve_file_checked(&filename).await?;
    let _guard = lock_manager
        .lock_file_with_timeout(&filename, config.lock_timeout)
        .await?;
    let outcome = leaderboard::sync(&target, incoming).await?;

    let response = match outcome {
        SyncOutcome::Merged(document) => {
            info!(filename, entries = document.entries.len(), "leaderboard merged");
            let content = render(&document)?;
            (StatusCode::OK, JsonResponse(json!({ "content": content }))).into_response()
        }
        SyncOutcome::Created(document) => {
            info!(filename, entries = document.entries.len(), "leaderboard created");
            let content = render(&document)?;
            (
                StatusCode::NOT_FOUND,
                JsonResponse(json!({
                    "error": "File not found, created new file",
                    "content": content,
                })),
            )
                .into_response()
        }
    };
    Ok(response)
}

/// 写入单条成绩，仅在分数更高时覆盖同名条目。
pub async fn save_new_data(
    Extension(storage): Extension<Arc<Storage>>,
    Extension(lock_manager): Extension<Arc<LockManager>>,
    Extension(config): Extension<Arc<LeaderboardConfig>>,
    payload: Result<Json<Entry>, JsonRejection>,
) -> Result<JsonResponse<LeaderboardDocument>, JsonError> {
    let Json(entry) = payload?;
    let target = storage.resolve_file_checked(&config.file).await?;
    let _guard = lock_manager
        .lock_file_with_timeout(&config.file, config.lock_timeout)
        .await?;
    let name = entry.name.clone();
    let document = leaderboard::record_entry(&target, entry).await?;
    info!(
        file = config.file,
        name,
        entries = document.entries.len(),
        "score recorded"
    );
    Ok(JsonResponse(document))
}

fn render(document: &LeaderboardDocument) -> Result<String, ApiError> {
    document
        .to_pretty_json()
        .map_err(|err| ApiError::Internal(err.to_string()))
}
