//! 文件上传、清空与文本下载处理器。

use axum::extract::{Extension, Multipart, Path};
use axum::response::Json as JsonResponse;
use serde::Serialize;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ApiError, JsonError};
use crate::storage::{ClearReport, Storage, StorageError};

#[derive(Serialize)]
pub(crate) struct ContentResponse {
    pub(crate) content: String,
}

/// 接收 multipart 上传：优先使用 `filename` 字段，否则使用原始文件名。
pub async fn upload_file(
    Extension(storage): Extension<Arc<Storage>>,
    mut multipart: Multipart,
) -> Result<String, ApiError> {
    let mut suggested_name: Option<String> = None;
    let mut payload: Option<(Option<String>, axum::body::Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some("file") => {
                let original_name = field.file_name().map(str::to_owned);
                let data = field.bytes().await?;
                payload = Some((original_name, data));
            }
            Some("filename") => {
                suggested_name = Some(field.text().await?);
            }
            other => debug!(field = ?other, "ignoring unknown multipart field"),
        }
    }

    let Some((original_name, data)) = payload else {
        return Err(ApiError::BadRequest("No file uploaded.".into()));
    };
    let name = suggested_name
        .filter(|name| !name.is_empty())
        .or(original_name)
        .unwrap_or_default();

    storage.write_file(&name, &data).await?;
    info!(name, size = data.len(), "file uploaded");
    Ok(format!("File uploaded successfully: {name}"))
}

/// 清空上传目录；单个文件删除失败不影响整体结果。
pub async fn clear_files(
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<&'static str, ApiError> {
    clear_outcome(storage.clear_all().await)
}

fn clear_outcome(result: Result<ClearReport, StorageError>) -> Result<&'static str, ApiError> {
    let report = match result {
        Ok(report) => report,
        Err(StorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            return Err(ApiError::NotFound("Uploads folder does not exist.".into()));
        }
        Err(err) => {
            warn!(error = ?err, "failed to read uploads folder");
            return Err(ApiError::Internal("Failed to read uploads folder.".into()));
        }
    };
    info!(
        removed = report.removed,
        failed = report.failed,
        "uploads cleared"
    );
    Ok("All uploaded files have been cleared.")
}

/// 以文本形式返回已上传文件内容。
pub async fn download_file(
    Path(filename): Path<String>,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<JsonResponse<ContentResponse>, JsonError> {
    let content = storage
        .read_text(&filename)
        .await
        .map_err(|err| match ApiError::from(err) {
            ApiError::Internal(detail) => {
                warn!(filename, error = %detail, "failed to read file");
                ApiError::Internal("Failed to read file".into())
            }
            other => other,
        })?;
    info!(filename, size = content.len(), "download file");
    Ok(JsonResponse(ContentResponse { content }))
}
