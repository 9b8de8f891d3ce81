//! 路由装配：端点、共享状态与中间件。

use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{get, post};
use axum::{Router, middleware};
use std::sync::Arc;

use crate::locking::LockManager;
use crate::scores::LeaderboardConfig;
use crate::storage::Storage;
use crate::{files, http, scores, version};

pub fn build_router(
    storage: Arc<Storage>,
    lock_manager: Arc<LockManager>,
    leaderboard: Arc<LeaderboardConfig>,
    upload_max_size: usize,
) -> Router {
    Router::new()
        .route("/", get(version::server_status))
        .route("/version", get(version::get_version_info))
        .route(
            "/upload",
            post(files::upload_file).layer(DefaultBodyLimit::max(upload_max_size)),
        )
        .route("/clear", get(files::clear_files))
        .route("/download", post(scores::sync_leaderboard))
        .route("/download/{filename}", get(files::download_file))
        .route("/saveNewData", post(scores::save_new_data))
        .layer(middleware::from_fn(http::add_security_headers))
        .layer(Extension(storage))
        .layer(Extension(lock_manager))
        .layer(Extension(leaderboard))
}
