//! scoredrop server binary.
//!
//! Accepts file uploads into a single uploads directory, serves their text
//! content back, and keeps merge-on-write leaderboard documents where the
//! highest score per player wins.

mod config;
mod error;
mod files;
mod http;
mod leaderboard;
mod locking;
mod logging;
mod routes;
mod scores;
mod storage;
mod version;

use axum::extract::connect_info::ConnectInfo;
use axum::http::Request;
use axum_server::Handle;
use clap::Parser;
use shadow_rs::shadow;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, info_span};

use crate::config::{Args, SHUTDOWN_GRACE_SECS};
use crate::http::{build_cors_layer, resolve_client_ip};
use crate::locking::LockManager;
use crate::scores::LeaderboardConfig;
use crate::storage::Storage;

shadow!(build);

/// Starts the server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();

    let args = Args::parse();
    let storage = Arc::new(Storage::new(PathBuf::from(&args.uploads_dir)));
    storage.ensure_root().await?;
    let leaderboard = Arc::new(LeaderboardConfig {
        file: args.leaderboard_file.clone(),
        lock_timeout: Duration::from_secs(args.lock_timeout_secs),
    });
    info!(
        uploads_dir = %storage.root_path().display(),
        leaderboard_file = leaderboard.file,
        "storage ready"
    );

    let mut app = routes::build_router(
        storage,
        Arc::new(LockManager::new()),
        leaderboard,
        args.upload_max_size,
    )
    .layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let connect_ip = request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip());
                let client_ip = resolve_client_ip(request.headers(), connect_ip)
                    .map(|ip| ip.to_string())
                    .unwrap_or_else(|| "unknown".to_string());

                info_span!(
                    env!("CARGO_CRATE_NAME"),
                    client_ip,
                    method = ?request.method(),
                    path = ?request.uri().path(),
                )
            })
            .on_request(DefaultOnRequest::new().level(Level::DEBUG))
            .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
    );

    if let Some(cors_layer) = build_cors_layer(args.cors_origins.as_deref()) {
        app = app.layer(cors_layer);
    }

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);
    let handle = Handle::new();

    info!("Server running on http://{}", addr);

    let server = axum_server::bind(addr)
        .handle(handle.clone())
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());

    // The serve future resolves only after the graceful drain finishes.
    tokio::spawn(shutdown_signal(handle));
    server.await?;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_SECS)));
}
