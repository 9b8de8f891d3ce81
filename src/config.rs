//! 命令行参数与服务默认配置。

use clap::Parser;
use shadow_rs::formatcp;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const DEFAULT_UPLOADS_DIR: &str = "uploads";
pub const DEFAULT_LEADERBOARD_FILE: &str = "leaderboard.json";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_UPLOAD_MAX_SIZE: usize = 64 * 1024 * 1024;
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 10;
pub const SHUTDOWN_GRACE_SECS: u64 = 10;

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "scoredrop", version = VERSION_INFO, about = "Upload and leaderboard server")]
pub struct Args {
    #[arg(
        short = 'd',
        long,
        env = "SCOREDROP_UPLOADS_DIR",
        default_value = DEFAULT_UPLOADS_DIR,
        help = "Directory holding uploaded files and leaderboards"
    )]
    pub uploads_dir: String,
    #[arg(
        short = 'b',
        long,
        env = "SCOREDROP_BIND",
        default_value = "0.0.0.0",
        help = "Bind address"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "SCOREDROP_PORT",
        default_value_t = DEFAULT_PORT,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(long, env = "SCOREDROP_CORS_ORIGINS", help = "Comma separated CORS origins")]
    pub cors_origins: Option<String>,
    #[arg(
        short = 'l',
        long,
        env = "SCOREDROP_LEADERBOARD_FILE",
        default_value = DEFAULT_LEADERBOARD_FILE,
        help = "Leaderboard file updated by /saveNewData"
    )]
    pub leaderboard_file: String,
    #[arg(
        long,
        env = "SCOREDROP_UPLOAD_MAX_SIZE",
        default_value_t = DEFAULT_UPLOAD_MAX_SIZE,
        help = "Max multipart upload body size in bytes"
    )]
    pub upload_max_size: usize,
    #[arg(
        long,
        env = "SCOREDROP_LOCK_TIMEOUT_SECS",
        default_value_t = DEFAULT_LOCK_TIMEOUT_SECS,
        help = "Seconds to wait for a leaderboard file lock"
    )]
    pub lock_timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let args = Args::try_parse_from(["scoredrop"]).expect("parse defaults");
        assert_eq!(args.uploads_dir, DEFAULT_UPLOADS_DIR);
        assert_eq!(args.port, DEFAULT_PORT);
        assert_eq!(args.leaderboard_file, DEFAULT_LEADERBOARD_FILE);
        assert!(args.cors_origins.is_none());
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from(["scoredrop", "-d", "/tmp/up", "-p", "9000"])
            .expect("parse flags");
        assert_eq!(args.uploads_dir, "/tmp/up");
        assert_eq!(args.port, 9000);
    }
}
