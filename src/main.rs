//! logalert server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - LOGALERT_HOST: Bind address (default: 0.0.0.0)
//! - LOGALERT_PORT: Port number (default: 8080)
//! - LOGALERT_DETECTION_INTERVAL_SECS: Seconds between alert evaluations (default: 60)
//! - LOGALERT_DEFAULT_PAGE_SIZE: Page size when none is requested (default: 20)
//! - LOGALERT_MAX_PAGE_SIZE: Largest page size accepted (default: 100)
//! - RUST_LOG: Log level (default: info)
//!
//! Firing state lives in process memory; run a single instance.

use logalert::api::{run_server, PagingConfig, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logalert=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = std::env::var("LOGALERT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env_or::<u16>("LOGALERT_PORT", 8080);
    let detection_interval_secs = env_or::<u64>("LOGALERT_DETECTION_INTERVAL_SECS", 60).max(1);

    let defaults = PagingConfig::default();
    let max_size = env_or::<usize>("LOGALERT_MAX_PAGE_SIZE", defaults.max_size).max(1);
    let default_size =
        env_or::<usize>("LOGALERT_DEFAULT_PAGE_SIZE", defaults.default_size).clamp(1, max_size);

    let config = ServerConfig {
        host,
        port,
        detection_interval_secs,
        paging: PagingConfig {
            default_size,
            max_size,
        },
    };

    tracing::info!("logalert configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!(
        "  Detection interval: {} seconds",
        config.detection_interval_secs
    );
    tracing::info!(
        "  Page size: default {}, max {}",
        config.paging.default_size,
        config.paging.max_size
    );

    run_server(config).await
}
