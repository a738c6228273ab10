use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_alert, create_application, grant_permission, health_check, ingest_logs, list_alerts,
    list_application_users, list_applications, list_notifications, mark_notification_read,
    revoke_permission, unread_count, update_alert, update_application, AppState, PagingConfig,
};
use crate::alerts::{AlertDetector, LocalFiringTracker, NotificationFanout, WindowCounter};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub detection_interval_secs: u64,
    pub paging: PagingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            detection_interval_secs: 60,
            paging: PagingConfig::default(),
        }
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Applications and access grants
        .route(
            "/applications",
            get(list_applications).post(create_application),
        )
        .route("/applications/:id", patch(update_application))
        .route("/applications/:id/users", get(list_application_users))
        .route("/applications/:id/permissions", post(grant_permission))
        .route(
            "/applications/:id/permissions/:user_id",
            delete(revoke_permission),
        )
        // Event ingest
        .route("/logs", post(ingest_logs))
        // Alert definitions
        .route("/alerts", get(list_alerts).post(create_alert))
        .route("/alerts/:id", patch(update_alert))
        // Notifications
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/:id/read", post(mark_notification_read))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Wire the detector to the stores held in `state`
pub fn build_detector(state: &AppState, interval: Duration) -> AlertDetector {
    AlertDetector::new(
        state.alerts.clone(),
        WindowCounter::new(state.events.clone()),
        Arc::new(LocalFiringTracker::new()),
        NotificationFanout::new(state.permissions.clone(), state.notifications.clone()),
        interval,
    )
}

/// Run the HTTP server and the alert detector until shutdown
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(config.paging));

    // Start background detector
    let detector = Arc::new(build_detector(
        &state,
        Duration::from_secs(config.detection_interval_secs),
    ));
    let detector_handle = Arc::clone(&detector).start();

    // Build router
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting logalert server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&detector)))
        .await?;

    if tokio::time::timeout(Duration::from_secs(5), detector_handle)
        .await
        .is_err()
    {
        tracing::warn!("Alert detector did not stop in time");
    }

    tracing::info!("logalert server stopped");
    Ok(())
}

async fn shutdown_signal(detector: Arc<AlertDetector>) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");

    tracing::info!("Shutdown signal received, stopping alert detector...");
    detector.stop();
}
