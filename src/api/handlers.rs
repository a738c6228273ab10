use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data::{
    format_iso8601, parse_iso8601, AlertDefinition, AlertId, AlertSpec, Application,
    ApplicationId, LogEvent, NotificationId, NotificationRecord, Page, PageRequest,
    PermissionGrant, SeverityLevel, UserId,
};
use crate::storage::{
    AlertError, AlertStore, AlertUpdate, ApplicationStore, LogStore, NotificationError,
    NotificationStore, PermissionStore,
};

/// Header carrying the authenticated caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Page size limits applied to list endpoints
#[derive(Debug, Clone, Copy)]
pub struct PagingConfig {
    pub default_size: usize,
    pub max_size: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_size: 20,
            max_size: 100,
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub applications: Arc<ApplicationStore>,
    pub alerts: Arc<AlertStore>,
    pub events: Arc<LogStore>,
    pub permissions: Arc<PermissionStore>,
    pub notifications: Arc<NotificationStore>,
    pub paging: PagingConfig,
}

impl AppState {
    /// Fresh, empty in-memory stores
    pub fn new(paging: PagingConfig) -> Self {
        let applications = Arc::new(ApplicationStore::new());
        Self {
            alerts: Arc::new(AlertStore::new(Arc::clone(&applications))),
            applications,
            events: Arc::new(LogStore::new()),
            permissions: Arc::new(PermissionStore::new()),
            notifications: Arc::new(NotificationStore::new()),
            paging,
        }
    }
}

fn current_user(headers: &HeaderMap) -> Result<UserId, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| ApiError::Unauthorized("User not authenticated".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub size: Option<usize>,
}

impl PageParams {
    fn resolve(&self, paging: &PagingConfig) -> Result<PageRequest, ApiError> {
        let size = self.size.unwrap_or(paging.default_size);
        if size == 0 {
            return Err(ApiError::BadRequest("Page size must be at least 1".to_string()));
        }
        if size > paging.max_size {
            return Err(ApiError::BadRequest(format!(
                "Page size must not exceed {}",
                paging.max_size
            )));
        }
        Ok(PageRequest::new(self.page.unwrap_or(0), size))
    }
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Applications & Permissions
// ============================================================================

#[derive(Deserialize)]
pub struct CreateApplicationRequest {
    pub name: String,
}

pub async fn create_application(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateApplicationRequest>, JsonRejection>,
) -> Result<Json<Application>, ApiError> {
    let Json(request) = payload?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Application name is required".to_string()));
    }
    Ok(Json(state.applications.create(name)))
}

fn require_application(state: &AppState, id: ApplicationId) -> Result<Application, ApiError> {
    state
        .applications
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("Application not found with ID: {}", id)))
}

pub async fn list_applications(State(state): State<Arc<AppState>>) -> Json<Vec<Application>> {
    let applications = state.applications.list();
    tracing::debug!(count = applications.len(), "Retrieved applications");
    Json(applications)
}

/// Every grant on the application, revoked ones included
pub async fn list_application_users(
    State(state): State<Arc<AppState>>,
    Path(application_id): Path<ApplicationId>,
) -> Result<Json<Vec<PermissionGrant>>, ApiError> {
    require_application(&state, application_id)?;
    let grants = state.permissions.grants_for(application_id);
    tracing::info!(
        application_id,
        users = grants.len(),
        "Retrieved users with access to application"
    );
    Ok(Json(grants))
}

#[derive(Deserialize)]
pub struct UpdateApplicationRequest {
    pub active: bool,
}

pub async fn update_application(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ApplicationId>,
    payload: Result<Json<UpdateApplicationRequest>, JsonRejection>,
) -> Result<Json<Application>, ApiError> {
    let Json(request) = payload?;
    state
        .applications
        .set_active(id, request.active)
        .map(Json)
        .map_err(|e| ApiError::NotFound(e.to_string()))
}

#[derive(Deserialize)]
pub struct GrantPermissionRequest {
    pub user_id: UserId,
}

pub async fn grant_permission(
    State(state): State<Arc<AppState>>,
    Path(application_id): Path<ApplicationId>,
    payload: Result<Json<GrantPermissionRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    require_application(&state, application_id)?;
    state.permissions.grant(request.user_id, application_id);
    tracing::info!(application_id, user_id = request.user_id, "Permission granted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_permission(
    State(state): State<Arc<AppState>>,
    Path((application_id, user_id)): Path<(ApplicationId, UserId)>,
) -> Result<StatusCode, ApiError> {
    if !state.permissions.revoke(user_id, application_id) {
        return Err(ApiError::NotFound(format!(
            "No permission for user {} on application {}",
            user_id, application_id
        )));
    }
    tracing::info!(application_id, user_id, "Permission revoked");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Log Ingest
// ============================================================================

#[derive(Deserialize)]
pub struct LogEventRequest {
    pub application_id: ApplicationId,
    pub level: String,
    #[serde(default)]
    pub message: String,
    /// Defaults to the time of receipt
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct IngestRequest {
    pub events: Vec<LogEventRequest>,
}

#[derive(Serialize)]
pub struct IngestResponse {
    pub inserted: usize,
    pub errors: usize,
}

pub async fn ingest_logs(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(request) = payload?;
    let received_at = Utc::now();
    let total = request.events.len();

    let events = request
        .events
        .into_iter()
        .filter(|e| {
            let known = state.applications.get(e.application_id).is_some();
            if !known {
                tracing::warn!(
                    application_id = e.application_id,
                    "Dropping log event for unknown application"
                );
            }
            known
        })
        .map(|e| {
            LogEvent::new(e.application_id, e.level, e.timestamp.unwrap_or(received_at))
                .with_message(e.message)
        });

    let inserted = state.events.append_batch(events);

    Ok(Json(IngestResponse {
        inserted,
        errors: total - inserted,
    }))
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Deserialize)]
pub struct CreateAlertRequest {
    pub application_id: ApplicationId,
    pub severity_level: String,
    pub count: u32,
    pub time_window: String,
}

#[derive(Deserialize)]
pub struct UpdateAlertRequest {
    pub application_id: ApplicationId,
    pub severity_level: String,
    pub count: u32,
    pub time_window: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertInfo {
    pub id: AlertId,
    pub updated_at: DateTime<Utc>,
    pub count: u32,
    pub time_window: String,
    pub level: SeverityLevel,
    pub is_active: bool,
    pub created_by_id: UserId,
    pub application_id: ApplicationId,
    pub application_name: String,
}

impl From<AlertDefinition> for AlertInfo {
    fn from(alert: AlertDefinition) -> Self {
        Self {
            id: alert.id,
            updated_at: alert.updated_at,
            count: alert.threshold,
            time_window: format_iso8601(&alert.window),
            level: alert.level,
            is_active: alert.active,
            created_by_id: alert.created_by,
            application_id: alert.application.id,
            application_name: alert.application.name,
        }
    }
}

fn parse_level(text: &str) -> Result<SeverityLevel, ApiError> {
    text.parse()
        .map_err(|e: crate::data::UnknownSeverity| ApiError::BadRequest(e.to_string()))
}

fn parse_window(text: &str) -> Result<std::time::Duration, ApiError> {
    parse_iso8601(text).map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub async fn create_alert(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateAlertRequest>, JsonRejection>,
) -> Result<Json<AlertInfo>, ApiError> {
    let user = current_user(&headers)?;
    let Json(request) = payload?;
    tracing::info!(
        application_id = request.application_id,
        "Received request to create alert"
    );

    let spec = AlertSpec::new(
        request.application_id,
        parse_level(&request.severity_level)?,
        request.count,
        parse_window(&request.time_window)?,
    );
    let alert = state.alerts.create(spec, user)?;

    Ok(Json(alert.into()))
}

pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<AlertInfo>>, ApiError> {
    let request = params.resolve(&state.paging)?;
    Ok(Json(state.alerts.list(request).map(AlertInfo::from)))
}

pub async fn update_alert(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<AlertId>,
    payload: Result<Json<UpdateAlertRequest>, JsonRejection>,
) -> Result<Json<AlertInfo>, ApiError> {
    let user = current_user(&headers)?;
    let Json(request) = payload?;
    tracing::info!(alert_id = id, user, "Received request to update alert");

    let changes = AlertUpdate {
        application_id: request.application_id,
        level: parse_level(&request.severity_level)?,
        threshold: request.count,
        window: parse_window(&request.time_window)?,
        active: request.is_active,
    };
    let alert = state.alerts.update(id, changes)?;

    Ok(Json(alert.into()))
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationInfo {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub alert_id: AlertId,
}

impl From<NotificationRecord> for NotificationInfo {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.recipient,
            message: record.message,
            is_read: record.read,
            created_at: record.created_at,
            alert_id: record.alert_id,
        }
    }
}

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<NotificationInfo>>, ApiError> {
    let user = current_user(&headers)?;
    let request = params.resolve(&state.paging)?;

    let page = state.notifications.list_for_recipient(user, request);
    tracing::debug!(user, returned = page.content.len(), "Retrieved notifications");

    Ok(Json(page.map(NotificationInfo::from)))
}

pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<NotificationId>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&headers)?;
    state.notifications.mark_read(user, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct UnreadResponse {
    pub unread: usize,
}

pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UnreadResponse>, ApiError> {
    let user = current_user(&headers)?;
    Ok(Json(UnreadResponse {
        unread: state.notifications.unread_count(user),
    }))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
}

impl From<AlertError> for ApiError {
    fn from(e: AlertError) -> Self {
        match e {
            AlertError::Duplicate { .. } => ApiError::Conflict(e.to_string()),
            AlertError::NotFound(_) | AlertError::UnknownApplication(_) => {
                ApiError::NotFound(e.to_string())
            }
            AlertError::InvalidThreshold(_) | AlertError::InvalidWindow => {
                ApiError::BadRequest(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<NotificationError> for ApiError {
    fn from(e: NotificationError) -> Self {
        match e {
            NotificationError::NotFound(_) => ApiError::NotFound(e.to_string()),
            NotificationError::Forbidden(id) => {
                tracing::warn!(notification_id = id, "Access denied to notification");
                ApiError::Forbidden("You do not have permission to access this resource".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
