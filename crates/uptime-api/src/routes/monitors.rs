use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use uptime_core::{HttpMethod, Monitor, MonitorStore};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateMonitorRequest {
    pub user_id: Uuid,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    pub interval_secs: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub expected_status: Option<u16>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMonitorRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub method: Option<HttpMethod>,
    pub interval_secs: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub expected_status: Option<u16>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_window_hours")]
    pub hours: u32,
}

fn default_window_hours() -> u32 {
    24
}

#[derive(Serialize)]
pub struct MonitorsResponse {
    pub monitors: Vec<Monitor>,
}

#[derive(Serialize)]
pub struct DeleteMonitorResponse {
    pub message: String,
    pub id: Uuid,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/monitors", get(list_monitors).post(create_monitor))
        .route(
            "/monitors/{id}",
            get(get_monitor).put(update_monitor).delete(delete_monitor),
        )
        .route("/monitors/{id}/history", get(get_history))
        .route("/monitors/{id}/summary", get(get_summary))
}

fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::BadRequest(format!("Invalid monitor ID: {}", id)))
}

async fn load_monitor(state: &AppState, id: Uuid) -> Result<Monitor, ApiError> {
    state
        .store
        .get_monitor(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Monitor {} not found", id)))
}

/// POST /api/v1/monitors
async fn create_monitor(
    State(state): State<AppState>,
    Json(body): Json<CreateMonitorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut monitor = Monitor::new(body.user_id, body.name, body.url).with_method(body.method);
    if let Some(v) = body.interval_secs {
        monitor = monitor.with_interval_secs(v);
    }
    if let Some(v) = body.timeout_ms {
        monitor = monitor.with_timeout_ms(v);
    }
    if let Some(v) = body.expected_status {
        monitor = monitor.with_expected_status(v);
    }
    if let Some(v) = body.enabled {
        monitor = monitor.with_enabled(v);
    }
    monitor.validate()?;

    state.store.insert_monitor(monitor.clone()).await?;
    tracing::info!(monitor_id = %monitor.id, url = %monitor.url, "Monitor created");
    Ok((StatusCode::CREATED, Json(monitor)))
}

/// GET /api/v1/monitors?user_id=...
async fn list_monitors(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let monitors = state.store.list_monitors(query.user_id).await?;
    Ok(Json(MonitorsResponse { monitors }))
}

/// GET /api/v1/monitors/{id}
async fn get_monitor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let monitor = load_monitor(&state, id).await?;
    Ok(Json(monitor))
}

/// PUT /api/v1/monitors/{id}
async fn update_monitor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateMonitorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let mut monitor = load_monitor(&state, id).await?;

    if let Some(v) = body.name {
        monitor.name = v;
    }
    if let Some(v) = body.url {
        monitor.url = v;
    }
    if let Some(v) = body.method {
        monitor.method = v;
    }
    if let Some(v) = body.interval_secs {
        monitor.interval_secs = v;
    }
    if let Some(v) = body.timeout_ms {
        monitor.timeout_ms = v;
    }
    if let Some(v) = body.expected_status {
        monitor.expected_status = v;
    }
    if let Some(v) = body.enabled {
        monitor.enabled = v;
    }
    monitor.validate()?;

    let updated = state.store.update_monitor(monitor).await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/monitors/{id}
async fn delete_monitor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    state.store.delete_monitor(id).await?;
    tracing::info!(monitor_id = %id, "Monitor deleted");
    Ok(Json(DeleteMonitorResponse {
        message: "Monitor deleted".to_string(),
        id,
    }))
}

/// GET /api/v1/monitors/{id}/history
async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    // 404 for unknown monitors rather than an empty page.
    load_monitor(&state, id).await?;
    let page = state
        .store
        .list_check_runs(id, query.page, query.limit.min(200))
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/monitors/{id}/summary
async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    load_monitor(&state, id).await?;
    if query.hours == 0 || query.hours > 24 * 90 {
        return Err(ApiError::BadRequest(format!(
            "hours must be 1-{}, got {}",
            24 * 90,
            query.hours
        )));
    }
    let summary = state.store.summary(id, query.hours).await?;
    Ok(Json(summary))
}
