use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use uptime_core::{Alert, MonitorStore};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub user_id: Uuid,
    pub monitor_id: Option<Uuid>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    50
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub unread: usize,
}

#[derive(Serialize)]
pub struct ReadAllResponse {
    pub marked: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/alerts", get(list_alerts))
        .route("/alerts/unread-count", get(unread_count))
        .route("/alerts/read-all", post(read_all))
        .route("/alerts/{id}/read", post(mark_read))
}

/// GET /api/v1/alerts?user_id=...&monitor_id=...
async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .store
        .list_alerts(query.user_id, query.monitor_id, query.page, query.limit.min(200))
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/alerts/unread-count?user_id=...
async fn unread_count(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let unread = state.store.unread_alert_count(query.user_id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

/// POST /api/v1/alerts/{id}/read?user_id=...
async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Alert>, ApiError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::BadRequest(format!("Invalid alert ID: {}", id)))?;
    let alert = state.store.mark_alert_read(query.user_id, id).await?;
    Ok(Json(alert))
}

/// POST /api/v1/alerts/read-all?user_id=...
async fn read_all(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let marked = state.store.mark_all_alerts_read(query.user_id).await?;
    Ok(Json(ReadAllResponse { marked }))
}
