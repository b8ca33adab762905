use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use uptime_core::EngineState;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct EngineStatusResponse {
    pub engine_id: Uuid,
    pub state: EngineState,
    pub tick_ms: u64,
    pub max_concurrent_probes: usize,
    pub alert_threshold: u32,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/engine/status", get(engine_status))
}

/// GET /api/v1/engine/status
async fn engine_status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let engine = state
        .engine
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("No engine attached to this server".to_string()))?;
    let config = engine.config();
    Ok(Json(EngineStatusResponse {
        engine_id: engine.id(),
        state: engine.state().await,
        tick_ms: config.tick_interval.as_millis() as u64,
        max_concurrent_probes: config.max_concurrent_probes,
        alert_threshold: config.alert_threshold,
    }))
}
