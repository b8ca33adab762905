pub mod alerts;
pub mod engine;
pub mod monitors;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(monitors::router())
        .merge(alerts::router())
        .merge(engine::router())
}
