use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/toggle/:date", post(handlers::toggle_form))
        .route("/api/month", get(handlers::get_month))
        .route("/api/checked", get(handlers::get_checked))
        .route("/api/toggle", post(handlers::toggle))
        .route("/api/summary", get(handlers::get_summary))
        .route("/api/events", get(handlers::events))
        .with_state(state)
}
