pub mod trips;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .merge(trips::router())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
