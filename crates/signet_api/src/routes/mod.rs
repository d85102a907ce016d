use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{download_signed, get_signing_session, health_check, submit_signature};
use crate::AppState;

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/public/contracts/sign/:id", get(get_signing_session))
        .route("/public/contracts/sign/:id", post(submit_signature))
        .route("/public/contracts/download/:id", get(download_signed))
        .with_state(state)
}
