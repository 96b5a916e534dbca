//! API module for the revocation logger

pub mod error;
pub mod handlers;

use axum::{
    extract::State,
    http::Uri,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use error::ApiError;
use handlers::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub log_id: String,
}

/// Health check endpoint
///
/// GET /
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        log_id: state.engine.identity().log_id().to_string(),
    })
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        // CA-facing
        .route(
            "/ct/v1/post-log-srd-with-rev-data",
            post(handlers::post_log_srd_with_rev_data),
        )
        // Monitor-facing
        .route(
            "/ct/v1/get-log-srd-with-rev-data",
            get(handlers::get_log_srd_with_rev_data),
        )
        .route(
            "/ct/v1/revoke-and-produce-srd",
            get(handlers::revoke_and_produce_srd).post(handlers::revoke_and_produce_srd),
        )
        .fallback(not_found)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
