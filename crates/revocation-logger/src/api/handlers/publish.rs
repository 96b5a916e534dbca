//! Monitor-facing fetch of every current attestation

use axum::{extract::State, Json};
use revocation_core::TransportEnvelope;
use std::sync::Arc;

use super::AppState;
use crate::api::error::ApiError;

/// GET /ct/v1/get-log-srd-with-rev-data
///
/// Every published attestation for the accepted category, each in its own
/// envelope. Fails with 400 until the first one has been published.
pub async fn get_log_srd_with_rev_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TransportEnvelope>>, ApiError> {
    Ok(Json(state.publisher.snapshot()?))
}
