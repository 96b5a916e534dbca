//! Revocation relay endpoint

use axum::{body::Bytes, extract::State, Json};
use revocation_core::TransportEnvelope;
use std::sync::Arc;
use tracing::info;

use super::AppState;
use crate::api::error::ApiError;
use crate::core::LoggerError;
use crate::relay::RevokeRequest;

/// GET|POST /ct/v1/revoke-and-produce-srd
///
/// Forward a revocation request to a CA and answer with the attestation the
/// logger issued for the CA's resulting submission. An empty body is an
/// empty request.
pub async fn revoke_and_produce_srd(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TransportEnvelope>, ApiError> {
    info!("New revoke-and-produce request received");

    let request: RevokeRequest = if body.is_empty() {
        RevokeRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| LoggerError::InvalidEncoding(format!("Invalid revoke request: {}", e)))?
    };

    let srd = state.relay.relay(&request).await?;

    Ok(Json(TransportEnvelope::wrap(srd)))
}
