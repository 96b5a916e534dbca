//! CA submission endpoint

use axum::{body::Bytes, extract::State, http::StatusCode};
use revocation_core::RevocationSubmission;
use std::sync::Arc;

use super::AppState;
use crate::api::error::ApiError;
use crate::core::LoggerError;

/// POST /ct/v1/post-log-srd-with-rev-data
///
/// Verify a CA's revocation submission, merge it and publish a new
/// attestation. Answers with an empty 200 on success.
pub async fn post_log_srd_with_rev_data(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let submission: RevocationSubmission = serde_json::from_slice(&body)
        .map_err(|e| LoggerError::InvalidEncoding(format!("Invalid submission: {}", e)))?;

    state.engine.ingest(&submission)?;

    Ok(StatusCode::OK)
}
