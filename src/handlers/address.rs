//! Address utilities that are not tied to an order

use axum::{extract::State, Json};

use crate::handlers::error::{map_service_error, ApiError};
use crate::models::address::{
    BatchVerificationResult, BatchVerifyRequest, ExtractNasRequest, ExtractNasResponse,
};
use crate::services::address_verification;
use crate::services::error::ServiceError;
use crate::services::nas::extract_nas_with_policy;
use crate::AppState;

/// Batches larger than this are rejected outright
const MAX_BATCH_SIZE: usize = 500;

pub async fn extract_nas(
    State(state): State<AppState>,
    Json(request): Json<ExtractNasRequest>,
) -> Json<ExtractNasResponse> {
    Json(ExtractNasResponse {
        nas_code: extract_nas_with_policy(&request.address, state.config.nas_match_policy),
    })
}

pub async fn verify_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchVerifyRequest>,
) -> Result<Json<BatchVerificationResult>, ApiError> {
    if request.codes.len() > MAX_BATCH_SIZE {
        return Err(map_service_error(ServiceError::validation(
            "codes",
            format!("at most {} codes per batch", MAX_BATCH_SIZE),
        )));
    }

    Ok(Json(
        address_verification::verify_address_batch(&state, request.codes).await,
    ))
}
