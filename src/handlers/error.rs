use axum::{http::StatusCode, Json};

use crate::models::error::ErrorResponse;
use crate::services::error::{ProviderError, ServiceError};

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: String, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error,
            code: Some(code.to_string()),
            current_status: None,
        }),
    )
}

/// Map a service failure onto a status code and a machine-readable code.
/// Not-found and validation failures stay distinct from provider and
/// database failures so clients can tell "retry" from "escalate".
pub fn map_service_error(err: ServiceError) -> ApiError {
    match err {
        ServiceError::InvalidTransition { current, target } => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("Invalid transition from {} to {}", current, target),
                code: Some("INVALID_TRANSITION".to_string()),
                current_status: Some(current.as_str().to_string()),
            }),
        ),
        ServiceError::Validation { field, message } => api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("{}: {}", field, message),
            "VALIDATION_ERROR",
        ),
        err @ ServiceError::NotFound { .. } => {
            api_error(StatusCode::NOT_FOUND, err.to_string(), "NOT_FOUND")
        }
        ServiceError::Provider(ProviderError::Timeout(msg)) => api_error(
            StatusCode::GATEWAY_TIMEOUT,
            format!("Provider timeout: {}", msg),
            "PROVIDER_TIMEOUT",
        ),
        ServiceError::Provider(err) => {
            api_error(StatusCode::BAD_GATEWAY, err.to_string(), "PROVIDER_ERROR")
        }
        ServiceError::Conflict(msg) => api_error(StatusCode::CONFLICT, msg, "CONFLICT"),
        ServiceError::Database(err) => {
            tracing::error!("Database error: {}", err);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", err),
                "DATABASE_ERROR",
            )
        }
    }
}

/// Database errors raised directly by a handler query
pub fn map_db_error(err: sea_orm::DbErr) -> ApiError {
    map_service_error(ServiceError::Database(err))
}
