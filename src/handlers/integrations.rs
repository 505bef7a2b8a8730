//! Integration registry endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::entities::integrations;
use crate::handlers::error::{map_db_error, map_service_error, ApiError};
use crate::models::integration::{IntegrationListResponse, SetEnabledRequest, UpsertIntegrationRequest};
use crate::services::integration_registry;
use crate::AppState;

pub async fn list_integrations(
    State(state): State<AppState>,
) -> Result<Json<IntegrationListResponse>, ApiError> {
    let integrations = integration_registry::list_integrations(&state.db)
        .await
        .map_err(map_db_error)?;
    let total_count = integrations.len();

    Ok(Json(IntegrationListResponse {
        integrations,
        total_count,
    }))
}

pub async fn get_integration(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<integrations::Model>, ApiError> {
    let integration = integration_registry::get_integration(&state.db, &name)
        .await
        .map_err(map_service_error)?;
    Ok(Json(integration))
}

pub async fn upsert_integration(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<UpsertIntegrationRequest>,
) -> Result<Json<integrations::Model>, ApiError> {
    let integration =
        integration_registry::upsert_integration(&state.db, &name, request.category, request.config)
            .await
            .map_err(map_service_error)?;
    Ok(Json(integration))
}

pub async fn set_enabled(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<SetEnabledRequest>,
) -> Result<Json<integrations::Model>, ApiError> {
    let integration = integration_registry::set_enabled(&state.db, &name, request.enabled)
        .await
        .map_err(map_service_error)?;
    Ok(Json(integration))
}
