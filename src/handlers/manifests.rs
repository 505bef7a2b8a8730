//! Manifest endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::entities::{manifest_items, manifests};
use crate::handlers::error::{map_service_error, ApiError};
use crate::models::manifest::{
    AddManifestItemRequest, CreateManifestRequest, HandOverResponse, ManifestDetailResponse,
};
use crate::services::manifests as manifest_service;
use crate::AppState;

pub async fn create_manifest(
    State(state): State<AppState>,
    Json(request): Json<CreateManifestRequest>,
) -> Result<(StatusCode, Json<manifests::Model>), ApiError> {
    let manifest = manifest_service::create_manifest(&state.db, &request.courier_name)
        .await
        .map_err(map_service_error)?;
    Ok((StatusCode::CREATED, Json(manifest)))
}

pub async fn list_manifests(
    State(state): State<AppState>,
) -> Result<Json<Vec<manifests::Model>>, ApiError> {
    let manifests = manifest_service::list_manifests(&state.db)
        .await
        .map_err(map_service_error)?;
    Ok(Json(manifests))
}

pub async fn get_manifest(
    State(state): State<AppState>,
    Path(manifest_id): Path<i32>,
) -> Result<Json<ManifestDetailResponse>, ApiError> {
    let (manifest, items) = manifest_service::get_manifest_detail(&state.db, manifest_id)
        .await
        .map_err(map_service_error)?;
    Ok(Json(ManifestDetailResponse { manifest, items }))
}

pub async fn add_manifest_item(
    State(state): State<AppState>,
    Path(manifest_id): Path<i32>,
    Json(request): Json<AddManifestItemRequest>,
) -> Result<(StatusCode, Json<manifest_items::Model>), ApiError> {
    let item = manifest_service::add_to_manifest(
        &state.db,
        manifest_id,
        request.order_id,
        request.tracking_number,
    )
    .await
    .map_err(map_service_error)?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn remove_manifest_item(
    State(state): State<AppState>,
    Path(item_id): Path<i32>,
) -> Result<Json<manifests::Model>, ApiError> {
    let manifest = manifest_service::remove_from_manifest(&state.db, item_id)
        .await
        .map_err(map_service_error)?;
    Ok(Json(manifest))
}

pub async fn scan_manifest_item(
    State(state): State<AppState>,
    Path(item_id): Path<i32>,
) -> Result<Json<manifest_items::Model>, ApiError> {
    let item = manifest_service::scan_manifest_item(&state.db, item_id)
        .await
        .map_err(map_service_error)?;
    Ok(Json(item))
}

pub async fn hand_over_manifest(
    State(state): State<AppState>,
    Path(manifest_id): Path<i32>,
) -> Result<Json<HandOverResponse>, ApiError> {
    let response = manifest_service::hand_over_manifest(&state.db, manifest_id)
        .await
        .map_err(map_service_error)?;
    Ok(Json(response))
}
