//! Pick and pack task endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::entities::{pack_tasks, pick_tasks};
use crate::handlers::error::{map_service_error, ApiError};
use crate::models::fulfillment::{
    AssignPickTaskRequest, CompletePackTaskRequest, PickExceptionRequest, PickScanRequest,
};
use crate::services::fulfillment;
use crate::AppState;

pub async fn assign_pick_task(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
    Json(request): Json<AssignPickTaskRequest>,
) -> Result<Json<pick_tasks::Model>, ApiError> {
    let task = fulfillment::assign_pick_task(&state.db, task_id, &request.assigned_to, request.tote_id)
        .await
        .map_err(map_service_error)?;
    Ok(Json(task))
}

pub async fn record_pick_scan(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
    Json(request): Json<PickScanRequest>,
) -> Result<Json<pick_tasks::Model>, ApiError> {
    let task = fulfillment::record_pick_scan(&state.db, task_id, request.scanned_qty, request.bin_location)
        .await
        .map_err(map_service_error)?;
    Ok(Json(task))
}

pub async fn report_pick_exception(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
    Json(request): Json<PickExceptionRequest>,
) -> Result<Json<pick_tasks::Model>, ApiError> {
    let task = fulfillment::report_pick_exception(&state.db, task_id, &request.reason)
        .await
        .map_err(map_service_error)?;
    Ok(Json(task))
}

pub async fn complete_pack_task(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
    Json(request): Json<CompletePackTaskRequest>,
) -> Result<Json<pack_tasks::Model>, ApiError> {
    let task = fulfillment::complete_pack_task(&state.db, task_id, request)
        .await
        .map_err(map_service_error)?;
    Ok(Json(task))
}
