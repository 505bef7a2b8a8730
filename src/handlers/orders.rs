//! Order endpoints
//!
//! POST /api/orders, GET /api/orders, GET /api/orders/{id},
//! POST /api/orders/{id}/status and the per-order sub-resources.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::handlers::error::{map_service_error, ApiError};
use crate::models::address::VerificationResult;
use crate::models::address::VerifyAddressRequest;
use crate::models::event::{EventListResponse, EventView};
use crate::models::fulfillment::{PackTaskListResponse, PickTaskListResponse};
use crate::models::order::{
    AdvanceStatusRequest, CreateOrderRequest, ListOrdersQuery, OrderDetailResponse,
    OrderListResponse, OrderView,
};
use crate::entities::address_verifications;
use crate::services::{address_verification, order_lifecycle, orders};
use crate::AppState;

pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetailResponse>), ApiError> {
    let (order, items) = orders::create_order(&state.db, request, state.config.nas_match_policy)
        .await
        .map_err(map_service_error)?;

    Ok((
        StatusCode::CREATED,
        Json(OrderDetailResponse {
            order: order.into(),
            items,
        }),
    ))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let orders = orders::list_orders(&state.db, query.status, query.limit)
        .await
        .map_err(map_service_error)?;

    let orders: Vec<OrderView> = orders.into_iter().map(OrderView::from).collect();
    let total_count = orders.len();

    Ok(Json(OrderListResponse { orders, total_count }))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> Result<Json<OrderDetailResponse>, ApiError> {
    let (order, items) = orders::get_order_detail(&state.db, order_id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(OrderDetailResponse {
        order: order.into(),
        items,
    }))
}

pub async fn advance_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    Json(request): Json<AdvanceStatusRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let order = order_lifecycle::advance_order_status(&state.db, order_id, request.status)
        .await
        .map_err(map_service_error)?;

    Ok(Json(order.into()))
}

pub async fn list_order_events(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> Result<Json<EventListResponse>, ApiError> {
    let events = orders::list_order_events(&state.db, order_id)
        .await
        .map_err(map_service_error)?;

    let events: Vec<EventView> = events.into_iter().map(EventView::from).collect();
    let total_count = events.len();

    Ok(Json(EventListResponse { events, total_count }))
}

pub async fn verify_address(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    request: Option<Json<VerifyAddressRequest>>,
) -> Result<Json<VerificationResult>, ApiError> {
    let mode = request.map(|Json(r)| r.mode).unwrap_or_default();

    let result = address_verification::verify_address(&state, order_id, mode)
        .await
        .map_err(map_service_error)?;

    Ok(Json(result))
}

pub async fn list_verifications(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> Result<Json<Vec<address_verifications::Model>>, ApiError> {
    let verifications = orders::list_verifications(&state.db, order_id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(verifications))
}

pub async fn list_pick_tasks(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> Result<Json<PickTaskListResponse>, ApiError> {
    let tasks = orders::list_pick_tasks(&state.db, order_id)
        .await
        .map_err(map_service_error)?;
    let total_count = tasks.len();

    Ok(Json(PickTaskListResponse { tasks, total_count }))
}

pub async fn list_pack_tasks(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> Result<Json<PackTaskListResponse>, ApiError> {
    let tasks = orders::list_pack_tasks(&state.db, order_id)
        .await
        .map_err(map_service_error)?;
    let total_count = tasks.len();

    Ok(Json(PackTaskListResponse { tasks, total_count }))
}
