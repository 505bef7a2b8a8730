//! Delivery route endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::entities::{route_stops, routes};
use crate::handlers::error::{map_service_error, ApiError};
use crate::models::route::{
    AddRouteStopRequest, CreateRouteRequest, DeliveryAttemptRequest, RouteDetailResponse,
};
use crate::services::delivery_routes;
use crate::AppState;

pub async fn create_route(
    State(state): State<AppState>,
    Json(request): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<routes::Model>), ApiError> {
    let route = delivery_routes::create_route(&state.db, &request.driver_name, request.vehicle_number)
        .await
        .map_err(map_service_error)?;
    Ok((StatusCode::CREATED, Json(route)))
}

pub async fn list_routes(State(state): State<AppState>) -> Result<Json<Vec<routes::Model>>, ApiError> {
    let routes = delivery_routes::list_routes(&state.db)
        .await
        .map_err(map_service_error)?;
    Ok(Json(routes))
}

pub async fn get_route(
    State(state): State<AppState>,
    Path(route_id): Path<i32>,
) -> Result<Json<RouteDetailResponse>, ApiError> {
    let (route, stops) = delivery_routes::get_route_detail(&state.db, route_id)
        .await
        .map_err(map_service_error)?;
    Ok(Json(RouteDetailResponse { route, stops }))
}

pub async fn add_route_stop(
    State(state): State<AppState>,
    Path(route_id): Path<i32>,
    Json(request): Json<AddRouteStopRequest>,
) -> Result<(StatusCode, Json<route_stops::Model>), ApiError> {
    let stop = delivery_routes::add_route_stop(&state.db, route_id, request.order_id)
        .await
        .map_err(map_service_error)?;
    Ok((StatusCode::CREATED, Json(stop)))
}

pub async fn remove_route_stop(
    State(state): State<AppState>,
    Path(stop_id): Path<i32>,
) -> Result<Json<Vec<route_stops::Model>>, ApiError> {
    let stops = delivery_routes::remove_route_stop(&state.db, stop_id)
        .await
        .map_err(map_service_error)?;
    Ok(Json(stops))
}

pub async fn record_delivery_attempt(
    State(state): State<AppState>,
    Path(stop_id): Path<i32>,
    Json(request): Json<DeliveryAttemptRequest>,
) -> Result<Json<route_stops::Model>, ApiError> {
    let stop = delivery_routes::record_delivery_attempt(&state.db, stop_id, request.outcome, request.reason)
        .await
        .map_err(map_service_error)?;
    Ok(Json(stop))
}
