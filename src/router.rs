use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{address, fulfillment, health, integrations, manifests, orders, routes};
use crate::AppState;

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(orders::create_order).get(orders::list_orders))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/status", post(orders::advance_order_status))
        .route("/api/orders/{id}/events", get(orders::list_order_events))
        .route("/api/orders/{id}/verify-address", post(orders::verify_address))
        .route("/api/orders/{id}/verifications", get(orders::list_verifications))
        .route("/api/orders/{id}/pick-tasks", get(orders::list_pick_tasks))
        .route("/api/orders/{id}/pack-tasks", get(orders::list_pack_tasks))
}

fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/api/address/extract-nas", post(address::extract_nas))
        .route("/api/address/verify-batch", post(address::verify_batch))
}

fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/api/pick-tasks/{id}/assign", post(fulfillment::assign_pick_task))
        .route("/api/pick-tasks/{id}/scan", post(fulfillment::record_pick_scan))
        .route("/api/pick-tasks/{id}/exception", post(fulfillment::report_pick_exception))
        .route("/api/pack-tasks/{id}/complete", post(fulfillment::complete_pack_task))
}

fn manifest_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/manifests",
            post(manifests::create_manifest).get(manifests::list_manifests),
        )
        .route("/api/manifests/{id}", get(manifests::get_manifest))
        .route("/api/manifests/{id}/items", post(manifests::add_manifest_item))
        .route("/api/manifests/{id}/hand-over", post(manifests::hand_over_manifest))
        .route("/api/manifest-items/{id}", delete(manifests::remove_manifest_item))
        .route("/api/manifest-items/{id}/scan", post(manifests::scan_manifest_item))
}

fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/api/routes", post(routes::create_route).get(routes::list_routes))
        .route("/api/routes/{id}", get(routes::get_route))
        .route("/api/routes/{id}/stops", post(routes::add_route_stop))
        .route("/api/route-stops/{id}", delete(routes::remove_route_stop))
        .route("/api/route-stops/{id}/attempt", post(routes::record_delivery_attempt))
}

fn integration_routes() -> Router<AppState> {
    Router::new()
        .route("/api/integrations", get(integrations::list_integrations))
        .route(
            "/api/integrations/{name}",
            get(integrations::get_integration).put(integrations::upsert_integration),
        )
        .route("/api/integrations/{name}/enabled", put(integrations::set_enabled))
}

/// Full application router, shared by `main` and the HTTP tests
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .merge(order_routes())
        .merge(address_routes())
        .merge(task_routes())
        .merge(manifest_routes())
        .merge(delivery_routes())
        .merge(integration_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
