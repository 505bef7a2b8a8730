//! Last-mile delivery routes
//!
//! Stop sequences are dense per route (1..=n). Adding appends at n + 1;
//! removing closes the gap.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::entities::route_stops::{self, Entity as RouteStops};
use crate::entities::routes::{self, Entity as Routes};
use crate::models::event::{event_types, EntityType};
use crate::models::order::OrderStatus;
use crate::models::route::{DeliveryOutcome, RouteStatus, RouteStopStatus};
use crate::services::error::{map_unique_violation, ServiceError};
use crate::services::event_log::{self, NewEvent};
use crate::services::order_lifecycle::{self, current_status};
use crate::services::orders::get_order;

pub fn generate_route_number() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("RTE-{}", id[..8].to_uppercase())
}

async fn find_route<C: ConnectionTrait>(conn: &C, route_id: i32) -> Result<routes::Model, ServiceError> {
    Routes::find_by_id(route_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("route", route_id))
}

async fn find_stop<C: ConnectionTrait>(conn: &C, stop_id: i32) -> Result<route_stops::Model, ServiceError> {
    RouteStops::find_by_id(stop_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("route stop", stop_id))
}

async fn stops_of<C: ConnectionTrait>(conn: &C, route_id: i32) -> Result<Vec<route_stops::Model>, ServiceError> {
    Ok(RouteStops::find()
        .filter(route_stops::Column::RouteId.eq(route_id))
        .order_by_asc(route_stops::Column::StopSequence)
        .all(conn)
        .await?)
}

pub async fn create_route(
    db: &DatabaseConnection,
    driver_name: &str,
    vehicle_number: Option<String>,
) -> Result<routes::Model, ServiceError> {
    let driver_name = driver_name.trim();
    if driver_name.is_empty() {
        return Err(ServiceError::validation("driver_name", "driver_name is required"));
    }

    let route = routes::ActiveModel {
        route_number: Set(generate_route_number()),
        driver_name: Set(driver_name.to_string()),
        vehicle_number: Set(vehicle_number),
        status: Set(RouteStatus::Planned.as_str().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| map_unique_violation(e, "route number"))?;

    info!(route_id = route.id, driver = driver_name, "Route created");
    Ok(route)
}

pub async fn list_routes(db: &DatabaseConnection) -> Result<Vec<routes::Model>, ServiceError> {
    Ok(Routes::find()
        .order_by_desc(routes::Column::CreatedAt)
        .order_by_desc(routes::Column::Id)
        .all(db)
        .await?)
}

pub async fn get_route_detail(
    db: &DatabaseConnection,
    route_id: i32,
) -> Result<(routes::Model, Vec<route_stops::Model>), ServiceError> {
    let route = find_route(db, route_id).await?;
    let stops = stops_of(db, route_id).await?;
    Ok((route, stops))
}

/// Append a dispatched order as the route's next stop
pub async fn add_route_stop(
    db: &DatabaseConnection,
    route_id: i32,
    order_id: i32,
) -> Result<route_stops::Model, ServiceError> {
    let txn = db.begin().await?;

    let route = find_route(&txn, route_id).await?;
    if route.status == RouteStatus::Completed.as_str() {
        return Err(ServiceError::validation(
            "route",
            format!("route {} is already completed", route.route_number),
        ));
    }

    let order = get_order(&txn, order_id).await?;
    let status = current_status(&order)?;
    if status != OrderStatus::Dispatched {
        return Err(ServiceError::validation(
            "order",
            format!("order {} is {}, only dispatched orders can be routed", order_id, status),
        ));
    }
    order_lifecycle::hold_order(&txn, &order, OrderStatus::Dispatched).await?;

    let already_routed = RouteStops::find()
        .filter(route_stops::Column::OrderId.eq(order_id))
        .filter(route_stops::Column::Status.ne(RouteStopStatus::Failed.as_str()))
        .one(&txn)
        .await?;
    if let Some(stop) = already_routed {
        return Err(ServiceError::Conflict(format!(
            "order {} is already stop {} on route {}",
            order_id, stop.stop_sequence, stop.route_id
        )));
    }

    let count = RouteStops::find()
        .filter(route_stops::Column::RouteId.eq(route.id))
        .count(&txn)
        .await?;
    let stop_sequence = count as i32 + 1;

    let stop = route_stops::ActiveModel {
        route_id: Set(route.id),
        order_id: Set(order_id),
        stop_sequence: Set(stop_sequence),
        status: Set(RouteStopStatus::Pending.as_str().to_string()),
        attempts: Set(0),
        failure_reason: Set(None),
        delivered_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| map_unique_violation(e, &format!("stop {} on route {}", stop_sequence, route.id)))?;

    event_log::append(
        &txn,
        NewEvent::new(
            EntityType::Route,
            route.id,
            event_types::ROUTE_STOP_ADDED,
            format!("Order {} added as stop {}", order.saylogix_number, stop_sequence),
        )
        .metadata(json!({ "stop_id": stop.id, "order_id": order_id, "stop_sequence": stop_sequence })),
    )
    .await?;

    txn.commit().await?;

    info!(route_id, order_id, stop_sequence, "Route stop added");
    Ok(stop)
}

/// Remove a stop and shift later stops down; returns the remaining stops
pub async fn remove_route_stop(
    db: &DatabaseConnection,
    stop_id: i32,
) -> Result<Vec<route_stops::Model>, ServiceError> {
    let txn = db.begin().await?;

    let stop = find_stop(&txn, stop_id).await?;
    if stop.status == RouteStopStatus::Delivered.as_str() {
        return Err(ServiceError::validation(
            "status",
            format!("stop {} is already delivered", stop.id),
        ));
    }

    let route_id = stop.route_id;
    let removed_sequence = stop.stop_sequence;
    let order_id = stop.order_id;
    stop.delete(&txn).await?;

    // Ascending order keeps (route_id, stop_sequence) unique at every step
    let later = RouteStops::find()
        .filter(route_stops::Column::RouteId.eq(route_id))
        .filter(route_stops::Column::StopSequence.gt(removed_sequence))
        .order_by_asc(route_stops::Column::StopSequence)
        .all(&txn)
        .await?;

    for next in later {
        RouteStops::update_many()
            .col_expr(
                route_stops::Column::StopSequence,
                Expr::value(next.stop_sequence - 1),
            )
            .filter(route_stops::Column::Id.eq(next.id))
            .exec(&txn)
            .await?;
    }

    event_log::append(
        &txn,
        NewEvent::new(
            EntityType::Route,
            route_id,
            event_types::ROUTE_STOP_REMOVED,
            format!("Stop {} removed", removed_sequence),
        )
        .metadata(json!({ "stop_id": stop_id, "order_id": order_id, "stop_sequence": removed_sequence })),
    )
    .await?;

    let remaining = stops_of(&txn, route_id).await?;
    txn.commit().await?;

    info!(route_id, stop_id, remaining = remaining.len(), "Route stop removed");
    Ok(remaining)
}

/// Record one delivery attempt at a stop. A delivered attempt also moves
/// the order to `delivered` in the same transaction.
pub async fn record_delivery_attempt(
    db: &DatabaseConnection,
    stop_id: i32,
    outcome: DeliveryOutcome,
    reason: Option<String>,
) -> Result<route_stops::Model, ServiceError> {
    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    if outcome == DeliveryOutcome::Failed && reason.is_none() {
        return Err(ServiceError::validation(
            "reason",
            "a failed delivery attempt needs a reason",
        ));
    }

    let txn = db.begin().await?;

    let stop = find_stop(&txn, stop_id).await?;
    if stop.status == RouteStopStatus::Delivered.as_str() {
        return Err(ServiceError::validation(
            "status",
            format!("stop {} is already delivered", stop.id),
        ));
    }

    let route = find_route(&txn, stop.route_id).await?;
    if route.status == RouteStatus::Planned.as_str() {
        Routes::update_many()
            .col_expr(routes::Column::Status, Expr::value(RouteStatus::InProgress.as_str()))
            .filter(routes::Column::Id.eq(route.id))
            .filter(routes::Column::Status.eq(RouteStatus::Planned.as_str()))
            .exec(&txn)
            .await?;
    }

    let now = Utc::now();
    let new_status = match outcome {
        DeliveryOutcome::Delivered => RouteStopStatus::Delivered,
        DeliveryOutcome::Failed => RouteStopStatus::Failed,
    };

    let mut update = RouteStops::update_many()
        .col_expr(route_stops::Column::Status, Expr::value(new_status.as_str()))
        .col_expr(route_stops::Column::Attempts, Expr::col(route_stops::Column::Attempts).add(1))
        .col_expr(route_stops::Column::FailureReason, Expr::value(reason.clone()));
    if outcome == DeliveryOutcome::Delivered {
        update = update.col_expr(route_stops::Column::DeliveredAt, Expr::value(now));
    }

    let result = update
        .filter(route_stops::Column::Id.eq(stop.id))
        .filter(route_stops::Column::Status.eq(stop.status.as_str()))
        .filter(route_stops::Column::Attempts.eq(stop.attempts))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::Conflict(format!(
            "route stop {} changed concurrently",
            stop.id
        )));
    }

    if outcome == DeliveryOutcome::Delivered {
        let order = get_order(&txn, stop.order_id).await?;
        order_lifecycle::advance(&txn, order, OrderStatus::Delivered).await?;

        let undelivered = RouteStops::find()
            .filter(route_stops::Column::RouteId.eq(route.id))
            .filter(route_stops::Column::Status.ne(RouteStopStatus::Delivered.as_str()))
            .count(&txn)
            .await?;
        if undelivered == 0 {
            Routes::update_many()
                .col_expr(routes::Column::Status, Expr::value(RouteStatus::Completed.as_str()))
                .filter(routes::Column::Id.eq(route.id))
                .exec(&txn)
                .await?;
        }
    }

    event_log::append(
        &txn,
        NewEvent::new(
            EntityType::RouteStop,
            stop.id,
            event_types::DELIVERY_ATTEMPTED,
            match &reason {
                Some(reason) => format!("Delivery attempt {}: {}", new_status.as_str(), reason),
                None => format!("Delivery attempt {}", new_status.as_str()),
            },
        )
        .states(
            json!({ "status": stop.status, "attempts": stop.attempts }),
            json!({ "status": new_status.as_str(), "attempts": stop.attempts + 1 }),
        )
        .metadata(json!({ "route_id": route.id, "order_id": stop.order_id })),
    )
    .await?;

    let updated = find_stop(&txn, stop.id).await?;
    txn.commit().await?;

    info!(
        stop_id = stop.id,
        order_id = stop.order_id,
        outcome = new_status.as_str(),
        attempts = updated.attempts,
        "Delivery attempt recorded"
    );

    Ok(updated)
}
