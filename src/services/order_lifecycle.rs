//! Order lifecycle state machine
//!
//! A status change is one database transaction: a compare-and-swap on
//! `(id, status, version)`, the milestone stamp, any tasks the new status
//! owns, and the status_changed event. Either all of it lands or none of it.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use tracing::{debug, info};

use crate::entities::orders::{self, Entity as Orders};
use crate::entities::{order_items, pack_tasks, pick_tasks};
use crate::models::event::{event_types, EntityType};
use crate::models::fulfillment::{PackTaskStatus, PickTaskStatus};
use crate::models::order::{Milestone, OrderStatus, TransitionCheck};
use crate::services::error::ServiceError;
use crate::services::event_log::{self, NewEvent};

/// Advance an order in its own transaction
pub async fn advance_order_status(
    db: &DatabaseConnection,
    order_id: i32,
    target: OrderStatus,
) -> Result<orders::Model, ServiceError> {
    let txn = db.begin().await?;

    let order = Orders::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("order", order_id))?;

    // Dropping txn on error rolls everything back
    let updated = advance(&txn, order, target).await?;

    txn.commit().await?;
    Ok(updated)
}

pub fn current_status(order: &orders::Model) -> Result<OrderStatus, ServiceError> {
    order
        .status
        .parse()
        .map_err(|e: String| ServiceError::validation("status", e))
}

/// Apply a transition using the caller's connection, which should be a
/// transaction for the write set to be atomic.
pub async fn advance<C: ConnectionTrait>(
    conn: &C,
    order: orders::Model,
    target: OrderStatus,
) -> Result<orders::Model, ServiceError> {
    let current = current_status(&order)?;

    match current.check_transition(target) {
        TransitionCheck::Unchanged => {
            debug!(order_id = order.id, status = %current, "Status already applied, no-op");
            return Ok(order);
        }
        TransitionCheck::Rejected => {
            return Err(ServiceError::InvalidTransition { current, target });
        }
        TransitionCheck::Allowed => {}
    }

    match target {
        OrderStatus::Picked => ensure_picking_closed(conn, order.id).await?,
        OrderStatus::Packed => ensure_packing_complete(conn, order.id).await?,
        _ => {}
    }

    let now = Utc::now();
    let mut update = Orders::update_many()
        .col_expr(orders::Column::Status, Expr::value(target.as_str()))
        .col_expr(orders::Column::Version, Expr::col(orders::Column::Version).add(1))
        .col_expr(orders::Column::UpdatedAt, Expr::value(now));

    for milestone in milestones_to_stamp(&order, target) {
        update = update.col_expr(milestone_column(milestone), Expr::value(now));
    }

    let result = update
        .filter(orders::Column::Id.eq(order.id))
        .filter(orders::Column::Status.eq(current.as_str()))
        .filter(orders::Column::Version.eq(order.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::Conflict(format!(
            "order {} changed concurrently (expected {} at version {})",
            order.id, current, order.version
        )));
    }

    let created_tasks = match target {
        OrderStatus::Validated => create_pick_tasks(conn, order.id).await?,
        OrderStatus::Picked => create_pack_task(conn, order.id).await?,
        _ => 0,
    };

    event_log::append(
        conn,
        NewEvent::new(
            EntityType::Order,
            order.id,
            event_types::STATUS_CHANGED,
            format!("Order {} moved from {} to {}", order.saylogix_number, current, target),
        )
        .states(
            json!({ "status": current.as_str(), "version": order.version }),
            json!({ "status": target.as_str(), "version": order.version + 1 }),
        )
        .metadata(json!({ "tasks_created": created_tasks })),
    )
    .await?;

    let updated = Orders::find_by_id(order.id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("order", order.id))?;

    info!(
        order_id = order.id,
        from = %current,
        to = %target,
        tasks_created = created_tasks,
        "Order status advanced"
    );

    Ok(updated)
}

/// Milestones the target status stamps. Already-set milestones are never
/// overwritten; `picking_started` is back-filled so the trail has no gap.
fn milestones_to_stamp(order: &orders::Model, target: OrderStatus) -> Vec<Milestone> {
    let Some(milestone) = target.milestone() else {
        return Vec::new();
    };

    let mut stamps = Vec::new();
    if milestone == Milestone::PickingCompleted && order.picking_started.is_none() {
        stamps.push(Milestone::PickingStarted);
    }
    if milestone.read(order).is_none() {
        stamps.push(milestone);
    }
    stamps
}

fn milestone_column(milestone: Milestone) -> orders::Column {
    match milestone {
        Milestone::OrderFetched => orders::Column::OrderFetched,
        Milestone::VerifyCompleted => orders::Column::VerifyCompleted,
        Milestone::PickingStarted => orders::Column::PickingStarted,
        Milestone::PickingCompleted => orders::Column::PickingCompleted,
        Milestone::PackingCompleted => orders::Column::PackingCompleted,
        Milestone::Dispatched => orders::Column::Dispatched,
        Milestone::Delivered => orders::Column::Delivered,
    }
}

/// Every pick task completed or exception-closed, and at least one exists
async fn ensure_picking_closed<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<(), ServiceError> {
    let tasks = pick_tasks::Entity::find()
        .filter(pick_tasks::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;

    if tasks.is_empty() {
        return Err(ServiceError::validation(
            "pick_tasks",
            format!("order {} has no pick tasks", order_id),
        ));
    }

    let open: Vec<i32> = tasks
        .iter()
        .filter(|task| {
            !task
                .status
                .parse::<PickTaskStatus>()
                .map(|status| status.is_closed())
                .unwrap_or(false)
        })
        .map(|task| task.id)
        .collect();

    if !open.is_empty() {
        return Err(ServiceError::validation(
            "pick_tasks",
            format!(
                "{} of {} pick tasks still open: {:?}",
                open.len(),
                tasks.len(),
                open
            ),
        ));
    }

    Ok(())
}

/// Every pack task completed, and at least one exists
async fn ensure_packing_complete<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<(), ServiceError> {
    let tasks = pack_tasks::Entity::find()
        .filter(pack_tasks::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;

    if tasks.is_empty() {
        return Err(ServiceError::validation(
            "pack_tasks",
            format!("order {} has no pack tasks", order_id),
        ));
    }

    let open: Vec<i32> = tasks
        .iter()
        .filter(|task| task.status != PackTaskStatus::Completed.as_str())
        .map(|task| task.id)
        .collect();

    if !open.is_empty() {
        return Err(ServiceError::validation(
            "pack_tasks",
            format!("pack tasks not completed: {:?}", open),
        ));
    }

    Ok(())
}

/// One pending pick task per order item
async fn create_pick_tasks<C: ConnectionTrait>(conn: &C, order_id: i32) -> Result<usize, ServiceError> {
    let items = order_items::Entity::find()
        .filter(order_items::Column::OrderId.eq(order_id))
        .order_by_asc(order_items::Column::Id)
        .all(conn)
        .await?;

    for item in &items {
        let task = pick_tasks::ActiveModel {
            order_id: Set(order_id),
            order_item_id: Set(item.id),
            sku: Set(item.sku.clone()),
            quantity: Set(item.quantity),
            picked_qty: Set(0),
            bin_location: Set(item.bin_location.clone()),
            tote_id: Set(None),
            status: Set(PickTaskStatus::Pending.as_str().to_string()),
            assigned_to: Set(None),
            exception_reason: Set(None),
            started_at: Set(None),
            completed_at: Set(None),
            ..Default::default()
        };
        task.insert(conn).await?;
    }

    Ok(items.len())
}

async fn create_pack_task<C: ConnectionTrait>(conn: &C, order_id: i32) -> Result<usize, ServiceError> {
    let task = pack_tasks::ActiveModel {
        order_id: Set(order_id),
        status: Set(PackTaskStatus::Pending.as_str().to_string()),
        packaging_type: Set(None),
        weight: Set(None),
        dimensions: Set(None),
        tote_id: Set(None),
        started_at: Set(None),
        completed_at: Set(None),
        ..Default::default()
    };
    task.insert(conn).await?;
    Ok(1)
}

/// Stamp `picking_started` if it is still empty. Part of the first pick scan.
pub async fn mark_picking_started<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
    at: DateTime<Utc>,
) -> Result<(), ServiceError> {
    Orders::update_many()
        .col_expr(orders::Column::PickingStarted, Expr::value(at))
        .col_expr(orders::Column::Version, Expr::col(orders::Column::Version).add(1))
        .col_expr(orders::Column::UpdatedAt, Expr::value(at))
        .filter(orders::Column::Id.eq(order_id))
        .filter(orders::Column::PickingStarted.is_null())
        .filter(orders::Column::VerifyCompleted.is_not_null())
        .exec(conn)
        .await?;
    Ok(())
}

/// Fence a dependent write (task scan, pack completion) against the order
/// row: the order must still be `expected` at the version read, and its
/// version moves on. A status change that landed in between turns the
/// dependent write into a `Conflict`.
pub async fn hold_order<C: ConnectionTrait>(
    conn: &C,
    order: &orders::Model,
    expected: OrderStatus,
) -> Result<(), ServiceError> {
    let result = Orders::update_many()
        .col_expr(orders::Column::Version, Expr::col(orders::Column::Version).add(1))
        .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(orders::Column::Id.eq(order.id))
        .filter(orders::Column::Status.eq(expected.as_str()))
        .filter(orders::Column::Version.eq(order.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::Conflict(format!(
            "order {} changed concurrently, expected {} at version {}",
            order.id, expected, order.version
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn order_with(status: OrderStatus) -> orders::Model {
        let now = Utc::now();
        orders::Model {
            id: 1,
            saylogix_number: "SLX-TEST0001".to_string(),
            source_order_number: "1001".to_string(),
            source_channel: "shopify".to_string(),
            status: status.as_str().to_string(),
            customer_name: "Test".to_string(),
            customer_phone: None,
            customer_email: None,
            shipping_address: "{}".to_string(),
            billing_address: None,
            coordinates: None,
            nas_code: None,
            nas_verified: false,
            verified_address: None,
            verification_timestamp: None,
            order_value: Decimal::ZERO,
            currency: "SAR".to_string(),
            order_fetched: Some(now),
            verify_completed: None,
            picking_started: None,
            picking_completed: None,
            packing_completed: None,
            dispatched: None,
            delivered: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_validated_stamps_verify_completed() {
        let order = order_with(OrderStatus::Fetched);
        assert_eq!(
            milestones_to_stamp(&order, OrderStatus::Validated),
            vec![Milestone::VerifyCompleted]
        );
    }

    #[test]
    fn test_picked_backfills_picking_started() {
        let order = order_with(OrderStatus::Validated);
        assert_eq!(
            milestones_to_stamp(&order, OrderStatus::Picked),
            vec![Milestone::PickingStarted, Milestone::PickingCompleted]
        );

        let mut started = order_with(OrderStatus::Validated);
        started.picking_started = Some(Utc::now());
        assert_eq!(
            milestones_to_stamp(&started, OrderStatus::Picked),
            vec![Milestone::PickingCompleted]
        );
    }

    #[test]
    fn test_existing_milestone_is_not_restamped() {
        let mut order = order_with(OrderStatus::Fetched);
        order.verify_completed = Some(Utc::now());
        assert!(milestones_to_stamp(&order, OrderStatus::Validated).is_empty());
    }

    #[test]
    fn test_side_states_stamp_nothing() {
        let order = order_with(OrderStatus::Packed);
        assert!(milestones_to_stamp(&order, OrderStatus::Cancelled).is_empty());
        assert!(milestones_to_stamp(&order, OrderStatus::Exception).is_empty());
    }
}
