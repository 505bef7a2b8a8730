//! Pick and pack task coordination
//!
//! Task writes are compare-and-swaps on the values read at the start of
//! the call (status, and `picked_qty` for scans). A concurrent writer makes
//! the second call fail with `Conflict` instead of double-counting.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use serde_json::json;
use tracing::info;

use crate::entities::order_items;
use crate::entities::pack_tasks::{self, Entity as PackTasks};
use crate::entities::pick_tasks::{self, Entity as PickTasks};
use crate::models::event::{event_types, EntityType};
use crate::models::fulfillment::{CompletePackTaskRequest, PackTaskStatus, PickTaskStatus};
use crate::models::order::OrderStatus;
use crate::services::error::ServiceError;
use crate::services::event_log::{self, NewEvent};
use crate::services::order_lifecycle::{current_status, hold_order, mark_picking_started};
use crate::services::orders::get_order;

async fn find_pick_task<C: ConnectionTrait>(conn: &C, task_id: i32) -> Result<pick_tasks::Model, ServiceError> {
    PickTasks::find_by_id(task_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("pick task", task_id))
}

async fn find_pack_task<C: ConnectionTrait>(conn: &C, task_id: i32) -> Result<pack_tasks::Model, ServiceError> {
    PackTasks::find_by_id(task_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("pack task", task_id))
}

fn pick_status(task: &pick_tasks::Model) -> Result<PickTaskStatus, ServiceError> {
    task.status
        .parse()
        .map_err(|e: String| ServiceError::validation("status", e))
}

fn pack_status(task: &pack_tasks::Model) -> Result<PackTaskStatus, ServiceError> {
    task.status
        .parse()
        .map_err(|e: String| ServiceError::validation("status", e))
}

fn ensure_open(task: &pick_tasks::Model) -> Result<PickTaskStatus, ServiceError> {
    let status = pick_status(task)?;
    if status.is_closed() {
        return Err(ServiceError::validation(
            "status",
            format!("pick task {} is already {}", task.id, status),
        ));
    }
    Ok(status)
}

/// Task work is only accepted while the order sits in `expected`; the order
/// row is fenced in the caller's transaction so a concurrent status change
/// cannot slip in between the check and the task write.
async fn hold_order_in<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
    expected: OrderStatus,
    work: &str,
) -> Result<(), ServiceError> {
    let order = get_order(conn, order_id).await?;
    let status = current_status(&order)?;
    if status != expected {
        return Err(ServiceError::validation(
            "order",
            format!("order {} is {}, not open for {}", order_id, status, work),
        ));
    }
    hold_order(conn, &order, expected).await
}

fn lost_race(task_kind: &str, task_id: i32) -> ServiceError {
    ServiceError::Conflict(format!("{} {} changed concurrently", task_kind, task_id))
}

/// Record a scan of `scanned_qty` units against a pick task.
///
/// A scan that would take the task past its quantity is not applied; the
/// task is closed as an exception instead and returned.
pub async fn record_pick_scan(
    db: &DatabaseConnection,
    task_id: i32,
    scanned_qty: i32,
    bin_location: Option<String>,
) -> Result<pick_tasks::Model, ServiceError> {
    if scanned_qty < 1 {
        return Err(ServiceError::validation("scanned_qty", "scanned_qty must be at least 1"));
    }

    let txn = db.begin().await?;

    let task = find_pick_task(&txn, task_id).await?;
    let status = ensure_open(&task)?;
    hold_order_in(&txn, task.order_id, OrderStatus::Validated, "picking").await?;

    let now = Utc::now();
    let new_qty = task.picked_qty + scanned_qty;

    if new_qty > task.quantity {
        let reason = format!(
            "scan mismatch: {} scanned with {} of {} already picked",
            scanned_qty, task.picked_qty, task.quantity
        );

        let result = PickTasks::update_many()
            .col_expr(pick_tasks::Column::Status, Expr::value(PickTaskStatus::Exception.as_str()))
            .col_expr(pick_tasks::Column::ExceptionReason, Expr::value(reason.clone()))
            .filter(pick_tasks::Column::Id.eq(task.id))
            .filter(pick_tasks::Column::Status.eq(status.as_str()))
            .filter(pick_tasks::Column::PickedQty.eq(task.picked_qty))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(lost_race("pick task", task.id));
        }

        event_log::append(
            &txn,
            NewEvent::new(EntityType::PickTask, task.id, event_types::TASK_EXCEPTION, reason.clone())
                .states(
                    json!({ "status": status.as_str(), "picked_qty": task.picked_qty }),
                    json!({ "status": PickTaskStatus::Exception.as_str(), "picked_qty": task.picked_qty }),
                )
                .metadata(json!({ "order_id": task.order_id, "scanned_qty": scanned_qty })),
        )
        .await?;

        let updated = find_pick_task(&txn, task.id).await?;
        txn.commit().await?;

        tracing::warn!(task_id = task.id, order_id = task.order_id, reason = %reason, "Pick scan mismatch");
        return Ok(updated);
    }

    let completed = new_qty == task.quantity;
    let new_status = if completed {
        PickTaskStatus::Completed
    } else {
        PickTaskStatus::InProgress
    };
    let bin_location = bin_location.or_else(|| task.bin_location.clone());

    let mut update = PickTasks::update_many()
        .col_expr(pick_tasks::Column::PickedQty, Expr::value(new_qty))
        .col_expr(pick_tasks::Column::Status, Expr::value(new_status.as_str()))
        .col_expr(pick_tasks::Column::BinLocation, Expr::value(bin_location.clone()));
    if task.started_at.is_none() {
        update = update.col_expr(pick_tasks::Column::StartedAt, Expr::value(now));
    }
    if completed {
        update = update.col_expr(pick_tasks::Column::CompletedAt, Expr::value(now));
    }

    let result = update
        .filter(pick_tasks::Column::Id.eq(task.id))
        .filter(pick_tasks::Column::Status.eq(status.as_str()))
        .filter(pick_tasks::Column::PickedQty.eq(task.picked_qty))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(lost_race("pick task", task.id));
    }

    if task.started_at.is_none() {
        mark_picking_started(&txn, task.order_id, now).await?;
    }

    if completed {
        order_items::Entity::update_many()
            .col_expr(order_items::Column::Picked, Expr::value(true))
            .col_expr(order_items::Column::BinLocation, Expr::value(bin_location))
            .filter(order_items::Column::Id.eq(task.order_item_id))
            .exec(&txn)
            .await?;
    }

    event_log::append(
        &txn,
        NewEvent::new(
            EntityType::PickTask,
            task.id,
            if completed {
                event_types::TASK_COMPLETED
            } else {
                event_types::PICK_SCANNED
            },
            format!("Picked {} x {} ({}/{})", scanned_qty, task.sku, new_qty, task.quantity),
        )
        .states(
            json!({ "status": status.as_str(), "picked_qty": task.picked_qty }),
            json!({ "status": new_status.as_str(), "picked_qty": new_qty }),
        )
        .metadata(json!({ "order_id": task.order_id, "scanned_qty": scanned_qty })),
    )
    .await?;

    let updated = find_pick_task(&txn, task.id).await?;
    txn.commit().await?;

    info!(
        task_id = task.id,
        order_id = task.order_id,
        picked_qty = new_qty,
        quantity = task.quantity,
        status = %new_status,
        "Pick scan recorded"
    );

    Ok(updated)
}

/// Hand a pending pick task to a picker
pub async fn assign_pick_task(
    db: &DatabaseConnection,
    task_id: i32,
    assigned_to: &str,
    tote_id: Option<String>,
) -> Result<pick_tasks::Model, ServiceError> {
    let assigned_to = assigned_to.trim();
    if assigned_to.is_empty() {
        return Err(ServiceError::validation("assigned_to", "assigned_to is required"));
    }

    let txn = db.begin().await?;

    let task = find_pick_task(&txn, task_id).await?;
    let status = pick_status(&task)?;
    if status != PickTaskStatus::Pending {
        return Err(ServiceError::validation(
            "status",
            format!("pick task {} is {}, only pending tasks can be assigned", task.id, status),
        ));
    }

    let result = PickTasks::update_many()
        .col_expr(pick_tasks::Column::Status, Expr::value(PickTaskStatus::Assigned.as_str()))
        .col_expr(pick_tasks::Column::AssignedTo, Expr::value(assigned_to))
        .col_expr(pick_tasks::Column::ToteId, Expr::value(tote_id.clone()))
        .filter(pick_tasks::Column::Id.eq(task.id))
        .filter(pick_tasks::Column::Status.eq(status.as_str()))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(lost_race("pick task", task.id));
    }

    event_log::append(
        &txn,
        NewEvent::new(
            EntityType::PickTask,
            task.id,
            event_types::TASK_ASSIGNED,
            format!("Assigned to {}", assigned_to),
        )
        .states(
            json!({ "status": status.as_str() }),
            json!({ "status": PickTaskStatus::Assigned.as_str() }),
        )
        .metadata(json!({ "order_id": task.order_id, "assigned_to": assigned_to, "tote_id": tote_id })),
    )
    .await?;

    let updated = find_pick_task(&txn, task.id).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Close an open pick task as an exception (short pick, damaged stock)
pub async fn report_pick_exception(
    db: &DatabaseConnection,
    task_id: i32,
    reason: &str,
) -> Result<pick_tasks::Model, ServiceError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ServiceError::validation("reason", "reason is required"));
    }

    let txn = db.begin().await?;

    let task = find_pick_task(&txn, task_id).await?;
    let status = ensure_open(&task)?;

    let result = PickTasks::update_many()
        .col_expr(pick_tasks::Column::Status, Expr::value(PickTaskStatus::Exception.as_str()))
        .col_expr(pick_tasks::Column::ExceptionReason, Expr::value(reason))
        .filter(pick_tasks::Column::Id.eq(task.id))
        .filter(pick_tasks::Column::Status.eq(status.as_str()))
        .filter(pick_tasks::Column::PickedQty.eq(task.picked_qty))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(lost_race("pick task", task.id));
    }

    event_log::append(
        &txn,
        NewEvent::new(EntityType::PickTask, task.id, event_types::TASK_EXCEPTION, reason)
            .states(
                json!({ "status": status.as_str() }),
                json!({ "status": PickTaskStatus::Exception.as_str() }),
            )
            .metadata(json!({ "order_id": task.order_id, "picked_qty": task.picked_qty })),
    )
    .await?;

    let updated = find_pick_task(&txn, task.id).await?;
    txn.commit().await?;

    tracing::warn!(task_id = task.id, order_id = task.order_id, reason, "Pick exception reported");
    Ok(updated)
}

/// Complete a pack task. Weight and packaging type are both required; a
/// rejected request leaves the task as it was.
pub async fn complete_pack_task(
    db: &DatabaseConnection,
    task_id: i32,
    request: CompletePackTaskRequest,
) -> Result<pack_tasks::Model, ServiceError> {
    let txn = db.begin().await?;

    let task = find_pack_task(&txn, task_id).await?;
    let status = pack_status(&task)?;
    if status == PackTaskStatus::Completed {
        return Err(ServiceError::validation(
            "status",
            format!("pack task {} is already completed", task.id),
        ));
    }

    let packaging_type = request
        .packaging_type
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ServiceError::validation("packaging_type", "packaging_type is required"))?
        .to_string();

    let weight = match request.weight {
        None => return Err(ServiceError::validation("weight", "weight is required")),
        Some(w) if w <= rust_decimal::Decimal::ZERO => {
            return Err(ServiceError::validation("weight", "weight must be positive"));
        }
        Some(w) => w,
    };

    hold_order_in(&txn, task.order_id, OrderStatus::Picked, "packing").await?;

    let now = Utc::now();

    let mut update = PackTasks::update_many()
        .col_expr(pack_tasks::Column::Status, Expr::value(PackTaskStatus::Completed.as_str()))
        .col_expr(pack_tasks::Column::PackagingType, Expr::value(packaging_type.clone()))
        .col_expr(pack_tasks::Column::Weight, Expr::value(weight))
        .col_expr(pack_tasks::Column::Dimensions, Expr::value(request.dimensions.clone()))
        .col_expr(pack_tasks::Column::CompletedAt, Expr::value(now));
    if task.started_at.is_none() {
        update = update.col_expr(pack_tasks::Column::StartedAt, Expr::value(now));
    }

    let result = update
        .filter(pack_tasks::Column::Id.eq(task.id))
        .filter(pack_tasks::Column::Status.eq(status.as_str()))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(lost_race("pack task", task.id));
    }

    // Only items that were actually picked can be packed
    let packed = order_items::Entity::update_many()
        .col_expr(order_items::Column::Packed, Expr::value(true))
        .filter(order_items::Column::OrderId.eq(task.order_id))
        .filter(order_items::Column::Picked.eq(true))
        .exec(&txn)
        .await?;

    event_log::append(
        &txn,
        NewEvent::new(
            EntityType::PackTask,
            task.id,
            event_types::TASK_COMPLETED,
            format!("Packed in {} at {}kg", packaging_type, weight),
        )
        .states(
            json!({ "status": status.as_str() }),
            json!({ "status": PackTaskStatus::Completed.as_str() }),
        )
        .metadata(json!({
            "order_id": task.order_id,
            "packaging_type": packaging_type,
            "weight": weight.to_string(),
            "items_packed": packed.rows_affected,
        })),
    )
    .await?;

    let updated = find_pack_task(&txn, task.id).await?;
    txn.commit().await?;

    info!(task_id = task.id, order_id = task.order_id, items_packed = packed.rows_affected, "Pack task completed");
    Ok(updated)
}
