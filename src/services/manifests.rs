//! Courier manifests
//!
//! `manifests.total_packages` is a denormalized count of the manifest's
//! items. It is changed in the same transaction as the items it counts and
//! repaired by [`reconcile_manifest_counts`] if it ever drifts.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::manifest_items::{self, Entity as ManifestItems};
use crate::entities::manifests::{self, Entity as Manifests};
use crate::models::event::{event_types, EntityType};
use crate::models::manifest::{
    CounterDrift, HandOverFailure, HandOverResponse, ManifestItemStatus, ManifestStatus,
};
use crate::models::order::OrderStatus;
use crate::services::error::{map_unique_violation, ServiceError};
use crate::services::event_log::{self, NewEvent};
use crate::services::order_lifecycle::{advance_order_status, current_status, hold_order};
use crate::services::orders::get_order;

pub fn generate_manifest_number() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("MAN-{}", id[..8].to_uppercase())
}

async fn find_manifest<C: ConnectionTrait>(conn: &C, manifest_id: i32) -> Result<manifests::Model, ServiceError> {
    Manifests::find_by_id(manifest_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("manifest", manifest_id))
}

async fn find_item<C: ConnectionTrait>(conn: &C, item_id: i32) -> Result<manifest_items::Model, ServiceError> {
    ManifestItems::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("manifest item", item_id))
}

fn ensure_open(manifest: &manifests::Model) -> Result<(), ServiceError> {
    if manifest.status != ManifestStatus::Open.as_str() {
        return Err(ServiceError::validation(
            "manifest",
            format!("manifest {} is {}", manifest.manifest_number, manifest.status),
        ));
    }
    Ok(())
}

pub async fn create_manifest(
    db: &DatabaseConnection,
    courier_name: &str,
) -> Result<manifests::Model, ServiceError> {
    let courier_name = courier_name.trim();
    if courier_name.is_empty() {
        return Err(ServiceError::validation("courier_name", "courier_name is required"));
    }

    let manifest = manifests::ActiveModel {
        manifest_number: Set(generate_manifest_number()),
        courier_name: Set(courier_name.to_string()),
        status: Set(ManifestStatus::Open.as_str().to_string()),
        total_packages: Set(0),
        created_at: Set(Utc::now()),
        handed_over_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| map_unique_violation(e, "manifest number"))?;

    info!(manifest_id = manifest.id, courier = courier_name, "Manifest created");
    Ok(manifest)
}

pub async fn list_manifests(db: &DatabaseConnection) -> Result<Vec<manifests::Model>, ServiceError> {
    Ok(Manifests::find()
        .order_by_desc(manifests::Column::CreatedAt)
        .order_by_desc(manifests::Column::Id)
        .all(db)
        .await?)
}

pub async fn get_manifest_detail(
    db: &DatabaseConnection,
    manifest_id: i32,
) -> Result<(manifests::Model, Vec<manifest_items::Model>), ServiceError> {
    let manifest = find_manifest(db, manifest_id).await?;
    let items = manifest
        .find_related(ManifestItems)
        .order_by_asc(manifest_items::Column::Id)
        .all(db)
        .await?;
    Ok((manifest, items))
}

/// Put a packed order on an open manifest
pub async fn add_to_manifest(
    db: &DatabaseConnection,
    manifest_id: i32,
    order_id: i32,
    tracking_number: Option<String>,
) -> Result<manifest_items::Model, ServiceError> {
    let txn = db.begin().await?;

    let manifest = find_manifest(&txn, manifest_id).await?;
    ensure_open(&manifest)?;

    let order = get_order(&txn, order_id).await?;
    let status = current_status(&order)?;
    if status != OrderStatus::Packed {
        return Err(ServiceError::validation(
            "order",
            format!("order {} is {}, only packed orders can be manifested", order_id, status),
        ));
    }
    hold_order(&txn, &order, OrderStatus::Packed).await?;

    let existing = ManifestItems::find()
        .filter(manifest_items::Column::OrderId.eq(order_id))
        .one(&txn)
        .await?;
    if let Some(existing) = existing {
        return Err(ServiceError::Conflict(format!(
            "order {} is already on manifest {}",
            order_id, existing.manifest_id
        )));
    }

    let item = manifest_items::ActiveModel {
        manifest_id: Set(manifest.id),
        order_id: Set(order_id),
        tracking_number: Set(tracking_number),
        status: Set(ManifestItemStatus::Pending.as_str().to_string()),
        scanned_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| map_unique_violation(e, &format!("manifest entry for order {}", order_id)))?;

    Manifests::update_many()
        .col_expr(
            manifests::Column::TotalPackages,
            Expr::col(manifests::Column::TotalPackages).add(1),
        )
        .filter(manifests::Column::Id.eq(manifest.id))
        .exec(&txn)
        .await?;

    event_log::append(
        &txn,
        NewEvent::new(
            EntityType::Manifest,
            manifest.id,
            event_types::MANIFEST_ITEM_ADDED,
            format!("Order {} added to {}", order.saylogix_number, manifest.manifest_number),
        )
        .metadata(json!({ "order_id": order_id, "item_id": item.id })),
    )
    .await?;

    txn.commit().await?;

    info!(manifest_id, order_id, item_id = item.id, "Order added to manifest");
    Ok(item)
}

/// Take an item off an open manifest; returns the manifest with its new count
pub async fn remove_from_manifest(
    db: &DatabaseConnection,
    item_id: i32,
) -> Result<manifests::Model, ServiceError> {
    let txn = db.begin().await?;

    let item = find_item(&txn, item_id).await?;
    let manifest = find_manifest(&txn, item.manifest_id).await?;
    ensure_open(&manifest)?;

    let order_id = item.order_id;
    item.delete(&txn).await?;

    Manifests::update_many()
        .col_expr(
            manifests::Column::TotalPackages,
            Expr::col(manifests::Column::TotalPackages).sub(1),
        )
        .filter(manifests::Column::Id.eq(manifest.id))
        .exec(&txn)
        .await?;

    event_log::append(
        &txn,
        NewEvent::new(
            EntityType::Manifest,
            manifest.id,
            event_types::MANIFEST_ITEM_REMOVED,
            format!("Order {} removed from {}", order_id, manifest.manifest_number),
        )
        .metadata(json!({ "order_id": order_id, "item_id": item_id })),
    )
    .await?;

    let updated = find_manifest(&txn, manifest.id).await?;
    txn.commit().await?;

    info!(manifest_id = manifest.id, order_id, "Order removed from manifest");
    Ok(updated)
}

/// Mark a package as physically scanned at the dock. Re-scanning is a no-op.
pub async fn scan_manifest_item(
    db: &DatabaseConnection,
    item_id: i32,
) -> Result<manifest_items::Model, ServiceError> {
    let txn = db.begin().await?;

    let item = find_item(&txn, item_id).await?;
    if item.status == ManifestItemStatus::Scanned.as_str() {
        txn.commit().await?;
        return Ok(item);
    }

    let manifest = find_manifest(&txn, item.manifest_id).await?;
    ensure_open(&manifest)?;

    let result = ManifestItems::update_many()
        .col_expr(
            manifest_items::Column::Status,
            Expr::value(ManifestItemStatus::Scanned.as_str()),
        )
        .col_expr(manifest_items::Column::ScannedAt, Expr::value(Utc::now()))
        .filter(manifest_items::Column::Id.eq(item.id))
        .filter(manifest_items::Column::Status.eq(ManifestItemStatus::Pending.as_str()))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::Conflict(format!(
            "manifest item {} changed concurrently",
            item.id
        )));
    }

    event_log::append(
        &txn,
        NewEvent::new(
            EntityType::ManifestItem,
            item.id,
            event_types::MANIFEST_ITEM_SCANNED,
            format!("Package for order {} scanned", item.order_id),
        )
        .metadata(json!({ "manifest_id": item.manifest_id, "order_id": item.order_id })),
    )
    .await?;

    let updated = find_item(&txn, item.id).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Hand a fully scanned manifest to the courier, then dispatch its orders.
///
/// The hand-over itself is one transaction. Each order is then advanced in
/// its own transaction; an order that cannot be dispatched is reported in
/// `failed_orders` without undoing the others.
pub async fn hand_over_manifest(
    db: &DatabaseConnection,
    manifest_id: i32,
) -> Result<HandOverResponse, ServiceError> {
    let txn = db.begin().await?;

    let manifest = find_manifest(&txn, manifest_id).await?;
    ensure_open(&manifest)?;

    let items = ManifestItems::find()
        .filter(manifest_items::Column::ManifestId.eq(manifest.id))
        .order_by_asc(manifest_items::Column::Id)
        .all(&txn)
        .await?;

    if items.is_empty() {
        return Err(ServiceError::validation(
            "items",
            format!("manifest {} has no packages", manifest.manifest_number),
        ));
    }

    let unscanned: Vec<i32> = items
        .iter()
        .filter(|item| item.status != ManifestItemStatus::Scanned.as_str())
        .map(|item| item.order_id)
        .collect();
    if !unscanned.is_empty() {
        return Err(ServiceError::validation(
            "items",
            format!("packages not scanned for orders {:?}", unscanned),
        ));
    }

    let now = Utc::now();
    let result = Manifests::update_many()
        .col_expr(
            manifests::Column::Status,
            Expr::value(ManifestStatus::HandedOver.as_str()),
        )
        .col_expr(manifests::Column::HandedOverAt, Expr::value(now))
        .filter(manifests::Column::Id.eq(manifest.id))
        .filter(manifests::Column::Status.eq(ManifestStatus::Open.as_str()))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::Conflict(format!(
            "manifest {} changed concurrently",
            manifest.id
        )));
    }

    event_log::append(
        &txn,
        NewEvent::new(
            EntityType::Manifest,
            manifest.id,
            event_types::MANIFEST_HANDED_OVER,
            format!("{} handed over to {}", manifest.manifest_number, manifest.courier_name),
        )
        .states(
            json!({ "status": ManifestStatus::Open.as_str() }),
            json!({ "status": ManifestStatus::HandedOver.as_str() }),
        )
        .metadata(json!({ "packages": items.len() })),
    )
    .await?;

    txn.commit().await?;

    let mut dispatched_orders = Vec::new();
    let mut failed_orders = Vec::new();
    for item in &items {
        match advance_order_status(db, item.order_id, OrderStatus::Dispatched).await {
            Ok(_) => dispatched_orders.push(item.order_id),
            Err(e) => {
                warn!(manifest_id, order_id = item.order_id, error = %e, "Could not dispatch order");
                failed_orders.push(HandOverFailure {
                    order_id: item.order_id,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        manifest_id,
        dispatched = dispatched_orders.len(),
        failed = failed_orders.len(),
        "Manifest handed over"
    );

    Ok(HandOverResponse {
        manifest: find_manifest(db, manifest.id).await?,
        dispatched_orders,
        failed_orders,
    })
}

/// Recount every manifest's items and repair any drifted counter
pub async fn reconcile_manifest_counts(db: &DatabaseConnection) -> Result<Vec<CounterDrift>, ServiceError> {
    let manifests = Manifests::find()
        .order_by_asc(manifests::Column::Id)
        .all(db)
        .await?;

    let mut drifts = Vec::new();

    for manifest in manifests {
        let actual = ManifestItems::find()
            .filter(manifest_items::Column::ManifestId.eq(manifest.id))
            .count(db)
            .await? as i32;

        if actual == manifest.total_packages {
            continue;
        }

        let txn = db.begin().await?;

        // Only repair the value we counted against
        let result = Manifests::update_many()
            .col_expr(manifests::Column::TotalPackages, Expr::value(actual))
            .filter(manifests::Column::Id.eq(manifest.id))
            .filter(manifests::Column::TotalPackages.eq(manifest.total_packages))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            continue;
        }

        event_log::append(
            &txn,
            NewEvent::new(
                EntityType::Manifest,
                manifest.id,
                event_types::COUNTER_RECONCILED,
                format!("total_packages corrected from {} to {}", manifest.total_packages, actual),
            )
            .states(
                json!({ "total_packages": manifest.total_packages }),
                json!({ "total_packages": actual }),
            ),
        )
        .await?;

        txn.commit().await?;

        warn!(
            manifest_id = manifest.id,
            recorded = manifest.total_packages,
            actual,
            "Manifest package counter drifted, repaired"
        );

        drifts.push(CounterDrift {
            manifest_id: manifest.id,
            recorded: manifest.total_packages,
            actual,
        });
    }

    Ok(drifts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_number_format() {
        let number = generate_manifest_number();
        assert!(number.starts_with("MAN-"));
        assert_eq!(number.len(), 12);
        assert!(number[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
