//! Order intake and queries

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::entities::order_items::{self, Entity as OrderItems};
use crate::entities::orders::{self, Entity as Orders};
use crate::entities::{address_verifications, events, pack_tasks, pick_tasks};
use crate::models::event::{event_types, EntityType};
use crate::models::order::{AddressInput, CreateOrderRequest, OrderStatus};
use crate::services::error::{map_unique_violation, ServiceError};
use crate::services::event_log::{self, NewEvent};
use crate::services::nas::{extract_nas_with_policy, normalize_short_code, NasMatchPolicy};

const DEFAULT_CURRENCY: &str = "SAR";
const DEFAULT_LIST_LIMIT: u64 = 100;
const MAX_LIST_LIMIT: u64 = 1000;

/// Warehouse-facing order number, e.g. `SLX-3F9A01BC`
pub fn generate_saylogix_number() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("SLX-{}", id[..8].to_uppercase())
}

fn require(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(field, format!("{} is required", field)));
    }
    Ok(())
}

fn validate_create_request(request: &CreateOrderRequest) -> Result<(), ServiceError> {
    require("source_order_number", &request.source_order_number)?;
    require("source_channel", &request.source_channel)?;
    require("customer_name", &request.customer_name)?;

    let address = &request.shipping_address;
    require("shipping_address.address1", address.address1.as_deref().unwrap_or(""))?;
    require("shipping_address.city", address.city.as_deref().unwrap_or(""))?;

    if request.order_value < Decimal::ZERO {
        return Err(ServiceError::validation("order_value", "order_value must not be negative"));
    }

    if request.items.is_empty() {
        return Err(ServiceError::validation("items", "an order needs at least one item"));
    }

    for (index, item) in request.items.iter().enumerate() {
        require(&format!("items[{}].sku", index), &item.sku)?;
        if item.quantity < 1 {
            return Err(ServiceError::validation(
                &format!("items[{}].quantity", index),
                "quantity must be at least 1",
            ));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(ServiceError::validation(
                &format!("items[{}].unit_price", index),
                "unit_price must not be negative",
            ));
        }
    }

    Ok(())
}

/// Create an order in `fetched` with its items. A given shortcode wins over
/// one found in the shipping address.
pub async fn create_order(
    db: &DatabaseConnection,
    request: CreateOrderRequest,
    policy: NasMatchPolicy,
) -> Result<(orders::Model, Vec<order_items::Model>), ServiceError> {
    validate_create_request(&request)?;

    let nas_code = match request.nas_code.as_deref() {
        Some(code) => Some(normalize_short_code(code).ok_or_else(|| {
            ServiceError::validation("nas_code", format!("{} is not a valid shortcode", code))
        })?),
        None => extract_nas_with_policy(
            &AddressInput::Structured(request.shipping_address.clone()),
            policy,
        ),
    };

    let source_ref = format!("{}/{}", request.source_channel, request.source_order_number);
    let now = Utc::now();

    let txn = db.begin().await?;

    let order = orders::ActiveModel {
        saylogix_number: Set(generate_saylogix_number()),
        source_order_number: Set(request.source_order_number.trim().to_string()),
        source_channel: Set(request.source_channel.trim().to_lowercase()),
        status: Set(OrderStatus::Fetched.as_str().to_string()),
        customer_name: Set(request.customer_name.trim().to_string()),
        customer_phone: Set(request.customer_phone),
        customer_email: Set(request.customer_email),
        shipping_address: Set(request.shipping_address.to_stored()),
        billing_address: Set(request.billing_address.map(|a| a.to_stored())),
        coordinates: Set(None),
        nas_code: Set(nas_code),
        nas_verified: Set(false),
        verified_address: Set(None),
        verification_timestamp: Set(None),
        order_value: Set(request.order_value),
        currency: Set(request
            .currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())),
        order_fetched: Set(Some(now)),
        verify_completed: Set(None),
        picking_started: Set(None),
        picking_completed: Set(None),
        packing_completed: Set(None),
        dispatched: Set(None),
        delivered: Set(None),
        version: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| map_unique_violation(e, &format!("order {}", source_ref)))?;

    let mut items = Vec::with_capacity(request.items.len());
    for item in request.items {
        let total_price = item.unit_price * Decimal::from(item.quantity);
        let saved = order_items::ActiveModel {
            order_id: Set(order.id),
            sku: Set(item.sku.trim().to_string()),
            product_name: Set(item.product_name),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            total_price: Set(total_price),
            picked: Set(false),
            packed: Set(false),
            bin_location: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        items.push(saved);
    }

    event_log::append(
        &txn,
        NewEvent::new(
            EntityType::Order,
            order.id,
            event_types::ORDER_CREATED,
            format!("Order {} received from {}", order.saylogix_number, source_ref),
        )
        .metadata(json!({
            "source_channel": order.source_channel,
            "source_order_number": order.source_order_number,
            "items": items.len(),
            "nas_code": order.nas_code,
        })),
    )
    .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = order.id,
        saylogix_number = %order.saylogix_number,
        items = items.len(),
        "Order created"
    );

    Ok((order, items))
}

pub async fn get_order<C: ConnectionTrait>(conn: &C, order_id: i32) -> Result<orders::Model, ServiceError> {
    Orders::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("order", order_id))
}

pub async fn get_order_detail(
    db: &DatabaseConnection,
    order_id: i32,
) -> Result<(orders::Model, Vec<order_items::Model>), ServiceError> {
    let order = get_order(db, order_id).await?;
    let items = OrderItems::find()
        .filter(order_items::Column::OrderId.eq(order_id))
        .order_by_asc(order_items::Column::Id)
        .all(db)
        .await?;
    Ok((order, items))
}

/// Newest first
pub async fn list_orders(
    db: &DatabaseConnection,
    status: Option<OrderStatus>,
    limit: Option<u64>,
) -> Result<Vec<orders::Model>, ServiceError> {
    let mut query = Orders::find();
    if let Some(status) = status {
        query = query.filter(orders::Column::Status.eq(status.as_str()));
    }

    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

    Ok(query
        .order_by_desc(orders::Column::CreatedAt)
        .order_by_desc(orders::Column::Id)
        .limit(limit)
        .all(db)
        .await?)
}

pub async fn list_order_events(
    db: &DatabaseConnection,
    order_id: i32,
) -> Result<Vec<events::Model>, ServiceError> {
    get_order(db, order_id).await?;
    Ok(event_log::list_for_entity(db, EntityType::Order, order_id).await?)
}

pub async fn list_verifications(
    db: &DatabaseConnection,
    order_id: i32,
) -> Result<Vec<address_verifications::Model>, ServiceError> {
    get_order(db, order_id).await?;
    Ok(address_verifications::Entity::find()
        .filter(address_verifications::Column::OrderId.eq(order_id))
        .order_by_asc(address_verifications::Column::Id)
        .all(db)
        .await?)
}

pub async fn list_pick_tasks(
    db: &DatabaseConnection,
    order_id: i32,
) -> Result<Vec<pick_tasks::Model>, ServiceError> {
    get_order(db, order_id).await?;
    Ok(pick_tasks::Entity::find()
        .filter(pick_tasks::Column::OrderId.eq(order_id))
        .order_by_asc(pick_tasks::Column::Id)
        .all(db)
        .await?)
}

pub async fn list_pack_tasks(
    db: &DatabaseConnection,
    order_id: i32,
) -> Result<Vec<pack_tasks::Model>, ServiceError> {
    get_order(db, order_id).await?;
    Ok(pack_tasks::Entity::find()
        .filter(pack_tasks::Column::OrderId.eq(order_id))
        .order_by_asc(pack_tasks::Column::Id)
        .all(db)
        .await?)
}
