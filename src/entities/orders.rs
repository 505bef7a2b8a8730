//! `SeaORM` Entity for orders table
//!
//! `status` holds the lower-case form of [`crate::models::order::OrderStatus`].
//! Address columns hold JSON text.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub saylogix_number: String,
    pub source_order_number: String,
    pub source_channel: String,
    pub status: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub shipping_address: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub billing_address: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub coordinates: Option<String>,
    pub nas_code: Option<String>,
    pub nas_verified: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub verified_address: Option<String>,
    pub verification_timestamp: Option<DateTimeUtc>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub order_value: Decimal,
    pub currency: String,
    pub order_fetched: Option<DateTimeUtc>,
    pub verify_completed: Option<DateTimeUtc>,
    pub picking_started: Option<DateTimeUtc>,
    pub picking_completed: Option<DateTimeUtc>,
    pub packing_completed: Option<DateTimeUtc>,
    pub dispatched: Option<DateTimeUtc>,
    pub delivered: Option<DateTimeUtc>,
    /// Bumped on every write; compared on status changes
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::pick_tasks::Entity")]
    PickTasks,
    #[sea_orm(has_many = "super::pack_tasks::Entity")]
    PackTasks,
    #[sea_orm(has_many = "super::address_verifications::Entity")]
    AddressVerifications,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::pick_tasks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PickTasks.def()
    }
}

impl Related<super::pack_tasks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackTasks.def()
    }
}

impl Related<super::address_verifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AddressVerifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
