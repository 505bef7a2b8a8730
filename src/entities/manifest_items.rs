//! `SeaORM` Entity for manifest_items table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "manifest_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub manifest_id: i32,
    #[sea_orm(unique)]
    pub order_id: i32,
    pub tracking_number: Option<String>,
    pub status: String,
    pub scanned_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::manifests::Entity",
        from = "Column::ManifestId",
        to = "super::manifests::Column::Id"
    )]
    Manifest,
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id"
    )]
    Order,
}

impl Related<super::manifests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manifest.def()
    }
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
