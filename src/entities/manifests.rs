//! `SeaORM` Entity for manifests table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "manifests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub manifest_number: String,
    pub courier_name: String,
    pub status: String,
    /// Denormalized count of manifest_items; written in the same transaction
    pub total_packages: i32,
    pub created_at: DateTimeUtc,
    pub handed_over_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::manifest_items::Entity")]
    ManifestItems,
}

impl Related<super::manifest_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ManifestItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
