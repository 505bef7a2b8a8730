//! `SeaORM` Entity for integrations table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "integrations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub category: String,
    pub is_enabled: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub config: Option<String>,
    pub success_count: i64,
    pub failure_count: i64,
    pub last_sync_at: Option<DateTimeUtc>,
    /// Most recent failure only; history lives in events
    #[sea_orm(column_type = "Text", nullable)]
    pub last_error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
