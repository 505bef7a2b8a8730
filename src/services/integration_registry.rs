//! Integration registry: which external systems are enabled, and how their
//! calls have been going.
//!
//! Counters are a single upsert that increments in the database
//! (`count = count + 1`), never read-modified-written, so concurrent calls
//! cannot lose updates.

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::json;

use crate::entities::integrations::{self, Entity as Integrations};
use crate::models::event::{event_types, EntityType};
use crate::models::integration::IntegrationCategory;
use crate::services::error::ServiceError;
use crate::services::event_log::{self, NewEvent};

/// Missing rows count as enabled so a fresh deployment works unconfigured
pub async fn is_enabled<C: ConnectionTrait>(conn: &C, name: &str) -> Result<bool, DbErr> {
    let record = Integrations::find()
        .filter(integrations::Column::Name.eq(name))
        .one(conn)
        .await?;

    Ok(record.map(|r| r.is_enabled).unwrap_or(true))
}

fn counter_row(name: &str, category: IntegrationCategory) -> integrations::ActiveModel {
    integrations::ActiveModel {
        name: Set(name.to_string()),
        category: Set(category.as_str().to_string()),
        is_enabled: Set(true),
        config: Set(None),
        success_count: Set(0),
        failure_count: Set(0),
        last_sync_at: Set(None),
        last_error: Set(None),
        ..Default::default()
    }
}

/// Record a successful call. First-ever calls create the row in the same
/// statement, so concurrent first calls cannot collide on `name`.
pub async fn record_success<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    category: IntegrationCategory,
) -> Result<(), DbErr> {
    let now = Utc::now();

    let mut row = counter_row(name, category);
    row.success_count = Set(1);
    row.last_sync_at = Set(Some(now));

    Integrations::insert(row)
        .on_conflict(
            OnConflict::column(integrations::Column::Name)
                .value(
                    integrations::Column::SuccessCount,
                    Expr::col((Integrations, integrations::Column::SuccessCount)).add(1),
                )
                .value(integrations::Column::LastSyncAt, Expr::value(now))
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    tracing::debug!("[{}] Recorded successful call", name);
    Ok(())
}

/// Record a failed call; `last_error` is overwritten
pub async fn record_failure<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    category: IntegrationCategory,
    error: &str,
) -> Result<(), DbErr> {
    let mut row = counter_row(name, category);
    row.failure_count = Set(1);
    row.last_error = Set(Some(error.to_string()));

    Integrations::insert(row)
        .on_conflict(
            OnConflict::column(integrations::Column::Name)
                .value(
                    integrations::Column::FailureCount,
                    Expr::col((Integrations, integrations::Column::FailureCount)).add(1),
                )
                .value(integrations::Column::LastError, Expr::value(error.to_string()))
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    tracing::debug!("[{}] Recorded failed call: {}", name, error);
    Ok(())
}

pub async fn list_integrations(db: &DatabaseConnection) -> Result<Vec<integrations::Model>, DbErr> {
    Integrations::find()
        .order_by_asc(integrations::Column::Name)
        .all(db)
        .await
}

pub async fn get_integration(
    db: &DatabaseConnection,
    name: &str,
) -> Result<integrations::Model, ServiceError> {
    Integrations::find()
        .filter(integrations::Column::Name.eq(name))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("integration", name))
}

/// Create or reconfigure an integration. Counters are left untouched.
pub async fn upsert_integration(
    db: &DatabaseConnection,
    name: &str,
    category: IntegrationCategory,
    config: Option<serde_json::Value>,
) -> Result<integrations::Model, ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::validation("name", "integration name is required"));
    }

    let existing = Integrations::find()
        .filter(integrations::Column::Name.eq(name))
        .one(db)
        .await?;

    let saved = match existing {
        Some(record) => {
            let mut active_model: integrations::ActiveModel = record.into();
            active_model.category = Set(category.as_str().to_string());
            active_model.config = Set(config.map(|c| c.to_string()));
            active_model.update(db).await?
        }
        None => {
            let new_record = integrations::ActiveModel {
                name: Set(name.to_string()),
                category: Set(category.as_str().to_string()),
                is_enabled: Set(true),
                config: Set(config.map(|c| c.to_string())),
                success_count: Set(0),
                failure_count: Set(0),
                last_sync_at: Set(None),
                last_error: Set(None),
                ..Default::default()
            };
            new_record.insert(db).await?
        }
    };

    tracing::info!("[{}] Integration configured ({})", name, category.as_str());
    Ok(saved)
}

/// Switch an integration on or off
pub async fn set_enabled(
    db: &DatabaseConnection,
    name: &str,
    enabled: bool,
) -> Result<integrations::Model, ServiceError> {
    let txn = db.begin().await?;

    let record = Integrations::find()
        .filter(integrations::Column::Name.eq(name))
        .one(&txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("integration", name))?;

    if record.is_enabled == enabled {
        txn.commit().await?;
        return Ok(record);
    }

    let previous = record.is_enabled;
    let id = record.id;
    let mut active_model: integrations::ActiveModel = record.into();
    active_model.is_enabled = Set(enabled);
    let updated = active_model.update(&txn).await?;

    event_log::append(
        &txn,
        NewEvent::new(
            EntityType::Integration,
            id,
            event_types::INTEGRATION_TOGGLED,
            format!("{} {}", name, if enabled { "enabled" } else { "disabled" }),
        )
        .states(json!({ "is_enabled": previous }), json!({ "is_enabled": enabled })),
    )
    .await?;

    txn.commit().await?;

    tracing::info!("[{}] Integration enabled set to {}", name, enabled);
    Ok(updated)
}
