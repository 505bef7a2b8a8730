//! Append-only event log
//!
//! `append` takes any connection so that state changes can write their
//! event inside the same transaction. `append_detached` is for events that
//! are not part of an atomic change: failures are logged, never returned.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde_json::Value;

use crate::entities::events::{self, Entity as Events};
use crate::models::event::EntityType;

/// An event about to be written
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub entity_type: EntityType,
    pub entity_id: i32,
    pub event_type: &'static str,
    pub description: String,
    pub previous_state: Option<Value>,
    pub new_state: Option<Value>,
    pub metadata: Option<Value>,
}

impl NewEvent {
    pub fn new(
        entity_type: EntityType,
        entity_id: i32,
        event_type: &'static str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            entity_type,
            entity_id,
            event_type,
            description: description.into(),
            previous_state: None,
            new_state: None,
            metadata: None,
        }
    }

    /// Attach before/after snapshots
    pub fn states(mut self, previous: Value, new: Value) -> Self {
        self.previous_state = Some(previous);
        self.new_state = Some(new);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

pub async fn append<C: ConnectionTrait>(conn: &C, event: NewEvent) -> Result<events::Model, DbErr> {
    let record = events::ActiveModel {
        entity_type: Set(event.entity_type.as_str().to_string()),
        entity_id: Set(event.entity_id),
        event_type: Set(event.event_type.to_string()),
        description: Set(event.description),
        previous_state: Set(event.previous_state.map(|v| v.to_string())),
        new_state: Set(event.new_state.map(|v| v.to_string())),
        metadata: Set(event.metadata.map(|v| v.to_string())),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    record.insert(conn).await
}

/// Fire-and-forget append; a failed write is logged at warn
pub async fn append_detached(db: &DatabaseConnection, event: NewEvent) {
    let entity_type = event.entity_type;
    let entity_id = event.entity_id;
    let event_type = event.event_type;

    if let Err(e) = append(db, event).await {
        tracing::warn!(
            entity_type = %entity_type,
            entity_id = entity_id,
            event_type = event_type,
            error = %e,
            "Failed to append event"
        );
    }
}

/// Events for one entity, oldest first
pub async fn list_for_entity<C: ConnectionTrait>(
    conn: &C,
    entity_type: EntityType,
    entity_id: i32,
) -> Result<Vec<events::Model>, DbErr> {
    Events::find()
        .filter(events::Column::EntityType.eq(entity_type.as_str()))
        .filter(events::Column::EntityId.eq(entity_id))
        .order_by_asc(events::Column::Id)
        .all(conn)
        .await
}
