//! Event log vocabulary

use serde::{Deserialize, Serialize};

use crate::entities::events;

/// Kinds of entity that appear in the event log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Order,
    PickTask,
    PackTask,
    Manifest,
    ManifestItem,
    Route,
    RouteStop,
    Integration,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Order => "order",
            EntityType::PickTask => "pick_task",
            EntityType::PackTask => "pack_task",
            EntityType::Manifest => "manifest",
            EntityType::ManifestItem => "manifest_item",
            EntityType::Route => "route",
            EntityType::RouteStop => "route_stop",
            EntityType::Integration => "integration",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event type names written to events.event_type
pub mod event_types {
    pub const ORDER_CREATED: &str = "order_created";
    pub const STATUS_CHANGED: &str = "status_changed";
    pub const ADDRESS_VERIFIED: &str = "address_verified";
    pub const ADDRESS_VERIFICATION_FAILED: &str = "address_verification_failed";
    pub const PICK_SCANNED: &str = "pick_scanned";
    pub const TASK_ASSIGNED: &str = "task_assigned";
    pub const TASK_COMPLETED: &str = "task_completed";
    pub const TASK_EXCEPTION: &str = "task_exception";
    pub const MANIFEST_ITEM_ADDED: &str = "manifest_item_added";
    pub const MANIFEST_ITEM_REMOVED: &str = "manifest_item_removed";
    pub const MANIFEST_ITEM_SCANNED: &str = "manifest_item_scanned";
    pub const MANIFEST_HANDED_OVER: &str = "manifest_handed_over";
    pub const COUNTER_RECONCILED: &str = "counter_reconciled";
    pub const ROUTE_STOP_ADDED: &str = "route_stop_added";
    pub const ROUTE_STOP_REMOVED: &str = "route_stop_removed";
    pub const DELIVERY_ATTEMPTED: &str = "delivery_attempted";
    pub const INTEGRATION_TOGGLED: &str = "integration_toggled";
}

/// Event as returned by the API, with JSON snapshots parsed
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: i32,
    pub entity_type: String,
    pub entity_id: i32,
    pub event_type: String,
    pub description: String,
    pub previous_state: Option<serde_json::Value>,
    pub new_state: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

fn parse_snapshot(raw: Option<String>) -> Option<serde_json::Value> {
    raw.map(|text| serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
}

impl From<events::Model> for EventView {
    fn from(event: events::Model) -> Self {
        EventView {
            id: event.id,
            entity_type: event.entity_type,
            entity_id: event.entity_id,
            event_type: event.event_type,
            description: event.description,
            previous_state: parse_snapshot(event.previous_state),
            new_state: parse_snapshot(event.new_state),
            metadata: parse_snapshot(event.metadata),
            created_at: event.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventListResponse {
    pub events: Vec<EventView>,
    pub total_count: usize,
}
