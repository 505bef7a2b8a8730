//! Manifest statuses and request/response types

use serde::{Deserialize, Serialize};

use crate::entities::{manifest_items, manifests};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    Open,
    HandedOver,
}

impl ManifestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestStatus::Open => "open",
            ManifestStatus::HandedOver => "handed_over",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestItemStatus {
    Pending,
    Scanned,
}

impl ManifestItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestItemStatus::Pending => "pending",
            ManifestItemStatus::Scanned => "scanned",
        }
    }
}

/// Request body for POST /api/manifests
#[derive(Debug, Clone, Deserialize)]
pub struct CreateManifestRequest {
    pub courier_name: String,
}

/// Request body for POST /api/manifests/{id}/items
#[derive(Debug, Clone, Deserialize)]
pub struct AddManifestItemRequest {
    pub order_id: i32,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestDetailResponse {
    pub manifest: manifests::Model,
    pub items: Vec<manifest_items::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HandOverFailure {
    pub order_id: i32,
    pub error: String,
}

/// Response for POST /api/manifests/{id}/hand-over
#[derive(Debug, Clone, Serialize)]
pub struct HandOverResponse {
    pub manifest: manifests::Model,
    pub dispatched_orders: Vec<i32>,
    pub failed_orders: Vec<HandOverFailure>,
}

/// Result of recounting one manifest's items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterDrift {
    pub manifest_id: i32,
    pub recorded: i32,
    pub actual: i32,
}
