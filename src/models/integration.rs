//! Integration registry types

use serde::{Deserialize, Serialize};

use crate::entities::integrations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationCategory {
    Courier,
    Ecommerce,
    Messaging,
    Maps,
    Address,
}

impl IntegrationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationCategory::Courier => "courier",
            IntegrationCategory::Ecommerce => "ecommerce",
            IntegrationCategory::Messaging => "messaging",
            IntegrationCategory::Maps => "maps",
            IntegrationCategory::Address => "address",
        }
    }
}

/// Request body for PUT /api/integrations/{name}
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertIntegrationRequest {
    pub category: IntegrationCategory,
    pub config: Option<serde_json::Value>,
}

/// Request body for PUT /api/integrations/{name}/enabled
#[derive(Debug, Clone, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationListResponse {
    pub integrations: Vec<integrations::Model>,
    pub total_count: usize,
}
