//! Delivery route statuses and request/response types

use serde::{Deserialize, Serialize};

use crate::entities::{route_stops, routes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Planned,
    InProgress,
    Completed,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Planned => "planned",
            RouteStatus::InProgress => "in_progress",
            RouteStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStopStatus {
    Pending,
    Delivered,
    Failed,
}

impl RouteStopStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStopStatus::Pending => "pending",
            RouteStopStatus::Delivered => "delivered",
            RouteStopStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    Failed,
}

/// Request body for POST /api/routes
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRouteRequest {
    pub driver_name: String,
    pub vehicle_number: Option<String>,
}

/// Request body for POST /api/routes/{id}/stops
#[derive(Debug, Clone, Deserialize)]
pub struct AddRouteStopRequest {
    pub order_id: i32,
}

/// Request body for POST /api/route-stops/{id}/attempt
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryAttemptRequest {
    pub outcome: DeliveryOutcome,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteDetailResponse {
    pub route: routes::Model,
    pub stops: Vec<route_stops::Model>,
}
