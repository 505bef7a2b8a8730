//! Pick and pack task statuses and request types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{pack_tasks, pick_tasks};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickTaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Exception,
}

impl PickTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickTaskStatus::Pending => "pending",
            PickTaskStatus::Assigned => "assigned",
            PickTaskStatus::InProgress => "in_progress",
            PickTaskStatus::Completed => "completed",
            PickTaskStatus::Exception => "exception",
        }
    }

    /// Completed and exception-closed tasks no longer accept scans
    pub fn is_closed(&self) -> bool {
        matches!(self, PickTaskStatus::Completed | PickTaskStatus::Exception)
    }
}

impl std::fmt::Display for PickTaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PickTaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PickTaskStatus::Pending),
            "assigned" => Ok(PickTaskStatus::Assigned),
            "in_progress" => Ok(PickTaskStatus::InProgress),
            "completed" => Ok(PickTaskStatus::Completed),
            "exception" => Ok(PickTaskStatus::Exception),
            _ => Err(format!("Unknown pick task status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackTaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl PackTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackTaskStatus::Pending => "pending",
            PackTaskStatus::InProgress => "in_progress",
            PackTaskStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for PackTaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PackTaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PackTaskStatus::Pending),
            "in_progress" => Ok(PackTaskStatus::InProgress),
            "completed" => Ok(PackTaskStatus::Completed),
            _ => Err(format!("Unknown pack task status: {}", s)),
        }
    }
}

/// Request body for POST /api/pick-tasks/{id}/scan
#[derive(Debug, Clone, Deserialize)]
pub struct PickScanRequest {
    pub scanned_qty: i32,
    pub bin_location: Option<String>,
}

/// Request body for POST /api/pick-tasks/{id}/assign
#[derive(Debug, Clone, Deserialize)]
pub struct AssignPickTaskRequest {
    pub assigned_to: String,
    pub tote_id: Option<String>,
}

/// Request body for POST /api/pick-tasks/{id}/exception
#[derive(Debug, Clone, Deserialize)]
pub struct PickExceptionRequest {
    pub reason: String,
}

/// Request body for POST /api/pack-tasks/{id}/complete
///
/// Both `weight` and `packaging_type` are required; they are optional here
/// so that a missing field surfaces as a validation error naming it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletePackTaskRequest {
    pub weight: Option<Decimal>,
    pub packaging_type: Option<String>,
    pub dimensions: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PickTaskListResponse {
    pub tasks: Vec<pick_tasks::Model>,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackTaskListResponse {
    pub tasks: Vec<pack_tasks::Model>,
    pub total_count: usize,
}
