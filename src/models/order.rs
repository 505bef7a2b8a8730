//! Order status, milestones and order DTOs
//!
//! Status progresses: fetched → validated → picked → packed → dispatched → delivered
//!                                      ↘ cancelled (terminal, from any non-terminal state)
//!                                      ↘ exception (from any non-terminal state)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{order_items, orders};

/// Closed set of order statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Fetched,
    Validated,
    Picked,
    Packed,
    Dispatched,
    Delivered,
    Cancelled,
    Exception,
}

/// Outcome of checking a requested status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
    /// Target equals the current status; nothing to do
    Unchanged,
    Allowed,
    Rejected,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Fetched,
        OrderStatus::Validated,
        OrderStatus::Picked,
        OrderStatus::Packed,
        OrderStatus::Dispatched,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Exception,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Fetched => "fetched",
            OrderStatus::Validated => "validated",
            OrderStatus::Picked => "picked",
            OrderStatus::Packed => "packed",
            OrderStatus::Dispatched => "dispatched",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Exception => "exception",
        }
    }

    /// Next status on the happy path
    pub fn successor(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Fetched => Some(OrderStatus::Validated),
            OrderStatus::Validated => Some(OrderStatus::Picked),
            OrderStatus::Picked => Some(OrderStatus::Packed),
            OrderStatus::Packed => Some(OrderStatus::Dispatched),
            OrderStatus::Dispatched => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Exception => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Milestone stamped when an order enters this status
    pub fn milestone(&self) -> Option<Milestone> {
        match self {
            OrderStatus::Validated => Some(Milestone::VerifyCompleted),
            OrderStatus::Picked => Some(Milestone::PickingCompleted),
            OrderStatus::Packed => Some(Milestone::PackingCompleted),
            OrderStatus::Dispatched => Some(Milestone::Dispatched),
            OrderStatus::Delivered => Some(Milestone::Delivered),
            OrderStatus::Fetched | OrderStatus::Cancelled | OrderStatus::Exception => None,
        }
    }

    pub fn check_transition(&self, target: OrderStatus) -> TransitionCheck {
        if *self == target {
            return TransitionCheck::Unchanged;
        }
        if self.successor() == Some(target) {
            return TransitionCheck::Allowed;
        }
        match target {
            OrderStatus::Cancelled | OrderStatus::Exception if !self.is_terminal() => {
                TransitionCheck::Allowed
            }
            _ => TransitionCheck::Rejected,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        OrderStatus::ALL
            .iter()
            .find(|status| status.as_str() == lower)
            .copied()
            .ok_or_else(|| format!("Unknown order status: {}", s))
    }
}

/// Timestamped milestones, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    OrderFetched,
    VerifyCompleted,
    PickingStarted,
    PickingCompleted,
    PackingCompleted,
    Dispatched,
    Delivered,
}

impl Milestone {
    pub const SEQUENCE: [Milestone; 7] = [
        Milestone::OrderFetched,
        Milestone::VerifyCompleted,
        Milestone::PickingStarted,
        Milestone::PickingCompleted,
        Milestone::PackingCompleted,
        Milestone::Dispatched,
        Milestone::Delivered,
    ];

    pub fn read(&self, order: &orders::Model) -> Option<DateTime<Utc>> {
        match self {
            Milestone::OrderFetched => order.order_fetched,
            Milestone::VerifyCompleted => order.verify_completed,
            Milestone::PickingStarted => order.picking_started,
            Milestone::PickingCompleted => order.picking_completed,
            Milestone::PackingCompleted => order.packing_completed,
            Milestone::Dispatched => order.dispatched,
            Milestone::Delivered => order.delivered,
        }
    }

    /// Milestones that must already be set before this one may be
    pub fn predecessors(&self) -> &'static [Milestone] {
        static SEQUENCE: [Milestone; 7] = Milestone::SEQUENCE;
        let index = SEQUENCE.iter().position(|m| m == self).unwrap_or(0);
        &SEQUENCE[..index]
    }
}

/// True when every set milestone has all earlier milestones set, and set
/// milestones never go backwards in time.
pub fn milestone_trail_is_consistent(order: &orders::Model) -> bool {
    let mut previous: Option<DateTime<Utc>> = None;
    let mut gap_seen = false;

    for milestone in Milestone::SEQUENCE {
        match milestone.read(order) {
            Some(at) => {
                if gap_seen {
                    return false;
                }
                if let Some(prev) = previous {
                    if at < prev {
                        return false;
                    }
                }
                previous = Some(at);
            }
            None => gap_seen = true,
        }
    }

    true
}

/// Structured postal address. Stored on orders as JSON text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
}

impl Address {
    /// Parse a stored JSON address; anything unparseable is kept as address1
    pub fn from_stored(raw: &str) -> Address {
        serde_json::from_str(raw).unwrap_or_else(|_| Address {
            address1: Some(raw.to_string()),
            ..Default::default()
        })
    }

    pub fn to_stored(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Either a free-text address or a structured one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressInput {
    Text(String),
    Structured(Address),
}

impl From<&str> for AddressInput {
    fn from(value: &str) -> Self {
        AddressInput::Text(value.to_string())
    }
}

impl From<Address> for AddressInput {
    fn from(value: Address) -> Self {
        AddressInput::Structured(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Request body for POST /api/orders
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub source_order_number: String,
    pub source_channel: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub nas_code: Option<String>,
    pub order_value: Decimal,
    pub currency: Option<String>,
    pub items: Vec<CreateOrderItemRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderItemRequest {
    pub sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Request body for POST /api/orders/{id}/status
#[derive(Debug, Clone, Deserialize)]
pub struct AdvanceStatusRequest {
    pub status: OrderStatus,
}

/// Query parameters for GET /api/orders
#[derive(Debug, Clone, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    pub limit: Option<u64>,
}

/// Order as returned by the API, with parsed addresses
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: i32,
    pub saylogix_number: String,
    pub source_order_number: String,
    pub source_channel: String,
    pub status: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub shipping_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    pub nas_code: Option<String>,
    pub nas_verified: bool,
    pub verified_address: Option<String>,
    pub verification_timestamp: Option<DateTime<Utc>>,
    pub order_value: Decimal,
    pub currency: String,
    pub order_fetched: Option<DateTime<Utc>>,
    pub verify_completed: Option<DateTime<Utc>>,
    pub picking_started: Option<DateTime<Utc>>,
    pub picking_completed: Option<DateTime<Utc>>,
    pub packing_completed: Option<DateTime<Utc>>,
    pub dispatched: Option<DateTime<Utc>>,
    pub delivered: Option<DateTime<Utc>>,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<orders::Model> for OrderView {
    fn from(order: orders::Model) -> Self {
        OrderView {
            id: order.id,
            shipping_address: Address::from_stored(&order.shipping_address),
            billing_address: order.billing_address.as_deref().map(Address::from_stored),
            coordinates: order
                .coordinates
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
            saylogix_number: order.saylogix_number,
            source_order_number: order.source_order_number,
            source_channel: order.source_channel,
            status: order.status,
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            customer_email: order.customer_email,
            nas_code: order.nas_code,
            nas_verified: order.nas_verified,
            verified_address: order.verified_address,
            verification_timestamp: order.verification_timestamp,
            order_value: order.order_value,
            currency: order.currency,
            order_fetched: order.order_fetched,
            verify_completed: order.verify_completed,
            picking_started: order.picking_started,
            picking_completed: order.picking_completed,
            packing_completed: order.packing_completed,
            dispatched: order.dispatched,
            delivered: order.delivered,
            version: order.version,
            updated_at: order.updated_at,
        }
    }
}

/// Response for GET /api/orders/{id}
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetailResponse {
    pub order: OrderView,
    pub items: Vec<order_items::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderView>,
    pub total_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed_targets(from: OrderStatus) -> Vec<OrderStatus> {
        OrderStatus::ALL
            .into_iter()
            .filter(|to| from.check_transition(*to) == TransitionCheck::Allowed)
            .collect()
    }

    #[test]
    fn test_every_status_pair() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let expected = if from == to {
                    TransitionCheck::Unchanged
                } else if from.successor() == Some(to) {
                    TransitionCheck::Allowed
                } else if matches!(to, OrderStatus::Cancelled | OrderStatus::Exception)
                    && !matches!(from, OrderStatus::Delivered | OrderStatus::Cancelled)
                {
                    TransitionCheck::Allowed
                } else {
                    TransitionCheck::Rejected
                };
                assert_eq!(from.check_transition(to), expected, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_happy_path_targets() {
        assert_eq!(
            allowed_targets(OrderStatus::Fetched),
            vec![OrderStatus::Validated, OrderStatus::Cancelled, OrderStatus::Exception]
        );
        assert_eq!(
            allowed_targets(OrderStatus::Packed),
            vec![OrderStatus::Dispatched, OrderStatus::Cancelled, OrderStatus::Exception]
        );
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        assert!(allowed_targets(OrderStatus::Delivered).is_empty());
        assert!(allowed_targets(OrderStatus::Cancelled).is_empty());
    }

    #[test]
    fn test_exception_can_only_be_cancelled() {
        assert_eq!(allowed_targets(OrderStatus::Exception), vec![OrderStatus::Cancelled]);
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert_eq!("PICKED".parse::<OrderStatus>(), Ok(OrderStatus::Picked));
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_milestone_predecessors() {
        assert!(Milestone::OrderFetched.predecessors().is_empty());
        assert_eq!(
            Milestone::PickingCompleted.predecessors(),
            &[Milestone::OrderFetched, Milestone::VerifyCompleted, Milestone::PickingStarted]
        );
    }

    #[test]
    fn test_address_from_stored_falls_back_to_text() {
        let parsed = Address::from_stored("{\"address1\":\"Flat 5\",\"city\":\"Jeddah\"}");
        assert_eq!(parsed.city.as_deref(), Some("Jeddah"));

        let raw = Address::from_stored("12 Olaya St");
        assert_eq!(raw.address1.as_deref(), Some("12 Olaya St"));
        assert!(raw.city.is_none());
    }

    #[test]
    fn test_address_input_untagged() {
        let text: AddressInput = serde_json::from_str("\"12 Olaya St\"").unwrap();
        assert_eq!(text, AddressInput::Text("12 Olaya St".to_string()));

        let structured: AddressInput =
            serde_json::from_str("{\"address1\":\"Flat 5\",\"zip\":\"JEDD1234\"}").unwrap();
        match structured {
            AddressInput::Structured(address) => {
                assert_eq!(address.zip.as_deref(), Some("JEDD1234"))
            }
            other => panic!("expected structured address, got {:?}", other),
        }
    }
}
