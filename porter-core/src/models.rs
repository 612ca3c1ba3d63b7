use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Order lifecycle: `shipping` until a robot claims it, `delivering` while
/// on board, `completed` once dropped off. No other transitions are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Shipping,
    Delivering,
    Completed,
}

impl OrderStatus {
    /// Wire and database form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Shipping => "shipping",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shipping" => Ok(OrderStatus::Shipping),
            "delivering" => Ok(OrderStatus::Delivering),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A `shipping` order joined with its product's load figures. This is both
/// the planner's input and the entry type of a finished plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub order_id: i64,
    pub weight: i64,
    pub value: i64,
}

/// The set of orders a robot carries out in one trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPlan {
    pub robot_id: String,
    pub total_weight: i64,
    pub total_value: i64,
    pub orders: Vec<Candidate>,
}

impl DeliveryPlan {
    /// Plan carrying nothing, returned for empty pools and zero capacity.
    pub fn empty(robot_id: impl Into<String>) -> Self {
        Self {
            robot_id: robot_id.into(),
            total_weight: 0,
            total_value: 0,
            orders: Vec::new(),
        }
    }
}

/// One row of a user's order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub shipped_status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub arrived_at: Option<DateTime<Utc>>,
}

/// Catalog entry. Only `weight` and `value` participate in planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    pub value: i64,
    pub weight: i64,
    pub image: String,
    pub description: String,
}

/// Input for order creation. The store assigns the identifier and the
/// initial `shipping` status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: i64,
    pub product_id: i64,
}

/// Search, sort and pagination envelope shared by the history projections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    /// Filter text; empty disables filtering.
    #[serde(default)]
    pub search: String,
    /// `prefix` anchors the match at the start, anything else is a
    /// substring match.
    #[serde(rename = "type", default)]
    pub match_type: String,
    /// Validated against a per-projection allowlist; unknown values fall
    /// back to the identifier column.
    #[serde(default)]
    pub sort_field: String,
    /// `DESC` (case-insensitive) or ascending.
    #[serde(default)]
    pub sort_order: String,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_page_size() -> i64 {
    20
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            search: String::new(),
            match_type: String::new(),
            sort_field: String::new(),
            sort_order: String::new(),
            page_size: default_page_size(),
            offset: 0,
        }
    }
}
