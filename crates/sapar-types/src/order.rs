//! Order lifecycle types.

use serde::{Deserialize, Serialize};

use crate::{BroadcastHandle, DriverId, OrderId, PassengerId};

/// Lifecycle state of an order. Transitions are monotonic:
/// `New -> Accepted -> Completed`; `Completed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    Accepted,
    Completed,
}

impl OrderStatus {
    /// Stable text form used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Completed => "completed",
        }
    }

    /// Parse the stored text form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(OrderStatus::New),
            "accepted" => Some(OrderStatus::Accepted),
            "completed" => Some(OrderStatus::Completed),
            _ => None,
        }
    }
}

/// Trip category chosen by the passenger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripCategory {
    Local,
    Intercity,
}

impl TripCategory {
    /// Stable text form used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TripCategory::Local => "local",
            TripCategory::Intercity => "intercity",
        }
    }

    /// Parse the stored text form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "local" => Some(TripCategory::Local),
            "intercity" => Some(TripCategory::Intercity),
            _ => None,
        }
    }
}

/// One ride request.
///
/// `driver_id` is non-null iff status is `Accepted` or `Completed`;
/// `rating` is non-zero (1..=5) only once the order is `Completed`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub origin: String,
    pub destination: String,
    /// Passenger's price offer in minor currency units. Opaque to the core.
    pub price: u32,
    /// Normalized passenger contact, `+7XXXXXXXXXX`.
    pub phone: String,
    pub passenger_id: PassengerId,
    pub category: TripCategory,
    pub status: OrderStatus,
    pub driver_id: Option<DriverId>,
    pub broadcast_handle: Option<BroadcastHandle>,
    /// 0 until the passenger rates the completed trip.
    pub rating: u8,
    /// Unix epoch seconds.
    pub created_at: u64,
}

/// Result of one claim attempt against an order.
///
/// Losing the race is an expected branch of the protocol, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOutcome {
    /// This attempt transitioned the order `New -> Accepted`.
    Won,
    /// No transition, but the order is already assigned to this driver.
    /// Retrying a timed-out claim lands here.
    AlreadyMine,
    /// Another driver holds the order, or it is already completed.
    Taken,
}

/// Result of attaching a passenger rating to an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RatingOutcome {
    /// The rating was recorded on the order; fold it into the driver.
    Applied { driver_id: Option<DriverId> },
    /// First rating wins; this order already carries one.
    AlreadyRated { driver_id: Option<DriverId> },
    /// The order has not been completed yet.
    NotCompleted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [OrderStatus::New, OrderStatus::Accepted, OrderStatus::Completed] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_category_round_trip() {
        for category in [TripCategory::Local, TripCategory::Intercity] {
            assert_eq!(TripCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(TripCategory::parse("city"), None);
    }

    #[test]
    fn test_rating_outcome_serialization() {
        let json = serde_json::to_value(RatingOutcome::Applied { driver_id: Some(42) })
            .expect("serialize");
        assert_eq!(json["result"], "applied");
        assert_eq!(json["driver_id"], 42);

        let json = serde_json::to_value(RatingOutcome::NotCompleted).expect("serialize");
        assert_eq!(json["result"], "not_completed");
    }
}
