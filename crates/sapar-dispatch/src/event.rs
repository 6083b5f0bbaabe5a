//! Typed external events and their outcomes.
//!
//! The dispatch surface is a closed set of events routed by exhaustive
//! match; adding a variant forces every consumer to handle it.

use serde::{Deserialize, Serialize};

use sapar_types::order::{ClaimOutcome, RatingOutcome, TripCategory};
use sapar_types::{DriverId, OrderId, PassengerId};

/// One external event entering the dispatch core.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    CreateOrder {
        origin: String,
        destination: String,
        price: u32,
        phone: String,
        passenger_id: PassengerId,
        category: TripCategory,
    },
    AcceptAttempt {
        order_id: OrderId,
        driver_id: DriverId,
        driver_name: String,
    },
    CompleteAttempt {
        order_id: OrderId,
    },
    RateAttempt {
        order_id: OrderId,
        score: u8,
    },
}

/// The resolved outcome of one dispatch event.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchOutcome {
    OrderCreated { order_id: OrderId },
    ClaimResolved { order_id: OrderId, outcome: ClaimOutcome },
    CompletionResolved { order_id: OrderId, completed: bool },
    RatingResolved { order_id: OrderId, outcome: RatingOutcome },
}
