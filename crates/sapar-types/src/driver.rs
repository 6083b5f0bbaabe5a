//! Driver registry types.

use serde::{Deserialize, Serialize};

use crate::DriverId;

/// One known claimant and its running rating.
///
/// `rating_count == 0` implies `rating == 0.0`. The average is maintained
/// incrementally by the rating fold, never by rescanning order history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    /// Display name, refreshed on each successful acceptance.
    pub name: String,
    /// Running average of folded trip ratings.
    pub rating: f64,
    /// Number of ratings folded into the average.
    pub rating_count: u32,
}

/// Per-driver aggregate for the external reporting dashboard.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverTotals {
    pub driver_id: DriverId,
    pub name: String,
    /// Orders this driver has accepted (including completed ones).
    pub orders: u32,
    /// Sum of accepted price offers, minor currency units.
    pub revenue: u64,
}
