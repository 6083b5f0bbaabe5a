//! Rating aggregation.
//!
//! Attaches a passenger score to its order (first rating wins) and folds
//! it into the driver's running average in the registry.

use rusqlite::Connection;

use sapar_db::queries::{drivers, orders};
use sapar_types::order::RatingOutcome;
use sapar_types::{OrderId, MAX_RATING, MIN_RATING};

use crate::error::DispatchError;

/// Apply a rating to an order and, when it sticks, to its driver.
///
/// `AlreadyRated` and `NotCompleted` are expected branches, reported in
/// the outcome. A completed order without a driver cannot happen by
/// invariant; if it does, the fold is skipped and reported.
pub fn apply(conn: &Connection, order_id: OrderId, score: u8) -> Result<RatingOutcome, DispatchError> {
    if !(MIN_RATING..=MAX_RATING).contains(&score) {
        return Err(DispatchError::Validation(format!(
            "rating {score} outside {MIN_RATING}..={MAX_RATING}"
        )));
    }

    let outcome = orders::set_rating(conn, order_id, score)?;

    match outcome {
        RatingOutcome::Applied {
            driver_id: Some(driver_id),
        } => {
            drivers::fold_rating(conn, driver_id, score)?;
            tracing::info!(order_id, driver_id, score, "rating folded");
        }
        RatingOutcome::Applied { driver_id: None } => {
            tracing::warn!(order_id, "completed order has no driver; rating not folded");
        }
        RatingOutcome::AlreadyRated { .. } => {
            tracing::debug!(order_id, "order already rated; keeping first rating");
        }
        RatingOutcome::NotCompleted => {
            tracing::debug!(order_id, "rating attempt before completion ignored");
        }
    }

    Ok(outcome)
}
