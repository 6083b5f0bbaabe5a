//! Order lifecycle command handlers.

use std::sync::Arc;

use serde_json::Value;

use sapar_db::queries::orders;
use sapar_types::order::{ClaimOutcome, RatingOutcome, TripCategory};

use super::{db_error, required_i64, required_str, to_json};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Create a new order and broadcast it to the driver pool.
pub async fn create_order(state: &Arc<DaemonState>, params: &Value) -> Result {
    let origin = required_str(params, "origin")?;
    let destination = required_str(params, "destination")?;
    let price = params
        .get("price")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| RpcError::invalid_params("price required"))?;
    let phone = required_str(params, "phone")?;
    let passenger_id = required_i64(params, "passenger_id")?;
    let category = params
        .get("category")
        .and_then(|v| v.as_str())
        .unwrap_or("local");
    let category = TripCategory::parse(category)
        .ok_or_else(|| RpcError::invalid_params("category must be local or intercity"))?;

    let order_id = state
        .coordinator
        .create_order(origin, destination, price, phone, passenger_id, category)
        .await
        .map_err(RpcError::from_dispatch)?;

    state.emit_event(
        "OrderCreated",
        serde_json::json!({"order_id": order_id, "passenger_id": passenger_id}),
    );

    Ok(serde_json::json!({"order_id": order_id}))
}

/// Resolve a driver's claim on an order.
pub async fn accept_order(state: &Arc<DaemonState>, params: &Value) -> Result {
    let order_id = required_i64(params, "order_id")?;
    let driver_id = required_i64(params, "driver_id")?;
    let driver_name = params
        .get("driver_name")
        .and_then(|v| v.as_str())
        .unwrap_or("Driver");

    let outcome = state
        .coordinator
        .accept_attempt(order_id, driver_id, driver_name)
        .await
        .map_err(RpcError::from_dispatch)?;

    if outcome == ClaimOutcome::Won {
        state.emit_event(
            "OrderAccepted",
            serde_json::json!({"order_id": order_id, "driver_id": driver_id}),
        );
    }

    Ok(serde_json::json!({"outcome": outcome}))
}

/// Resolve a trip-completion signal.
pub async fn complete_order(state: &Arc<DaemonState>, params: &Value) -> Result {
    let order_id = required_i64(params, "order_id")?;

    let completed = state
        .coordinator
        .complete_attempt(order_id)
        .await
        .map_err(RpcError::from_dispatch)?;

    if completed {
        state.emit_event("OrderCompleted", serde_json::json!({"order_id": order_id}));
    }

    Ok(serde_json::json!({"completed": completed}))
}

/// Resolve a passenger rating submission.
pub async fn rate_order(state: &Arc<DaemonState>, params: &Value) -> Result {
    let order_id = required_i64(params, "order_id")?;
    let score = params
        .get("score")
        .and_then(|v| v.as_u64())
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| RpcError::invalid_params("score required"))?;

    let outcome = state
        .coordinator
        .rate_attempt(order_id, score)
        .await
        .map_err(RpcError::from_dispatch)?;

    if matches!(outcome, RatingOutcome::Applied { .. }) {
        state.emit_event(
            "OrderRated",
            serde_json::json!({"order_id": order_id, "score": score}),
        );
    }

    to_json(outcome)
}

/// Fetch one order.
pub async fn get_order(state: &Arc<DaemonState>, params: &Value) -> Result {
    let order_id = required_i64(params, "order_id")?;

    let db = state.db.lock().await;
    let order = orders::get(&db, order_id).map_err(db_error)?;

    to_json(order)
}

/// List orders still waiting for a driver, oldest first.
pub async fn list_open_orders(state: &Arc<DaemonState>) -> Result {
    let db = state.db.lock().await;
    let open = orders::open_orders(&db).map_err(db_error)?;

    to_json(open)
}
