//! Driver registry command handlers.

use std::sync::Arc;

use serde_json::Value;

use sapar_db::queries::{drivers, orders};

use super::{db_error, required_i64, to_json};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Fetch a driver and its running rating.
pub async fn get_driver(state: &Arc<DaemonState>, params: &Value) -> Result {
    let driver_id = required_i64(params, "driver_id")?;

    let db = state.db.lock().await;
    let driver = drivers::get(&db, driver_id).map_err(db_error)?;

    to_json(driver)
}

/// Fetch a driver's order history, newest first.
pub async fn get_driver_orders(state: &Arc<DaemonState>, params: &Value) -> Result {
    let driver_id = required_i64(params, "driver_id")?;

    let db = state.db.lock().await;
    let history = orders::orders_for_driver(&db, driver_id).map_err(db_error)?;

    to_json(history)
}

/// Per-driver order counts and revenue for the dashboard.
pub async fn get_driver_totals(state: &Arc<DaemonState>) -> Result {
    let db = state.db.lock().await;
    let totals = drivers::totals(&db).map_err(db_error)?;

    to_json(totals)
}
