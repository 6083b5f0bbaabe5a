//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category.

pub mod drivers;
pub mod orders;
pub mod system;

use serde_json::Value;

use crate::rpc::RpcError;

pub(crate) fn required_str<'a>(
    params: &'a Value,
    key: &str,
) -> std::result::Result<&'a str, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

pub(crate) fn required_i64(params: &Value, key: &str) -> std::result::Result<i64, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

pub(crate) fn db_error(e: sapar_db::DbError) -> RpcError {
    match e {
        sapar_db::DbError::NotFound(what) => RpcError::not_found(&what),
        other => RpcError::store_error(&other.to_string()),
    }
}

pub(crate) fn to_json<T: serde::Serialize>(value: T) -> std::result::Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(&format!("serialize error: {e}")))
}
