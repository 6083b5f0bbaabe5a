//! Transport bridge & diagnostics command handlers.

use std::sync::Arc;

use serde_json::Value;

use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Liveness check.
pub async fn ping(_state: &Arc<DaemonState>) -> Result {
    Ok(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Drain queued outbound notices for the external messaging bridge.
pub async fn take_notices(state: &Arc<DaemonState>, params: &Value) -> Result {
    let max = params
        .get("max")
        .and_then(|v| v.as_u64())
        .unwrap_or(100) as usize;

    let notices = state.notices.take(max);
    let remaining = state.notices.len();
    Ok(serde_json::json!({
        "notices": notices,
        "remaining": remaining,
    }))
}

/// Subscribe to daemon events.
pub async fn subscribe_events(_state: &Arc<DaemonState>, params: &Value) -> Result {
    let _filter = params.get("filter");

    // Generate subscription ID
    let mut sub_id = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut sub_id);

    Ok(serde_json::json!({
        "subscription_id": hex::encode(sub_id),
    }))
}

/// Unsubscribe from daemon events.
pub async fn unsubscribe_events(_state: &Arc<DaemonState>, params: &Value) -> Result {
    let _subscription_id = params
        .get("subscription_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("subscription_id required"))?;

    Ok(serde_json::json!({"unsubscribed": true}))
}
