//! Transport port for outbound notices.
//!
//! The core's only contract with the messaging layer: deliver or report
//! failure. Implementations live outside this crate (the daemon queues
//! notices for an external bridge; tests record them in memory).

use async_trait::async_trait;

use sapar_notify::OutboundNotice;
use sapar_types::BroadcastHandle;

/// Receipt for a delivered notice.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeliveryReceipt {
    /// Handle to the delivered message, returned for pool broadcasts so
    /// the notice can later be edited. `None` for plain sends.
    pub handle: Option<BroadcastHandle>,
}

/// A notice could not be handed to the transport.
///
/// Always non-fatal to the caller: committed state is never rolled back
/// over a failed send.
#[derive(Debug, thiserror::Error)]
#[error("notice delivery failed: {reason}")]
pub struct DeliveryError {
    pub reason: String,
}

/// Outbound message delivery, implemented by the hosting process.
#[async_trait]
pub trait NoticeTransport: Send + Sync {
    async fn deliver(&self, notice: OutboundNotice) -> Result<DeliveryReceipt, DeliveryError>;
}
