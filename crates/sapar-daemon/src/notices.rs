//! Outbound notice queue.
//!
//! The daemon-side [`NoticeTransport`]: notices are queued for the external
//! messaging bridge, which drains them over RPC (`take_notices`) and owns
//! actual delivery. Each queued notice also surfaces on the event bus so a
//! connected bridge can react without polling.
//!
//! Pool broadcasts are handed a queue-local sequence number as their
//! broadcast handle; the bridge maps handles to platform message ids when
//! it processes edits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use sapar_dispatch::{DeliveryError, DeliveryReceipt, NoticeTransport};
use sapar_notify::{OutboundNotice, Recipient};

use crate::events::{Event, EventBus};

/// A notice waiting for the bridge, tagged with its queue sequence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueuedNotice {
    pub seq: i64,
    pub notice: OutboundNotice,
}

/// Bounded in-memory notice queue feeding the external bridge.
pub struct NoticeQueue {
    queue: Mutex<VecDeque<QueuedNotice>>,
    capacity: usize,
    next_seq: AtomicI64,
    bus: EventBus,
}

impl NoticeQueue {
    pub fn new(capacity: usize, bus: EventBus) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            capacity,
            next_seq: AtomicI64::new(1),
            bus,
        }
    }

    /// Remove and return up to `max` notices, oldest first.
    pub fn take(&self, max: usize) -> Vec<QueuedNotice> {
        let mut queue = match self.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };
        let n = max.min(queue.len());
        queue.drain(..n).collect()
    }

    /// Number of notices currently waiting.
    pub fn len(&self) -> usize {
        match self.queue.lock() {
            Ok(queue) => queue.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NoticeTransport for NoticeQueue {
    async fn deliver(&self, notice: OutboundNotice) -> Result<DeliveryReceipt, DeliveryError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);

        // Fresh pool broadcasts get a handle so they can be edited later.
        let handle = match notice.recipient {
            Recipient::DriverPool if notice.edit_of.is_none() => Some(seq),
            _ => None,
        };

        let queued = QueuedNotice {
            seq,
            notice: notice.clone(),
        };
        {
            let mut queue = match self.queue.lock() {
                Ok(queue) => queue,
                Err(poisoned) => poisoned.into_inner(),
            };
            if queue.len() >= self.capacity {
                // Bounded queue: oldest entry goes when no bridge drains.
                warn!(capacity = self.capacity, "notice queue full, dropping oldest");
                queue.pop_front();
            }
            queue.push_back(queued);
        }

        self.bus.emit(Event {
            event_type: "NoticeQueued".to_string(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            payload: serde_json::json!({
                "seq": seq,
                "recipient": notice.recipient,
            }),
        });

        Ok(DeliveryReceipt { handle })
    }
}
