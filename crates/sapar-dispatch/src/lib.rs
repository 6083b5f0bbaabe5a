//! # sapar-dispatch
//!
//! The dispatch core: the atomic single-assignment protocol over orders,
//! rating aggregation, and the coordinator that sequences store writes and
//! notification fan-out in response to external events.
//!
//! The store is the only shared mutable resource; every cross-cutting
//! decision is a conditional write against it, so the guarantees hold even
//! with multiple coordinator processes on one database.

pub mod coordinator;
pub mod error;
pub mod event;
pub mod rating;
pub mod transport;

pub use coordinator::{Coordinator, PriceBounds};
pub use error::DispatchError;
pub use event::{DispatchEvent, DispatchOutcome};
pub use transport::{DeliveryError, DeliveryReceipt, NoticeTransport};
