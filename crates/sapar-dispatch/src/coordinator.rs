//! Dispatch coordination.
//!
//! Sequences the store and the notification fan-out per external event.
//! The store handle is passed in at construction, never global, so tests
//! and multiple instances can each carry their own. The connection lock
//! is never held across a transport call.

use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use sapar_db::queries::{drivers, orders};
use sapar_notify::OutboundNotice;
use sapar_types::order::{ClaimOutcome, RatingOutcome, TripCategory};
use sapar_types::{phone, DriverId, OrderId, PassengerId, DEFAULT_MAX_PRICE, DEFAULT_MIN_PRICE};

use crate::error::DispatchError;
use crate::event::{DispatchEvent, DispatchOutcome};
use crate::rating;
use crate::transport::NoticeTransport;

/// Accepted range for a passenger price offer, inclusive.
#[derive(Clone, Copy, Debug)]
pub struct PriceBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for PriceBounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_PRICE,
            max: DEFAULT_MAX_PRICE,
        }
    }
}

/// Orchestrates order lifecycle, assignment, rating, and fan-out.
pub struct Coordinator {
    db: Arc<Mutex<Connection>>,
    transport: Arc<dyn NoticeTransport>,
    bounds: PriceBounds,
}

impl Coordinator {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        transport: Arc<dyn NoticeTransport>,
        bounds: PriceBounds,
    ) -> Self {
        Self {
            db,
            transport,
            bounds,
        }
    }

    /// Route one external event. Exhaustive over the closed event set.
    pub async fn handle(&self, event: DispatchEvent) -> Result<DispatchOutcome, DispatchError> {
        match event {
            DispatchEvent::CreateOrder {
                origin,
                destination,
                price,
                phone,
                passenger_id,
                category,
            } => {
                let order_id = self
                    .create_order(&origin, &destination, price, &phone, passenger_id, category)
                    .await?;
                Ok(DispatchOutcome::OrderCreated { order_id })
            }
            DispatchEvent::AcceptAttempt {
                order_id,
                driver_id,
                driver_name,
            } => {
                let outcome = self
                    .accept_attempt(order_id, driver_id, &driver_name)
                    .await?;
                Ok(DispatchOutcome::ClaimResolved { order_id, outcome })
            }
            DispatchEvent::CompleteAttempt { order_id } => {
                let completed = self.complete_attempt(order_id).await?;
                Ok(DispatchOutcome::CompletionResolved {
                    order_id,
                    completed,
                })
            }
            DispatchEvent::RateAttempt { order_id, score } => {
                let outcome = self.rate_attempt(order_id, score).await?;
                Ok(DispatchOutcome::RatingResolved { order_id, outcome })
            }
        }
    }

    /// Validate, persist, and broadcast a new order.
    ///
    /// The broadcast handle is attached after delivery; losing it (failed
    /// delivery or failed attach) only degrades the later pool edit, it
    /// never unwinds the created order.
    pub async fn create_order(
        &self,
        origin: &str,
        destination: &str,
        price: u32,
        phone: &str,
        passenger_id: PassengerId,
        category: TripCategory,
    ) -> Result<OrderId, DispatchError> {
        if price < self.bounds.min || price > self.bounds.max {
            return Err(DispatchError::Validation(format!(
                "price {price} outside [{}, {}]",
                self.bounds.min, self.bounds.max
            )));
        }
        let phone = phone::normalize(phone).ok_or_else(|| {
            DispatchError::Validation("unrecognized phone number".to_string())
        })?;

        let order = {
            let db = self.db.lock().await;
            let id = orders::insert(
                &db,
                origin,
                destination,
                price,
                &phone,
                passenger_id,
                category,
                unix_now(),
            )?;
            orders::get(&db, id)?
        };
        info!(order_id = order.id, passenger_id, "order created");

        match self.transport.deliver(sapar_notify::order_created(&order)).await {
            Ok(receipt) => {
                if let Some(handle) = receipt.handle {
                    let db = self.db.lock().await;
                    if let Err(e) = orders::attach_broadcast_handle(&db, order.id, handle) {
                        warn!(order_id = order.id, "failed to attach broadcast handle: {e}");
                    }
                }
            }
            Err(e) => warn!(order_id = order.id, "pool broadcast failed: {e}"),
        }

        self.deliver_best_effort(sapar_notify::order_submitted(&order))
            .await;

        Ok(order.id)
    }

    /// Resolve one driver's claim on an order.
    pub async fn accept_attempt(
        &self,
        order_id: OrderId,
        driver_id: DriverId,
        driver_name: &str,
    ) -> Result<ClaimOutcome, DispatchError> {
        let (outcome, order) = {
            let db = self.db.lock().await;
            let outcome = orders::try_claim(&db, order_id, driver_id)?;
            // Lazy registration: only the winning claim creates the row.
            if outcome == ClaimOutcome::Won {
                drivers::upsert(&db, driver_id, driver_name)?;
            }
            (outcome, orders::get(&db, order_id)?)
        };

        match outcome {
            ClaimOutcome::Won => {
                info!(order_id, driver_id, "order claimed");
                for notice in sapar_notify::claim_won(&order, driver_name) {
                    self.deliver_best_effort(notice).await;
                }
            }
            ClaimOutcome::AlreadyMine => {
                // Retried claim; already registered and notified last time.
                debug!(order_id, driver_id, "claim retry on own order");
            }
            ClaimOutcome::Taken => {
                debug!(order_id, driver_id, "claim lost");
                self.deliver_best_effort(sapar_notify::claim_lost(order_id, driver_id))
                    .await;
            }
        }

        Ok(outcome)
    }

    /// Resolve a completion signal. Duplicate completions are a no-op.
    pub async fn complete_attempt(&self, order_id: OrderId) -> Result<bool, DispatchError> {
        let (completed, order) = {
            let db = self.db.lock().await;
            let completed = orders::mark_completed(&db, order_id)?;
            (completed, orders::get(&db, order_id)?)
        };

        if completed {
            info!(order_id, "order completed");
            for notice in sapar_notify::order_completed(&order) {
                self.deliver_best_effort(notice).await;
            }
        } else {
            debug!(order_id, status = order.status.as_str(), "completion no-op");
        }

        Ok(completed)
    }

    /// Resolve a rating submission.
    pub async fn rate_attempt(
        &self,
        order_id: OrderId,
        score: u8,
    ) -> Result<RatingOutcome, DispatchError> {
        let (outcome, passenger_id) = {
            let db = self.db.lock().await;
            let outcome = rating::apply(&db, order_id, score)?;
            (outcome, orders::get(&db, order_id)?.passenger_id)
        };

        if matches!(outcome, RatingOutcome::Applied { .. }) {
            self.deliver_best_effort(sapar_notify::rating_recorded(passenger_id, score))
                .await;
        }

        Ok(outcome)
    }

    /// Deliver one notice; failures are reported and dropped, never
    /// propagated into the already-committed transition.
    async fn deliver_best_effort(&self, notice: OutboundNotice) {
        if let Err(e) = self.transport.deliver(notice).await {
            warn!("{e}");
        }
    }
}

/// Current time as Unix epoch seconds.
fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sapar_notify::Recipient;
    use sapar_types::order::OrderStatus;

    use crate::transport::{DeliveryError, DeliveryReceipt};

    /// Records notices; hands out sequential handles for pool broadcasts.
    struct RecordingTransport {
        notices: std::sync::Mutex<Vec<OutboundNotice>>,
        fail: bool,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self {
                notices: std::sync::Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                notices: std::sync::Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn recorded(&self) -> Vec<OutboundNotice> {
            self.notices.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl NoticeTransport for RecordingTransport {
        async fn deliver(
            &self,
            notice: OutboundNotice,
        ) -> Result<DeliveryReceipt, DeliveryError> {
            if self.fail {
                return Err(DeliveryError {
                    reason: "transport down".into(),
                });
            }
            let mut notices = self.notices.lock().expect("lock");
            let handle = match notice.recipient {
                Recipient::DriverPool if notice.edit_of.is_none() => {
                    Some(notices.len() as i64 + 1)
                }
                _ => None,
            };
            notices.push(notice);
            Ok(DeliveryReceipt { handle })
        }
    }

    fn coordinator(transport: Arc<RecordingTransport>) -> Coordinator {
        let conn = sapar_db::open_memory().expect("open");
        Coordinator::new(
            Arc::new(Mutex::new(conn)),
            transport,
            PriceBounds::default(),
        )
    }

    async fn created_order(coordinator: &Coordinator) -> OrderId {
        coordinator
            .create_order(
                "Abay 10",
                "Airport",
                500,
                "+7 701 123 45 67",
                9001,
                TripCategory::Local,
            )
            .await
            .expect("create order")
    }

    #[tokio::test]
    async fn test_create_order_broadcasts_and_attaches_handle() {
        let transport = Arc::new(RecordingTransport::new());
        let coordinator = coordinator(transport.clone());

        let order_id = created_order(&coordinator).await;

        let notices = transport.recorded();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].recipient, Recipient::DriverPool);
        assert_eq!(notices[1].recipient, Recipient::Passenger(9001));

        let db = coordinator.db.lock().await;
        let order = orders::get(&db, order_id).expect("get");
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.phone, "+77011234567");
        assert_eq!(order.broadcast_handle, Some(1));
    }

    #[tokio::test]
    async fn test_price_bounds_validation() {
        let coordinator = coordinator(Arc::new(RecordingTransport::new()));

        for price in [99, 100_001] {
            let result = coordinator
                .create_order("A", "B", price, "+77011234567", 1, TripCategory::Local)
                .await;
            assert!(
                matches!(result, Err(DispatchError::Validation(_))),
                "price {price} should be rejected"
            );
        }
        for price in [100, 100_000] {
            coordinator
                .create_order("A", "B", price, "+77011234567", 1, TripCategory::Local)
                .await
                .unwrap_or_else(|e| panic!("price {price} should be accepted: {e}"));
        }
    }

    #[tokio::test]
    async fn test_bad_phone_rejected() {
        let coordinator = coordinator(Arc::new(RecordingTransport::new()));
        let result = coordinator
            .create_order("A", "B", 500, "12345", 1, TripCategory::Local)
            .await;
        assert!(matches!(result, Err(DispatchError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_fail_creation() {
        let transport = Arc::new(RecordingTransport::failing());
        let coordinator = coordinator(transport.clone());

        let order_id = created_order(&coordinator).await;

        let db = coordinator.db.lock().await;
        let order = orders::get(&db, order_id).expect("get");
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.broadcast_handle, None);
    }

    #[tokio::test]
    async fn test_accept_registers_winner_and_fans_out() {
        let transport = Arc::new(RecordingTransport::new());
        let coordinator = coordinator(transport.clone());
        let order_id = created_order(&coordinator).await;

        let outcome = coordinator
            .accept_attempt(order_id, 77, "Arman")
            .await
            .expect("accept");
        assert_eq!(outcome, ClaimOutcome::Won);

        {
            let db = coordinator.db.lock().await;
            let driver = drivers::get(&db, 77).expect("registered");
            assert_eq!(driver.name, "Arman");
        }

        let notices = transport.recorded();
        // create broadcast + passenger ack, then edit + driver + passenger
        assert_eq!(notices.len(), 5);
        assert_eq!(notices[2].edit_of, Some(1));
        assert_eq!(notices[3].recipient, Recipient::Driver(77));
        assert_eq!(notices[4].recipient, Recipient::Passenger(9001));
    }

    #[tokio::test]
    async fn test_losing_claim_gets_private_notice_only() {
        let transport = Arc::new(RecordingTransport::new());
        let coordinator = coordinator(transport.clone());
        let order_id = created_order(&coordinator).await;

        coordinator
            .accept_attempt(order_id, 77, "Arman")
            .await
            .expect("winner");
        let before = transport.recorded().len();

        let outcome = coordinator
            .accept_attempt(order_id, 88, "Bolat")
            .await
            .expect("loser");
        assert_eq!(outcome, ClaimOutcome::Taken);

        let notices = transport.recorded();
        assert_eq!(notices.len(), before + 1);
        assert_eq!(notices[before].recipient, Recipient::Driver(88));

        // Losing claimants are never registered.
        let db = coordinator.db.lock().await;
        assert!(drivers::get(&db, 88).is_err());
    }

    #[tokio::test]
    async fn test_winner_retry_does_not_renotify() {
        let transport = Arc::new(RecordingTransport::new());
        let coordinator = coordinator(transport.clone());
        let order_id = created_order(&coordinator).await;

        coordinator
            .accept_attempt(order_id, 77, "Arman")
            .await
            .expect("claim");
        let before = transport.recorded().len();

        let outcome = coordinator
            .accept_attempt(order_id, 77, "Arman")
            .await
            .expect("retry");
        assert_eq!(outcome, ClaimOutcome::AlreadyMine);
        assert_eq!(transport.recorded().len(), before);
    }

    #[tokio::test]
    async fn test_complete_then_rate_flow() {
        let transport = Arc::new(RecordingTransport::new());
        let coordinator = coordinator(transport.clone());
        let order_id = created_order(&coordinator).await;
        coordinator
            .accept_attempt(order_id, 77, "Arman")
            .await
            .expect("claim");

        assert!(coordinator.complete_attempt(order_id).await.expect("complete"));
        // Duplicate completion is a quiet no-op.
        assert!(!coordinator.complete_attempt(order_id).await.expect("again"));

        let outcome = coordinator.rate_attempt(order_id, 5).await.expect("rate");
        assert_eq!(outcome, RatingOutcome::Applied { driver_id: Some(77) });

        let db = coordinator.db.lock().await;
        let driver = drivers::get(&db, 77).expect("driver");
        assert_eq!(driver.rating, 5.0);
        assert_eq!(driver.rating_count, 1);
    }

    #[tokio::test]
    async fn test_handle_routes_every_event() {
        let coordinator = coordinator(Arc::new(RecordingTransport::new()));

        let outcome = coordinator
            .handle(DispatchEvent::CreateOrder {
                origin: "A".into(),
                destination: "B".into(),
                price: 500,
                phone: "+77011234567".into(),
                passenger_id: 1,
                category: TripCategory::Local,
            })
            .await
            .expect("create");
        let order_id = match outcome {
            DispatchOutcome::OrderCreated { order_id } => order_id,
            other => panic!("unexpected outcome: {other:?}"),
        };

        let outcome = coordinator
            .handle(DispatchEvent::AcceptAttempt {
                order_id,
                driver_id: 77,
                driver_name: "Arman".into(),
            })
            .await
            .expect("accept");
        assert!(matches!(
            outcome,
            DispatchOutcome::ClaimResolved {
                outcome: ClaimOutcome::Won,
                ..
            }
        ));

        let outcome = coordinator
            .handle(DispatchEvent::CompleteAttempt { order_id })
            .await
            .expect("complete");
        assert!(matches!(
            outcome,
            DispatchOutcome::CompletionResolved {
                completed: true,
                ..
            }
        ));

        let outcome = coordinator
            .handle(DispatchEvent::RateAttempt { order_id, score: 4 })
            .await
            .expect("rate");
        assert!(matches!(
            outcome,
            DispatchOutcome::RatingResolved {
                outcome: RatingOutcome::Applied { .. },
                ..
            }
        ));
    }
}
