//! # sapar-notify
//!
//! Notification fan-out: a deterministic mapping from committed order-state
//! transitions to outbound notices for the passenger, the driver pool, and
//! individual drivers.
//!
//! This crate renders already-decided state into messages; it decides no
//! business outcomes. Delivery is the transport's problem and is best-effort
//! per recipient: a failed send never rolls back a committed transition.

use serde::{Deserialize, Serialize};

use sapar_types::order::{Order, TripCategory};
use sapar_types::{BroadcastHandle, DriverId, OrderId, PassengerId};

/// Who a notice is addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Passenger(PassengerId),
    Driver(DriverId),
    /// The shared channel all drivers watch for new orders.
    DriverPool,
}

/// An interactive response affordance attached to a notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Affordance {
    Accept { order_id: OrderId },
    Complete { order_id: OrderId },
    Rate { order_id: OrderId },
}

/// One outbound message, ready for a transport to deliver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutboundNotice {
    pub recipient: Recipient,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affordance: Option<Affordance>,
    /// When set, the transport should edit this earlier broadcast instead
    /// of sending a fresh message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_of: Option<BroadcastHandle>,
}

fn category_label(category: TripCategory) -> &'static str {
    match category {
        TripCategory::Local => "in town",
        TripCategory::Intercity => "out of town",
    }
}

/// Pool broadcast announcing a freshly created order.
pub fn order_created(order: &Order) -> OutboundNotice {
    OutboundNotice {
        recipient: Recipient::DriverPool,
        text: format!(
            "New order #{id} ({category})\n\
             From: {origin}\n\
             To: {destination}\n\
             Passenger offer: {price}\n\
             Phone: {phone}",
            id = order.id,
            category = category_label(order.category),
            origin = order.origin,
            destination = order.destination,
            price = order.price,
            phone = order.phone,
        ),
        affordance: Some(Affordance::Accept { order_id: order.id }),
        edit_of: None,
    }
}

/// Confirmation sent back to the passenger after their order is broadcast.
pub fn order_submitted(order: &Order) -> OutboundNotice {
    OutboundNotice {
        recipient: Recipient::Passenger(order.passenger_id),
        text: format!(
            "Order #{id} sent to drivers ({category}, offer {price}). Waiting for a driver...",
            id = order.id,
            category = category_label(order.category),
            price = order.price,
        ),
        affordance: None,
        edit_of: None,
    }
}

/// Fan-out after a driver wins the claim: withdraw the open broadcast,
/// hand the winner the trip details, and tell the passenger.
pub fn claim_won(order: &Order, driver_name: &str) -> Vec<OutboundNotice> {
    let mut notices = Vec::with_capacity(3);

    if let Some(handle) = order.broadcast_handle {
        notices.push(OutboundNotice {
            recipient: Recipient::DriverPool,
            text: format!(
                "Order #{id} taken by {driver_name}\n\
                 From: {origin}\n\
                 To: {destination}\n\
                 Price: {price}",
                id = order.id,
                origin = order.origin,
                destination = order.destination,
                price = order.price,
            ),
            affordance: None,
            edit_of: Some(handle),
        });
    }

    if let Some(driver_id) = order.driver_id {
        notices.push(OutboundNotice {
            recipient: Recipient::Driver(driver_id),
            text: format!(
                "You accepted order #{id} ({category})\n\
                 From: {origin}\n\
                 To: {destination}\n\
                 Price: {price}\n\
                 Passenger phone: {phone}",
                id = order.id,
                category = category_label(order.category),
                origin = order.origin,
                destination = order.destination,
                price = order.price,
                phone = order.phone,
            ),
            affordance: Some(Affordance::Complete { order_id: order.id }),
            edit_of: None,
        });
    }

    notices.push(OutboundNotice {
        recipient: Recipient::Passenger(order.passenger_id),
        text: format!(
            "Driver found: {driver_name}. Price: {price}. Your driver is on the way.",
            price = order.price,
        ),
        affordance: None,
        edit_of: None,
    });

    notices
}

/// Ephemeral notice to a driver whose claim lost the race.
pub fn claim_lost(order_id: OrderId, driver_id: DriverId) -> OutboundNotice {
    OutboundNotice {
        recipient: Recipient::Driver(driver_id),
        text: format!("Order #{order_id} has already been taken by another driver."),
        affordance: None,
        edit_of: None,
    }
}

/// Fan-out after completion: ack the driver, ask the passenger to rate.
pub fn order_completed(order: &Order) -> Vec<OutboundNotice> {
    let mut notices = Vec::with_capacity(2);

    if let Some(driver_id) = order.driver_id {
        notices.push(OutboundNotice {
            recipient: Recipient::Driver(driver_id),
            text: format!("Trip for order #{id} completed. Thank you!", id = order.id),
            affordance: None,
            edit_of: None,
        });
    }

    notices.push(OutboundNotice {
        recipient: Recipient::Passenger(order.passenger_id),
        text: "Your trip is complete! Please rate your driver:".to_string(),
        affordance: Some(Affordance::Rate { order_id: order.id }),
        edit_of: None,
    });

    notices
}

/// Ack to the passenger once their rating is recorded.
pub fn rating_recorded(passenger_id: PassengerId, score: u8) -> OutboundNotice {
    OutboundNotice {
        recipient: Recipient::Passenger(passenger_id),
        text: format!("Thanks! You rated your driver {score}/5."),
        affordance: None,
        edit_of: None,
    }
}
