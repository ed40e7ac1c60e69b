//! Outbound notification contract. Delivery is an external collaborator;
//! the engine emits fire-and-forget events and a failed publish never blocks
//! or rolls back a state transition.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingRequested,
    BookingApproved,
    BookingRejected,
    RoomAllocated,
    AllocationPending,
    PaymentDue,
    PaymentReceived,
    TransferCompleted,
    CheckoutCompleted,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::BookingRequested => "booking_requested",
            Self::BookingApproved => "booking_approved",
            Self::BookingRejected => "booking_rejected",
            Self::RoomAllocated => "room_allocated",
            Self::AllocationPending => "allocation_pending",
            Self::PaymentDue => "payment_due",
            Self::PaymentReceived => "payment_received",
            Self::TransferCompleted => "transfer_completed",
            Self::CheckoutCompleted => "checkout_completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Trait describing the outbound notification hook (e-mail, SMS, push).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Fire-and-forget dispatch: failures are logged and swallowed.
pub fn dispatch<N: NotificationPublisher + ?Sized>(publisher: &N, notification: Notification) {
    let kind = notification.kind;
    if let Err(err) = publisher.publish(notification) {
        warn!(kind = kind.label(), error = %err, "notification delivery failed");
    }
}
