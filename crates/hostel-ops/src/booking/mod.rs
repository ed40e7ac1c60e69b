//! Booking lifecycle: request intake, owner approval, payment-triggered
//! confirmation with automatic bed allocation, and the manual-allocation
//! escape hatch.

pub mod domain;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    AdvancePayment, AdvanceStatus, Booking, BookingId, BookingStatus, BookingStatusView,
    InvalidTransition, StayRequest,
};
pub use router::booking_router;
pub use service::{BookingError, BookingService, PaymentCallback};
pub use store::BookingStore;
