//! Occupancy allocation and booking lifecycle engine for multi-floor hostel
//! facilities: the hierarchical capacity model, the deterministic bed
//! assignment algorithm, the booking state machine, the recurring billing
//! scheduler, and the late-fee/checkout settlement calculators.

pub mod billing;
pub mod booking;
pub mod checkout;
pub mod config;
pub mod error;
pub mod notify;
pub mod occupancy;
pub mod store;
pub mod telemetry;
pub mod transfer;
