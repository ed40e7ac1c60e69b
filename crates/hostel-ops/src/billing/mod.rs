//! Recurring rent obligations: series generation anchored on check-in day,
//! maintenance charge append, payment completion, and the late-fee sweep.

pub mod domain;
pub mod latefee;
pub mod scheduler;
pub mod store;

pub use domain::{BillingPeriod, Payment, PaymentId, PaymentStatus, PaymentType};
pub use latefee::{LateFeeCalculator, SweepError, SweepOutcome};
pub use scheduler::{
    BillingError, BillingScheduler, CycleError, CycleOutcome, RegenerationPolicy, SeriesSummary,
};
pub use store::PaymentStore;
