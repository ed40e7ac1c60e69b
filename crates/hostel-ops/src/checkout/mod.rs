//! Checkout flow: damage assessment, final-bill settlement math, bed release,
//! and the `confirmed → completed` booking transition.

pub mod domain;
pub mod settlement;
pub mod store;

pub use domain::{
    Checkout, CheckoutId, CheckoutStatus, DamageAssessment, DamageItem, FinalBill,
};
pub use settlement::{compute_final_bill, CheckoutError, CheckoutService};
pub use store::CheckoutStore;
