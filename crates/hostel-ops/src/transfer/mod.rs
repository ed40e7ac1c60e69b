//! Room transfers: two-phase validated moves of an occupant from one bed to
//! another within the same facility.

pub mod domain;
pub mod service;
pub mod store;

pub use domain::{RoomTransfer, TransferId, TransferStatus};
pub use service::{TransferError, TransferService};
pub use store::TransferStore;
