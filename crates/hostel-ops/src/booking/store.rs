use super::domain::{Booking, BookingId};
use crate::occupancy::domain::{HostelId, ResidentId};
use crate::store::StoreError;

/// Storage abstraction for bookings. `update_booking` is a versioned write:
/// the store must reject the record with `StoreError::StaleVersion` unless the
/// stored version equals `expected_version`, so concurrent transitions on the
/// same booking serialize instead of clobbering each other.
pub trait BookingStore: Send + Sync {
    fn insert_booking(&self, booking: Booking) -> Result<Booking, StoreError>;
    fn booking(&self, id: &BookingId) -> Result<Option<Booking>, StoreError>;
    fn update_booking(&self, booking: Booking, expected_version: u64)
        -> Result<Booking, StoreError>;

    /// Any booking for the pair still in `{pending, approved, confirmed}`.
    fn active_for(
        &self,
        resident: &ResidentId,
        hostel: &HostelId,
    ) -> Result<Option<Booking>, StoreError>;

    /// Confirmed bookings flagged for manual allocation, for owner queues.
    fn awaiting_manual_allocation(&self, hostel: &HostelId) -> Result<Vec<Booking>, StoreError>;

    /// All bookings currently in `confirmed`, for the periodic billing pass.
    fn confirmed_bookings(&self) -> Result<Vec<Booking>, StoreError>;
}
