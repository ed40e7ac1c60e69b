use chrono::NaiveDate;

use super::domain::{Payment, PaymentId};
use crate::booking::domain::BookingId;
use crate::store::StoreError;

/// Storage abstraction for billing obligations and payment records.
pub trait PaymentStore: Send + Sync {
    fn insert_payment(&self, payment: Payment) -> Result<Payment, StoreError>;
    fn update_payment(&self, payment: Payment) -> Result<(), StoreError>;
    fn payment(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError>;
    fn delete_payment(&self, id: &PaymentId) -> Result<(), StoreError>;

    /// Every monthly obligation for the booking, sorted by due date.
    fn monthly_for_booking(&self, booking: &BookingId) -> Result<Vec<Payment>, StoreError>;

    /// Open monthly obligations whose due date has passed and which carry no
    /// late fee yet: the late-fee sweep's work list.
    fn overdue_candidates(&self, today: NaiveDate) -> Result<Vec<Payment>, StoreError>;
}
