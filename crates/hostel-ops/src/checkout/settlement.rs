use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;

use super::domain::{
    Checkout, CheckoutId, CheckoutStatus, DamageAssessment, DamageItem, FinalBill,
};
use super::store::CheckoutStore;
use crate::billing::domain::Payment;
use crate::billing::store::PaymentStore;
use crate::booking::domain::{BookingId, BookingStatus, InvalidTransition};
use crate::booking::store::BookingStore;
use crate::notify::{self, Notification, NotificationKind, NotificationPublisher};
use crate::occupancy::allocation::{AllocationEngine, AllocationError};
use crate::occupancy::store::OccupancyStore;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("checkout {0} not found")]
    NotFound(CheckoutId),
    #[error("booking {0} not found")]
    UnknownBooking(BookingId),
    #[error("booking {0} has no allocated bed")]
    NotAllocated(BookingId),
    #[error("checkout {0} was already processed")]
    AlreadyProcessed(CheckoutId),
    #[error("illegal booking transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<InvalidTransition> for CheckoutError {
    fn from(value: InvalidTransition) -> Self {
        Self::InvalidTransition {
            from: value.from,
            to: value.to,
        }
    }
}

/// Settlement math over the booking's unpaid monthly obligations up to the
/// checkout date. Pure so it can be exercised without a store.
///
/// Late fees already sitting on unpaid obligations are billed alongside any
/// extra `other_charges`; outstanding maintenance charges fold into the other
/// charges as well. The security refund offsets the total, and the resulting
/// `net_amount` may be negative (refund owed to the resident).
pub fn compute_final_bill(
    unpaid: &[Payment],
    checkout_date: NaiveDate,
    damage_cost: i64,
    other_charges: i64,
    security_deposit: i64,
) -> FinalBill {
    let mut rent_due = 0;
    let mut utilities_due = 0;
    let mut late_fees = 0;
    let mut maintenance_due = 0;
    for payment in unpaid {
        if !payment.status.is_open() {
            continue;
        }
        match payment.due_date {
            Some(due) if due <= checkout_date => {}
            _ => continue,
        }
        rent_due += payment.base_rent;
        utilities_due += payment.utility_charge;
        maintenance_due += payment.maintenance_charge;
        late_fees += payment.late_fee;
    }

    let other_charges = other_charges + maintenance_due;
    let total_due = rent_due + utilities_due + damage_cost + late_fees + other_charges;
    let security_refund = (security_deposit - damage_cost).max(0);
    FinalBill {
        rent_due,
        utilities_due,
        damage_cost,
        late_fees,
        other_charges,
        total_due,
        security_refund,
        net_amount: total_due - security_refund,
    }
}

static CHECKOUT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_checkout_id() -> CheckoutId {
    let id = CHECKOUT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CheckoutId(format!("chk-{id:06}"))
}

/// Drives a checkout from request through final settlement: damage
/// assessment, final-bill computation, bed release, and the booking's
/// `confirmed → completed` transition.
pub struct CheckoutService<O, B, P, C, N> {
    occupancy: Arc<O>,
    bookings: Arc<B>,
    payments: Arc<P>,
    checkouts: Arc<C>,
    engine: AllocationEngine<O>,
    notifier: Arc<N>,
}

impl<O, B, P, C, N> CheckoutService<O, B, P, C, N>
where
    O: OccupancyStore + 'static,
    B: BookingStore + 'static,
    P: PaymentStore + 'static,
    C: CheckoutStore + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        occupancy: Arc<O>,
        bookings: Arc<B>,
        payments: Arc<P>,
        checkouts: Arc<C>,
        notifier: Arc<N>,
        claim_retry_budget: u32,
    ) -> Self {
        let engine = AllocationEngine::new(occupancy.clone(), claim_retry_budget);
        Self {
            occupancy,
            bookings,
            payments,
            checkouts,
            engine,
            notifier,
        }
    }

    pub fn get(&self, id: &CheckoutId) -> Result<Checkout, CheckoutError> {
        self.checkouts
            .checkout(id)?
            .ok_or_else(|| CheckoutError::NotFound(id.clone()))
    }

    /// Open a checkout for a confirmed, allocated booking.
    pub fn request(
        &self,
        booking_id: &BookingId,
        requested_for: NaiveDate,
    ) -> Result<Checkout, CheckoutError> {
        let booking = self
            .bookings
            .booking(booking_id)?
            .ok_or_else(|| CheckoutError::UnknownBooking(booking_id.clone()))?;
        if booking.status != BookingStatus::Confirmed {
            return Err(CheckoutError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Completed,
            });
        }
        let bed = booking
            .allocated_bed
            .clone()
            .ok_or_else(|| CheckoutError::NotAllocated(booking.id.clone()))?;

        let checkout = Checkout {
            id: next_checkout_id(),
            booking: booking.id,
            bed,
            hostel: booking.hostel,
            resident: booking.resident,
            status: CheckoutStatus::Pending,
            requested_for,
            damage: DamageAssessment::default(),
            final_bill: None,
            completed_at: None,
        };
        Ok(self.checkouts.insert_checkout(checkout)?)
    }

    /// Owner approval, `pending → approved`.
    pub fn approve(&self, id: &CheckoutId) -> Result<Checkout, CheckoutError> {
        let mut checkout = self.get(id)?;
        if checkout.status != CheckoutStatus::Pending {
            return Err(CheckoutError::AlreadyProcessed(checkout.id));
        }
        checkout.status = CheckoutStatus::Approved;
        self.checkouts.update_checkout(checkout.clone())?;
        Ok(checkout)
    }

    pub fn cancel(&self, id: &CheckoutId) -> Result<Checkout, CheckoutError> {
        let mut checkout = self.get(id)?;
        if !matches!(
            checkout.status,
            CheckoutStatus::Pending | CheckoutStatus::Approved
        ) {
            return Err(CheckoutError::AlreadyProcessed(checkout.id));
        }
        checkout.status = CheckoutStatus::Cancelled;
        self.checkouts.update_checkout(checkout.clone())?;
        Ok(checkout)
    }

    /// Record the damage walkthrough; replaces any previous assessment.
    pub fn assess_damage(
        &self,
        id: &CheckoutId,
        damages: Vec<DamageItem>,
    ) -> Result<Checkout, CheckoutError> {
        let mut checkout = self.get(id)?;
        if !matches!(
            checkout.status,
            CheckoutStatus::Pending | CheckoutStatus::Approved
        ) {
            return Err(CheckoutError::AlreadyProcessed(checkout.id));
        }
        checkout.damage = DamageAssessment::from_items(damages);
        self.checkouts.update_checkout(checkout.clone())?;
        Ok(checkout)
    }

    /// Settle and complete: compute the final bill, release the bed, and move
    /// the booking to `completed`. The booking's historical allocation
    /// references are cleared only here.
    pub fn complete(
        &self,
        id: &CheckoutId,
        other_charges: i64,
        now: DateTime<Utc>,
    ) -> Result<Checkout, CheckoutError> {
        let mut checkout = self.get(id)?;
        if checkout.status != CheckoutStatus::Approved {
            return Err(CheckoutError::AlreadyProcessed(checkout.id));
        }
        let mut booking = self
            .bookings
            .booking(&checkout.booking)?
            .ok_or_else(|| CheckoutError::UnknownBooking(checkout.booking.clone()))?;

        let hostel = self.occupancy.hostel(&checkout.hostel)?;
        let security_deposit = hostel.map(|h| h.pricing.security_deposit).unwrap_or(0);
        let unpaid = self.payments.monthly_for_booking(&checkout.booking)?;
        let bill = compute_final_bill(
            &unpaid,
            checkout.requested_for,
            checkout.damage.total_damage_cost,
            other_charges,
            security_deposit,
        );

        self.engine.release_bed(&checkout.bed, now)?;

        let version = booking.version;
        booking.transition_to(BookingStatus::Completed)?;
        booking.actual_check_out = Some(now);
        booking.allocated_room = None;
        booking.allocated_bed = None;
        self.bookings.update_booking(booking, version)?;

        checkout.status = CheckoutStatus::Completed;
        checkout.final_bill = Some(bill);
        checkout.completed_at = Some(now);
        self.checkouts.update_checkout(checkout.clone())?;

        notify::dispatch(
            self.notifier.as_ref(),
            Notification {
                recipient: checkout.resident.0.clone(),
                kind: NotificationKind::CheckoutCompleted,
                title: "Checkout completed".to_string(),
                message: format!("Final settlement amount: {}", bill.net_amount),
                data: json!({
                    "checkout_id": checkout.id.0,
                    "total_due": bill.total_due,
                    "security_refund": bill.security_refund,
                    "net_amount": bill.net_amount,
                }),
            },
        );
        Ok(checkout)
    }
}
