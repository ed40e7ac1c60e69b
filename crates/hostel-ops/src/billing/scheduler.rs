use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{BillingPeriod, Payment, PaymentId, PaymentStatus, PaymentType};
use super::store::PaymentStore;
use crate::booking::domain::{Booking, BookingId};
use crate::booking::store::BookingStore;
use crate::occupancy::domain::PricingSnapshot;
use crate::occupancy::store::OccupancyStore;
use crate::store::StoreError;

/// What regeneration does to obligations that already exist for the booking.
///
/// The legacy behavior (`ReplaceAll`) deletes paid obligations too, erasing
/// payment history; `PreservePaid` keeps completed records and only fills the
/// remaining periods. Configurable rather than guessed; `PreservePaid` is the
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenerationPolicy {
    ReplaceAll,
    PreservePaid,
}

impl Default for RegenerationPolicy {
    fn default() -> Self {
        Self::PreservePaid
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeriesSummary {
    pub generated: usize,
    pub preserved: usize,
    pub removed: usize,
}

/// Per-booking failure captured by a billing-cycle pass.
#[derive(Debug, Clone, Serialize)]
pub struct CycleError {
    pub booking: BookingId,
    pub reason: String,
}

/// Summary of a billing-cycle pass over the confirmed bookings.
#[derive(Debug, Default, Serialize)]
pub struct CycleOutcome {
    pub examined: usize,
    pub series_created: usize,
    pub errors: Vec<CycleError>,
}

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("booking {0} has no recorded check-in")]
    NotCheckedIn(BookingId),
    #[error("no open monthly obligation for booking {booking}")]
    ObligationNotFound {
        booking: BookingId,
        period: Option<BillingPeriod>,
    },
    #[error("obligation {0} is already settled")]
    AlreadySettled(PaymentId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

static PAYMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_payment_id() -> PaymentId {
    let id = PAYMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PaymentId(format!("pay-{id:06}"))
}

/// Materializes the recurring rent obligation series for confirmed, allocated
/// bookings and services changes to individual obligations.
pub struct BillingScheduler<P> {
    payments: Arc<P>,
    policy: RegenerationPolicy,
}

impl<P> BillingScheduler<P>
where
    P: PaymentStore,
{
    pub fn new(payments: Arc<P>, policy: RegenerationPolicy) -> Self {
        Self { payments, policy }
    }

    /// Generate one obligation per billing period from actual check-in through
    /// the expected checkout date.
    ///
    /// The anchor day is the check-in's day-of-month; each later due date is
    /// the same anchor day one calendar month on, clamped to the last day of
    /// months that are too short. Generation is idempotent by replacement,
    /// subject to the configured [`RegenerationPolicy`].
    pub fn generate_series(
        &self,
        booking: &Booking,
        pricing: &PricingSnapshot,
    ) -> Result<SeriesSummary, BillingError> {
        let anchor = booking
            .actual_check_in
            .ok_or_else(|| BillingError::NotCheckedIn(booking.id.clone()))?
            .date_naive();
        let expected_checkout = booking.request.check_out;

        let mut summary = SeriesSummary::default();
        let mut preserved_periods = BTreeSet::new();
        for existing in self.payments.monthly_for_booking(&booking.id)? {
            let keep = self.policy == RegenerationPolicy::PreservePaid
                && existing.status == PaymentStatus::Completed;
            if keep {
                summary.preserved += 1;
                if let Some(period) = existing.period {
                    preserved_periods.insert(period);
                }
            } else {
                self.payments.delete_payment(&existing.id)?;
                summary.removed += 1;
            }
        }

        for offset in 0u32.. {
            let Some(due) = anchor.checked_add_months(Months::new(offset)) else {
                break;
            };
            if due > expected_checkout {
                break;
            }
            let period = BillingPeriod::of(due);
            if preserved_periods.contains(&period) {
                continue;
            }

            let mut obligation = Payment {
                id: next_payment_id(),
                booking: booking.id.clone(),
                hostel: booking.hostel.clone(),
                resident: booking.resident.clone(),
                payment_type: PaymentType::Monthly,
                status: PaymentStatus::Pending,
                base_rent: pricing.monthly_rent,
                utility_charge: pricing.utility_charge,
                maintenance_charge: 0,
                amount: 0,
                period: Some(period),
                due_date: Some(due),
                paid_at: None,
                late_fee: 0,
                late_fee_applied: false,
                is_overdue: false,
                overdue_since: None,
            };
            obligation.recompute_amount();
            self.payments.insert_payment(obligation)?;
            summary.generated += 1;
        }

        info!(
            booking = %booking.id,
            generated = summary.generated,
            preserved = summary.preserved,
            removed = summary.removed,
            "billing series regenerated"
        );
        Ok(summary)
    }

    /// Fold a completed maintenance cost into the obligation for the given
    /// period. Only still-open obligations accept charges; the amount is
    /// recomputed from its three components.
    pub fn apply_maintenance_charge(
        &self,
        booking: &BookingId,
        period: BillingPeriod,
        cost: i64,
    ) -> Result<Payment, BillingError> {
        let mut obligation = self
            .payments
            .monthly_for_booking(booking)?
            .into_iter()
            .find(|payment| payment.period == Some(period))
            .ok_or_else(|| BillingError::ObligationNotFound {
                booking: booking.clone(),
                period: Some(period),
            })?;

        if !obligation.status.is_open() {
            return Err(BillingError::AlreadySettled(obligation.id));
        }
        if cost == 0 {
            return Ok(obligation);
        }

        obligation.maintenance_charge += cost;
        obligation.recompute_amount();
        self.payments.update_payment(obligation.clone())?;
        Ok(obligation)
    }

    /// Mark the matching obligation completed after the external payment
    /// collaborator reports a successful monthly payment. Without an explicit
    /// period tag the earliest-due open obligation is the match.
    pub fn complete_obligation(
        &self,
        booking: &BookingId,
        period: Option<BillingPeriod>,
        now: DateTime<Utc>,
    ) -> Result<Payment, BillingError> {
        let obligations = self.payments.monthly_for_booking(booking)?;
        let mut obligation = match period {
            Some(period) => obligations
                .into_iter()
                .find(|payment| payment.period == Some(period)),
            None => obligations
                .into_iter()
                .filter(|payment| payment.status.is_open())
                .min_by_key(|payment| payment.due_date),
        }
        .ok_or_else(|| BillingError::ObligationNotFound {
            booking: booking.clone(),
            period,
        })?;

        if !obligation.status.is_open() {
            return Err(BillingError::AlreadySettled(obligation.id));
        }

        obligation.status = PaymentStatus::Completed;
        obligation.paid_at = Some(now);
        self.payments.update_payment(obligation.clone())?;
        Ok(obligation)
    }

    /// Persist a completed one-off payment record (advance, deposit,
    /// maintenance, or other).
    pub fn record_one_off(
        &self,
        booking: &Booking,
        payment_type: PaymentType,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<Payment, BillingError> {
        let record = Payment {
            id: next_payment_id(),
            booking: booking.id.clone(),
            hostel: booking.hostel.clone(),
            resident: booking.resident.clone(),
            payment_type,
            status: PaymentStatus::Completed,
            base_rent: 0,
            utility_charge: 0,
            maintenance_charge: 0,
            amount,
            period: None,
            due_date: None,
            paid_at: Some(now),
            late_fee: 0,
            late_fee_applied: false,
            is_overdue: false,
            overdue_since: None,
        };
        Ok(self.payments.insert_payment(record)?)
    }

    /// Periodic catch-up over the confirmed bookings: any checked-in booking
    /// with no obligation series yet gets one. Bookings that already carry
    /// obligations are left untouched, so applied late fees and folded-in
    /// maintenance charges survive the pass. One bad record never aborts the
    /// batch.
    pub fn run_cycle<B, O>(&self, bookings: &B, occupancy: &O) -> Result<CycleOutcome, StoreError>
    where
        B: BookingStore,
        O: OccupancyStore,
    {
        let mut outcome = CycleOutcome::default();
        for booking in bookings.confirmed_bookings()? {
            if booking.actual_check_in.is_none() {
                continue;
            }
            outcome.examined += 1;

            let existing = match self.payments.monthly_for_booking(&booking.id) {
                Ok(existing) => existing,
                Err(err) => {
                    outcome.errors.push(CycleError {
                        booking: booking.id.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            if !existing.is_empty() {
                continue;
            }

            let hostel = match occupancy.hostel(&booking.hostel) {
                Ok(Some(hostel)) => hostel,
                Ok(None) => {
                    outcome.errors.push(CycleError {
                        booking: booking.id.clone(),
                        reason: format!("hostel {} not found", booking.hostel),
                    });
                    continue;
                }
                Err(err) => {
                    outcome.errors.push(CycleError {
                        booking: booking.id.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            match self.generate_series(&booking, &hostel.pricing) {
                Ok(summary) if summary.generated > 0 => outcome.series_created += 1,
                Ok(_) => {}
                Err(err) => outcome.errors.push(CycleError {
                    booking: booking.id.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        info!(
            examined = outcome.examined,
            series_created = outcome.series_created,
            errors = outcome.errors.len(),
            "billing cycle pass finished"
        );
        Ok(outcome)
    }
}
