use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::domain::{
    AdvancePayment, AdvanceStatus, Booking, BookingId, BookingStatus, InvalidTransition,
    StayRequest,
};
use super::store::BookingStore;
use crate::billing::domain::{BillingPeriod, PaymentType};
use crate::billing::scheduler::{BillingError, BillingScheduler, RegenerationPolicy};
use crate::billing::store::PaymentStore;
use crate::notify::{self, Notification, NotificationKind, NotificationPublisher};
use crate::occupancy::allocation::{AllocationEngine, AllocationError, ClaimOutcome};
use crate::occupancy::domain::{BedFilter, HostelId, ResidentId};
use crate::occupancy::store::OccupancyStore;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("booking {0} not found")]
    NotFound(BookingId),
    #[error("hostel {0} not found")]
    UnknownHostel(HostelId),
    #[error("illegal booking transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("booking {0} was already processed")]
    AlreadyProcessed(BookingId),
    #[error("no capacity available in hostel {0}")]
    NoCapacity(HostelId),
    #[error("resident {resident} already has an active booking in hostel {hostel}")]
    DuplicateActiveBooking {
        resident: ResidentId,
        hostel: HostelId,
    },
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Billing(#[from] BillingError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<InvalidTransition> for BookingError {
    fn from(value: InvalidTransition) -> Self {
        Self::InvalidTransition {
            from: value.from,
            to: value.to,
        }
    }
}

/// Callback payload from the external payment collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCallback {
    pub payment_type: PaymentType,
    pub amount_paid: i64,
    pub success: bool,
    #[serde(default)]
    pub period: Option<BillingPeriod>,
}

static BOOKING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_booking_id() -> BookingId {
    let id = BOOKING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BookingId(format!("bkg-{id:06}"))
}

/// Service composing the booking state machine with the allocation engine and
/// billing scheduler. Allocation is deferred to payment completion so capacity
/// is never held by an unpaid reservation.
pub struct BookingService<O, B, P, N> {
    occupancy: Arc<O>,
    bookings: Arc<B>,
    engine: AllocationEngine<O>,
    billing: BillingScheduler<P>,
    notifier: Arc<N>,
}

impl<O, B, P, N> BookingService<O, B, P, N>
where
    O: OccupancyStore + 'static,
    B: BookingStore + 'static,
    P: PaymentStore + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        occupancy: Arc<O>,
        bookings: Arc<B>,
        payments: Arc<P>,
        notifier: Arc<N>,
        claim_retry_budget: u32,
        regeneration: RegenerationPolicy,
    ) -> Self {
        let engine = AllocationEngine::new(occupancy.clone(), claim_retry_budget);
        let billing = BillingScheduler::new(payments, regeneration);
        Self {
            occupancy,
            bookings,
            engine,
            billing,
            notifier,
        }
    }

    pub fn billing(&self) -> &BillingScheduler<P> {
        &self.billing
    }

    pub fn engine(&self) -> &AllocationEngine<O> {
        &self.engine
    }

    /// Insert a `pending` booking after checking the facility still has
    /// capacity and the resident holds no other active booking there.
    pub fn create(
        &self,
        resident: ResidentId,
        hostel_id: HostelId,
        request: StayRequest,
    ) -> Result<Booking, BookingError> {
        let hostel = self
            .occupancy
            .hostel(&hostel_id)?
            .ok_or_else(|| BookingError::UnknownHostel(hostel_id.clone()))?;
        if hostel.beds.available_beds == 0 {
            return Err(BookingError::NoCapacity(hostel_id));
        }
        if self.bookings.active_for(&resident, &hostel_id)?.is_some() {
            return Err(BookingError::DuplicateActiveBooking {
                resident,
                hostel: hostel_id,
            });
        }

        let booking = Booking {
            id: next_booking_id(),
            resident: resident.clone(),
            hostel: hostel_id,
            owner: hostel.owner.clone(),
            request,
            status: BookingStatus::Pending,
            advance: AdvancePayment::unpaid(),
            allocated_room: None,
            allocated_bed: None,
            actual_check_in: None,
            actual_check_out: None,
            needs_manual_allocation: false,
            rejection_reason: None,
            version: 1,
        };
        let stored = self.bookings.insert_booking(booking)?;

        notify::dispatch(
            self.notifier.as_ref(),
            Notification {
                recipient: hostel.owner.0.clone(),
                kind: NotificationKind::BookingRequested,
                title: "New booking request".to_string(),
                message: format!("Resident {} requested a bed at {}", resident, hostel.name),
                data: json!({ "booking_id": stored.id.0 }),
            },
        );
        Ok(stored)
    }

    pub fn get(&self, id: &BookingId) -> Result<Booking, BookingError> {
        self.bookings
            .booking(id)?
            .ok_or_else(|| BookingError::NotFound(id.clone()))
    }

    /// Owner approval: `pending → approved`, fixing the advance amount from
    /// the facility's pricing snapshot.
    pub fn approve(&self, id: &BookingId) -> Result<Booking, BookingError> {
        let mut booking = self.get(id)?;
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::AlreadyProcessed(booking.id));
        }
        let hostel = self
            .occupancy
            .hostel(&booking.hostel)?
            .ok_or_else(|| BookingError::UnknownHostel(booking.hostel.clone()))?;
        if hostel.beds.available_beds == 0 {
            return Err(BookingError::NoCapacity(booking.hostel));
        }

        let version = booking.version;
        booking.transition_to(BookingStatus::Approved)?;
        booking.advance.amount = hostel.pricing.advance_amount;
        let stored = self.bookings.update_booking(booking, version)?;

        notify::dispatch(
            self.notifier.as_ref(),
            Notification {
                recipient: stored.resident.0.clone(),
                kind: NotificationKind::BookingApproved,
                title: "Booking approved".to_string(),
                message: format!(
                    "Pay the advance of {} to confirm your booking",
                    stored.advance.amount
                ),
                data: json!({ "booking_id": stored.id.0, "advance_amount": stored.advance.amount }),
            },
        );
        Ok(stored)
    }

    /// Owner rejection: `pending → rejected`, recording the reason. Terminal.
    pub fn reject(&self, id: &BookingId, reason: String) -> Result<Booking, BookingError> {
        let mut booking = self.get(id)?;
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::AlreadyProcessed(booking.id));
        }
        let version = booking.version;
        booking.transition_to(BookingStatus::Rejected)?;
        booking.rejection_reason = Some(reason);
        let stored = self.bookings.update_booking(booking, version)?;

        notify::dispatch(
            self.notifier.as_ref(),
            Notification {
                recipient: stored.resident.0.clone(),
                kind: NotificationKind::BookingRejected,
                title: "Booking rejected".to_string(),
                message: stored
                    .rejection_reason
                    .clone()
                    .unwrap_or_else(|| "Your booking request was rejected".to_string()),
                data: json!({ "booking_id": stored.id.0 }),
            },
        );
        Ok(stored)
    }

    /// Resident cancellation, legal only from `pending` or `approved`; no bed
    /// was ever claimed in those states, so there are no capacity side
    /// effects.
    pub fn cancel(&self, id: &BookingId) -> Result<Booking, BookingError> {
        let mut booking = self.get(id)?;
        let version = booking.version;
        booking.transition_to(BookingStatus::Cancelled)?;
        Ok(self.bookings.update_booking(booking, version)?)
    }

    /// Entry point for the external payment collaborator.
    ///
    /// A successful advance payment confirms the booking and synchronously
    /// attempts automatic allocation; running out of capacity there is a
    /// degraded state (`needs_manual_allocation`), not an error. A successful
    /// monthly payment settles the matching obligation.
    pub fn record_payment(
        &self,
        id: &BookingId,
        callback: PaymentCallback,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let booking = self.get(id)?;
        match callback.payment_type {
            PaymentType::Monthly => {
                if callback.success {
                    let settled = self.billing.complete_obligation(id, callback.period, now)?;
                    notify::dispatch(
                        self.notifier.as_ref(),
                        Notification {
                            recipient: booking.resident.0.clone(),
                            kind: NotificationKind::PaymentReceived,
                            title: "Payment received".to_string(),
                            message: format!("Your rent payment of {} was recorded", settled.amount),
                            data: json!({
                                "booking_id": booking.id.0,
                                "payment_id": settled.id.0,
                                "period": settled.period.map(|p| p.to_string()),
                            }),
                        },
                    );
                }
                Ok(booking)
            }
            PaymentType::Advance => {
                if !callback.success {
                    return self.mark_advance_failed(booking);
                }
                self.confirm_with_advance(booking, callback.amount_paid, now)
            }
            _ => {
                if callback.success {
                    self.billing.record_one_off(
                        &booking,
                        callback.payment_type,
                        callback.amount_paid,
                        now,
                    )?;
                }
                Ok(booking)
            }
        }
    }

    fn mark_advance_failed(&self, mut booking: Booking) -> Result<Booking, BookingError> {
        if booking.status != BookingStatus::Approved {
            return Err(BookingError::AlreadyProcessed(booking.id));
        }
        let version = booking.version;
        booking.advance.status = AdvanceStatus::Failed;
        Ok(self.bookings.update_booking(booking, version)?)
    }

    fn confirm_with_advance(
        &self,
        mut booking: Booking,
        amount_paid: i64,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        if booking.status == BookingStatus::Confirmed
            && booking.advance.status == AdvanceStatus::Paid
        {
            return Err(BookingError::AlreadyProcessed(booking.id));
        }

        let version = booking.version;
        booking.transition_to(BookingStatus::Confirmed)?;
        booking.advance.status = AdvanceStatus::Paid;
        booking.advance.paid_at = Some(now);
        let confirmed = self.bookings.update_booking(booking, version)?;
        self.billing
            .record_one_off(&confirmed, PaymentType::Advance, amount_paid, now)?;

        self.try_allocate(confirmed, now)
    }

    /// Owner-initiated retry after automatic allocation found no capacity.
    /// Idempotent: a booking that already holds a bed is returned unchanged.
    pub fn allocate_manually(
        &self,
        id: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let booking = self.get(id)?;
        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Confirmed,
            });
        }
        if booking.allocated_bed.is_some() {
            return Ok(booking);
        }

        let allocated = self.try_allocate(booking, now)?;
        if allocated.needs_manual_allocation {
            return Err(BookingError::NoCapacity(allocated.hostel));
        }
        Ok(allocated)
    }

    /// Claim a bed for a confirmed booking and follow through with the
    /// billing series. Claim-retry exhaustion degrades to the manual
    /// allocation queue instead of failing the payment callback.
    fn try_allocate(
        &self,
        mut booking: Booking,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let filter = BedFilter {
            floor_number: booking.request.floor_preference,
            room_number: None,
        };
        let outcome =
            match self
                .engine
                .claim_bed(&booking.hostel, &filter, &booking.resident, &booking.id, now)
            {
                Ok(outcome) => outcome,
                Err(AllocationError::ConflictRetryExhausted { attempts }) => {
                    warn!(
                        booking = %booking.id,
                        attempts,
                        "bed claim contention exhausted retries, deferring to manual allocation"
                    );
                    ClaimOutcome::NoCapacity
                }
                Err(other) => return Err(other.into()),
            };

        match outcome {
            ClaimOutcome::Claimed(bed) => {
                let version = booking.version;
                booking.allocated_room = Some(bed.room.clone());
                booking.allocated_bed = Some(bed.id.clone());
                booking.actual_check_in = Some(now);
                booking.needs_manual_allocation = false;
                let allocated = self.bookings.update_booking(booking, version)?;

                let hostel = self
                    .occupancy
                    .hostel(&allocated.hostel)?
                    .ok_or_else(|| BookingError::UnknownHostel(allocated.hostel.clone()))?;
                self.billing.generate_series(&allocated, &hostel.pricing)?;

                notify::dispatch(
                    self.notifier.as_ref(),
                    Notification {
                        recipient: allocated.resident.0.clone(),
                        kind: NotificationKind::RoomAllocated,
                        title: "Bed allocated".to_string(),
                        message: format!("You have been assigned bed {}", bed.label),
                        data: json!({
                            "booking_id": allocated.id.0,
                            "room": bed.room_number,
                            "bed": bed.label,
                        }),
                    },
                );
                Ok(allocated)
            }
            ClaimOutcome::NoCapacity => {
                let version = booking.version;
                booking.needs_manual_allocation = true;
                let deferred = self.bookings.update_booking(booking, version)?;

                notify::dispatch(
                    self.notifier.as_ref(),
                    Notification {
                        recipient: deferred.owner.0.clone(),
                        kind: NotificationKind::AllocationPending,
                        title: "Manual allocation needed".to_string(),
                        message: format!(
                            "Booking {} is confirmed but no bed was available",
                            deferred.id
                        ),
                        data: json!({ "booking_id": deferred.id.0 }),
                    },
                );
                Ok(deferred)
            }
        }
    }
}
