use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use super::domain::{RoomTransfer, TransferId, TransferStatus};
use super::store::TransferStore;
use crate::booking::domain::{BookingId, BookingStatus};
use crate::booking::store::BookingStore;
use crate::notify::{self, Notification, NotificationKind, NotificationPublisher};
use crate::occupancy::allocation::{AllocationEngine, AllocationError, ClaimOutcome};
use crate::occupancy::domain::BedId;
use crate::occupancy::store::OccupancyStore;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transfer {0} not found")]
    NotFound(TransferId),
    #[error("booking {0} not found")]
    UnknownBooking(BookingId),
    #[error("booking {0} is not confirmed and allocated")]
    NotAllocated(BookingId),
    #[error("bed {0} is not available")]
    BedUnavailable(BedId),
    #[error("transfer {0} was already processed")]
    AlreadyProcessed(TransferId),
    #[error("transfer {0} no longer matches the booking's allocation")]
    StaleTransfer(TransferId),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

static TRANSFER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_transfer_id() -> TransferId {
    let id = TRANSFER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TransferId(format!("trf-{id:06}"))
}

/// Coordinates bed-to-bed moves. Availability of the destination is checked
/// twice: once at request time and again at completion, since it can change
/// between the two. The destination is claimed through the same conditional
/// write as any other allocation before the old bed is released.
pub struct TransferService<O, B, T, N> {
    occupancy: Arc<O>,
    bookings: Arc<B>,
    transfers: Arc<T>,
    engine: AllocationEngine<O>,
    notifier: Arc<N>,
}

impl<O, B, T, N> TransferService<O, B, T, N>
where
    O: OccupancyStore + 'static,
    B: BookingStore + 'static,
    T: TransferStore + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        occupancy: Arc<O>,
        bookings: Arc<B>,
        transfers: Arc<T>,
        notifier: Arc<N>,
        claim_retry_budget: u32,
    ) -> Self {
        let engine = AllocationEngine::new(occupancy.clone(), claim_retry_budget);
        Self {
            occupancy,
            bookings,
            transfers,
            engine,
            notifier,
        }
    }

    pub fn get(&self, id: &TransferId) -> Result<RoomTransfer, TransferError> {
        self.transfers
            .transfer(id)?
            .ok_or_else(|| TransferError::NotFound(id.clone()))
    }

    /// Open a transfer request, validating the destination bed is free right
    /// now. The real claim happens at completion.
    pub fn request(
        &self,
        booking_id: &BookingId,
        requested_bed: &BedId,
        reason: Option<String>,
    ) -> Result<RoomTransfer, TransferError> {
        let booking = self
            .bookings
            .booking(booking_id)?
            .ok_or_else(|| TransferError::UnknownBooking(booking_id.clone()))?;
        let (current_room, current_bed) = match (
            booking.status,
            booking.allocated_room.clone(),
            booking.allocated_bed.clone(),
        ) {
            (BookingStatus::Confirmed, Some(room), Some(bed)) => (room, bed),
            _ => return Err(TransferError::NotAllocated(booking.id)),
        };

        let destination = self
            .occupancy
            .bed(requested_bed)?
            .ok_or_else(|| TransferError::BedUnavailable(requested_bed.clone()))?;
        if !destination.active || destination.is_occupied {
            return Err(TransferError::BedUnavailable(destination.id));
        }

        let transfer = RoomTransfer {
            id: next_transfer_id(),
            booking: booking.id,
            hostel: booking.hostel,
            resident: booking.resident,
            current_room,
            current_bed,
            requested_room: destination.room,
            requested_bed: destination.id,
            status: TransferStatus::Pending,
            reason,
            actual_move_date: None,
        };
        Ok(self.transfers.insert_transfer(transfer)?)
    }

    pub fn approve(&self, id: &TransferId) -> Result<RoomTransfer, TransferError> {
        let mut transfer = self.get(id)?;
        if transfer.status != TransferStatus::Pending {
            return Err(TransferError::AlreadyProcessed(transfer.id));
        }
        transfer.status = TransferStatus::Approved;
        self.transfers.update_transfer(transfer.clone())?;
        Ok(transfer)
    }

    pub fn reject(&self, id: &TransferId, reason: String) -> Result<RoomTransfer, TransferError> {
        let mut transfer = self.get(id)?;
        if transfer.status != TransferStatus::Pending {
            return Err(TransferError::AlreadyProcessed(transfer.id));
        }
        transfer.status = TransferStatus::Rejected;
        transfer.reason = Some(reason);
        self.transfers.update_transfer(transfer.clone())?;
        Ok(transfer)
    }

    pub fn cancel(&self, id: &TransferId) -> Result<RoomTransfer, TransferError> {
        let mut transfer = self.get(id)?;
        if !matches!(
            transfer.status,
            TransferStatus::Pending | TransferStatus::Approved
        ) {
            return Err(TransferError::AlreadyProcessed(transfer.id));
        }
        transfer.status = TransferStatus::Cancelled;
        self.transfers.update_transfer(transfer.clone())?;
        Ok(transfer)
    }

    /// Execute an approved transfer. The destination is re-validated through
    /// the conditional claim; on a lost race the transfer stays `approved` and
    /// the caller sees `BedUnavailable`, so it can be retried or cancelled.
    pub fn complete(
        &self,
        id: &TransferId,
        now: DateTime<Utc>,
    ) -> Result<RoomTransfer, TransferError> {
        let mut transfer = self.get(id)?;
        if transfer.status != TransferStatus::Approved {
            return Err(TransferError::AlreadyProcessed(transfer.id));
        }
        let mut booking = self
            .bookings
            .booking(&transfer.booking)?
            .ok_or_else(|| TransferError::UnknownBooking(transfer.booking.clone()))?;
        // The booking can check out or move between approval and completion;
        // claiming the destination for it then would strand an occupied bed.
        if booking.status != BookingStatus::Confirmed
            || booking.allocated_bed.as_ref() != Some(&transfer.current_bed)
        {
            return Err(TransferError::StaleTransfer(transfer.id));
        }

        let claimed = match self.engine.claim_specific_bed(
            &transfer.requested_bed,
            &transfer.resident,
            &transfer.booking,
            now,
        )? {
            ClaimOutcome::Claimed(bed) => bed,
            ClaimOutcome::NoCapacity => {
                return Err(TransferError::BedUnavailable(transfer.requested_bed))
            }
        };

        self.engine.release_bed(&transfer.current_bed, now)?;

        let version = booking.version;
        booking.allocated_room = Some(claimed.room.clone());
        booking.allocated_bed = Some(claimed.id.clone());
        self.bookings.update_booking(booking, version)?;

        transfer.status = TransferStatus::Completed;
        transfer.actual_move_date = Some(now);
        self.transfers.update_transfer(transfer.clone())?;

        notify::dispatch(
            self.notifier.as_ref(),
            Notification {
                recipient: transfer.resident.0.clone(),
                kind: NotificationKind::TransferCompleted,
                title: "Room transfer completed".to_string(),
                message: format!("You have been moved to bed {}", claimed.label),
                data: json!({
                    "transfer_id": transfer.id.0,
                    "room": claimed.room_number,
                    "bed": claimed.label,
                }),
            },
        );
        Ok(transfer)
    }
}
