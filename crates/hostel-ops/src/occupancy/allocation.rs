use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::domain::{Bed, BedFilter, BedId, HostelId, ResidentId};
use super::store::OccupancyStore;
use crate::booking::domain::BookingId;
use crate::store::StoreError;

/// Result of a claim attempt. Running out of beds is an expected condition,
/// not an error; callers must branch on it explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    Claimed(Bed),
    NoCapacity,
}

#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("bed claim contention exceeded {attempts} attempts")]
    ConflictRetryExhausted { attempts: u32 },
    #[error("bed {0} is not currently occupied")]
    BedNotOccupied(BedId),
    #[error("unknown hostel {0}")]
    UnknownHostel(HostelId),
    #[error("unknown bed {0}")]
    UnknownBed(BedId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Maintains the four-level counter hierarchy. All occupancy mutation goes
/// through this engine; no other component touches the counters directly.
///
/// The bed write is the only atomic guard (an optimistic compare-and-swap via
/// [`OccupancyStore::claim_bed_if_free`]). The room/floor/hostel counter
/// cascade is best-effort: if any cascade write fails, the counters are
/// recomputed from the authoritative set of bed records.
pub struct AllocationEngine<S> {
    store: Arc<S>,
    retry_budget: u32,
}

impl<S> AllocationEngine<S>
where
    S: OccupancyStore,
{
    pub fn new(store: Arc<S>, retry_budget: u32) -> Self {
        Self {
            store,
            retry_budget: retry_budget.max(1),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Claim the single lowest-ordered free bed in the facility, filling low
    /// floors first: `(floor_number, room_number, bed_number)` ascending.
    ///
    /// Lost races re-read the candidate list and retry; once the budget is
    /// spent the failure is surfaced as transient so the caller may retry the
    /// whole operation.
    pub fn claim_bed(
        &self,
        hostel: &HostelId,
        filter: &BedFilter,
        occupant: &ResidentId,
        booking: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, AllocationError> {
        for attempt in 1..=self.retry_budget {
            let mut candidates = self.store.free_beds_ordered(hostel, filter)?;
            if candidates.is_empty() {
                return Ok(ClaimOutcome::NoCapacity);
            }
            let candidate = candidates.remove(0);

            if self
                .store
                .claim_bed_if_free(&candidate.id, occupant, booking, now)?
            {
                let claimed = self
                    .store
                    .bed(&candidate.id)?
                    .ok_or_else(|| AllocationError::UnknownBed(candidate.id.clone()))?;
                self.cascade_claim(&claimed)?;
                return Ok(ClaimOutcome::Claimed(claimed));
            }

            debug!(
                attempt,
                bed = %candidate.id.0,
                "lost bed claim race, re-reading candidates"
            );
        }

        Err(AllocationError::ConflictRetryExhausted {
            attempts: self.retry_budget,
        })
    }

    /// Claim a specific, already-chosen bed (transfer completion). The
    /// lowest-order search is bypassed but the same conditional write guards
    /// against a concurrent claim; a lost race reports `NoCapacity`.
    pub fn claim_specific_bed(
        &self,
        bed: &BedId,
        occupant: &ResidentId,
        booking: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, AllocationError> {
        let current = self
            .store
            .bed(bed)?
            .ok_or_else(|| AllocationError::UnknownBed(bed.clone()))?;
        if !current.active || current.is_occupied {
            return Ok(ClaimOutcome::NoCapacity);
        }

        if self.store.claim_bed_if_free(bed, occupant, booking, now)? {
            let claimed = self
                .store
                .bed(bed)?
                .ok_or_else(|| AllocationError::UnknownBed(bed.clone()))?;
            self.cascade_claim(&claimed)?;
            Ok(ClaimOutcome::Claimed(claimed))
        } else {
            Ok(ClaimOutcome::NoCapacity)
        }
    }

    /// Release an occupied bed and reverse the counter cascade.
    pub fn release_bed(&self, bed: &BedId, now: DateTime<Utc>) -> Result<Bed, AllocationError> {
        let current = self
            .store
            .bed(bed)?
            .ok_or_else(|| AllocationError::UnknownBed(bed.clone()))?;
        if !current.is_occupied {
            return Err(AllocationError::BedNotOccupied(bed.clone()));
        }

        let released = self.store.release_bed(bed, now)?;
        if let Err(err) = self.apply_release_counters(&released) {
            warn!(
                hostel = %released.hostel.0,
                error = %err,
                "release counter cascade failed, reconciling from bed records"
            );
            self.reconcile(&released.hostel)?;
        }
        Ok(released)
    }

    fn cascade_claim(&self, bed: &Bed) -> Result<(), AllocationError> {
        if let Err(err) = self.apply_claim_counters(bed) {
            warn!(
                hostel = %bed.hostel.0,
                error = %err,
                "claim counter cascade failed, reconciling from bed records"
            );
            self.reconcile(&bed.hostel)?;
        }
        Ok(())
    }

    fn apply_claim_counters(&self, bed: &Bed) -> Result<(), AllocationError> {
        let mut room = self
            .store
            .room(&bed.room)?
            .ok_or_else(|| StoreError::NotFound)?;
        room.beds.claim_one();
        let was_full = room.is_full;
        room.recompute_full();
        let became_full = !was_full && room.is_full;
        self.store.update_room(room)?;

        let mut floor = self
            .store
            .floor(&bed.floor)?
            .ok_or_else(|| StoreError::NotFound)?;
        floor.beds.claim_one();
        if became_full {
            floor.rooms.fill_one();
        }
        self.store.update_floor(floor)?;

        let mut hostel = self
            .store
            .hostel(&bed.hostel)?
            .ok_or_else(|| AllocationError::UnknownHostel(bed.hostel.clone()))?;
        hostel.beds.claim_one();
        self.store.update_hostel(hostel)?;
        Ok(())
    }

    fn apply_release_counters(&self, bed: &Bed) -> Result<(), AllocationError> {
        let mut room = self
            .store
            .room(&bed.room)?
            .ok_or_else(|| StoreError::NotFound)?;
        let was_full = room.is_full;
        room.beds.release_one();
        room.recompute_full();
        let became_not_full = was_full && !room.is_full;
        self.store.update_room(room)?;

        let mut floor = self
            .store
            .floor(&bed.floor)?
            .ok_or_else(|| StoreError::NotFound)?;
        floor.beds.release_one();
        if became_not_full {
            floor.rooms.vacate_one();
        }
        self.store.update_floor(floor)?;

        let mut hostel = self
            .store
            .hostel(&bed.hostel)?
            .ok_or_else(|| AllocationError::UnknownHostel(bed.hostel.clone()))?;
        hostel.beds.release_one();
        self.store.update_hostel(hostel)?;
        Ok(())
    }

    /// Recompute every room, floor, and hostel counter from the authoritative
    /// bed records. Used as the compensating step when a cascade write fails
    /// and as a standalone reconciliation job when drift is suspected.
    pub fn reconcile(&self, hostel_id: &HostelId) -> Result<(), AllocationError> {
        let beds = self.store.beds_in_hostel(hostel_id)?;

        // (total, occupied) per room and per floor, plus full-room tallies.
        let mut per_room: BTreeMap<super::domain::RoomId, (u32, u32)> = BTreeMap::new();
        let mut per_floor: BTreeMap<super::domain::FloorId, (u32, u32)> = BTreeMap::new();
        for bed in &beds {
            let room = per_room.entry(bed.room.clone()).or_insert((0, 0));
            room.0 += 1;
            if bed.is_occupied {
                room.1 += 1;
            }
            let floor = per_floor.entry(bed.floor.clone()).or_insert((0, 0));
            floor.0 += 1;
            if bed.is_occupied {
                floor.1 += 1;
            }
        }

        let mut full_rooms_per_floor: BTreeMap<super::domain::FloorId, u32> = BTreeMap::new();
        for (room_id, (total, occupied)) in &per_room {
            let mut room = self
                .store
                .room(room_id)?
                .ok_or_else(|| StoreError::NotFound)?;
            room.beds = super::domain::BedCounters {
                total_beds: *total,
                occupied_beds: *occupied,
                available_beds: total - occupied,
            };
            room.recompute_full();
            if room.is_full {
                *full_rooms_per_floor.entry(room.floor.clone()).or_insert(0) += 1;
            }
            self.store.update_room(room)?;
        }

        let mut hostel_occupied = 0;
        for (floor_id, (total, occupied)) in &per_floor {
            let mut floor = self
                .store
                .floor(floor_id)?
                .ok_or_else(|| StoreError::NotFound)?;
            floor.beds = super::domain::BedCounters {
                total_beds: *total,
                occupied_beds: *occupied,
                available_beds: total - occupied,
            };
            let full = full_rooms_per_floor.get(floor_id).copied().unwrap_or(0);
            floor.rooms.occupied_rooms = full;
            floor.rooms.available_rooms = floor.rooms.total_rooms.saturating_sub(full);
            self.store.update_floor(floor)?;
            hostel_occupied += occupied;
        }

        let mut hostel = self
            .store
            .hostel(hostel_id)?
            .ok_or_else(|| AllocationError::UnknownHostel(hostel_id.clone()))?;
        hostel.beds.occupied_beds = hostel_occupied;
        hostel.beds.available_beds = hostel.beds.total_beds.saturating_sub(hostel_occupied);
        self.store.update_hostel(hostel)?;
        Ok(())
    }
}
