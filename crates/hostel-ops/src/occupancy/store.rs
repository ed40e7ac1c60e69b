use chrono::{DateTime, Utc};

use super::domain::{Bed, BedFilter, BedId, Floor, FloorId, Hostel, HostelId, Room, RoomId};
use crate::booking::domain::BookingId;
use crate::occupancy::domain::ResidentId;
use crate::store::StoreError;

/// Storage abstraction for the capacity hierarchy.
///
/// `claim_bed_if_free` is the only operation that must be atomic with respect
/// to concurrent claims: it flips `is_occupied` only if it was `false` and
/// reports whether the caller won. Everything else is plain per-record
/// read/update; the counter cascade is maintained by the allocation engine
/// and repaired by reconciliation when a cascade write fails.
pub trait OccupancyStore: Send + Sync {
    fn insert_hostel(&self, hostel: Hostel) -> Result<(), StoreError>;
    fn hostel(&self, id: &HostelId) -> Result<Option<Hostel>, StoreError>;
    fn update_hostel(&self, hostel: Hostel) -> Result<(), StoreError>;

    fn insert_floor(&self, floor: Floor) -> Result<(), StoreError>;
    fn floor(&self, id: &FloorId) -> Result<Option<Floor>, StoreError>;
    fn update_floor(&self, floor: Floor) -> Result<(), StoreError>;

    fn insert_room(&self, room: Room) -> Result<(), StoreError>;
    fn room(&self, id: &RoomId) -> Result<Option<Room>, StoreError>;
    fn update_room(&self, room: Room) -> Result<(), StoreError>;

    fn insert_bed(&self, bed: Bed) -> Result<(), StoreError>;
    fn bed(&self, id: &BedId) -> Result<Option<Bed>, StoreError>;
    fn update_bed(&self, bed: Bed) -> Result<(), StoreError>;

    /// All beds in the facility, in no particular order.
    fn beds_in_hostel(&self, hostel: &HostelId) -> Result<Vec<Bed>, StoreError>;

    /// Active, unoccupied beds matching the filter, sorted by the strict
    /// `(floor_number, room_number, bed_seq)` ascending order.
    fn free_beds_ordered(
        &self,
        hostel: &HostelId,
        filter: &BedFilter,
    ) -> Result<Vec<Bed>, StoreError>;

    /// Conditionally claim a bed: succeeds (returning `true`) only if the bed
    /// is active and `is_occupied` was `false`, in which case the occupant,
    /// booking, and `occupied_from` are written in the same atomic update.
    fn claim_bed_if_free(
        &self,
        bed: &BedId,
        occupant: &ResidentId,
        booking: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Clear the occupant fields and stamp `occupied_till`, returning the
    /// released bed so the caller can reverse the counter cascade.
    fn release_bed(&self, bed: &BedId, now: DateTime<Utc>) -> Result<Bed, StoreError>;
}
