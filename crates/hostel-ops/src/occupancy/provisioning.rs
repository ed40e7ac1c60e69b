use std::sync::atomic::{AtomicU64, Ordering};

use super::domain::{
    Bed, BedCounters, FacilityLayout, Floor, FloorId, Hostel, HostelId, LateFeePolicy, OwnerId,
    PricingSnapshot, Room, RoomCounters, RoomId,
};
use super::store::OccupancyStore;
use crate::store::StoreError;

/// Owner-supplied parameters for a new facility.
#[derive(Debug, Clone)]
pub struct FacilitySpec {
    pub owner: OwnerId,
    pub name: String,
    pub layout: FacilityLayout,
    pub pricing: PricingSnapshot,
    pub late_fee_policy: LateFeePolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("facility layout must have at least one floor, room, and bed")]
    EmptyLayout,
    #[error(transparent)]
    Store(#[from] StoreError),
}

static HOSTEL_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_hostel_id() -> HostelId {
    let id = HOSTEL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    HostelId(format!("hst-{id:04}"))
}

/// Create the full floor/room/bed hierarchy for a facility. Rooms are numbered
/// `floor * 100 + sequence`; beds are labelled `"{room}-{seq}"`. Counters start
/// fully available.
pub fn provision<S: OccupancyStore>(store: &S, spec: FacilitySpec) -> Result<Hostel, ProvisionError> {
    let layout = spec.layout;
    if layout.floors == 0 || layout.rooms_per_floor == 0 || layout.beds_per_room == 0 {
        return Err(ProvisionError::EmptyLayout);
    }

    let hostel_id = next_hostel_id();
    let hostel = Hostel {
        id: hostel_id.clone(),
        owner: spec.owner,
        name: spec.name,
        layout,
        pricing: spec.pricing,
        late_fee_policy: spec.late_fee_policy,
        beds: BedCounters::sized(layout.total_beds()),
    };
    store.insert_hostel(hostel.clone())?;

    for floor_number in 1..=layout.floors {
        let floor_id = FloorId(format!("{}-f{floor_number}", hostel_id.0));
        store.insert_floor(Floor {
            id: floor_id.clone(),
            hostel: hostel_id.clone(),
            number: floor_number,
            rooms: RoomCounters::sized(layout.rooms_per_floor),
            beds: BedCounters::sized(layout.rooms_per_floor * layout.beds_per_room),
        })?;

        for seq_on_floor in 1..=layout.rooms_per_floor {
            let room_number = floor_number * 100 + seq_on_floor;
            let room_id = RoomId(format!("{}-r{room_number}", hostel_id.0));
            store.insert_room(Room {
                id: room_id.clone(),
                hostel: hostel_id.clone(),
                floor: floor_id.clone(),
                floor_number,
                number: room_number,
                beds: BedCounters::sized(layout.beds_per_room),
                is_full: false,
            })?;

            for bed_seq in 1..=layout.beds_per_room {
                store.insert_bed(Bed {
                    id: super::domain::BedId(format!("{}-r{room_number}-b{bed_seq}", hostel_id.0)),
                    hostel: hostel_id.clone(),
                    floor: floor_id.clone(),
                    room: room_id.clone(),
                    floor_number,
                    room_number,
                    bed_seq,
                    label: format!("{room_number}-{bed_seq}"),
                    active: true,
                    is_occupied: false,
                    occupant: None,
                    booking: None,
                    occupied_from: None,
                    occupied_till: None,
                })?;
            }
        }
    }

    Ok(hostel)
}
