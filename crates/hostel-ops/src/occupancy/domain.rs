use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::domain::BookingId;

/// Identifier wrapper for a facility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostelId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FloorId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BedId(pub String);

/// Identity of the resident occupying a bed; issued by the external identity
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResidentId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub String);

macro_rules! impl_id_display {
    ($($id:ident),+) => {
        $(impl fmt::Display for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })+
    };
}

impl_id_display!(HostelId, FloorId, RoomId, BedId, ResidentId, OwnerId);

/// Structural parameters fixed when the facility is provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityLayout {
    pub floors: u32,
    pub rooms_per_floor: u32,
    pub beds_per_room: u32,
}

impl FacilityLayout {
    pub const fn total_beds(&self) -> u32 {
        self.floors * self.rooms_per_floor * self.beds_per_room
    }
}

/// Pricing knobs consumed as an immutable snapshot per operation; billing and
/// late-fee passes never re-read these mid-algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    pub monthly_rent: i64,
    pub advance_amount: i64,
    pub utility_charge: i64,
    pub security_deposit: i64,
}

/// How the late fee accrues once the grace period is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum LateFeeCharge {
    /// Flat amount regardless of how late the obligation is.
    Fixed(i64),
    /// Percentage of the obligation amount.
    Percentage(f64),
    /// Per-day amount for each day past the grace period.
    Daily(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LateFeePolicy {
    pub grace_days: i64,
    pub charge: LateFeeCharge,
    pub max_fee: Option<i64>,
}

impl LateFeePolicy {
    /// Fee owed on an obligation of `amount` that is `days_overdue` days past
    /// its due date. Callers are expected to have already checked the grace
    /// period; a daily charge still subtracts it from the billed days.
    pub fn fee_for(&self, days_overdue: i64, amount: i64) -> i64 {
        let raw = match self.charge {
            LateFeeCharge::Fixed(flat) => flat,
            LateFeeCharge::Percentage(pct) => ((amount as f64) * pct / 100.0).round() as i64,
            LateFeeCharge::Daily(per_day) => (days_overdue - self.grace_days).max(0) * per_day,
        };
        match self.max_fee {
            Some(cap) => raw.min(cap),
            None => raw,
        }
    }
}

/// Bed-level counter triple mirrored at room, floor, and hostel level.
/// `occupied + available == total` must hold after every mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedCounters {
    pub total_beds: u32,
    pub occupied_beds: u32,
    pub available_beds: u32,
}

impl BedCounters {
    pub fn sized(total: u32) -> Self {
        Self {
            total_beds: total,
            occupied_beds: 0,
            available_beds: total,
        }
    }

    pub fn claim_one(&mut self) {
        self.occupied_beds = (self.occupied_beds + 1).min(self.total_beds);
        self.available_beds = self.total_beds - self.occupied_beds;
    }

    pub fn release_one(&mut self) {
        self.occupied_beds = self.occupied_beds.saturating_sub(1);
        self.available_beds = self.total_beds - self.occupied_beds;
    }

    pub fn balanced(&self) -> bool {
        self.occupied_beds + self.available_beds == self.total_beds
    }
}

/// Room-level counter triple kept on each floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCounters {
    pub total_rooms: u32,
    pub occupied_rooms: u32,
    pub available_rooms: u32,
}

impl RoomCounters {
    pub fn sized(total: u32) -> Self {
        Self {
            total_rooms: total,
            occupied_rooms: 0,
            available_rooms: total,
        }
    }

    pub fn fill_one(&mut self) {
        self.occupied_rooms = (self.occupied_rooms + 1).min(self.total_rooms);
        self.available_rooms = self.total_rooms - self.occupied_rooms;
    }

    pub fn vacate_one(&mut self) {
        self.occupied_rooms = self.occupied_rooms.saturating_sub(1);
        self.available_rooms = self.total_rooms - self.occupied_rooms;
    }
}

/// Top-level managed property. Counters are mutated only by the allocation
/// engine; pricing and policy are owner-supplied at provisioning time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hostel {
    pub id: HostelId,
    pub owner: OwnerId,
    pub name: String,
    pub layout: FacilityLayout,
    pub pricing: PricingSnapshot,
    pub late_fee_policy: LateFeePolicy,
    pub beds: BedCounters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Floor {
    pub id: FloorId,
    pub hostel: HostelId,
    pub number: u32,
    pub rooms: RoomCounters,
    pub beds: BedCounters,
}

/// `number` is `floor_number * 100 + sequence_on_floor`, so room 3 on floor 2
/// is room 203.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub hostel: HostelId,
    pub floor: FloorId,
    pub floor_number: u32,
    pub number: u32,
    pub beds: BedCounters,
    pub is_full: bool,
}

impl Room {
    pub fn recompute_full(&mut self) {
        self.is_full = self.beds.occupied_beds >= self.beds.total_beds;
    }
}

/// The atomic unit of allocation. `is_occupied == true` exactly when
/// `occupant` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bed {
    pub id: BedId,
    pub hostel: HostelId,
    pub floor: FloorId,
    pub room: RoomId,
    pub floor_number: u32,
    pub room_number: u32,
    pub bed_seq: u32,
    /// Human-facing bed number, e.g. `"201-3"` for the third bed in room 201.
    pub label: String,
    pub active: bool,
    pub is_occupied: bool,
    pub occupant: Option<ResidentId>,
    pub booking: Option<BookingId>,
    pub occupied_from: Option<DateTime<Utc>>,
    pub occupied_till: Option<DateTime<Utc>>,
}

impl Bed {
    /// Strict total order used by the deterministic claim: low floors fill
    /// first, then low rooms, then low bed numbers.
    pub fn sort_key(&self) -> (u32, u32, u32) {
        (self.floor_number, self.room_number, self.bed_seq)
    }
}

/// Optional narrowing criteria for a claim. An empty filter matches every
/// active, unoccupied bed in the facility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedFilter {
    pub floor_number: Option<u32>,
    pub room_number: Option<u32>,
}

impl BedFilter {
    pub fn matches(&self, bed: &Bed) -> bool {
        self.floor_number.map_or(true, |f| bed.floor_number == f)
            && self.room_number.map_or(true, |r| bed.room_number == r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_stay_balanced_through_claim_and_release() {
        let mut counters = BedCounters::sized(3);
        counters.claim_one();
        counters.claim_one();
        assert_eq!(counters.occupied_beds, 2);
        assert_eq!(counters.available_beds, 1);
        assert!(counters.balanced());

        counters.release_one();
        counters.release_one();
        assert_eq!(counters, BedCounters::sized(3));
        assert!(counters.balanced());
    }

    #[test]
    fn release_never_underflows() {
        let mut counters = BedCounters::sized(2);
        counters.release_one();
        assert_eq!(counters.occupied_beds, 0);
        assert_eq!(counters.available_beds, 2);
    }

    #[test]
    fn fixed_fee_ignores_days() {
        let policy = LateFeePolicy {
            grace_days: 3,
            charge: LateFeeCharge::Fixed(250),
            max_fee: None,
        };
        assert_eq!(policy.fee_for(4, 5000), 250);
        assert_eq!(policy.fee_for(40, 5000), 250);
    }

    #[test]
    fn percentage_fee_rounds_to_whole_units() {
        let policy = LateFeePolicy {
            grace_days: 0,
            charge: LateFeeCharge::Percentage(2.5),
            max_fee: None,
        };
        assert_eq!(policy.fee_for(10, 4010), 100);
    }

    #[test]
    fn daily_fee_bills_only_days_past_grace() {
        let policy = LateFeePolicy {
            grace_days: 5,
            charge: LateFeeCharge::Daily(20),
            max_fee: None,
        };
        assert_eq!(policy.fee_for(8, 5000), 60);
    }

    #[test]
    fn fee_clamps_to_max() {
        let policy = LateFeePolicy {
            grace_days: 0,
            charge: LateFeeCharge::Daily(100),
            max_fee: Some(500),
        };
        assert_eq!(policy.fee_for(30, 5000), 500);
    }
}
