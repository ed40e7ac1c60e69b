use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::occupancy::domain::{
    FacilityLayout, Hostel, LateFeeCharge, LateFeePolicy, OwnerId, PricingSnapshot,
};
use crate::occupancy::provisioning::{provision, FacilitySpec};
use crate::store::MemoryStore;

pub(super) fn pricing() -> PricingSnapshot {
    PricingSnapshot {
        monthly_rent: 5000,
        advance_amount: 2000,
        utility_charge: 300,
        security_deposit: 3000,
    }
}

pub(super) fn late_fee_policy() -> LateFeePolicy {
    LateFeePolicy {
        grace_days: 3,
        charge: LateFeeCharge::Fixed(250),
        max_fee: None,
    }
}

pub(super) fn spec(floors: u32, rooms_per_floor: u32, beds_per_room: u32) -> FacilitySpec {
    FacilitySpec {
        owner: OwnerId("own-001".to_string()),
        name: "Lakeview Hostel".to_string(),
        layout: FacilityLayout {
            floors,
            rooms_per_floor,
            beds_per_room,
        },
        pricing: pricing(),
        late_fee_policy: late_fee_policy(),
    }
}

/// Provision a 2x2x2 facility (8 beds) into a fresh in-memory store.
pub(super) fn small_facility() -> (Arc<MemoryStore>, Hostel) {
    let store = Arc::new(MemoryStore::default());
    let hostel = provision(store.as_ref(), spec(2, 2, 2)).expect("facility provisions");
    (store, hostel)
}

pub(super) fn at(year: i32, month: u32, day: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}
