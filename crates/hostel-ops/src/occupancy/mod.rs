//! Hierarchical capacity model (hostel → floor → room → bed) and the
//! allocation engine that keeps the four-level occupancy counters consistent.

pub mod allocation;
pub mod domain;
pub mod provisioning;
pub mod store;

#[cfg(test)]
mod tests;

pub use allocation::{AllocationEngine, AllocationError, ClaimOutcome};
pub use domain::{
    Bed, BedCounters, BedFilter, BedId, FacilityLayout, Floor, FloorId, Hostel, HostelId,
    LateFeeCharge, LateFeePolicy, OwnerId, PricingSnapshot, ResidentId, Room, RoomCounters, RoomId,
};
pub use provisioning::{provision, FacilitySpec, ProvisionError};
pub use store::OccupancyStore;
