use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, TimeZone, Utc};

use crate::billing::scheduler::RegenerationPolicy;
use crate::booking::domain::StayRequest;
use crate::booking::service::BookingService;
use crate::notify::{Notification, NotificationKind, NotificationPublisher, NotifyError};
use crate::occupancy::domain::{
    FacilityLayout, Hostel, LateFeeCharge, LateFeePolicy, OwnerId, PricingSnapshot, ResidentId,
};
use crate::occupancy::provisioning::{provision, FacilitySpec};
use crate::store::MemoryStore;

pub(super) type TestService = BookingService<MemoryStore, MemoryStore, MemoryStore, MemoryNotifier>;

pub(super) fn resident(n: u32) -> ResidentId {
    ResidentId(format!("res-{n:03}"))
}

pub(super) fn stay_request() -> StayRequest {
    StayRequest {
        check_in: NaiveDate::from_ymd_opt(2026, 3, 15).expect("valid date"),
        check_out: NaiveDate::from_ymd_opt(2026, 9, 15).expect("valid date"),
        room_preference: None,
        floor_preference: None,
    }
}

pub(super) fn at(year: i32, month: u32, day: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Provision a small facility and wire a service around a shared store.
pub(super) fn build_service(
    floors: u32,
    rooms_per_floor: u32,
    beds_per_room: u32,
) -> (TestService, Arc<MemoryStore>, Arc<MemoryNotifier>, Hostel) {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let hostel = provision(
        store.as_ref(),
        FacilitySpec {
            owner: OwnerId("own-001".to_string()),
            name: "Lakeview Hostel".to_string(),
            layout: FacilityLayout {
                floors,
                rooms_per_floor,
                beds_per_room,
            },
            pricing: PricingSnapshot {
                monthly_rent: 5000,
                advance_amount: 2000,
                utility_charge: 300,
                security_deposit: 3000,
            },
            late_fee_policy: LateFeePolicy {
                grace_days: 3,
                charge: LateFeeCharge::Fixed(250),
                max_fee: None,
            },
        },
    )
    .expect("facility provisions");

    let service = BookingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        notifier.clone(),
        3,
        RegenerationPolicy::PreservePaid,
    );
    (service, store, notifier, hostel)
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn kinds(&self) -> Vec<NotificationKind> {
        self.events().into_iter().map(|event| event.kind).collect()
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Publisher whose transport always fails, for fire-and-forget coverage.
#[derive(Default, Clone)]
pub(super) struct BrokenNotifier;

impl NotificationPublisher for BrokenNotifier {
    fn publish(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp unreachable".to_string()))
    }
}
