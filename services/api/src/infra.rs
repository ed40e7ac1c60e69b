use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

use hostel_ops::notify::{Notification, NotificationPublisher, NotifyError};
use hostel_ops::occupancy::provisioning::FacilitySpec;
use hostel_ops::occupancy::{
    provision, FacilityLayout, Hostel, LateFeeCharge, LateFeePolicy, OwnerId, PricingSnapshot,
    ProvisionError,
};
use hostel_ops::store::MemoryStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) store: Arc<MemoryStore>,
}

/// Notification sink for the in-process deployment: structured log lines
/// stand in for the real e-mail/SMS transport.
#[derive(Default, Clone)]
pub(crate) struct LogNotifier;

impl NotificationPublisher for LogNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            recipient = %notification.recipient,
            kind = notification.kind.label(),
            title = %notification.title,
            "notification"
        );
        Ok(())
    }
}

pub(crate) fn demo_facility_spec(layout: FacilityLayout) -> FacilitySpec {
    FacilitySpec {
        owner: OwnerId("own-001".to_string()),
        name: "Lakeview Hostel".to_string(),
        layout,
        pricing: PricingSnapshot {
            monthly_rent: 5000,
            advance_amount: 2000,
            utility_charge: 300,
            security_deposit: 3000,
        },
        late_fee_policy: LateFeePolicy {
            grace_days: 3,
            charge: LateFeeCharge::Fixed(250),
            max_fee: Some(1500),
        },
    }
}

pub(crate) fn seed_demo_facility(store: &MemoryStore) -> Result<Hostel, ProvisionError> {
    let layout = FacilityLayout {
        floors: 3,
        rooms_per_floor: 4,
        beds_per_room: 3,
    };
    provision(store, demo_facility_spec(layout))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
