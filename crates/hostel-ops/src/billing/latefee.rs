use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::PaymentId;
use super::store::PaymentStore;
use crate::notify::{self, Notification, NotificationKind, NotificationPublisher};
use crate::occupancy::domain::{HostelId, LateFeePolicy};
use crate::occupancy::store::OccupancyStore;
use crate::store::StoreError;
use serde_json::json;

/// Per-record failure captured by a sweep; one bad record never aborts the
/// batch.
#[derive(Debug, Clone, Serialize)]
pub struct SweepError {
    pub payment: PaymentId,
    pub reason: String,
}

/// Summary of a late-fee pass, reported instead of aborting on first failure.
#[derive(Debug, Default, Serialize)]
pub struct SweepOutcome {
    pub examined: usize,
    pub fees_applied: usize,
    pub within_grace: usize,
    pub skipped: usize,
    pub errors: Vec<SweepError>,
}

/// Periodic pass over open, overdue monthly obligations. Idempotent by
/// construction: the store only returns candidates with `late_fee_applied ==
/// false`, and applying a fee sets the guard, so a second pass over the same
/// record is a no-op.
pub struct LateFeeCalculator<P, O, N> {
    payments: Arc<P>,
    occupancy: Arc<O>,
    notifier: Arc<N>,
}

impl<P, O, N> LateFeeCalculator<P, O, N>
where
    P: PaymentStore,
    O: OccupancyStore,
    N: NotificationPublisher,
{
    pub fn new(payments: Arc<P>, occupancy: Arc<O>, notifier: Arc<N>) -> Self {
        Self {
            payments,
            occupancy,
            notifier,
        }
    }

    pub fn run(&self, today: NaiveDate) -> Result<SweepOutcome, StoreError> {
        let candidates = self.payments.overdue_candidates(today)?;
        let mut outcome = SweepOutcome::default();

        // Policy snapshots, fetched once per facility for the whole batch.
        let mut policies: HashMap<HostelId, Option<LateFeePolicy>> = HashMap::new();

        for mut payment in candidates {
            outcome.examined += 1;

            let policy = match policies.get(&payment.hostel) {
                Some(snapshot) => *snapshot,
                None => {
                    // A store failure is transient; only a definitive lookup
                    // result (policy or confirmed absence) is cached.
                    let found = match self.occupancy.hostel(&payment.hostel) {
                        Ok(found) => found,
                        Err(err) => {
                            warn!(
                                payment = %payment.id,
                                hostel = %payment.hostel,
                                error = %err,
                                "policy lookup failed, skipping record"
                            );
                            outcome.skipped += 1;
                            outcome.errors.push(SweepError {
                                payment: payment.id.clone(),
                                reason: err.to_string(),
                            });
                            continue;
                        }
                    };
                    let snapshot = found.map(|hostel| hostel.late_fee_policy);
                    policies.insert(payment.hostel.clone(), snapshot);
                    snapshot
                }
            };
            let Some(policy) = policy else {
                warn!(
                    payment = %payment.id,
                    hostel = %payment.hostel,
                    "late-fee configuration missing, skipping record"
                );
                outcome.skipped += 1;
                outcome.errors.push(SweepError {
                    payment: payment.id.clone(),
                    reason: format!("late-fee configuration missing for hostel {}", payment.hostel),
                });
                continue;
            };

            let Some(due) = payment.due_date else {
                outcome.skipped += 1;
                outcome.errors.push(SweepError {
                    payment: payment.id.clone(),
                    reason: "monthly obligation has no due date".to_string(),
                });
                continue;
            };

            let days_overdue = today.signed_duration_since(due).num_days();
            if days_overdue <= policy.grace_days {
                outcome.within_grace += 1;
                continue;
            }

            payment.late_fee = policy.fee_for(days_overdue, payment.amount);
            payment.late_fee_applied = true;
            payment.is_overdue = true;
            payment.overdue_since = Some(today);

            match self.payments.update_payment(payment.clone()) {
                Ok(()) => {
                    outcome.fees_applied += 1;
                    notify::dispatch(
                        self.notifier.as_ref(),
                        Notification {
                            recipient: payment.resident.0.clone(),
                            kind: NotificationKind::PaymentDue,
                            title: "Rent payment overdue".to_string(),
                            message: format!(
                                "Your payment of {} due {} is overdue; a late fee of {} applies",
                                payment.amount, due, payment.late_fee
                            ),
                            data: json!({
                                "payment_id": payment.id.0,
                                "due_date": due.to_string(),
                                "late_fee": payment.late_fee,
                            }),
                        },
                    );
                }
                Err(err) => outcome.errors.push(SweepError {
                    payment: payment.id.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        info!(
            examined = outcome.examined,
            fees_applied = outcome.fees_applied,
            within_grace = outcome.within_grace,
            skipped = outcome.skipped,
            errors = outcome.errors.len(),
            "late-fee sweep finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::domain::{BillingPeriod, Payment, PaymentStatus, PaymentType};
    use crate::booking::domain::BookingId;
    use crate::occupancy::domain::{
        BedCounters, FacilityLayout, Hostel, LateFeeCharge, OwnerId, PricingSnapshot, ResidentId,
    };
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn hostel(id: &str, charge: LateFeeCharge, grace_days: i64) -> Hostel {
        Hostel {
            id: HostelId(id.to_string()),
            owner: OwnerId("own-1".to_string()),
            name: "Test House".to_string(),
            layout: FacilityLayout {
                floors: 1,
                rooms_per_floor: 1,
                beds_per_room: 1,
            },
            pricing: PricingSnapshot {
                monthly_rent: 5000,
                advance_amount: 1000,
                utility_charge: 0,
                security_deposit: 2000,
            },
            late_fee_policy: LateFeePolicy {
                grace_days,
                charge,
                max_fee: None,
            },
            beds: BedCounters::sized(1),
        }
    }

    fn obligation(id: &str, hostel: &str, due: NaiveDate) -> Payment {
        Payment {
            id: PaymentId(id.to_string()),
            booking: BookingId("bkg-000001".to_string()),
            hostel: HostelId(hostel.to_string()),
            resident: ResidentId("res-1".to_string()),
            payment_type: PaymentType::Monthly,
            status: PaymentStatus::Pending,
            base_rent: 5000,
            utility_charge: 0,
            maintenance_charge: 0,
            amount: 5000,
            period: Some(BillingPeriod::of(due)),
            due_date: Some(due),
            paid_at: None,
            late_fee: 0,
            late_fee_applied: false,
            is_overdue: false,
            overdue_since: None,
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        kinds: std::sync::Mutex<Vec<NotificationKind>>,
    }

    impl RecordingNotifier {
        fn kinds(&self) -> Vec<NotificationKind> {
            self.kinds.lock().expect("kinds mutex poisoned").clone()
        }
    }

    impl NotificationPublisher for RecordingNotifier {
        fn publish(&self, notification: Notification) -> Result<(), crate::notify::NotifyError> {
            self.kinds
                .lock()
                .expect("kinds mutex poisoned")
                .push(notification.kind);
            Ok(())
        }
    }

    type TestCalculator = LateFeeCalculator<MemoryStore, MemoryStore, RecordingNotifier>;

    fn calculator() -> (TestCalculator, Arc<MemoryStore>, Arc<RecordingNotifier>) {
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        (
            LateFeeCalculator::new(store.clone(), store.clone(), notifier.clone()),
            store,
            notifier,
        )
    }

    #[test]
    fn fee_applies_once_and_only_once() {
        let (calculator, store, notifier) = calculator();
        store
            .insert_hostel(hostel("hst-0001", LateFeeCharge::Fixed(250), 3))
            .expect("hostel inserted");
        store
            .insert_payment(obligation("pay-000001", "hst-0001", date(2025, 3, 1)))
            .expect("obligation inserted");

        let first = calculator.run(date(2025, 3, 10)).expect("sweep runs");
        assert_eq!(first.fees_applied, 1);

        let stored = store
            .payment(&PaymentId("pay-000001".to_string()))
            .expect("fetch works")
            .expect("obligation exists");
        assert_eq!(stored.late_fee, 250);
        assert!(stored.late_fee_applied);
        assert!(stored.is_overdue);

        assert_eq!(notifier.kinds(), vec![NotificationKind::PaymentDue]);

        let second = calculator.run(date(2025, 3, 20)).expect("sweep runs");
        assert_eq!(second.examined, 0);
        assert_eq!(second.fees_applied, 0);
        // No second reminder for an already-flagged obligation.
        assert_eq!(notifier.kinds().len(), 1);

        let unchanged = store
            .payment(&PaymentId("pay-000001".to_string()))
            .expect("fetch works")
            .expect("obligation exists");
        assert_eq!(unchanged.late_fee, 250);
        assert_eq!(unchanged.overdue_since, Some(date(2025, 3, 10)));
    }

    #[test]
    fn grace_period_suppresses_the_fee() {
        let (calculator, store, _notifier) = calculator();
        store
            .insert_hostel(hostel("hst-0001", LateFeeCharge::Fixed(250), 7))
            .expect("hostel inserted");
        store
            .insert_payment(obligation("pay-000001", "hst-0001", date(2025, 3, 1)))
            .expect("obligation inserted");

        let outcome = calculator.run(date(2025, 3, 6)).expect("sweep runs");
        assert_eq!(outcome.within_grace, 1);
        assert_eq!(outcome.fees_applied, 0);

        let stored = store
            .payment(&PaymentId("pay-000001".to_string()))
            .expect("fetch works")
            .expect("obligation exists");
        assert!(!stored.late_fee_applied);
        assert_eq!(stored.late_fee, 0);
    }

    #[test]
    fn daily_fee_grows_with_days_past_grace() {
        let (calculator, store, _notifier) = calculator();
        store
            .insert_hostel(hostel("hst-0001", LateFeeCharge::Daily(20), 2))
            .expect("hostel inserted");
        store
            .insert_payment(obligation("pay-000001", "hst-0001", date(2025, 3, 1)))
            .expect("obligation inserted");

        calculator.run(date(2025, 3, 11)).expect("sweep runs");

        let stored = store
            .payment(&PaymentId("pay-000001".to_string()))
            .expect("fetch works")
            .expect("obligation exists");
        // 10 days overdue, 2 of them in grace.
        assert_eq!(stored.late_fee, 160);
    }

    #[test]
    fn missing_facility_config_skips_record_and_continues() {
        let (calculator, store, _notifier) = calculator();
        store
            .insert_hostel(hostel("hst-0002", LateFeeCharge::Fixed(100), 0))
            .expect("hostel inserted");
        store
            .insert_payment(obligation("pay-000001", "hst-gone", date(2025, 3, 1)))
            .expect("obligation inserted");
        store
            .insert_payment(obligation("pay-000002", "hst-0002", date(2025, 3, 1)))
            .expect("obligation inserted");

        let outcome = calculator.run(date(2025, 3, 10)).expect("sweep runs");
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.fees_applied, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].payment, PaymentId("pay-000001".to_string()));
    }

    /// Delegates to a real store but fails `hostel` lookups while the switch
    /// is on, standing in for a backend outage mid-sweep.
    struct OutageOccupancy {
        inner: Arc<MemoryStore>,
        hostel_lookups_fail: std::sync::atomic::AtomicBool,
    }

    impl OutageOccupancy {
        fn new(inner: Arc<MemoryStore>) -> Self {
            Self {
                inner,
                hostel_lookups_fail: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn set_failing(&self, failing: bool) {
            self.hostel_lookups_fail
                .store(failing, std::sync::atomic::Ordering::SeqCst);
        }
    }

    impl crate::occupancy::store::OccupancyStore for OutageOccupancy {
        fn insert_hostel(&self, hostel: Hostel) -> Result<(), StoreError> {
            self.inner.insert_hostel(hostel)
        }

        fn hostel(&self, id: &HostelId) -> Result<Option<Hostel>, StoreError> {
            if self.hostel_lookups_fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(StoreError::Unavailable("backend offline".to_string()));
            }
            self.inner.hostel(id)
        }

        fn update_hostel(&self, hostel: Hostel) -> Result<(), StoreError> {
            self.inner.update_hostel(hostel)
        }

        fn insert_floor(&self, floor: crate::occupancy::domain::Floor) -> Result<(), StoreError> {
            self.inner.insert_floor(floor)
        }

        fn floor(
            &self,
            id: &crate::occupancy::domain::FloorId,
        ) -> Result<Option<crate::occupancy::domain::Floor>, StoreError> {
            self.inner.floor(id)
        }

        fn update_floor(&self, floor: crate::occupancy::domain::Floor) -> Result<(), StoreError> {
            self.inner.update_floor(floor)
        }

        fn insert_room(&self, room: crate::occupancy::domain::Room) -> Result<(), StoreError> {
            self.inner.insert_room(room)
        }

        fn room(
            &self,
            id: &crate::occupancy::domain::RoomId,
        ) -> Result<Option<crate::occupancy::domain::Room>, StoreError> {
            self.inner.room(id)
        }

        fn update_room(&self, room: crate::occupancy::domain::Room) -> Result<(), StoreError> {
            self.inner.update_room(room)
        }

        fn insert_bed(&self, bed: crate::occupancy::domain::Bed) -> Result<(), StoreError> {
            self.inner.insert_bed(bed)
        }

        fn bed(
            &self,
            id: &crate::occupancy::domain::BedId,
        ) -> Result<Option<crate::occupancy::domain::Bed>, StoreError> {
            self.inner.bed(id)
        }

        fn update_bed(&self, bed: crate::occupancy::domain::Bed) -> Result<(), StoreError> {
            self.inner.update_bed(bed)
        }

        fn beds_in_hostel(
            &self,
            hostel: &HostelId,
        ) -> Result<Vec<crate::occupancy::domain::Bed>, StoreError> {
            self.inner.beds_in_hostel(hostel)
        }

        fn free_beds_ordered(
            &self,
            hostel: &HostelId,
            filter: &crate::occupancy::domain::BedFilter,
        ) -> Result<Vec<crate::occupancy::domain::Bed>, StoreError> {
            self.inner.free_beds_ordered(hostel, filter)
        }

        fn claim_bed_if_free(
            &self,
            bed: &crate::occupancy::domain::BedId,
            occupant: &ResidentId,
            booking: &BookingId,
            now: chrono::DateTime<chrono::Utc>,
        ) -> Result<bool, StoreError> {
            self.inner.claim_bed_if_free(bed, occupant, booking, now)
        }

        fn release_bed(
            &self,
            bed: &crate::occupancy::domain::BedId,
            now: chrono::DateTime<chrono::Utc>,
        ) -> Result<crate::occupancy::domain::Bed, StoreError> {
            self.inner.release_bed(bed, now)
        }
    }

    #[test]
    fn store_outage_is_reported_per_record_without_caching() {
        let store = Arc::new(MemoryStore::default());
        let occupancy = Arc::new(OutageOccupancy::new(store.clone()));
        let calculator = LateFeeCalculator::new(
            store.clone(),
            occupancy.clone(),
            Arc::new(RecordingNotifier::default()),
        );
        store
            .insert_hostel(hostel("hst-0001", LateFeeCharge::Fixed(250), 3))
            .expect("hostel inserted");
        store
            .insert_payment(obligation("pay-000001", "hst-0001", date(2025, 3, 1)))
            .expect("obligation inserted");
        store
            .insert_payment(obligation("pay-000002", "hst-0001", date(2025, 3, 2)))
            .expect("obligation inserted");

        occupancy.set_failing(true);
        let outage = calculator.run(date(2025, 3, 10)).expect("sweep runs");
        assert_eq!(outage.fees_applied, 0);
        assert_eq!(outage.skipped, 2);
        assert_eq!(outage.errors.len(), 2);
        for error in &outage.errors {
            assert!(
                error.reason.contains("backend offline"),
                "outage must not be reported as a missing policy: {}",
                error.reason
            );
        }

        // The failure was not cached as an absent policy: once the store
        // recovers, the same records get their fee.
        occupancy.set_failing(false);
        let recovered = calculator.run(date(2025, 3, 10)).expect("sweep runs");
        assert_eq!(recovered.fees_applied, 2);
        assert_eq!(recovered.errors.len(), 0);
    }

    #[test]
    fn percentage_fee_uses_obligation_amount() {
        let (calculator, store, _notifier) = calculator();
        store
            .insert_hostel(hostel("hst-0001", LateFeeCharge::Percentage(10.0), 0))
            .expect("hostel inserted");
        store
            .insert_payment(obligation("pay-000001", "hst-0001", date(2025, 3, 1)))
            .expect("obligation inserted");

        calculator.run(date(2025, 3, 5)).expect("sweep runs");

        let stored = store
            .payment(&PaymentId("pay-000001".to_string()))
            .expect("fetch works")
            .expect("obligation exists");
        assert_eq!(stored.late_fee, 500);
    }
}
