//! End-to-end specifications for the occupancy and booking lifecycle.
//!
//! Scenarios run the whole pipeline through the public service facades over a
//! shared in-memory store: provision a facility, book and confirm a stay,
//! collect rent, sweep late fees, move the resident, and settle the checkout.

mod common {
    use std::sync::{Arc, Mutex};

    use chrono::{NaiveDate, TimeZone, Utc};

    use hostel_ops::billing::RegenerationPolicy;
    use hostel_ops::booking::{BookingService, StayRequest};
    use hostel_ops::checkout::CheckoutService;
    use hostel_ops::notify::{Notification, NotificationPublisher, NotifyError};
    use hostel_ops::occupancy::provisioning::FacilitySpec;
    use hostel_ops::occupancy::{
        provision, FacilityLayout, Hostel, LateFeeCharge, LateFeePolicy, OwnerId, PricingSnapshot,
        ResidentId,
    };
    use hostel_ops::store::MemoryStore;
    use hostel_ops::transfer::TransferService;

    pub(super) type Bookings =
        BookingService<MemoryStore, MemoryStore, MemoryStore, RecordingNotifier>;
    pub(super) type Checkouts =
        CheckoutService<MemoryStore, MemoryStore, MemoryStore, MemoryStore, RecordingNotifier>;
    pub(super) type Transfers =
        TransferService<MemoryStore, MemoryStore, MemoryStore, RecordingNotifier>;

    #[derive(Default, Clone)]
    pub(super) struct RecordingNotifier {
        events: Arc<Mutex<Vec<Notification>>>,
    }

    impl RecordingNotifier {
        pub(super) fn events(&self) -> Vec<Notification> {
            self.events.lock().expect("notifier mutex poisoned").clone()
        }
    }

    impl NotificationPublisher for RecordingNotifier {
        fn publish(&self, notification: Notification) -> Result<(), NotifyError> {
            self.events
                .lock()
                .expect("notifier mutex poisoned")
                .push(notification);
            Ok(())
        }
    }

    pub(super) struct Harness {
        pub(super) store: Arc<MemoryStore>,
        pub(super) notifier: Arc<RecordingNotifier>,
        pub(super) bookings: Bookings,
        pub(super) checkouts: Checkouts,
        pub(super) transfers: Transfers,
        pub(super) hostel: Hostel,
    }

    pub(super) fn harness(floors: u32, rooms_per_floor: u32, beds_per_room: u32) -> Harness {
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
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

        let bookings = BookingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            notifier.clone(),
            3,
            RegenerationPolicy::PreservePaid,
        );
        let checkouts = CheckoutService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            notifier.clone(),
            3,
        );
        let transfers = TransferService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            notifier.clone(),
            3,
        );

        Harness {
            store,
            notifier,
            bookings,
            checkouts,
            transfers,
            hostel,
        }
    }

    pub(super) fn resident(n: u32) -> ResidentId {
        ResidentId(format!("res-{n:03}"))
    }

    pub(super) fn stay(check_in: NaiveDate, check_out: NaiveDate) -> StayRequest {
        StayRequest {
            check_in,
            check_out,
            room_preference: None,
            floor_preference: None,
        }
    }

    pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    pub(super) fn at(year: i32, month: u32, day: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }
}

use common::*;

use hostel_ops::billing::{PaymentStatus, PaymentStore, PaymentType};
use hostel_ops::billing::latefee::LateFeeCalculator;
use hostel_ops::booking::{BookingStatus, PaymentCallback};
use hostel_ops::checkout::CheckoutStatus;
use hostel_ops::notify::NotificationKind;
use hostel_ops::occupancy::{BedId, OccupancyStore};
use hostel_ops::transfer::{TransferError, TransferStatus};

fn advance(amount: i64) -> PaymentCallback {
    PaymentCallback {
        payment_type: PaymentType::Advance,
        amount_paid: amount,
        success: true,
        period: None,
    }
}

#[test]
fn stay_from_request_to_settled_checkout() {
    let h = harness(2, 2, 2);

    let booking = h
        .bookings
        .create(
            resident(1),
            h.hostel.id.clone(),
            stay(date(2026, 1, 31), date(2026, 4, 30)),
        )
        .expect("booking created");
    h.bookings.approve(&booking.id).expect("booking approved");
    let confirmed = h
        .bookings
        .record_payment(&booking.id, advance(2000), at(2026, 1, 31))
        .expect("advance confirms booking");
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    let bed = confirmed.allocated_bed.clone().expect("bed allocated");

    // Jan 31 anchor clamps to short months: Jan 31, Feb 28, Mar 31, Apr 30.
    let series = h.store.monthly_for_booking(&booking.id).expect("series");
    let due_dates: Vec<_> = series.iter().filter_map(|p| p.due_date).collect();
    assert_eq!(
        due_dates,
        vec![
            date(2026, 1, 31),
            date(2026, 2, 28),
            date(2026, 3, 31),
            date(2026, 4, 30),
        ]
    );

    // January rent arrives on time; February slips past the grace window.
    h.bookings
        .record_payment(
            &booking.id,
            PaymentCallback {
                payment_type: PaymentType::Monthly,
                amount_paid: 5300,
                success: true,
                period: None,
            },
            at(2026, 1, 31),
        )
        .expect("january settled");

    let sweep = LateFeeCalculator::new(h.store.clone(), h.store.clone(), h.notifier.clone())
        .run(date(2026, 3, 10))
        .expect("sweep runs");
    assert_eq!(sweep.fees_applied, 1);

    let series = h.store.monthly_for_booking(&booking.id).expect("series");
    let february = series
        .iter()
        .find(|p| p.due_date == Some(date(2026, 2, 28)))
        .expect("february present");
    assert!(february.late_fee_applied);
    assert_eq!(february.late_fee, 250);
    // The fee rides alongside the obligation; the base amount is untouched.
    assert_eq!(february.amount, 5300);

    // Move the resident one bed over before checkout.
    let destination = BedId(format!("{}-r102-b1", h.hostel.id.0));
    let transfer = h
        .transfers
        .request(&booking.id, &destination, Some("window side".to_string()))
        .expect("transfer requested");
    h.transfers.approve(&transfer.id).expect("transfer approved");
    let moved = h
        .transfers
        .complete(&transfer.id, at(2026, 3, 15))
        .expect("transfer completed");
    assert_eq!(moved.status, TransferStatus::Completed);

    let old_bed = h.store.bed(&bed).expect("read").expect("exists");
    assert!(!old_bed.is_occupied);
    let new_bed = h.store.bed(&destination).expect("read").expect("exists");
    assert!(new_bed.is_occupied);

    // Checkout at the end of April settles everything still unpaid.
    let checkout = h
        .checkouts
        .request(&booking.id, date(2026, 4, 30))
        .expect("checkout requested");
    h.checkouts.approve(&checkout.id).expect("checkout approved");
    let settled = h
        .checkouts
        .complete(&checkout.id, 0, at(2026, 4, 30))
        .expect("checkout completed");
    assert_eq!(settled.status, CheckoutStatus::Completed);

    let bill = settled.final_bill.expect("bill computed");
    // Feb (with fee), Mar, Apr rents remain open: 3 * 5000 rent + 3 * 300
    // utilities + 250 late fee, against the 3000 deposit.
    assert_eq!(bill.rent_due, 15_000);
    assert_eq!(bill.utilities_due, 900);
    assert_eq!(bill.late_fees, 250);
    assert_eq!(bill.security_refund, 3000);
    assert_eq!(bill.net_amount, bill.total_due - 3000);

    let completed = h.bookings.get(&booking.id).expect("booking readable");
    assert_eq!(completed.status, BookingStatus::Completed);
    assert!(completed.allocated_bed.is_none());
    assert!(completed.actual_check_out.is_some());

    let hostel = h
        .store
        .hostel(&h.hostel.id)
        .expect("read")
        .expect("exists");
    assert_eq!(hostel.beds.occupied_beds, 0);
    assert_eq!(hostel.beds.available_beds, 8);

    let kinds: Vec<NotificationKind> = h.notifier.events().into_iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&NotificationKind::PaymentReceived));
    assert!(kinds.contains(&NotificationKind::PaymentDue));
    assert!(kinds.contains(&NotificationKind::TransferCompleted));
    assert!(kinds.contains(&NotificationKind::CheckoutCompleted));
}

#[test]
fn transfer_completion_rejects_a_booking_that_checked_out_meanwhile() {
    let h = harness(1, 2, 1);

    let booking = h
        .bookings
        .create(
            resident(1),
            h.hostel.id.clone(),
            stay(date(2026, 2, 1), date(2026, 5, 1)),
        )
        .expect("booking created");
    h.bookings.approve(&booking.id).expect("booking approved");
    h.bookings
        .record_payment(&booking.id, advance(2000), at(2026, 2, 1))
        .expect("advance confirms booking");

    let destination = BedId(format!("{}-r102-b1", h.hostel.id.0));
    let transfer = h
        .transfers
        .request(&booking.id, &destination, None)
        .expect("transfer requested");
    h.transfers.approve(&transfer.id).expect("transfer approved");

    // The resident checks out while the approved transfer sits idle.
    let checkout = h
        .checkouts
        .request(&booking.id, date(2026, 3, 1))
        .expect("checkout requested");
    h.checkouts.approve(&checkout.id).expect("checkout approved");
    h.checkouts
        .complete(&checkout.id, 0, at(2026, 3, 1))
        .expect("checkout completed");

    let result = h.transfers.complete(&transfer.id, at(2026, 3, 2));
    assert!(matches!(result, Err(TransferError::StaleTransfer(_))));

    // Nothing moved: the destination stays free and the facility stays empty.
    let dest = h.store.bed(&destination).expect("read").expect("exists");
    assert!(!dest.is_occupied);
    assert!(dest.occupant.is_none());
    let hostel = h
        .store
        .hostel(&h.hostel.id)
        .expect("read")
        .expect("exists");
    assert_eq!(hostel.beds.occupied_beds, 0);

    // The transfer is left approved, so the owner can still cancel it.
    let stale = h.transfers.get(&transfer.id).expect("transfer readable");
    assert_eq!(stale.status, TransferStatus::Approved);
    h.transfers.cancel(&transfer.id).expect("stale transfer cancels");
}

#[test]
fn regeneration_preserves_paid_history_after_a_transfer() {
    let h = harness(1, 2, 1);

    let booking = h
        .bookings
        .create(
            resident(1),
            h.hostel.id.clone(),
            stay(date(2026, 2, 1), date(2026, 5, 1)),
        )
        .expect("booking created");
    h.bookings.approve(&booking.id).expect("booking approved");
    h.bookings
        .record_payment(&booking.id, advance(2000), at(2026, 2, 1))
        .expect("advance confirms booking");
    h.bookings
        .record_payment(
            &booking.id,
            PaymentCallback {
                payment_type: PaymentType::Monthly,
                amount_paid: 5300,
                success: true,
                period: None,
            },
            at(2026, 2, 2),
        )
        .expect("february settled");

    let refreshed = h.bookings.get(&booking.id).expect("booking readable");
    let hostel = h
        .store
        .hostel(&h.hostel.id)
        .expect("read")
        .expect("exists");
    let summary = h
        .bookings
        .billing()
        .generate_series(&refreshed, &hostel.pricing)
        .expect("series regenerates");

    assert_eq!(summary.preserved, 1);
    assert_eq!(summary.removed, 3);
    assert_eq!(summary.generated, 3);

    let series = h.store.monthly_for_booking(&booking.id).expect("series");
    assert_eq!(series.len(), 4);
    assert_eq!(series[0].status, PaymentStatus::Completed);
}
