use crate::infra::{demo_facility_spec, parse_date, LogNotifier};
use chrono::{Local, NaiveDate, TimeZone, Utc};
use clap::Args;
use std::sync::Arc;

use hostel_ops::billing::latefee::LateFeeCalculator;
use hostel_ops::billing::{PaymentStore, PaymentType, RegenerationPolicy};
use hostel_ops::booking::{BookingService, PaymentCallback, StayRequest};
use hostel_ops::checkout::CheckoutService;
use hostel_ops::error::AppError;
use hostel_ops::occupancy::{provision, FacilityLayout, OccupancyStore, ResidentId};
use hostel_ops::store::{MemoryStore, StoreError};
use hostel_ops::transfer::TransferService;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Check-in date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) check_in: Option<NaiveDate>,
    /// Check-out date (YYYY-MM-DD). Defaults to check_in + 3 months.
    #[arg(long, value_parser = parse_date)]
    pub(crate) check_out: Option<NaiveDate>,
    /// Date for the late-fee sweep portion. Defaults to check_in + 40 days.
    #[arg(long, value_parser = parse_date)]
    pub(crate) sweep_on: Option<NaiveDate>,
    /// Skip the transfer portion of the demo.
    #[arg(long)]
    pub(crate) skip_transfer: bool,
}

fn noon(date: NaiveDate) -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap_or_default())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let check_in = args.check_in.unwrap_or_else(|| Local::now().date_naive());
    let check_out = check_in
        .checked_add_months(chrono::Months::new(3))
        .unwrap_or(check_in);
    let check_out = args.check_out.unwrap_or(check_out);
    let sweep_on = args
        .sweep_on
        .unwrap_or(check_in + chrono::Duration::days(40));

    println!("Hostel operations demo");

    let store = Arc::new(MemoryStore::default());
    let hostel = provision(
        store.as_ref(),
        demo_facility_spec(FacilityLayout {
            floors: 2,
            rooms_per_floor: 2,
            beds_per_room: 2,
        }),
    )?;
    println!(
        "- provisioned {} '{}': {} beds across {} floors",
        hostel.id, hostel.name, hostel.beds.total_beds, hostel.layout.floors
    );

    let bookings = BookingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(LogNotifier),
        5,
        RegenerationPolicy::PreservePaid,
    );

    let booking = bookings.create(
        ResidentId("res-001".to_string()),
        hostel.id.clone(),
        StayRequest {
            check_in,
            check_out,
            room_preference: None,
            floor_preference: None,
        },
    )?;
    println!("- booking {} created ({})", booking.id, booking.status.label());

    let approved = bookings.approve(&booking.id)?;
    println!(
        "- booking approved, advance due: {}",
        approved.advance.amount
    );

    let confirmed = bookings.record_payment(
        &booking.id,
        PaymentCallback {
            payment_type: PaymentType::Advance,
            amount_paid: approved.advance.amount,
            success: true,
            period: None,
        },
        noon(check_in),
    )?;
    let bed = confirmed
        .allocated_bed
        .clone()
        .ok_or(AppError::Store(StoreError::NotFound))?;
    println!("- advance paid, bed {} allocated", bed);

    println!("Billing series:");
    let series = store.monthly_for_booking(&booking.id)?;
    for obligation in &series {
        println!(
            "  - {} due {}: {}",
            obligation
                .period
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            obligation
                .due_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            obligation.amount
        );
    }

    let sweep = LateFeeCalculator::new(store.clone(), store.clone(), Arc::new(LogNotifier))
        .run(sweep_on)?;
    println!(
        "Late-fee sweep on {sweep_on}: {} examined, {} fees applied, {} within grace",
        sweep.examined, sweep.fees_applied, sweep.within_grace
    );

    if !args.skip_transfer {
        let transfers = TransferService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(LogNotifier),
            5,
        );
        let destination = store
            .free_beds_ordered(&hostel.id, &Default::default())?
            .into_iter()
            .next()
            .ok_or(AppError::Store(StoreError::NotFound))?;
        let transfer = transfers.request(&booking.id, &destination.id, Some("demo move".to_string()))?;
        transfers.approve(&transfer.id)?;
        transfers.complete(&transfer.id, noon(sweep_on))?;
        println!("- transferred to bed {}", destination.label);
    }

    let checkouts = CheckoutService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(LogNotifier),
        5,
    );
    let checkout = checkouts.request(&booking.id, check_out)?;
    checkouts.approve(&checkout.id)?;
    let settled = checkouts.complete(&checkout.id, 0, noon(check_out))?;

    if let Some(bill) = settled.final_bill {
        println!("Final settlement:");
        println!("  - rent due:        {}", bill.rent_due);
        println!("  - utilities due:   {}", bill.utilities_due);
        println!("  - late fees:       {}", bill.late_fees);
        println!("  - damage cost:     {}", bill.damage_cost);
        println!("  - total due:       {}", bill.total_due);
        println!("  - security refund: {}", bill.security_refund);
        println!("  - net amount:      {}", bill.net_amount);
    }

    let snapshot = store
        .hostel(&hostel.id)?
        .ok_or(AppError::Store(StoreError::NotFound))?;
    println!(
        "Facility after checkout: {}/{} beds occupied",
        snapshot.beds.occupied_beds, snapshot.beds.total_beds
    );

    Ok(())
}
