use crate::cli::ServeArgs;
use crate::infra::{seed_demo_facility, AppState, LogNotifier};
use crate::routes::with_booking_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use hostel_ops::billing::latefee::LateFeeCalculator;
use hostel_ops::billing::{BillingScheduler, RegenerationPolicy};
use hostel_ops::booking::BookingService;
use hostel_ops::config::AppConfig;
use hostel_ops::error::AppError;
use hostel_ops::store::MemoryStore;
use hostel_ops::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(config.environment, &config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let store = Arc::new(MemoryStore::default());
    let hostel = seed_demo_facility(store.as_ref())?;
    info!(hostel = %hostel.id, beds = hostel.beds.total_beds, "demo facility seeded");

    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        store: store.clone(),
    };

    let booking_service = Arc::new(BookingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(LogNotifier),
        config.engine.claim_retries,
        config.engine.regeneration,
    ));

    spawn_late_fee_sweep(store.clone(), config.engine.late_fee_sweep_secs);
    spawn_billing_cycle(
        store.clone(),
        config.engine.regeneration,
        config.engine.billing_cycle_secs,
    );

    let app = with_booking_routes(booking_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "hostel operations engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodic late-fee sweep over every overdue monthly obligation. The sweep
/// is idempotent per obligation, so overlapping intervals are harmless.
fn spawn_late_fee_sweep(store: Arc<MemoryStore>, interval_secs: u64) {
    if interval_secs == 0 {
        info!("late-fee sweep disabled");
        return;
    }

    tokio::spawn(async move {
        let calculator = LateFeeCalculator::new(store.clone(), store, Arc::new(LogNotifier));
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let today = chrono::Local::now().date_naive();
            match calculator.run(today) {
                Ok(outcome) => {
                    if outcome.examined > 0 {
                        info!(
                            examined = outcome.examined,
                            fees_applied = outcome.fees_applied,
                            within_grace = outcome.within_grace,
                            skipped = outcome.skipped,
                            "late-fee sweep finished"
                        );
                    }
                }
                Err(err) => error!(error = %err, "late-fee sweep failed"),
            }
        }
    });
}

/// Periodic billing-cycle pass: any confirmed, checked-in booking without an
/// obligation series gets one. Existing series are left alone.
fn spawn_billing_cycle(
    store: Arc<MemoryStore>,
    regeneration: RegenerationPolicy,
    interval_secs: u64,
) {
    if interval_secs == 0 {
        info!("billing cycle pass disabled");
        return;
    }

    tokio::spawn(async move {
        let scheduler = BillingScheduler::new(store.clone(), regeneration);
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match scheduler.run_cycle(store.as_ref(), store.as_ref()) {
                Ok(outcome) => {
                    if outcome.series_created > 0 || !outcome.errors.is_empty() {
                        info!(
                            examined = outcome.examined,
                            series_created = outcome.series_created,
                            errors = outcome.errors.len(),
                            "billing cycle pass finished"
                        );
                    }
                }
                Err(err) => error!(error = %err, "billing cycle pass failed"),
            }
        }
    });
}
