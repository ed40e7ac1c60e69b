use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use hostel_ops::billing::PaymentStore;
use hostel_ops::booking::{booking_router, BookingService, BookingStore};
use hostel_ops::notify::NotificationPublisher;
use hostel_ops::occupancy::{BedFilter, HostelId, OccupancyStore};

pub(crate) fn with_booking_routes<O, B, P, N>(
    service: Arc<BookingService<O, B, P, N>>,
) -> axum::Router
where
    O: OccupancyStore + 'static,
    B: BookingStore + 'static,
    P: PaymentStore + 'static,
    N: NotificationPublisher + 'static,
{
    booking_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/hostels/:hostel_id/occupancy",
            axum::routing::get(occupancy_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Live counter snapshot for one facility plus the ordered free-bed queue the
/// next automatic claim would walk.
pub(crate) async fn occupancy_endpoint(
    Extension(state): Extension<AppState>,
    Path(hostel_id): Path<String>,
) -> impl IntoResponse {
    let hostel_id = HostelId(hostel_id);
    let hostel = match state.store.hostel(&hostel_id) {
        Ok(Some(hostel)) => hostel,
        Ok(None) => {
            let payload = json!({ "error": format!("hostel {} not found", hostel_id) });
            return (StatusCode::NOT_FOUND, Json(payload));
        }
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(payload));
        }
    };

    let free = match state
        .store
        .free_beds_ordered(&hostel_id, &BedFilter::default())
    {
        Ok(beds) => beds,
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(payload));
        }
    };
    let free_labels: Vec<String> = free.into_iter().map(|bed| bed.label).collect();

    let payload = json!({
        "hostel_id": hostel.id.0,
        "name": hostel.name,
        "total_beds": hostel.beds.total_beds,
        "occupied_beds": hostel.beds.occupied_beds,
        "available_beds": hostel.beds.available_beds,
        "free_beds": free_labels,
    });
    (StatusCode::OK, Json(payload))
}
