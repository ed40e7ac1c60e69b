use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{BookingId, StayRequest};
use super::service::{BookingError, BookingService, PaymentCallback};
use crate::billing::store::PaymentStore;
use crate::booking::store::BookingStore;
use crate::notify::NotificationPublisher;
use crate::occupancy::domain::{HostelId, ResidentId};
use crate::occupancy::store::OccupancyStore;

/// Request payload for booking intake.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingSubmission {
    pub resident_id: String,
    pub hostel_id: String,
    #[serde(flatten)]
    pub request: StayRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectionPayload {
    pub reason: String,
}

/// Router builder exposing HTTP endpoints for the booking lifecycle.
pub fn booking_router<O, B, P, N>(service: Arc<BookingService<O, B, P, N>>) -> Router
where
    O: OccupancyStore + 'static,
    B: BookingStore + 'static,
    P: PaymentStore + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/bookings", post(submit_handler::<O, B, P, N>))
        .route(
            "/api/v1/bookings/:booking_id",
            get(status_handler::<O, B, P, N>),
        )
        .route(
            "/api/v1/bookings/:booking_id/approve",
            post(approve_handler::<O, B, P, N>),
        )
        .route(
            "/api/v1/bookings/:booking_id/reject",
            post(reject_handler::<O, B, P, N>),
        )
        .route(
            "/api/v1/bookings/:booking_id/cancel",
            post(cancel_handler::<O, B, P, N>),
        )
        .route(
            "/api/v1/bookings/:booking_id/payments",
            post(payment_handler::<O, B, P, N>),
        )
        .route(
            "/api/v1/bookings/:booking_id/allocate",
            post(allocate_handler::<O, B, P, N>),
        )
        .with_state(service)
}

fn error_response(error: BookingError) -> Response {
    let status = match &error {
        BookingError::NotFound(_) | BookingError::UnknownHostel(_) => StatusCode::NOT_FOUND,
        BookingError::InvalidTransition { .. } | BookingError::AlreadyProcessed(_) => {
            StatusCode::CONFLICT
        }
        BookingError::NoCapacity(_) | BookingError::DuplicateActiveBooking { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        BookingError::Store(crate::store::StoreError::StaleVersion) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn submit_handler<O, B, P, N>(
    State(service): State<Arc<BookingService<O, B, P, N>>>,
    axum::Json(submission): axum::Json<BookingSubmission>,
) -> Response
where
    O: OccupancyStore + 'static,
    B: BookingStore + 'static,
    P: PaymentStore + 'static,
    N: NotificationPublisher + 'static,
{
    let resident = ResidentId(submission.resident_id);
    let hostel = HostelId(submission.hostel_id);
    match service.create(resident, hostel, submission.request) {
        Ok(booking) => (StatusCode::ACCEPTED, axum::Json(booking.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<O, B, P, N>(
    State(service): State<Arc<BookingService<O, B, P, N>>>,
    Path(booking_id): Path<String>,
) -> Response
where
    O: OccupancyStore + 'static,
    B: BookingStore + 'static,
    P: PaymentStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.get(&BookingId(booking_id)) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_handler<O, B, P, N>(
    State(service): State<Arc<BookingService<O, B, P, N>>>,
    Path(booking_id): Path<String>,
) -> Response
where
    O: OccupancyStore + 'static,
    B: BookingStore + 'static,
    P: PaymentStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.approve(&BookingId(booking_id)) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reject_handler<O, B, P, N>(
    State(service): State<Arc<BookingService<O, B, P, N>>>,
    Path(booking_id): Path<String>,
    axum::Json(payload): axum::Json<RejectionPayload>,
) -> Response
where
    O: OccupancyStore + 'static,
    B: BookingStore + 'static,
    P: PaymentStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.reject(&BookingId(booking_id), payload.reason) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_handler<O, B, P, N>(
    State(service): State<Arc<BookingService<O, B, P, N>>>,
    Path(booking_id): Path<String>,
) -> Response
where
    O: OccupancyStore + 'static,
    B: BookingStore + 'static,
    P: PaymentStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.cancel(&BookingId(booking_id)) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn payment_handler<O, B, P, N>(
    State(service): State<Arc<BookingService<O, B, P, N>>>,
    Path(booking_id): Path<String>,
    axum::Json(callback): axum::Json<PaymentCallback>,
) -> Response
where
    O: OccupancyStore + 'static,
    B: BookingStore + 'static,
    P: PaymentStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.record_payment(&BookingId(booking_id), callback, Utc::now()) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn allocate_handler<O, B, P, N>(
    State(service): State<Arc<BookingService<O, B, P, N>>>,
    Path(booking_id): Path<String>,
) -> Response
where
    O: OccupancyStore + 'static,
    B: BookingStore + 'static,
    P: PaymentStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.allocate_manually(&BookingId(booking_id), Utc::now()) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}
