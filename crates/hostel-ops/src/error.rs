use crate::booking::service::BookingError;
use crate::checkout::settlement::CheckoutError;
use crate::config::ConfigError;
use crate::occupancy::provisioning::ProvisionError;
use crate::store::StoreError;
use crate::telemetry::TelemetryError;
use crate::transfer::service::TransferError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Provision(ProvisionError),
    Booking(BookingError),
    Transfer(TransferError),
    Checkout(CheckoutError),
    Store(StoreError),
    Io(std::io::Error),
    Server(axum::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Provision(err) => write!(f, "provisioning error: {}", err),
            AppError::Booking(err) => write!(f, "booking error: {}", err),
            AppError::Transfer(err) => write!(f, "transfer error: {}", err),
            AppError::Checkout(err) => write!(f, "checkout error: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Provision(err) => Some(err),
            AppError::Booking(err) => Some(err),
            AppError::Transfer(err) => Some(err),
            AppError::Checkout(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<ProvisionError> for AppError {
    fn from(value: ProvisionError) -> Self {
        Self::Provision(value)
    }
}

impl From<BookingError> for AppError {
    fn from(value: BookingError) -> Self {
        Self::Booking(value)
    }
}

impl From<TransferError> for AppError {
    fn from(value: TransferError) -> Self {
        Self::Transfer(value)
    }
}

impl From<CheckoutError> for AppError {
    fn from(value: CheckoutError) -> Self {
        Self::Checkout(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}
