use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_helpers::{AppError, ErrorCode};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0} not found")]
    NotFound(String),

    /// Event closed, booking already settled, or similar lifecycle violation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Only {available} spot(s) remaining")]
    CapacityExceeded { available: i32 },

    #[error("Payment provider unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Payment declined: {0}")]
    PaymentDenied(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unauthorized access to booking {0}")]
    Unauthorized(Uuid),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

pub type BookingResult<T> = Result<T, BookingError>;

impl BookingError {
    pub fn booking_not_found(id: impl std::fmt::Display) -> Self {
        BookingError::NotFound(format!("Booking {}", id))
    }

    pub fn event_not_found(id: Uuid) -> Self {
        BookingError::NotFound(format!("Event {}", id))
    }
}

impl From<DbErr> for BookingError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                BookingError::Conflict(format!("Duplicate booking: {}", detail))
            }
            _ => BookingError::Persistence(format!("Database error: {}", err)),
        }
    }
}

impl From<GatewayError> for BookingError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(msg) => BookingError::GatewayUnavailable(msg),
            GatewayError::Rejected(msg) => BookingError::PaymentDenied(msg),
        }
    }
}

impl From<validator::ValidationErrors> for BookingError {
    fn from(err: validator::ValidationErrors) -> Self {
        BookingError::Validation(err.to_string())
    }
}

/// Convert BookingError to AppError for standardized error responses
impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            BookingError::InvalidState(msg) => {
                AppError::coded(StatusCode::BAD_REQUEST, ErrorCode::InvalidState, msg)
            }
            BookingError::Conflict(msg) => {
                AppError::coded(StatusCode::BAD_REQUEST, ErrorCode::DuplicateBooking, msg)
            }
            err @ BookingError::CapacityExceeded { available } => AppError::coded(
                StatusCode::BAD_REQUEST,
                ErrorCode::CapacityExceeded,
                err.to_string(),
            )
            .with_details(serde_json::json!({ "available": available })),
            BookingError::GatewayUnavailable(msg) => AppError::coded(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::GatewayUnavailable,
                msg,
            ),
            BookingError::PaymentDenied(msg) => AppError::coded(
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::PaymentDenied,
                msg,
            ),
            BookingError::Validation(msg) => AppError::BadRequest(msg),
            BookingError::Unauthorized(id) => {
                AppError::Forbidden(format!("Access denied to booking {}", id))
            }
            BookingError::Persistence(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: BookingError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(BookingError::booking_not_found("bk_1")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(BookingError::CapacityExceeded { available: 2 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(BookingError::Conflict("dup".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(BookingError::Unauthorized(Uuid::nil())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(BookingError::GatewayUnavailable("timeout".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(BookingError::PaymentDenied("declined".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(BookingError::Persistence("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_capacity_message_names_remaining_spots() {
        let err = BookingError::CapacityExceeded { available: 3 };
        assert_eq!(err.to_string(), "Only 3 spot(s) remaining");
    }

    #[test]
    fn test_gateway_errors_convert() {
        assert!(matches!(
            BookingError::from(GatewayError::Unavailable("down".into())),
            BookingError::GatewayUnavailable(_)
        ));
        assert!(matches!(
            BookingError::from(GatewayError::Rejected("bad key".into())),
            BookingError::PaymentDenied(_)
        ));
    }

    #[test]
    fn test_plain_db_error_is_persistence() {
        let err = BookingError::from(DbErr::Custom("connection reset".into()));
        assert!(matches!(err, BookingError::Persistence(_)));
    }
}
