//! Application state management.
//!
//! Holds the configuration, the database pool and the booking orchestrator
//! wired with its production collaborators.

use domain_bookings::BookingService;

/// Shared application state.
///
/// Cloned into routers; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// PostgreSQL database connection pool
    pub db: database::postgres::DatabaseConnection,
    pub bookings: BookingService,
    pub jwt_auth: axum_helpers::JwtAuth,
}
