//! Bookings Domain
//!
//! Capacity-limited event booking with asynchronous payment reconciliation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, gateway callback
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Booking lifecycle state machine
//! └──────┬──────┘
//!        │
//! ┌──────▼──────────────────────────────────────────┐
//! │ Repository │ Ledger + Catalog │ Gateway │ Notifier │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! The per-event `registered_count` is the only shared counter. Both stores
//! update it with a single increment-with-ceiling so concurrent confirmations
//! can never push it past capacity. Booking status changes are
//! compare-and-swap writes, which makes repeated or concurrent payment
//! callbacks safe to apply.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_bookings::{
//!     BookingService, BookingSettings, InMemoryBookingRepository, InMemoryEventStore,
//!     MockPaymentGateway, NoopNotifier,
//! };
//!
//! let events = Arc::new(InMemoryEventStore::new());
//! let service = BookingService::new(
//!     Arc::new(InMemoryBookingRepository::new()),
//!     events.clone(),
//!     events,
//!     Arc::new(MockPaymentGateway::new()),
//!     Arc::new(NoopNotifier),
//!     BookingSettings::default(),
//! );
//! ```

pub mod catalog;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod notifier;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod store;

pub use catalog::EventCatalog;
pub use error::{BookingError, BookingResult};
pub use gateway::{
    Checkout, GatewayConfig, GatewayError, HttpPaymentGateway, InitializePayment,
    MockPaymentGateway, PaymentGateway, Verification,
};
pub use handlers::{ApiDoc, CallbackAck};
pub use ledger::{Admission, CapacityLedger};
pub use models::{
    Availability, Booking, BookingFilter, BookingOutcome, BookingStatus, CallbackPayload,
    CreateBooking, CreateEvent, Event, EventStatus, NewBooking, Payer, PaymentInfo,
    PaymentProvider, PaymentStatus, ReconcileOutcome, Resolution, Transition, VerifyResponse,
};
pub use notifier::{BookingNotifier, EmailNotifier, NoopNotifier};
pub use postgres::{PgBookingRepository, PgEventStore};
pub use repository::{BookingRepository, InMemoryBookingRepository};
pub use service::{BookingService, BookingSettings};
pub use store::InMemoryEventStore;
