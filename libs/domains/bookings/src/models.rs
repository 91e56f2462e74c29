use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter, sea_query::StringLen};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Upper bound on tickets in a single booking
pub const MAX_TICKETS_PER_BOOKING: i32 = 10;

/// Reason recorded when a verified payment arrives after the event sold out
pub const SOLD_OUT_REASON: &str = "sold out before payment confirmation; refund required";

/// Event publication status
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventStatus {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Open for registrations until the deadline
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "completed")]
    Completed,
}

/// Booking lifecycle status
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookingStatus {
    /// Waiting for the gateway to report a verified payment
    #[sea_orm(string_value = "pending_payment")]
    PendingPayment,
    /// Capacity committed
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "payment_failed")]
    PaymentFailed,
}

impl BookingStatus {
    /// Active bookings count against the one-per-user-per-event rule.
    pub fn is_active(self) -> bool {
        matches!(self, Self::PendingPayment | Self::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::PendingPayment)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentProvider {
    /// Free booking, no payment step
    #[default]
    #[sea_orm(string_value = "none")]
    None,
    #[sea_orm(string_value = "gateway")]
    Gateway,
}

/// Transaction status as reported by a callback or by verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Success,
    Failed,
    Abandoned,
    Reversed,
    /// Still in flight at the provider
    Pending,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Map a callback event name such as `charge.success`.
    pub fn from_event_name(name: &str) -> Self {
        match name.rsplit('.').next().unwrap_or_default() {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "abandoned" => Self::Abandoned,
            "reversed" => Self::Reversed,
            "pending" => Self::Pending,
            _ => Self::Unknown,
        }
    }
}

/// Event record, referenced by bookings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    /// Maximum number of tickets
    pub capacity: i32,
    /// Whole currency units per ticket; 0 means free
    pub price: i64,
    pub registration_deadline: DateTime<Utc>,
    pub status: EventStatus,
    /// Committed ticket count
    pub registered_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn new(input: CreateEvent) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            organizer_id: input.organizer_id,
            title: input.title,
            capacity: input.capacity,
            price: input.price,
            registration_deadline: input.registration_deadline,
            status: input.status,
            registered_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining(&self) -> i32 {
        (self.capacity - self.registered_count).max(0)
    }

    pub fn is_free(&self) -> bool {
        self.price == 0
    }

    pub fn total_for(&self, quantity: i32) -> i64 {
        self.price * i64::from(quantity)
    }

    /// Why the event cannot take bookings at `now`, if it cannot.
    pub fn registration_closed_reason(&self, now: DateTime<Utc>) -> Option<String> {
        if self.status != EventStatus::Published {
            return Some(format!("Event is not open for registration (status: {})", self.status));
        }
        if now > self.registration_deadline {
            return Some("Registration deadline has passed".to_string());
        }
        None
    }
}

/// Input for seeding an event
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEvent {
    pub organizer_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 1))]
    pub capacity: i32,
    #[validate(range(min = 0))]
    pub price: i64,
    pub registration_deadline: DateTime<Utc>,
    #[serde(default)]
    pub status: EventStatus,
}

/// Payment sub-record of a booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentInfo {
    pub provider: PaymentProvider,
    pub amount: i64,
    pub currency: String,
    /// Idempotency token shared with the gateway
    pub reference: Option<String>,
    /// Gateway transaction id, set once verified
    pub transaction_id: Option<String>,
    pub checkout_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub contact_email: String,
    pub quantity: i32,
    pub total_amount: i64,
    pub status: BookingStatus,
    pub payment: PaymentInfo,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn new(input: NewBooking) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            event_id: input.event_id,
            user_id: input.user_id,
            contact_email: input.contact_email,
            quantity: input.quantity,
            total_amount: input.total_amount,
            status: input.status,
            payment: PaymentInfo {
                provider: input.provider,
                amount: input.total_amount,
                currency: input.currency,
                reference: input.reference,
                transaction_id: None,
                checkout_url: None,
            },
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
            confirmed_at: (input.status == BookingStatus::Confirmed).then_some(now),
        }
    }

    /// Apply a status change in memory, mirroring what the stores persist.
    pub fn apply(&mut self, transition: &Transition) {
        let now = Utc::now();
        self.status = transition.to;
        if let Some(transaction_id) = &transition.transaction_id {
            self.payment.transaction_id = Some(transaction_id.clone());
        }
        if let Some(reason) = &transition.reason {
            self.cancellation_reason = Some(reason.clone());
        } else if transition.to == BookingStatus::Confirmed {
            self.cancellation_reason = None;
        }
        self.confirmed_at = (transition.to == BookingStatus::Confirmed).then_some(now);
        self.updated_at = now;
    }
}

/// Fully-resolved booking insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub contact_email: String,
    pub quantity: i32,
    pub total_amount: i64,
    pub status: BookingStatus,
    pub provider: PaymentProvider,
    pub currency: String,
    pub reference: Option<String>,
}

/// Conditional status change applied by [`crate::BookingRepository::transition`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub to: BookingStatus,
    pub transaction_id: Option<String>,
    pub reason: Option<String>,
}

impl Transition {
    pub fn to(status: BookingStatus) -> Self {
        Self {
            to: status,
            transaction_id: None,
            reason: None,
        }
    }

    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Request body for `POST /events/{id}/book`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBooking {
    #[validate(range(min = 1, max = MAX_TICKETS_PER_BOOKING))]
    #[schema(minimum = 1, maximum = 10, example = 2)]
    pub quantity: i32,
}

/// The authenticated caller placing a booking
#[derive(Debug, Clone)]
pub struct Payer {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingOutcome {
    pub booking: Booking,
    /// Where to send the buyer to pay; absent for free events
    pub checkout_url: Option<String>,
    pub message: String,
}

/// What a reconciliation attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Confirmed,
    PaymentFailed,
    /// Payment verified but the event filled up first
    SoldOut,
    /// Gateway still reports the transaction in flight
    Pending,
    /// Booking was already settled; nothing changed
    AlreadySettled,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconcileOutcome {
    pub booking: Booking,
    pub resolution: Resolution,
}

impl ReconcileOutcome {
    pub fn message(&self) -> String {
        match self.resolution {
            Resolution::Confirmed => "Payment verified; booking confirmed".to_string(),
            Resolution::PaymentFailed => "Payment was not successful".to_string(),
            Resolution::SoldOut => {
                "Event sold out before payment was confirmed; a refund is required".to_string()
            }
            Resolution::Pending => "Payment is still being processed".to_string(),
            Resolution::AlreadySettled => format!("Booking is already {}", self.booking.status),
        }
    }
}

/// Response body for manual verification
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    pub booking: Booking,
    pub resolution: Resolution,
    pub message: String,
}

impl From<ReconcileOutcome> for VerifyResponse {
    fn from(outcome: ReconcileOutcome) -> Self {
        let message = outcome.message();
        Self {
            booking: outcome.booking,
            resolution: outcome.resolution,
            message,
        }
    }
}

/// Capacity snapshot for an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Availability {
    pub event_id: Uuid,
    pub capacity: i32,
    pub registered: i32,
    pub remaining: i32,
    pub price: i64,
    pub is_free: bool,
}

impl From<&Event> for Availability {
    fn from(event: &Event) -> Self {
        Self {
            event_id: event.id,
            capacity: event.capacity,
            registered: event.registered_count,
            remaining: event.remaining(),
            price: event.price,
            is_free: event.is_free(),
        }
    }
}

/// Query filters for listing bookings
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for BookingFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Gateway webhook body: `{"event": "charge.success", "data": {"reference": "...", "status": "success"}}`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CallbackPayload {
    #[serde(default)]
    pub event: Option<String>,
    pub data: CallbackData,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CallbackData {
    pub reference: String,
    #[serde(default)]
    pub status: Option<PaymentStatus>,
}

impl CallbackPayload {
    /// `data.status`, falling back to the event name.
    pub fn reported_status(&self) -> PaymentStatus {
        self.data
            .status
            .or_else(|| self.event.as_deref().map(PaymentStatus::from_event_name))
            .unwrap_or(PaymentStatus::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(price: i64, capacity: i32) -> Event {
        Event::new(CreateEvent {
            organizer_id: Uuid::new_v4(),
            title: "RustConf".to_string(),
            capacity,
            price,
            registration_deadline: Utc::now() + Duration::days(7),
            status: EventStatus::Published,
        })
    }

    #[test]
    fn test_booking_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&BookingStatus::PendingPayment).unwrap(),
            "\"pending_payment\""
        );
        assert_eq!(BookingStatus::PaymentFailed.to_string(), "payment_failed");
        assert!(BookingStatus::Confirmed.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
        assert!(!BookingStatus::PendingPayment.is_terminal());
    }

    #[test]
    fn test_event_remaining_and_total() {
        let mut e = event(500, 10);
        e.registered_count = 7;

        assert_eq!(e.remaining(), 3);
        assert_eq!(e.total_for(2), 1000);
        assert!(!e.is_free());
    }

    #[test]
    fn test_registration_closed_reasons() {
        let mut e = event(0, 5);
        assert!(e.registration_closed_reason(Utc::now()).is_none());

        e.registration_deadline = Utc::now() - Duration::minutes(1);
        assert_eq!(
            e.registration_closed_reason(Utc::now()).as_deref(),
            Some("Registration deadline has passed")
        );

        e.status = EventStatus::Draft;
        assert!(e.registration_closed_reason(Utc::now()).unwrap().contains("draft"));
    }

    #[test]
    fn test_new_free_booking_is_confirmed_immediately() {
        let booking = Booking::new(NewBooking {
            event_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            contact_email: "ada@example.com".to_string(),
            quantity: 1,
            total_amount: 0,
            status: BookingStatus::Confirmed,
            provider: PaymentProvider::None,
            currency: "NGN".to_string(),
            reference: None,
        });

        assert!(booking.confirmed_at.is_some());
        assert_eq!(booking.payment.provider, PaymentProvider::None);
    }

    #[test]
    fn test_apply_transition_records_transaction() {
        let mut booking = Booking::new(NewBooking {
            event_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            contact_email: "ada@example.com".to_string(),
            quantity: 2,
            total_amount: 1000,
            status: BookingStatus::PendingPayment,
            provider: PaymentProvider::Gateway,
            currency: "NGN".to_string(),
            reference: Some("bk_1".to_string()),
        });
        assert!(booking.confirmed_at.is_none());

        booking.apply(&Transition::to(BookingStatus::Confirmed).with_transaction_id("4099"));

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment.transaction_id.as_deref(), Some("4099"));
        assert!(booking.confirmed_at.is_some());
    }

    #[test]
    fn test_callback_status_prefers_data_status() {
        let payload: CallbackPayload = serde_json::from_str(
            r#"{"event":"charge.success","data":{"reference":"bk_1","status":"failed"}}"#,
        )
        .unwrap();
        assert_eq!(payload.reported_status(), PaymentStatus::Failed);
    }

    #[test]
    fn test_callback_status_falls_back_to_event_name() {
        let payload: CallbackPayload =
            serde_json::from_str(r#"{"event":"charge.success","data":{"reference":"bk_1"}}"#)
                .unwrap();
        assert_eq!(payload.reported_status(), PaymentStatus::Success);
    }

    #[test]
    fn test_unknown_callback_status_is_not_success() {
        let payload: CallbackPayload = serde_json::from_str(
            r#"{"event":"charge.dispute.create","data":{"reference":"bk_1","status":"disputed"}}"#,
        )
        .unwrap();
        assert_eq!(payload.reported_status(), PaymentStatus::Unknown);
    }

    #[test]
    fn test_status_columns_use_snake_case_values() {
        use sea_orm::ActiveEnum;

        assert_eq!(BookingStatus::PendingPayment.to_value(), "pending_payment");
        assert_eq!(BookingStatus::PaymentFailed.to_value(), "payment_failed");
        assert_eq!(EventStatus::Published.to_value(), "published");
        assert_eq!(
            BookingStatus::try_from_value(&"confirmed".to_string()).unwrap(),
            BookingStatus::Confirmed
        );
    }

    #[test]
    fn test_quantity_is_bounded_by_ticket_limit() {
        let at_limit = CreateBooking {
            quantity: MAX_TICKETS_PER_BOOKING,
        };
        let over_limit = CreateBooking {
            quantity: MAX_TICKETS_PER_BOOKING + 1,
        };

        assert!(at_limit.validate().is_ok());
        assert!(over_limit.validate().is_err());
    }

    #[test]
    fn test_booking_filter_defaults() {
        let filter: BookingFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter.limit, 50);
        assert_eq!(filter.offset, 0);
        assert!(filter.status.is_none());
    }
}
