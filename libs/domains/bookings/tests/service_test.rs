//! Lifecycle tests for the booking orchestrator
//!
//! These run the real service against the in-memory stores, the scriptable
//! gateway and an email notifier backed by the mock provider:
//! - free and paid booking paths
//! - idempotent and concurrent reconciliation
//! - capacity never oversold under contention
//! - gateway outages and notification failures

use chrono::{Duration, Utc};
use domain_bookings::*;
use email::{Mailer, MockEmailProvider, TemplateEngine};
use futures::future::join_all;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use test_utils::TestDataBuilder;
use uuid::Uuid;

struct Harness {
    service: BookingService,
    events: Arc<InMemoryEventStore>,
    bookings: Arc<InMemoryBookingRepository>,
    gateway: MockPaymentGateway,
    emails: MockEmailProvider,
}

fn harness_with(emails: MockEmailProvider) -> Harness {
    let events = Arc::new(InMemoryEventStore::new());
    let bookings = Arc::new(InMemoryBookingRepository::new());
    let gateway = MockPaymentGateway::new();
    let notifier = EmailNotifier::new(Mailer::new(emails.clone(), TemplateEngine::new().unwrap()));

    let service = BookingService::new(
        bookings.clone(),
        events.clone(),
        events.clone(),
        Arc::new(gateway.clone()),
        Arc::new(notifier),
        BookingSettings::default(),
    );

    Harness {
        service,
        events,
        bookings,
        gateway,
        emails,
    }
}

fn harness() -> Harness {
    harness_with(MockEmailProvider::new())
}

async fn seed_event(h: &Harness, capacity: i32, price: i64) -> Event {
    h.events
        .insert_event(CreateEvent {
            organizer_id: Uuid::now_v7(),
            title: "RustConf".to_string(),
            capacity,
            price,
            registration_deadline: Utc::now() + Duration::days(7),
            status: EventStatus::Published,
        })
        .await
        .unwrap()
}

fn payer(builder: &TestDataBuilder, n: u64) -> Payer {
    Payer {
        user_id: builder.other_user_id(n),
        email: builder.email(&format!("user{}", n)),
        name: None,
    }
}

fn reference_of(outcome: &BookingOutcome) -> String {
    outcome.booking.payment.reference.clone().unwrap()
}

async fn registered(h: &Harness, event_id: Uuid) -> i32 {
    let availability = h.service.event_availability(event_id).await.unwrap();
    availability.registered
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn test_free_booking_is_confirmed_immediately() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("free_booking");
    let event = seed_event(&h, 10, 0).await;

    let outcome = h
        .service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 3 })
        .await
        .unwrap();

    assert_eq!(outcome.booking.status, BookingStatus::Confirmed);
    assert_eq!(outcome.booking.payment.provider, PaymentProvider::None);
    assert!(outcome.checkout_url.is_none());
    assert!(outcome.booking.confirmed_at.is_some());
    assert_eq!(registered(&h, event.id).await, 3);
    assert!(h.gateway.initialized().await.is_empty());
    assert_eq!(h.emails.sent_count().await, 1);
}

#[tokio::test]
async fn test_paid_booking_waits_for_payment() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("paid_booking");
    let event = seed_event(&h, 10, 500).await;

    let outcome = h
        .service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 2 })
        .await
        .unwrap();

    assert_eq!(outcome.booking.status, BookingStatus::PendingPayment);
    assert_eq!(outcome.booking.total_amount, 1000);
    assert!(reference_of(&outcome).starts_with("bk_"));
    assert_eq!(
        outcome.checkout_url,
        outcome.booking.payment.checkout_url,
        "checkout URL is stored on the booking"
    );
    assert!(outcome.checkout_url.is_some());

    let initialized = h.gateway.initialized().await;
    assert_eq!(initialized.len(), 1);
    assert_eq!(initialized[0].amount, 1000);
    assert_eq!(initialized[0].currency, "NGN");

    // Deferred reservation: nothing is committed until payment is verified.
    assert_eq!(registered(&h, event.id).await, 0);
}

#[tokio::test]
async fn test_second_active_booking_conflicts() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("duplicate_booking");
    let event = seed_event(&h, 10, 500).await;
    let payer = payer(&builder, 1);

    h.service
        .create_booking(event.id, payer.clone(), CreateBooking { quantity: 1 })
        .await
        .unwrap();

    let result = h
        .service
        .create_booking(event.id, payer, CreateBooking { quantity: 1 })
        .await;
    assert!(matches!(result, Err(BookingError::Conflict(_))));
}

#[tokio::test]
async fn test_deadline_passed_is_invalid_state() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("deadline_passed");
    let event = h
        .events
        .insert_event(CreateEvent {
            organizer_id: Uuid::now_v7(),
            title: "Yesterday".to_string(),
            capacity: 10,
            price: 0,
            registration_deadline: Utc::now() - Duration::hours(1),
            status: EventStatus::Published,
        })
        .await
        .unwrap();

    let result = h
        .service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 1 })
        .await;
    assert!(matches!(result, Err(BookingError::InvalidState(_))));
}

#[tokio::test]
async fn test_oversized_request_reports_remaining() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("oversized");
    let event = seed_event(&h, 4, 0).await;

    h.service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 3 })
        .await
        .unwrap();

    let result = h
        .service
        .create_booking(event.id, payer(&builder, 2), CreateBooking { quantity: 2 })
        .await;
    assert!(matches!(
        result,
        Err(BookingError::CapacityExceeded { available: 1 })
    ));
}

#[tokio::test]
async fn test_unknown_event_is_not_found() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("unknown_event");

    let result = h
        .service
        .create_booking(Uuid::now_v7(), payer(&builder, 1), CreateBooking { quantity: 1 })
        .await;
    assert!(matches!(result, Err(BookingError::NotFound(_))));
}

#[tokio::test]
async fn test_failed_initialization_keeps_pending_booking_and_resumes() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("init_outage");
    let event = seed_event(&h, 10, 500).await;
    let payer = payer(&builder, 1);

    h.gateway
        .fail_initialize(GatewayError::Unavailable("connect timeout".into()))
        .await;

    let result = h
        .service
        .create_booking(event.id, payer.clone(), CreateBooking { quantity: 2 })
        .await;
    assert!(matches!(result, Err(BookingError::GatewayUnavailable(_))));

    let stranded = h
        .bookings
        .find_active(payer.user_id, event.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stranded.status, BookingStatus::PendingPayment);
    assert!(stranded.payment.checkout_url.is_none());

    h.gateway.clear_failures().await;
    let retried = h
        .service
        .create_booking(event.id, payer, CreateBooking { quantity: 2 })
        .await
        .unwrap();

    assert_eq!(retried.booking.id, stranded.id);
    assert!(retried.checkout_url.is_some());
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn test_verified_payment_confirms_booking() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("verified_payment");
    let event = seed_event(&h, 10, 500).await;

    let outcome = h
        .service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 2 })
        .await
        .unwrap();
    let reference = reference_of(&outcome);

    let reconciled = h
        .service
        .reconcile(&reference, PaymentStatus::Success)
        .await
        .unwrap();

    assert_eq!(reconciled.resolution, Resolution::Confirmed);
    assert_eq!(reconciled.booking.status, BookingStatus::Confirmed);
    assert_eq!(
        reconciled.booking.payment.transaction_id,
        Some(format!("tx_{}", reference))
    );
    assert_eq!(registered(&h, event.id).await, 2);
    assert_eq!(h.emails.sent_count().await, 1);
}

#[tokio::test]
async fn test_duplicate_callback_is_idempotent() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("duplicate_callback");
    let event = seed_event(&h, 10, 500).await;

    let outcome = h
        .service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 2 })
        .await
        .unwrap();
    let reference = reference_of(&outcome);

    h.service
        .reconcile(&reference, PaymentStatus::Success)
        .await
        .unwrap();
    let replay = h
        .service
        .reconcile(&reference, PaymentStatus::Success)
        .await
        .unwrap();

    assert_eq!(replay.resolution, Resolution::AlreadySettled);
    assert_eq!(replay.booking.status, BookingStatus::Confirmed);
    assert_eq!(registered(&h, event.id).await, 2);
    assert_eq!(h.emails.sent_count().await, 1);
    assert_eq!(h.gateway.verify_calls().await, 1);
}

#[tokio::test]
async fn test_concurrent_callbacks_confirm_exactly_once() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("concurrent_callbacks");
    let event = seed_event(&h, 10, 500).await;

    let outcome = h
        .service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 2 })
        .await
        .unwrap();
    let reference = reference_of(&outcome);

    let attempts = (0..8).map(|_| {
        let service = h.service.clone();
        let reference = reference.clone();
        tokio::spawn(async move { service.reconcile(&reference, PaymentStatus::Success).await })
    });

    let confirmed = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .filter(|o| o.resolution == Resolution::Confirmed)
        .count();

    assert_eq!(confirmed, 1);
    assert_eq!(registered(&h, event.id).await, 2);
    assert_eq!(h.emails.sent_count().await, 1);
}

#[tokio::test]
async fn test_verification_overrides_reported_success() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("spoofed_success");
    let event = seed_event(&h, 10, 500).await;

    let outcome = h
        .service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 1 })
        .await
        .unwrap();
    let reference = reference_of(&outcome);
    h.gateway
        .script_status(&reference, PaymentStatus::Failed)
        .await;

    let reconciled = h
        .service
        .reconcile(&reference, PaymentStatus::Success)
        .await
        .unwrap();

    assert_eq!(reconciled.resolution, Resolution::PaymentFailed);
    assert_eq!(reconciled.booking.status, BookingStatus::PaymentFailed);
    assert_eq!(registered(&h, event.id).await, 0);
}

#[tokio::test]
async fn test_underpaid_verification_fails_booking() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("underpaid");
    let event = seed_event(&h, 10, 500).await;

    let outcome = h
        .service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 2 })
        .await
        .unwrap();
    let reference = reference_of(&outcome);
    h.gateway
        .script(Verification {
            reference: reference.clone(),
            status: PaymentStatus::Success,
            amount_minor: 50_000,
            currency: "NGN".to_string(),
            transaction_id: Some("tx_partial".to_string()),
        })
        .await;

    let reconciled = h
        .service
        .reconcile(&reference, PaymentStatus::Success)
        .await
        .unwrap();

    assert_eq!(reconciled.booking.status, BookingStatus::PaymentFailed);
    assert_eq!(registered(&h, event.id).await, 0);
}

#[tokio::test]
async fn test_reported_failure_skips_verification() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("reported_failure");
    let event = seed_event(&h, 10, 500).await;

    let outcome = h
        .service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 1 })
        .await
        .unwrap();

    let reconciled = h
        .service
        .reconcile(&reference_of(&outcome), PaymentStatus::Abandoned)
        .await
        .unwrap();

    assert_eq!(reconciled.booking.status, BookingStatus::PaymentFailed);
    assert_eq!(h.gateway.verify_calls().await, 0);
    assert_eq!(h.emails.sent_count().await, 1);
}

#[tokio::test]
async fn test_pending_verification_leaves_booking_pending() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("pending_verification");
    let event = seed_event(&h, 10, 500).await;

    let outcome = h
        .service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 1 })
        .await
        .unwrap();
    let reference = reference_of(&outcome);
    h.gateway
        .script_status(&reference, PaymentStatus::Pending)
        .await;

    let reconciled = h
        .service
        .reconcile(&reference, PaymentStatus::Success)
        .await
        .unwrap();

    assert_eq!(reconciled.resolution, Resolution::Pending);
    assert_eq!(reconciled.booking.status, BookingStatus::PendingPayment);
}

#[tokio::test]
async fn test_gateway_outage_during_verify_keeps_booking_pending() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("verify_outage");
    let event = seed_event(&h, 10, 500).await;
    let payer = payer(&builder, 1);

    let outcome = h
        .service
        .create_booking(event.id, payer.clone(), CreateBooking { quantity: 1 })
        .await
        .unwrap();
    let reference = reference_of(&outcome);

    h.gateway
        .fail_verify(GatewayError::Unavailable("503 from provider".into()))
        .await;
    let result = h.service.reconcile(&reference, PaymentStatus::Success).await;
    assert!(matches!(result, Err(BookingError::GatewayUnavailable(_))));

    let booking = h.service.get_booking(outcome.booking.id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::PendingPayment);

    // The client falls back to manual verification once the gateway recovers.
    h.gateway.clear_failures().await;
    let verified = h
        .service
        .manual_verify(&reference, payer.user_id)
        .await
        .unwrap();
    assert_eq!(verified.booking.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_in_flight_verification_keeps_booking_retryable() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("in_flight_verification");
    let event = seed_event(&h, 10, 500).await;

    let outcome = h
        .service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 1 })
        .await
        .unwrap();
    let reference = reference_of(&outcome);

    // `ongoing`, `processing` and `queued` all deserialize as Unknown.
    h.gateway
        .script_status(&reference, PaymentStatus::Unknown)
        .await;
    let first = h
        .service
        .reconcile(&reference, PaymentStatus::Success)
        .await
        .unwrap();
    assert_eq!(first.resolution, Resolution::Pending);
    assert_eq!(first.booking.status, BookingStatus::PendingPayment);

    h.gateway
        .script_status(&reference, PaymentStatus::Success)
        .await;
    let second = h
        .service
        .reconcile(&reference, PaymentStatus::Success)
        .await
        .unwrap();
    assert_eq!(second.resolution, Resolution::Confirmed);
    assert_eq!(registered(&h, event.id).await, 1);
}

#[tokio::test]
async fn test_manual_verify_recovers_failed_booking() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("late_settlement");
    let event = seed_event(&h, 10, 500).await;
    let payer = payer(&builder, 1);

    let outcome = h
        .service
        .create_booking(event.id, payer.clone(), CreateBooking { quantity: 2 })
        .await
        .unwrap();
    let reference = reference_of(&outcome);

    h.gateway
        .script_status(&reference, PaymentStatus::Failed)
        .await;
    let failed = h
        .service
        .reconcile(&reference, PaymentStatus::Success)
        .await
        .unwrap();
    assert_eq!(failed.booking.status, BookingStatus::PaymentFailed);

    // The charge settles later; callbacks stay idempotent but the buyer can
    // ask for a fresh verification.
    h.gateway
        .script_status(&reference, PaymentStatus::Success)
        .await;
    let replay = h
        .service
        .reconcile(&reference, PaymentStatus::Success)
        .await
        .unwrap();
    assert_eq!(replay.resolution, Resolution::AlreadySettled);

    let verified = h
        .service
        .manual_verify(&reference, payer.user_id)
        .await
        .unwrap();
    assert_eq!(verified.resolution, Resolution::Confirmed);
    assert_eq!(verified.booking.status, BookingStatus::Confirmed);
    assert!(verified.booking.confirmed_at.is_some());
    assert!(verified.booking.cancellation_reason.is_none());
    assert_eq!(registered(&h, event.id).await, 2);
}

#[tokio::test]
async fn test_manual_verify_of_still_failed_payment_changes_nothing() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("still_failed");
    let event = seed_event(&h, 10, 500).await;
    let payer = payer(&builder, 1);

    let outcome = h
        .service
        .create_booking(event.id, payer.clone(), CreateBooking { quantity: 1 })
        .await
        .unwrap();
    let reference = reference_of(&outcome);
    h.gateway
        .script_status(&reference, PaymentStatus::Failed)
        .await;
    h.service
        .reconcile(&reference, PaymentStatus::Success)
        .await
        .unwrap();

    let again = h
        .service
        .manual_verify(&reference, payer.user_id)
        .await
        .unwrap();
    assert_eq!(again.resolution, Resolution::PaymentFailed);
    assert_eq!(again.booking.status, BookingStatus::PaymentFailed);
    assert_eq!(h.emails.sent_count().await, 1);
    assert_eq!(registered(&h, event.id).await, 0);
}

#[tokio::test]
async fn test_unknown_reference_is_not_found() {
    let h = harness();

    let result = h
        .service
        .reconcile("bk_does_not_exist", PaymentStatus::Success)
        .await;
    assert!(matches!(result, Err(BookingError::NotFound(_))));
}

#[tokio::test]
async fn test_payment_for_cancelled_booking_changes_nothing() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("cancelled_then_paid");
    let event = seed_event(&h, 10, 500).await;
    let payer = payer(&builder, 1);

    let outcome = h
        .service
        .create_booking(event.id, payer.clone(), CreateBooking { quantity: 1 })
        .await
        .unwrap();
    h.service
        .cancel_booking(outcome.booking.id, payer.user_id)
        .await
        .unwrap();

    let reconciled = h
        .service
        .reconcile(&reference_of(&outcome), PaymentStatus::Success)
        .await
        .unwrap();

    assert_eq!(reconciled.resolution, Resolution::AlreadySettled);
    assert_eq!(reconciled.booking.status, BookingStatus::Cancelled);
    assert_eq!(registered(&h, event.id).await, 0);
}

#[tokio::test]
async fn test_notification_failure_does_not_roll_back() {
    let h = harness_with(MockEmailProvider::failing("provider down"));
    let builder = TestDataBuilder::from_test_name("email_down");
    let event = seed_event(&h, 10, 500).await;

    let outcome = h
        .service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 2 })
        .await
        .unwrap();

    let reconciled = h
        .service
        .reconcile(&reference_of(&outcome), PaymentStatus::Success)
        .await
        .unwrap();

    assert_eq!(reconciled.booking.status, BookingStatus::Confirmed);
    assert_eq!(registered(&h, event.id).await, 2);
}

// ============================================================================
// Capacity under contention
// ============================================================================

/// Ledger that fails its first reservation, then delegates.
struct FlakyLedger {
    inner: Arc<InMemoryEventStore>,
    failed_once: AtomicBool,
}

#[async_trait]
impl CapacityLedger for FlakyLedger {
    async fn remaining(&self, event_id: Uuid) -> BookingResult<i32> {
        self.inner.remaining(event_id).await
    }

    async fn check_and_reserve(&self, event_id: Uuid, quantity: i32) -> BookingResult<Admission> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(BookingError::Persistence("db down".to_string()));
        }
        self.inner.check_and_reserve(event_id, quantity).await
    }

    async fn release(&self, event_id: Uuid, quantity: i32) -> BookingResult<()> {
        self.inner.release(event_id, quantity).await
    }
}

#[tokio::test]
async fn test_ledger_outage_never_oversells() {
    let events = Arc::new(InMemoryEventStore::new());
    let bookings = Arc::new(InMemoryBookingRepository::new());
    let gateway = MockPaymentGateway::new();
    let service = BookingService::new(
        bookings.clone(),
        events.clone(),
        Arc::new(FlakyLedger {
            inner: events.clone(),
            failed_once: AtomicBool::new(false),
        }),
        Arc::new(gateway.clone()),
        Arc::new(NoopNotifier),
        BookingSettings::default(),
    );
    let builder = TestDataBuilder::from_test_name("ledger_outage");

    let event = events
        .insert_event(CreateEvent {
            organizer_id: Uuid::now_v7(),
            title: "RustConf".to_string(),
            capacity: 1,
            price: 500,
            registration_deadline: Utc::now() + Duration::days(7),
            status: EventStatus::Published,
        })
        .await
        .unwrap();

    let mut references = Vec::new();
    for n in 0..2 {
        let outcome = service
            .create_booking(event.id, payer(&builder, n), CreateBooking { quantity: 1 })
            .await
            .unwrap();
        references.push(reference_of(&outcome));
    }

    let first = service
        .reconcile(&references[0], PaymentStatus::Success)
        .await;
    assert!(matches!(first, Err(BookingError::Persistence(_))));
    let untouched = bookings
        .get_by_reference(&references[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.status, BookingStatus::PendingPayment);

    let second = service
        .reconcile(&references[1], PaymentStatus::Success)
        .await
        .unwrap();
    assert_eq!(second.resolution, Resolution::Confirmed);

    let retried = service
        .reconcile(&references[0], PaymentStatus::Success)
        .await
        .unwrap();
    assert_eq!(retried.resolution, Resolution::SoldOut);
    assert_eq!(retried.booking.status, BookingStatus::Cancelled);

    let confirmed: i32 = service
        .list_event_bookings(event.id, BookingFilter::default())
        .await
        .unwrap()
        .iter()
        .filter(|b| b.status == BookingStatus::Confirmed)
        .map(|b| b.quantity)
        .sum();
    assert_eq!(confirmed, 1);
    assert_eq!(service.event_availability(event.id).await.unwrap().registered, 1);
}

#[tokio::test]
async fn test_last_seats_are_never_oversold() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("last_seats");
    let event = seed_event(&h, 5, 500).await;

    // With deferred reservation every buyer gets a checkout URL.
    let mut references = Vec::new();
    for n in 0..12 {
        let outcome = h
            .service
            .create_booking(event.id, payer(&builder, n), CreateBooking { quantity: 1 })
            .await
            .unwrap();
        references.push(reference_of(&outcome));
    }

    let attempts = references.into_iter().map(|reference| {
        let service = h.service.clone();
        tokio::spawn(async move { service.reconcile(&reference, PaymentStatus::Success).await })
    });
    let outcomes: Vec<ReconcileOutcome> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let confirmed = outcomes
        .iter()
        .filter(|o| o.resolution == Resolution::Confirmed)
        .count();
    let sold_out: Vec<_> = outcomes
        .iter()
        .filter(|o| o.resolution == Resolution::SoldOut)
        .collect();

    assert_eq!(confirmed, 5);
    assert_eq!(sold_out.len(), 7);
    for outcome in sold_out {
        assert_eq!(outcome.booking.status, BookingStatus::Cancelled);
        assert_eq!(
            outcome.booking.cancellation_reason.as_deref(),
            Some("sold out before payment confirmation; refund required")
        );
    }
    assert_eq!(registered(&h, event.id).await, 5);
}

#[tokio::test]
async fn test_concurrent_free_bookings_respect_capacity() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("free_rush");
    let event = seed_event(&h, 3, 0).await;

    let attempts = (0..10).map(|n| {
        let service = h.service.clone();
        let payer = payer(&builder, n);
        tokio::spawn(async move {
            service
                .create_booking(event.id, payer, CreateBooking { quantity: 1 })
                .await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 3);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, BookingError::CapacityExceeded { .. }))
    );
    assert_eq!(registered(&h, event.id).await, 3);
}

// ============================================================================
// Queries and cancellation
// ============================================================================

#[tokio::test]
async fn test_cancel_and_rebook() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("cancel_rebook");
    let event = seed_event(&h, 10, 500).await;
    let payer = payer(&builder, 1);

    let first = h
        .service
        .create_booking(event.id, payer.clone(), CreateBooking { quantity: 1 })
        .await
        .unwrap();
    let cancelled = h
        .service
        .cancel_booking(first.booking.id, payer.user_id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("cancelled by user"));

    let second = h
        .service
        .create_booking(event.id, payer.clone(), CreateBooking { quantity: 1 })
        .await
        .unwrap();
    assert_ne!(second.booking.id, first.booking.id);

    let mine = h
        .service
        .list_user_bookings(payer.user_id, BookingFilter::default())
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);
}

#[tokio::test]
async fn test_other_users_cannot_read_or_cancel() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("ownership");
    let event = seed_event(&h, 10, 500).await;

    let outcome = h
        .service
        .create_booking(event.id, payer(&builder, 1), CreateBooking { quantity: 1 })
        .await
        .unwrap();
    let intruder = builder.other_user_id(99);

    assert!(matches!(
        h.service
            .get_booking_for_user(outcome.booking.id, intruder)
            .await,
        Err(BookingError::Unauthorized(_))
    ));
    assert!(matches!(
        h.service.cancel_booking(outcome.booking.id, intruder).await,
        Err(BookingError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_list_event_bookings() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("event_bookings");
    let event = seed_event(&h, 10, 0).await;

    for n in 0..3 {
        h.service
            .create_booking(event.id, payer(&builder, n), CreateBooking { quantity: 1 })
            .await
            .unwrap();
    }

    let bookings = h
        .service
        .list_event_bookings(event.id, BookingFilter::default())
        .await
        .unwrap();
    assert_eq!(bookings.len(), 3);
    assert!(bookings.iter().all(|b| b.status == BookingStatus::Confirmed));
}
