use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::EventCatalog;
use crate::error::{BookingError, BookingResult};
use crate::gateway::{GatewayError, InitializePayment, PaymentGateway};
use crate::ledger::{Admission, CapacityLedger};
use crate::models::{
    Availability, Booking, BookingFilter, BookingOutcome, BookingStatus, CreateBooking, Event,
    NewBooking, Payer, PaymentProvider, PaymentStatus, ReconcileOutcome, Resolution,
    SOLD_OUT_REASON, Transition,
};
use crate::notifier::BookingNotifier;
use crate::repository::BookingRepository;

const USER_CANCELLED_REASON: &str = "cancelled by user";

const CONFIRM_LOCK_STRIPES: usize = 64;

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct BookingSettings {
    /// ISO 4217 code charged for paid events
    pub currency: String,
    /// Where the gateway redirects the buyer after checkout
    pub callback_url: Option<String>,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            currency: "NGN".to_string(),
            callback_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Notice {
    Confirmed,
    Failed,
}

/// Booking lifecycle orchestrator.
///
/// Every status change goes through [`BookingRepository::transition`] with an
/// expected current status, and every seat goes through [`CapacityLedger`].
/// Together they make reconciliation safe to replay and to race.
#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    catalog: Arc<dyn EventCatalog>,
    ledger: Arc<dyn CapacityLedger>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn BookingNotifier>,
    settings: BookingSettings,
    confirm_locks: Arc<[Mutex<()>]>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        catalog: Arc<dyn EventCatalog>,
        ledger: Arc<dyn CapacityLedger>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn BookingNotifier>,
        settings: BookingSettings,
    ) -> Self {
        Self {
            bookings,
            catalog,
            ledger,
            gateway,
            notifier,
            settings,
            confirm_locks: (0..CONFIRM_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    fn confirm_lock(&self, booking_id: Uuid) -> &Mutex<()> {
        let stripe = (booking_id.as_u128() % self.confirm_locks.len() as u128) as usize;
        &self.confirm_locks[stripe]
    }

    pub fn settings(&self) -> &BookingSettings {
        &self.settings
    }

    /// Book `input.quantity` tickets for the payer.
    ///
    /// Free events are confirmed on the spot. Paid events return a pending
    /// booking and a checkout URL; seats are committed only once the payment
    /// is verified.
    #[instrument(skip(self, payer, input), fields(user_id = %payer.user_id, quantity = input.quantity))]
    pub async fn create_booking(
        &self,
        event_id: Uuid,
        payer: Payer,
        input: CreateBooking,
    ) -> BookingResult<BookingOutcome> {
        input.validate()?;

        let event = self.load_event(event_id).await?;
        if let Some(reason) = event.registration_closed_reason(Utc::now()) {
            return Err(BookingError::InvalidState(reason));
        }

        // A pending booking whose checkout never initialized may be resumed
        // with the same quantity; anything else active is a duplicate.
        let resumable = match self.bookings.find_active(payer.user_id, event_id).await? {
            Some(existing)
                if existing.status == BookingStatus::PendingPayment
                    && existing.payment.checkout_url.is_none()
                    && existing.quantity == input.quantity =>
            {
                Some(existing)
            }
            Some(_) => {
                return Err(BookingError::Conflict(
                    "You already have an active booking for this event".to_string(),
                ));
            }
            None => None,
        };

        let available = self.ledger.remaining(event_id).await?;
        if input.quantity > available {
            return Err(BookingError::CapacityExceeded { available });
        }

        if let Some(existing) = resumable {
            info!(booking_id = %existing.id, "Resuming checkout for pending booking");
            return self.start_checkout(existing).await;
        }

        if event.is_free() {
            return self.book_free(&event, &payer, input.quantity).await;
        }

        let booking = self
            .bookings
            .create(NewBooking {
                event_id,
                user_id: payer.user_id,
                contact_email: payer.email.clone(),
                quantity: input.quantity,
                total_amount: event.total_for(input.quantity),
                status: BookingStatus::PendingPayment,
                provider: PaymentProvider::Gateway,
                currency: self.settings.currency.clone(),
                reference: Some(new_reference()),
            })
            .await?;

        self.start_checkout(booking).await
    }

    async fn book_free(
        &self,
        event: &Event,
        payer: &Payer,
        quantity: i32,
    ) -> BookingResult<BookingOutcome> {
        self.ledger.commit(event.id, quantity).await?;

        let created = self
            .bookings
            .create(NewBooking {
                event_id: event.id,
                user_id: payer.user_id,
                contact_email: payer.email.clone(),
                quantity,
                total_amount: 0,
                status: BookingStatus::Confirmed,
                provider: PaymentProvider::None,
                currency: self.settings.currency.clone(),
                reference: None,
            })
            .await;

        let booking = match created {
            Ok(booking) => booking,
            Err(err) => {
                self.release_quietly(event.id, quantity).await;
                return Err(err);
            }
        };

        info!(booking_id = %booking.id, event_id = %event.id, "Free booking confirmed");
        self.notify(&booking, Notice::Confirmed).await;

        Ok(BookingOutcome {
            booking,
            checkout_url: None,
            message: "Booking confirmed".to_string(),
        })
    }

    async fn start_checkout(&self, booking: Booking) -> BookingResult<BookingOutcome> {
        let reference = booking.payment.reference.clone().ok_or_else(|| {
            BookingError::Persistence(format!("Booking {} has no payment reference", booking.id))
        })?;

        let checkout = self
            .gateway
            .initialize(InitializePayment {
                reference: reference.clone(),
                email: booking.contact_email.clone(),
                amount: booking.total_amount,
                currency: booking.payment.currency.clone(),
                callback_url: self.settings.callback_url.clone(),
                metadata: json!({
                    "booking_id": booking.id,
                    "event_id": booking.event_id,
                    "user_id": booking.user_id,
                    "quantity": booking.quantity,
                }),
            })
            .await
            .map_err(|e| {
                warn!(booking_id = %booking.id, reference = %reference, error = %e, "Checkout initialization failed");
                BookingError::from(e)
            })?;

        let booking = self
            .bookings
            .set_checkout(booking.id, &checkout.checkout_url)
            .await?;

        info!(booking_id = %booking.id, reference = %reference, "Checkout initialized");
        Ok(BookingOutcome {
            booking,
            checkout_url: Some(checkout.checkout_url),
            message: "Complete payment to confirm your booking".to_string(),
        })
    }

    /// Apply a gateway-reported payment outcome. Safe to call repeatedly and
    /// concurrently for the same reference.
    #[instrument(skip(self))]
    pub async fn reconcile(
        &self,
        reference: &str,
        reported: PaymentStatus,
    ) -> BookingResult<ReconcileOutcome> {
        let booking = self
            .bookings
            .get_by_reference(reference)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(reference))?;

        match booking.status {
            BookingStatus::PendingPayment => {}
            BookingStatus::Cancelled => {
                if reported == PaymentStatus::Success {
                    warn!(
                        booking_id = %booking.id,
                        reference = %reference,
                        "Payment reported for cancelled booking; manual refund required"
                    );
                }
                return Ok(settled(booking));
            }
            BookingStatus::Confirmed | BookingStatus::PaymentFailed => {
                info!(booking_id = %booking.id, status = %booking.status, "Duplicate payment notification");
                return Ok(settled(booking));
            }
        }

        match reported {
            PaymentStatus::Success => self.verify_and_apply(booking).await,
            PaymentStatus::Pending => Ok(ReconcileOutcome {
                booking,
                resolution: Resolution::Pending,
            }),
            other => {
                self.mark_failed(booking, format!("Payment reported as {}", other))
                    .await
            }
        }
    }

    /// Client-initiated reconciliation for when no callback arrived.
    ///
    /// A `payment_failed` booking is verified again against the same
    /// reference, so a charge that settled late can still confirm it.
    #[instrument(skip(self))]
    pub async fn manual_verify(
        &self,
        reference: &str,
        user_id: Uuid,
    ) -> BookingResult<ReconcileOutcome> {
        let booking = self
            .bookings
            .get_by_reference(reference)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(reference))?;

        if booking.user_id != user_id {
            return Err(BookingError::Unauthorized(booking.id));
        }

        match booking.status {
            BookingStatus::PendingPayment | BookingStatus::PaymentFailed => {
                self.verify_and_apply(booking).await
            }
            BookingStatus::Confirmed | BookingStatus::Cancelled => Ok(settled(booking)),
        }
    }

    async fn verify_and_apply(&self, booking: Booking) -> BookingResult<ReconcileOutcome> {
        let reference = booking.payment.reference.clone().unwrap_or_default();

        let verification = match self.gateway.verify(&reference).await {
            Ok(verification) => verification,
            Err(GatewayError::Unavailable(msg)) => {
                warn!(booking_id = %booking.id, reference = %reference, error = %msg, "Verification unavailable; booking unchanged");
                return Err(BookingError::GatewayUnavailable(msg));
            }
            Err(GatewayError::Rejected(msg)) => {
                return self
                    .mark_failed(booking, format!("Payment verification rejected: {}", msg))
                    .await;
            }
        };

        // In-flight states the provider has not settled yet (`ongoing`,
        // `processing`, `queued`) arrive as Unknown.
        if matches!(
            verification.status,
            PaymentStatus::Pending | PaymentStatus::Unknown
        ) {
            info!(booking_id = %booking.id, status = %verification.status, "Payment not settled yet");
            return Ok(ReconcileOutcome {
                booking,
                resolution: Resolution::Pending,
            });
        }

        if !verification.settles(booking.total_amount, &booking.payment.currency) {
            let reason = if verification.status == PaymentStatus::Success {
                warn!(
                    booking_id = %booking.id,
                    expected = booking.total_amount,
                    paid_minor = verification.amount_minor,
                    currency = %verification.currency,
                    "Verified payment does not match booking total"
                );
                "Payment amount or currency mismatch".to_string()
            } else {
                format!("Payment {}", verification.status)
            };
            return self.mark_failed(booking, reason).await;
        }

        self.confirm(booking, verification.transaction_id).await
    }

    /// Reserve the booking's seats, then move it to `confirmed`.
    ///
    /// A confirmed booking always has its seats counted by the ledger. If the
    /// status write fails after the reservation, the seats stay held.
    /// Confirmations of one booking run one at a time within a process.
    async fn confirm(
        &self,
        booking: Booking,
        transaction_id: Option<String>,
    ) -> BookingResult<ReconcileOutcome> {
        let guard = self.confirm_lock(booking.id).lock().await;

        let current = self
            .bookings
            .get_by_id(booking.id)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(booking.id))?;
        if current.status != booking.status {
            return Ok(settled(current));
        }
        let from = current.status;

        let remaining = match self
            .ledger
            .check_and_reserve(current.event_id, current.quantity)
            .await?
        {
            Admission::Admitted { remaining } => remaining,
            Admission::Rejected { available } => return self.sold_out(current, available).await,
        };

        let mut transition = Transition::to(BookingStatus::Confirmed);
        if let Some(transaction_id) = transaction_id {
            transition = transition.with_transaction_id(transaction_id);
        }

        match self.bookings.transition(current.id, from, transition).await {
            Ok(Some(confirmed)) => {
                drop(guard);
                info!(booking_id = %confirmed.id, remaining, "Booking confirmed");
                self.notify(&confirmed, Notice::Confirmed).await;
                Ok(ReconcileOutcome {
                    booking: confirmed,
                    resolution: Resolution::Confirmed,
                })
            }
            Ok(None) => {
                self.release_quietly(current.event_id, current.quantity).await;
                self.lost_race(current.id).await
            }
            Err(err) => {
                tracing::error!(
                    booking_id = %current.id,
                    event_id = %current.event_id,
                    quantity = current.quantity,
                    error = %err,
                    "Confirmation write failed; reserved seats stay held"
                );
                Err(err)
            }
        }
    }

    /// A verified payment with no seats left to back it.
    ///
    /// Pending bookings are cancelled. A retried `payment_failed` booking
    /// keeps its status.
    async fn sold_out(&self, booking: Booking, available: i32) -> BookingResult<ReconcileOutcome> {
        warn!(
            booking_id = %booking.id,
            requested = booking.quantity,
            available,
            "Event sold out before payment confirmation; manual refund required"
        );

        if booking.status != BookingStatus::PendingPayment {
            return Ok(ReconcileOutcome {
                booking,
                resolution: Resolution::SoldOut,
            });
        }

        let transition = Transition::to(BookingStatus::Cancelled).with_reason(SOLD_OUT_REASON);
        match self
            .bookings
            .transition(booking.id, BookingStatus::PendingPayment, transition)
            .await?
        {
            Some(cancelled) => {
                self.notify(&cancelled, Notice::Failed).await;
                Ok(ReconcileOutcome {
                    booking: cancelled,
                    resolution: Resolution::SoldOut,
                })
            }
            None => self.lost_race(booking.id).await,
        }
    }

    async fn mark_failed(&self, booking: Booking, reason: String) -> BookingResult<ReconcileOutcome> {
        if booking.status == BookingStatus::PaymentFailed {
            info!(booking_id = %booking.id, reason = %reason, "Payment still failed");
            return Ok(ReconcileOutcome {
                booking,
                resolution: Resolution::PaymentFailed,
            });
        }

        let transition = Transition::to(BookingStatus::PaymentFailed).with_reason(reason);

        match self
            .bookings
            .transition(booking.id, BookingStatus::PendingPayment, transition)
            .await?
        {
            Some(failed) => {
                info!(booking_id = %failed.id, "Payment failed");
                self.notify(&failed, Notice::Failed).await;
                Ok(ReconcileOutcome {
                    booking: failed,
                    resolution: Resolution::PaymentFailed,
                })
            }
            None => self.lost_race(booking.id).await,
        }
    }

    /// Another caller already moved the booking; report what it did.
    async fn lost_race(&self, booking_id: Uuid) -> BookingResult<ReconcileOutcome> {
        let current = self
            .bookings
            .get_by_id(booking_id)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(booking_id))?;

        Ok(settled(current))
    }

    async fn release_quietly(&self, event_id: Uuid, quantity: i32) {
        if let Err(e) = self.ledger.release(event_id, quantity).await {
            tracing::error!(event_id = %event_id, quantity, error = %e, "Failed to release seats");
        }
    }

    async fn notify(&self, booking: &Booking, notice: Notice) {
        let event = match self.catalog.get_event(booking.event_id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                warn!(booking_id = %booking.id, "Skipping notification: event missing");
                return;
            }
            Err(e) => {
                warn!(booking_id = %booking.id, error = %e, "Skipping notification: event lookup failed");
                return;
            }
        };

        let result = match notice {
            Notice::Confirmed => self.notifier.booking_confirmed(booking, &event).await,
            Notice::Failed => self.notifier.payment_failed(booking, &event).await,
        };

        if let Err(e) = result {
            warn!(booking_id = %booking.id, notice = ?notice, error = %e, "Failed to send booking notification");
        }
    }

    /// Cancel the caller's pending booking.
    #[instrument(skip(self))]
    pub async fn cancel_booking(&self, id: Uuid, user_id: Uuid) -> BookingResult<Booking> {
        let booking = self.get_booking_for_user(id, user_id).await?;

        match booking.status {
            BookingStatus::Cancelled => Ok(booking),
            BookingStatus::Confirmed | BookingStatus::PaymentFailed => Err(
                BookingError::InvalidState(format!("Cannot cancel a {} booking", booking.status)),
            ),
            BookingStatus::PendingPayment => {
                let transition =
                    Transition::to(BookingStatus::Cancelled).with_reason(USER_CANCELLED_REASON);
                match self
                    .bookings
                    .transition(id, BookingStatus::PendingPayment, transition)
                    .await?
                {
                    Some(cancelled) => {
                        info!(booking_id = %id, "Booking cancelled by user");
                        Ok(cancelled)
                    }
                    None => {
                        let current = self.get_booking_for_user(id, user_id).await?;
                        if current.status == BookingStatus::Cancelled {
                            Ok(current)
                        } else {
                            Err(BookingError::InvalidState(format!(
                                "Cannot cancel a {} booking",
                                current.status
                            )))
                        }
                    }
                }
            }
        }
    }

    pub async fn get_booking(&self, id: Uuid) -> BookingResult<Booking> {
        self.bookings
            .get_by_id(id)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(id))
    }

    /// Get a booking by ID, verifying user ownership
    pub async fn get_booking_for_user(&self, id: Uuid, user_id: Uuid) -> BookingResult<Booking> {
        let booking = self.get_booking(id).await?;

        if booking.user_id != user_id {
            return Err(BookingError::Unauthorized(id));
        }

        Ok(booking)
    }

    pub async fn list_user_bookings(
        &self,
        user_id: Uuid,
        filter: BookingFilter,
    ) -> BookingResult<Vec<Booking>> {
        self.bookings.list_by_user(user_id, filter).await
    }

    pub async fn list_event_bookings(
        &self,
        event_id: Uuid,
        filter: BookingFilter,
    ) -> BookingResult<Vec<Booking>> {
        self.bookings.list_by_event(event_id, filter).await
    }

    pub async fn event_availability(&self, event_id: Uuid) -> BookingResult<Availability> {
        let event = self.load_event(event_id).await?;
        Ok(Availability::from(&event))
    }

    async fn load_event(&self, id: Uuid) -> BookingResult<Event> {
        self.catalog
            .get_event(id)
            .await?
            .ok_or_else(|| BookingError::event_not_found(id))
    }
}

fn settled(booking: Booking) -> ReconcileOutcome {
    ReconcileOutcome {
        booking,
        resolution: Resolution::AlreadySettled,
    }
}

fn new_reference() -> String {
    format!("bk_{}", Uuid::new_v4().simple())
}
