//! Booking notifications.
//!
//! Notification delivery is best-effort: the service logs failures and never
//! rolls back a state transition because an email could not be sent.

use async_trait::async_trait;
use email::{EmailProvider, Mailer, NotificationResult, templates};
use serde_json::json;

use crate::models::{Booking, BookingStatus, Event, SOLD_OUT_REASON};

const DEFAULT_FAILURE_REASON: &str = "Payment was not successful";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingNotifier: Send + Sync {
    async fn booking_confirmed(&self, booking: &Booking, event: &Event) -> NotificationResult<()>;

    /// Sent for failed payments and for paid bookings that lost the race for
    /// the last seats.
    async fn payment_failed(&self, booking: &Booking, event: &Event) -> NotificationResult<()>;
}

/// Sends the booking templates through a [`Mailer`]
pub struct EmailNotifier<P: EmailProvider> {
    mailer: Mailer<P>,
}

impl<P: EmailProvider> EmailNotifier<P> {
    pub fn new(mailer: Mailer<P>) -> Self {
        Self { mailer }
    }

    pub fn mailer(&self) -> &Mailer<P> {
        &self.mailer
    }
}

fn reference_of(booking: &Booking) -> String {
    booking
        .payment
        .reference
        .clone()
        .unwrap_or_else(|| booking.id.to_string())
}

#[async_trait]
impl<P: EmailProvider> BookingNotifier for EmailNotifier<P> {
    async fn booking_confirmed(&self, booking: &Booking, event: &Event) -> NotificationResult<()> {
        let amount = (booking.total_amount > 0).then_some(booking.total_amount);
        let data = json!({
            "event_title": event.title,
            "quantity": booking.quantity,
            "amount": amount,
            "currency": booking.payment.currency,
            "reference": reference_of(booking),
        });

        self.mailer
            .send_template(&booking.contact_email, templates::BOOKING_CONFIRMED, &data)
            .await?;
        Ok(())
    }

    async fn payment_failed(&self, booking: &Booking, event: &Event) -> NotificationResult<()> {
        let reason = booking
            .cancellation_reason
            .as_deref()
            .unwrap_or(DEFAULT_FAILURE_REASON);
        let refund_required = booking.status == BookingStatus::Cancelled
            && booking.cancellation_reason.as_deref() == Some(SOLD_OUT_REASON);

        let data = json!({
            "event_title": event.title,
            "reason": reason,
            "reference": reference_of(booking),
            "refund_required": refund_required,
        });

        self.mailer
            .send_template(&booking.contact_email, templates::PAYMENT_FAILED, &data)
            .await?;
        Ok(())
    }
}

/// Drops every notification. Used when no email provider is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl BookingNotifier for NoopNotifier {
    async fn booking_confirmed(&self, booking: &Booking, _event: &Event) -> NotificationResult<()> {
        tracing::debug!(booking_id = %booking.id, "Skipping confirmation email");
        Ok(())
    }

    async fn payment_failed(&self, booking: &Booking, _event: &Event) -> NotificationResult<()> {
        tracing::debug!(booking_id = %booking.id, "Skipping failure email");
        Ok(())
    }
}
