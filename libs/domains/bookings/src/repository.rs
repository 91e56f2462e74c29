use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, BookingFilter, BookingStatus, NewBooking, Transition};

/// Repository trait for Booking persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a booking. Fails with `Conflict` when the user already holds an
    /// active booking for the event or the payment reference is taken.
    async fn create(&self, input: NewBooking) -> BookingResult<Booking>;

    async fn get_by_id(&self, id: Uuid) -> BookingResult<Option<Booking>>;

    /// Look up a booking by its gateway payment reference
    async fn get_by_reference(&self, reference: &str) -> BookingResult<Option<Booking>>;

    /// The user's pending or confirmed booking for an event, if any
    async fn find_active(&self, user_id: Uuid, event_id: Uuid) -> BookingResult<Option<Booking>>;

    async fn list_by_user(&self, user_id: Uuid, filter: BookingFilter)
    -> BookingResult<Vec<Booking>>;

    async fn list_by_event(
        &self,
        event_id: Uuid,
        filter: BookingFilter,
    ) -> BookingResult<Vec<Booking>>;

    /// Record the gateway checkout URL on a pending booking
    async fn set_checkout(&self, id: Uuid, checkout_url: &str) -> BookingResult<Booking>;

    /// Move a booking from `from` to `transition.to`.
    ///
    /// Returns `None` when the booking is no longer in `from`, so at most one
    /// of several concurrent callers wins.
    async fn transition(
        &self,
        id: Uuid,
        from: BookingStatus,
        transition: Transition,
    ) -> BookingResult<Option<Booking>>;
}

/// In-memory implementation of BookingRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryBookingRepository {
    bookings: Arc<RwLock<HashMap<Uuid, Booking>>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self {
            bookings: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

fn paginate(mut bookings: Vec<Booking>, filter: &BookingFilter) -> Vec<Booking> {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    bookings
        .into_iter()
        .skip(filter.offset)
        .take(filter.limit)
        .collect()
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn create(&self, input: NewBooking) -> BookingResult<Booking> {
        let mut bookings = self.bookings.write().await;

        let active_exists = bookings.values().any(|b| {
            b.user_id == input.user_id && b.event_id == input.event_id && b.status.is_active()
        });
        if active_exists {
            return Err(BookingError::Conflict(
                "An active booking already exists for this event".to_string(),
            ));
        }

        if let Some(reference) = &input.reference {
            if bookings
                .values()
                .any(|b| b.payment.reference.as_deref() == Some(reference.as_str()))
            {
                return Err(BookingError::Conflict(format!(
                    "Payment reference {} already in use",
                    reference
                )));
            }
        }

        let booking = Booking::new(input);
        bookings.insert(booking.id, booking.clone());

        tracing::info!(booking_id = %booking.id, status = %booking.status, "Created booking");
        Ok(booking)
    }

    async fn get_by_id(&self, id: Uuid) -> BookingResult<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(&id).cloned())
    }

    async fn get_by_reference(&self, reference: &str) -> BookingResult<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .find(|b| b.payment.reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn find_active(&self, user_id: Uuid, event_id: Uuid) -> BookingResult<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .find(|b| b.user_id == user_id && b.event_id == event_id && b.status.is_active())
            .cloned())
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: BookingFilter,
    ) -> BookingResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let matching = bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .filter(|b| filter.status.is_none_or(|s| b.status == s))
            .cloned()
            .collect();

        Ok(paginate(matching, &filter))
    }

    async fn list_by_event(
        &self,
        event_id: Uuid,
        filter: BookingFilter,
    ) -> BookingResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let matching = bookings
            .values()
            .filter(|b| b.event_id == event_id)
            .filter(|b| filter.status.is_none_or(|s| b.status == s))
            .cloned()
            .collect();

        Ok(paginate(matching, &filter))
    }

    async fn set_checkout(&self, id: Uuid, checkout_url: &str) -> BookingResult<Booking> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&id)
            .ok_or_else(|| BookingError::booking_not_found(id))?;

        booking.payment.checkout_url = Some(checkout_url.to_string());
        booking.updated_at = chrono::Utc::now();
        Ok(booking.clone())
    }

    async fn transition(
        &self,
        id: Uuid,
        from: BookingStatus,
        transition: Transition,
    ) -> BookingResult<Option<Booking>> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&id)
            .ok_or_else(|| BookingError::booking_not_found(id))?;

        if booking.status != from {
            tracing::debug!(
                booking_id = %id,
                expected = %from,
                actual = %booking.status,
                "Booking transition lost"
            );
            return Ok(None);
        }

        booking.apply(&transition);
        tracing::info!(booking_id = %id, from = %from, to = %transition.to, "Booking transitioned");
        Ok(Some(booking.clone()))
    }
}
