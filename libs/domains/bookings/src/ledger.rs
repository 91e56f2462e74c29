//! Per-event capacity accounting.
//!
//! `registered_count` only ever moves through [`CapacityLedger`]. Implementations
//! must make the check and the increment a single atomic step so the count can
//! never exceed capacity, however many confirmations race.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{BookingError, BookingResult};

/// Result of an atomic check-and-reserve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Seats were committed; `remaining` is what is left afterwards
    Admitted { remaining: i32 },
    /// Not enough seats; nothing changed
    Rejected { available: i32 },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CapacityLedger: Send + Sync {
    /// Seats still available. Errors with `NotFound` for unknown events.
    async fn remaining(&self, event_id: Uuid) -> BookingResult<i32>;

    /// Increment `registered_count` by `quantity` only if it stays within capacity.
    async fn check_and_reserve(&self, event_id: Uuid, quantity: i32) -> BookingResult<Admission>;

    /// Give seats back, never dropping the count below zero.
    async fn release(&self, event_id: Uuid, quantity: i32) -> BookingResult<()>;

    /// Reserve or fail with [`BookingError::CapacityExceeded`].
    async fn commit(&self, event_id: Uuid, quantity: i32) -> BookingResult<i32> {
        match self.check_and_reserve(event_id, quantity).await? {
            Admission::Admitted { remaining } => Ok(remaining),
            Admission::Rejected { available } => Err(BookingError::CapacityExceeded { available }),
        }
    }
}
