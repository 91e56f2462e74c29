use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

use crate::catalog::EventCatalog;
use crate::error::{BookingError, BookingResult};
use crate::ledger::{Admission, CapacityLedger};
use crate::models::{CreateEvent, Event};

/// In-memory events table backing both the catalog and the capacity ledger.
///
/// A single mutex guards every event so a reservation reads and writes
/// `registered_count` in one critical section.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventStore {
    events: Arc<Mutex<HashMap<Uuid, Event>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_event(&self, input: CreateEvent) -> BookingResult<Event> {
        input.validate()?;

        let event = Event::new(input);
        self.events.lock().await.insert(event.id, event.clone());

        tracing::info!(event_id = %event.id, capacity = event.capacity, "Created event");
        Ok(event)
    }
}

#[async_trait]
impl EventCatalog for InMemoryEventStore {
    async fn get_event(&self, id: Uuid) -> BookingResult<Option<Event>> {
        Ok(self.events.lock().await.get(&id).cloned())
    }
}

#[async_trait]
impl CapacityLedger for InMemoryEventStore {
    async fn remaining(&self, event_id: Uuid) -> BookingResult<i32> {
        self.events
            .lock()
            .await
            .get(&event_id)
            .map(Event::remaining)
            .ok_or_else(|| BookingError::event_not_found(event_id))
    }

    async fn check_and_reserve(&self, event_id: Uuid, quantity: i32) -> BookingResult<Admission> {
        let mut events = self.events.lock().await;
        let event = events
            .get_mut(&event_id)
            .ok_or_else(|| BookingError::event_not_found(event_id))?;

        if event.registered_count + quantity > event.capacity {
            return Ok(Admission::Rejected {
                available: event.remaining(),
            });
        }

        event.registered_count += quantity;
        event.updated_at = Utc::now();
        Ok(Admission::Admitted {
            remaining: event.remaining(),
        })
    }

    async fn release(&self, event_id: Uuid, quantity: i32) -> BookingResult<()> {
        let mut events = self.events.lock().await;
        let event = events
            .get_mut(&event_id)
            .ok_or_else(|| BookingError::event_not_found(event_id))?;

        event.registered_count = (event.registered_count - quantity).max(0);
        event.updated_at = Utc::now();
        Ok(())
    }
}
