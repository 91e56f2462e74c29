use async_trait::async_trait;
use uuid::Uuid;

use crate::error::BookingResult;
use crate::models::Event;

/// Read access to events. Event management itself lives elsewhere.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventCatalog: Send + Sync {
    async fn get_event(&self, id: Uuid) -> BookingResult<Option<Event>>;
}
