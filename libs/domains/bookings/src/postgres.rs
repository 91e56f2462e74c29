use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    catalog::EventCatalog,
    entity::{booking, event},
    error::{BookingError, BookingResult},
    ledger::{Admission, CapacityLedger},
    models::{Booking, BookingFilter, BookingStatus, CreateEvent, Event, NewBooking, Transition},
    repository::BookingRepository,
};

pub struct PgBookingRepository {
    db: DatabaseConnection,
}

impl PgBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn list_where(
        &self,
        column: booking::Column,
        id: Uuid,
        filter: BookingFilter,
    ) -> BookingResult<Vec<Booking>> {
        let mut query = booking::Entity::find().filter(column.eq(id));

        if let Some(status) = filter.status {
            query = query.filter(booking::Column::Status.eq(status));
        }

        let models = query
            .order_by_desc(booking::Column::CreatedAt)
            .limit(filter.limit as u64)
            .offset(filter.offset as u64)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create(&self, input: NewBooking) -> BookingResult<Booking> {
        // The partial unique index on (user_id, event_id) rejects a second
        // active booking; the DbErr conversion turns that into Conflict.
        let active_model: booking::ActiveModel = Booking::new(input).into();
        let model = active_model.insert(&self.db).await?;

        tracing::info!(booking_id = %model.id, status = %model.status, "Created booking");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> BookingResult<Option<Booking>> {
        let model = booking::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn get_by_reference(&self, reference: &str) -> BookingResult<Option<Booking>> {
        let model = booking::Entity::find()
            .filter(booking::Column::PaymentReference.eq(reference))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_active(&self, user_id: Uuid, event_id: Uuid) -> BookingResult<Option<Booking>> {
        let model = booking::Entity::find()
            .filter(booking::Column::UserId.eq(user_id))
            .filter(booking::Column::EventId.eq(event_id))
            .filter(
                booking::Column::Status
                    .is_in([BookingStatus::PendingPayment, BookingStatus::Confirmed]),
            )
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: BookingFilter,
    ) -> BookingResult<Vec<Booking>> {
        self.list_where(booking::Column::UserId, user_id, filter)
            .await
    }

    async fn list_by_event(
        &self,
        event_id: Uuid,
        filter: BookingFilter,
    ) -> BookingResult<Vec<Booking>> {
        self.list_where(booking::Column::EventId, event_id, filter)
            .await
    }

    async fn set_checkout(&self, id: Uuid, checkout_url: &str) -> BookingResult<Booking> {
        let result = booking::Entity::update_many()
            .col_expr(booking::Column::CheckoutUrl, Expr::value(checkout_url))
            .filter(booking::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(BookingError::booking_not_found(id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(id))
    }

    async fn transition(
        &self,
        id: Uuid,
        from: BookingStatus,
        transition: Transition,
    ) -> BookingResult<Option<Booking>> {
        let mut update = booking::Entity::update_many()
            .col_expr(booking::Column::Status, Expr::value(transition.to))
            .filter(booking::Column::Id.eq(id))
            .filter(booking::Column::Status.eq(from));

        if let Some(transaction_id) = transition.transaction_id.clone() {
            update = update.col_expr(booking::Column::TransactionId, Expr::value(transaction_id));
        }
        if let Some(reason) = transition.reason.clone() {
            update = update.col_expr(booking::Column::CancellationReason, Expr::value(reason));
        } else if transition.to == BookingStatus::Confirmed {
            update = update.col_expr(
                booking::Column::CancellationReason,
                Expr::value(Option::<String>::None),
            );
        }
        let confirmed_at = (transition.to == BookingStatus::Confirmed).then(Utc::now);
        update = update.col_expr(booking::Column::ConfirmedAt, Expr::value(confirmed_at));

        let result = update.exec(&self.db).await?;

        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(id))?;

        if result.rows_affected == 0 {
            tracing::debug!(
                booking_id = %id,
                expected = %from,
                actual = %current.status,
                "Booking transition lost"
            );
            return Ok(None);
        }

        tracing::info!(booking_id = %id, from = %from, to = %transition.to, "Booking transitioned");
        Ok(Some(current))
    }
}

/// Events table access: catalog reads and the capacity ledger.
pub struct PgEventStore {
    db: DatabaseConnection,
}

impl PgEventStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn insert_event(&self, input: CreateEvent) -> BookingResult<Event> {
        input.validate()?;

        let active_model: event::ActiveModel = Event::new(input).into();
        let model = active_model.insert(&self.db).await?;

        tracing::info!(event_id = %model.id, capacity = model.capacity, "Created event");
        Ok(model.into())
    }
}

#[async_trait]
impl EventCatalog for PgEventStore {
    async fn get_event(&self, id: Uuid) -> BookingResult<Option<Event>> {
        let model = event::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }
}

#[async_trait]
impl CapacityLedger for PgEventStore {
    async fn remaining(&self, event_id: Uuid) -> BookingResult<i32> {
        self.get_event(event_id)
            .await?
            .map(|e| e.remaining())
            .ok_or_else(|| BookingError::event_not_found(event_id))
    }

    async fn check_and_reserve(&self, event_id: Uuid, quantity: i32) -> BookingResult<Admission> {
        // Single conditional UPDATE: the ceiling check and the increment are
        // one statement, so concurrent confirmations serialize on the row lock.
        let result = event::Entity::update_many()
            .col_expr(
                event::Column::RegisteredCount,
                Expr::cust_with_values("registered_count + ?", [quantity]),
            )
            .filter(event::Column::Id.eq(event_id))
            .filter(Expr::cust_with_values(
                "registered_count + ? <= capacity",
                [quantity],
            ))
            .exec(&self.db)
            .await?;

        let event = self
            .get_event(event_id)
            .await?
            .ok_or_else(|| BookingError::event_not_found(event_id))?;

        if result.rows_affected == 0 {
            tracing::info!(
                event_id = %event_id,
                requested = quantity,
                available = event.remaining(),
                "Reservation rejected"
            );
            return Ok(Admission::Rejected {
                available: event.remaining(),
            });
        }

        Ok(Admission::Admitted {
            remaining: event.remaining(),
        })
    }

    async fn release(&self, event_id: Uuid, quantity: i32) -> BookingResult<()> {
        let result = event::Entity::update_many()
            .col_expr(
                event::Column::RegisteredCount,
                Expr::cust_with_values("GREATEST(registered_count - ?, 0)", [quantity]),
            )
            .filter(event::Column::Id.eq(event_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(BookingError::event_not_found(event_id));
        }

        tracing::info!(event_id = %event_id, released = quantity, "Released seats");
        Ok(())
    }
}
