use crate::models::{BookingStatus, PaymentInfo, PaymentProvider};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sea-ORM Entity for the bookings table
///
/// The payment sub-record is flattened into `payment_*` columns.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub contact_email: String,
    pub quantity: i32,
    pub total_amount: i64,
    pub status: BookingStatus,
    pub payment_provider: PaymentProvider,
    pub currency: String,
    #[sea_orm(unique)]
    pub payment_reference: Option<String>,
    pub transaction_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub checkout_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub cancellation_reason: Option<String>,
    pub confirmed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Booking {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            event_id: model.event_id,
            user_id: model.user_id,
            contact_email: model.contact_email,
            quantity: model.quantity,
            total_amount: model.total_amount,
            status: model.status,
            payment: PaymentInfo {
                provider: model.payment_provider,
                amount: model.total_amount,
                currency: model.currency,
                reference: model.payment_reference,
                transaction_id: model.transaction_id,
                checkout_url: model.checkout_url,
            },
            cancellation_reason: model.cancellation_reason,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
            confirmed_at: model.confirmed_at.map(Into::into),
        }
    }
}

impl From<crate::models::Booking> for ActiveModel {
    fn from(booking: crate::models::Booking) -> Self {
        ActiveModel {
            id: Set(booking.id),
            event_id: Set(booking.event_id),
            user_id: Set(booking.user_id),
            contact_email: Set(booking.contact_email),
            quantity: Set(booking.quantity),
            total_amount: Set(booking.total_amount),
            status: Set(booking.status),
            payment_provider: Set(booking.payment.provider),
            currency: Set(booking.payment.currency),
            payment_reference: Set(booking.payment.reference),
            transaction_id: Set(booking.payment.transaction_id),
            checkout_url: Set(booking.payment.checkout_url),
            cancellation_reason: Set(booking.cancellation_reason),
            confirmed_at: Set(booking.confirmed_at.map(Into::into)),
            created_at: Set(booking.created_at.into()),
            updated_at: Set(booking.updated_at.into()),
        }
    }
}
