use crate::models::EventStatus;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sea-ORM Entity for the events table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub capacity: i32,
    pub price: i64,
    pub registration_deadline: DateTimeWithTimeZone,
    pub status: EventStatus,
    pub registered_count: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Event {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            organizer_id: model.organizer_id,
            title: model.title,
            capacity: model.capacity,
            price: model.price,
            registration_deadline: model.registration_deadline.into(),
            status: model.status,
            registered_count: model.registered_count,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<crate::models::Event> for ActiveModel {
    fn from(event: crate::models::Event) -> Self {
        ActiveModel {
            id: Set(event.id),
            organizer_id: Set(event.organizer_id),
            title: Set(event.title),
            capacity: Set(event.capacity),
            price: Set(event.price),
            registration_deadline: Set(event.registration_deadline.into()),
            status: Set(event.status),
            registered_count: Set(event.registered_count),
            created_at: Set(event.created_at.into()),
            updated_at: Set(event.updated_at.into()),
        }
    }
}
