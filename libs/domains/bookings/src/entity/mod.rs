//! Sea-ORM entities for the `events` and `bookings` tables.

pub mod booking;
pub mod event;
