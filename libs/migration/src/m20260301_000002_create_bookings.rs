use sea_orm_migration::{prelude::*, schema::*};

use crate::m20260301_000001_create_events::Events;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(pk_uuid(Bookings::Id))
                    .col(uuid(Bookings::EventId))
                    .col(uuid(Bookings::UserId))
                    .col(string(Bookings::ContactEmail))
                    .col(integer(Bookings::Quantity))
                    .col(big_integer(Bookings::TotalAmount))
                    .col(string_len(Bookings::Status, 32))
                    .col(string_len(Bookings::PaymentProvider, 32).default("none"))
                    .col(string_len(Bookings::Currency, 3))
                    .col(string_null(Bookings::PaymentReference))
                    .col(string_null(Bookings::TransactionId))
                    .col(text_null(Bookings::CheckoutUrl))
                    .col(text_null(Bookings::CancellationReason))
                    .col(timestamp_with_time_zone_null(Bookings::ConfirmedAt))
                    .col(
                        timestamp_with_time_zone(Bookings::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Bookings::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_event_id")
                            .from(Bookings::Table, Bookings::EventId)
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                ALTER TABLE bookings
                    ADD CONSTRAINT chk_bookings_quantity_positive CHECK (quantity > 0),
                    ADD CONSTRAINT chk_bookings_total_non_negative CHECK (total_amount >= 0),
                    ADD CONSTRAINT chk_bookings_status
                        CHECK (status IN ('pending_payment', 'confirmed', 'cancelled', 'payment_failed'))
                "#,
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_payment_reference")
                    .table(Bookings::Table)
                    .col(Bookings::PaymentReference)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // At most one non-terminal booking per (user, event)
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE UNIQUE INDEX idx_bookings_active_user_event
                    ON bookings (user_id, event_id)
                    WHERE status IN ('pending_payment', 'confirmed')
                "#,
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_user_id_created_at")
                    .table(Bookings::Table)
                    .col(Bookings::UserId)
                    .col(Bookings::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_event_id_status")
                    .table(Bookings::Table)
                    .col(Bookings::EventId)
                    .col(Bookings::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER bookings_touch_updated_at
                    BEFORE UPDATE ON bookings
                    FOR EACH ROW
                    EXECUTE FUNCTION util.touch_updated_at()
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TRIGGER IF EXISTS bookings_touch_updated_at ON bookings")
            .await?;

        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Bookings {
    Table,
    Id,
    EventId,
    UserId,
    ContactEmail,
    Quantity,
    TotalAmount,
    Status,
    PaymentProvider,
    Currency,
    PaymentReference,
    TransactionId,
    CheckoutUrl,
    CancellationReason,
    ConfirmedAt,
    CreatedAt,
    UpdatedAt,
}
