use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(pk_uuid(Events::Id))
                    .col(uuid(Events::OrganizerId))
                    .col(string(Events::Title))
                    .col(integer(Events::Capacity))
                    .col(big_integer(Events::Price).default(0))
                    .col(timestamp_with_time_zone(Events::RegistrationDeadline))
                    .col(string_len(Events::Status, 32).default("draft"))
                    .col(integer(Events::RegisteredCount).default(0))
                    .col(
                        timestamp_with_time_zone(Events::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Events::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Domain bounds
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                ALTER TABLE events
                    ADD CONSTRAINT chk_events_capacity_positive CHECK (capacity > 0),
                    ADD CONSTRAINT chk_events_price_non_negative CHECK (price >= 0),
                    ADD CONSTRAINT chk_events_registered_within_capacity
                        CHECK (registered_count >= 0 AND registered_count <= capacity),
                    ADD CONSTRAINT chk_events_status
                        CHECK (status IN ('draft', 'published', 'cancelled', 'completed'))
                "#,
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_events_status")
                    .table(Events::Table)
                    .col(Events::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_events_organizer_id")
                    .table(Events::Table)
                    .col(Events::OrganizerId)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER events_touch_updated_at
                    BEFORE UPDATE ON events
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
            .execute_unprepared("DROP TRIGGER IF EXISTS events_touch_updated_at ON events")
            .await?;

        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Events {
    Table,
    Id,
    OrganizerId,
    Title,
    Capacity,
    Price,
    RegistrationDeadline,
    Status,
    RegisteredCount,
    CreatedAt,
    UpdatedAt,
}
