//! Migration to create the append-only events table

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
                    .col(pk_auto(Events::Id))
                    .col(string(Events::EntityType))
                    .col(integer(Events::EntityId))
                    .col(string(Events::EventType))
                    .col(text(Events::Description))
                    .col(text_null(Events::PreviousState))
                    .col(text_null(Events::NewState))
                    .col(text_null(Events::Metadata))
                    .col(timestamp_with_time_zone(Events::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_events_entity")
                    .table(Events::Table)
                    .col(Events::EntityType)
                    .col(Events::EntityId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    EntityType,
    EntityId,
    EventType,
    Description,
    PreviousState,
    NewState,
    Metadata,
    CreatedAt,
}
