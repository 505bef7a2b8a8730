//! Migration to create the integrations registry table

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Integrations::Table)
                    .if_not_exists()
                    .col(pk_auto(Integrations::Id))
                    .col(string_len_uniq(Integrations::Name, 100))
                    .col(string(Integrations::Category))
                    .col(boolean(Integrations::IsEnabled).default(true))
                    .col(text_null(Integrations::Config))
                    .col(big_integer(Integrations::SuccessCount).default(0))
                    .col(big_integer(Integrations::FailureCount).default(0))
                    .col(timestamp_with_time_zone_null(Integrations::LastSyncAt))
                    .col(text_null(Integrations::LastError))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Integrations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Integrations {
    Table,
    Id,
    Name,
    Category,
    IsEnabled,
    Config,
    SuccessCount,
    FailureCount,
    LastSyncAt,
    LastError,
}
