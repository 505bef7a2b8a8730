//! Migration to create the address_verifications table
//!
//! One row per verification attempt; an order may have many.

use sea_orm_migration::{prelude::*, schema::*};

use super::m20261001_000001_create_orders::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AddressVerifications::Table)
                    .if_not_exists()
                    .col(pk_auto(AddressVerifications::Id))
                    .col(integer(AddressVerifications::OrderId))
                    .col(text(AddressVerifications::OriginalAddress))
                    .col(text_null(AddressVerifications::VerifiedAddress))
                    .col(string(AddressVerifications::Status).default("pending"))
                    .col(string(AddressVerifications::VerificationMethod))
                    .col(string_len_null(AddressVerifications::NasCode, 8))
                    .col(text_null(AddressVerifications::ErrorMessage))
                    .col(timestamp_with_time_zone(AddressVerifications::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone_null(AddressVerifications::CompletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_address_verifications_order_id")
                            .from(AddressVerifications::Table, AddressVerifications::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_address_verifications_order_id")
                    .table(AddressVerifications::Table)
                    .col(AddressVerifications::OrderId)
                    .to_owned(),
            )
            .await?;

        // The pending sweep scans by status and age
        manager
            .create_index(
                Index::create()
                    .name("idx_address_verifications_status_created")
                    .table(AddressVerifications::Table)
                    .col(AddressVerifications::Status)
                    .col(AddressVerifications::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AddressVerifications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AddressVerifications {
    Table,
    Id,
    OrderId,
    OriginalAddress,
    VerifiedAddress,
    Status,
    VerificationMethod,
    NasCode,
    ErrorMessage,
    CreatedAt,
    CompletedAt,
}
