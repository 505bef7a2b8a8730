//! Migration to create the orders and order_items tables

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(pk_auto(Orders::Id))
                    .col(string_len_uniq(Orders::SaylogixNumber, 32))
                    .col(string(Orders::SourceOrderNumber))
                    .col(string(Orders::SourceChannel))
                    .col(string(Orders::Status).default("fetched"))
                    .col(string(Orders::CustomerName))
                    .col(string_null(Orders::CustomerPhone))
                    .col(string_null(Orders::CustomerEmail))
                    // Structured addresses are stored as JSON text
                    .col(text(Orders::ShippingAddress))
                    .col(text_null(Orders::BillingAddress))
                    .col(text_null(Orders::Coordinates))
                    .col(string_len_null(Orders::NasCode, 8))
                    .col(boolean(Orders::NasVerified).default(false))
                    .col(text_null(Orders::VerifiedAddress))
                    .col(timestamp_with_time_zone_null(Orders::VerificationTimestamp))
                    .col(decimal_len(Orders::OrderValue, 12, 2))
                    .col(string_len(Orders::Currency, 3).default("SAR"))
                    // Milestones, in canonical order
                    .col(timestamp_with_time_zone_null(Orders::OrderFetched))
                    .col(timestamp_with_time_zone_null(Orders::VerifyCompleted))
                    .col(timestamp_with_time_zone_null(Orders::PickingStarted))
                    .col(timestamp_with_time_zone_null(Orders::PickingCompleted))
                    .col(timestamp_with_time_zone_null(Orders::PackingCompleted))
                    .col(timestamp_with_time_zone_null(Orders::Dispatched))
                    .col(timestamp_with_time_zone_null(Orders::Delivered))
                    .col(integer(Orders::Version).default(1))
                    .col(timestamp_with_time_zone(Orders::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Orders::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        // A channel's order number is only unique within that channel
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_source_ref")
                    .table(Orders::Table)
                    .col(Orders::SourceChannel)
                    .col(Orders::SourceOrderNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_status")
                    .table(Orders::Table)
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(pk_auto(OrderItems::Id))
                    .col(integer(OrderItems::OrderId))
                    .col(string(OrderItems::Sku))
                    .col(string(OrderItems::ProductName))
                    .col(integer(OrderItems::Quantity))
                    .col(decimal_len(OrderItems::UnitPrice, 12, 2))
                    .col(decimal_len(OrderItems::TotalPrice, 12, 2))
                    .col(boolean(OrderItems::Picked).default(false))
                    .col(boolean(OrderItems::Packed).default(false))
                    .col(string_null(OrderItems::BinLocation))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_order_id")
                            .from(OrderItems::Table, OrderItems::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_items_order_id")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    Id,
    SaylogixNumber,
    SourceOrderNumber,
    SourceChannel,
    Status,
    CustomerName,
    CustomerPhone,
    CustomerEmail,
    ShippingAddress,
    BillingAddress,
    Coordinates,
    NasCode,
    NasVerified,
    VerifiedAddress,
    VerificationTimestamp,
    OrderValue,
    Currency,
    OrderFetched,
    VerifyCompleted,
    PickingStarted,
    PickingCompleted,
    PackingCompleted,
    Dispatched,
    Delivered,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum OrderItems {
    Table,
    Id,
    OrderId,
    Sku,
    ProductName,
    Quantity,
    UnitPrice,
    TotalPrice,
    Picked,
    Packed,
    BinLocation,
}
