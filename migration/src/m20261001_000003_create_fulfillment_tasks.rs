//! Migration to create the pick_tasks and pack_tasks tables

use sea_orm_migration::{prelude::*, schema::*};

use super::m20261001_000001_create_orders::{OrderItems, Orders};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PickTasks::Table)
                    .if_not_exists()
                    .col(pk_auto(PickTasks::Id))
                    .col(integer(PickTasks::OrderId))
                    .col(integer(PickTasks::OrderItemId))
                    .col(string(PickTasks::Sku))
                    .col(integer(PickTasks::Quantity))
                    .col(integer(PickTasks::PickedQty).default(0))
                    .col(string_null(PickTasks::BinLocation))
                    .col(string_null(PickTasks::ToteId))
                    .col(string(PickTasks::Status).default("pending"))
                    .col(string_null(PickTasks::AssignedTo))
                    .col(text_null(PickTasks::ExceptionReason))
                    .col(timestamp_with_time_zone_null(PickTasks::StartedAt))
                    .col(timestamp_with_time_zone_null(PickTasks::CompletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pick_tasks_order_id")
                            .from(PickTasks::Table, PickTasks::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pick_tasks_order_item_id")
                            .from(PickTasks::Table, PickTasks::OrderItemId)
                            .to(OrderItems::Table, OrderItems::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pick_tasks_order_id")
                    .table(PickTasks::Table)
                    .col(PickTasks::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PackTasks::Table)
                    .if_not_exists()
                    .col(pk_auto(PackTasks::Id))
                    .col(integer(PackTasks::OrderId))
                    .col(string(PackTasks::Status).default("pending"))
                    .col(string_null(PackTasks::PackagingType))
                    .col(decimal_len_null(PackTasks::Weight, 10, 3))
                    .col(string_null(PackTasks::Dimensions))
                    .col(string_null(PackTasks::ToteId))
                    .col(timestamp_with_time_zone_null(PackTasks::StartedAt))
                    .col(timestamp_with_time_zone_null(PackTasks::CompletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pack_tasks_order_id")
                            .from(PackTasks::Table, PackTasks::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pack_tasks_order_id")
                    .table(PackTasks::Table)
                    .col(PackTasks::OrderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PackTasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PickTasks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PickTasks {
    Table,
    Id,
    OrderId,
    OrderItemId,
    Sku,
    Quantity,
    PickedQty,
    BinLocation,
    ToteId,
    Status,
    AssignedTo,
    ExceptionReason,
    StartedAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum PackTasks {
    Table,
    Id,
    OrderId,
    Status,
    PackagingType,
    Weight,
    Dimensions,
    ToteId,
    StartedAt,
    CompletedAt,
}
