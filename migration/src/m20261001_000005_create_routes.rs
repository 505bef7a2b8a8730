//! Migration to create the routes and route_stops tables

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
                    .table(Routes::Table)
                    .if_not_exists()
                    .col(pk_auto(Routes::Id))
                    .col(string_len_uniq(Routes::RouteNumber, 32))
                    .col(string(Routes::DriverName))
                    .col(string_null(Routes::VehicleNumber))
                    .col(string(Routes::Status).default("planned"))
                    .col(timestamp_with_time_zone(Routes::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RouteStops::Table)
                    .if_not_exists()
                    .col(pk_auto(RouteStops::Id))
                    .col(integer(RouteStops::RouteId))
                    .col(integer(RouteStops::OrderId))
                    .col(integer(RouteStops::StopSequence))
                    .col(string(RouteStops::Status).default("pending"))
                    .col(integer(RouteStops::Attempts).default(0))
                    .col(text_null(RouteStops::FailureReason))
                    .col(timestamp_with_time_zone_null(RouteStops::DeliveredAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_route_stops_route_id")
                            .from(RouteStops::Table, RouteStops::RouteId)
                            .to(Routes::Table, Routes::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_route_stops_order_id")
                            .from(RouteStops::Table, RouteStops::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // stop_sequence is unique within a route
        manager
            .create_index(
                Index::create()
                    .name("idx_route_stops_route_sequence")
                    .table(RouteStops::Table)
                    .col(RouteStops::RouteId)
                    .col(RouteStops::StopSequence)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RouteStops::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Routes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Routes {
    Table,
    Id,
    RouteNumber,
    DriverName,
    VehicleNumber,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RouteStops {
    Table,
    Id,
    RouteId,
    OrderId,
    StopSequence,
    Status,
    Attempts,
    FailureReason,
    DeliveredAt,
}
