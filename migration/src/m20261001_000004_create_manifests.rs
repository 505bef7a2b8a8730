//! Migration to create the manifests and manifest_items tables

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
                    .table(Manifests::Table)
                    .if_not_exists()
                    .col(pk_auto(Manifests::Id))
                    .col(string_len_uniq(Manifests::ManifestNumber, 32))
                    .col(string(Manifests::CourierName))
                    .col(string(Manifests::Status).default("open"))
                    .col(integer(Manifests::TotalPackages).default(0))
                    .col(timestamp_with_time_zone(Manifests::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone_null(Manifests::HandedOverAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ManifestItems::Table)
                    .if_not_exists()
                    .col(pk_auto(ManifestItems::Id))
                    .col(integer(ManifestItems::ManifestId))
                    .col(integer(ManifestItems::OrderId))
                    .col(string_null(ManifestItems::TrackingNumber))
                    .col(string(ManifestItems::Status).default("pending"))
                    .col(timestamp_with_time_zone_null(ManifestItems::ScannedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_manifest_items_manifest_id")
                            .from(ManifestItems::Table, ManifestItems::ManifestId)
                            .to(Manifests::Table, Manifests::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_manifest_items_order_id")
                            .from(ManifestItems::Table, ManifestItems::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // An order ships on at most one manifest
        manager
            .create_index(
                Index::create()
                    .name("idx_manifest_items_order_id")
                    .table(ManifestItems::Table)
                    .col(ManifestItems::OrderId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_manifest_items_manifest_id")
                    .table(ManifestItems::Table)
                    .col(ManifestItems::ManifestId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ManifestItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Manifests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Manifests {
    Table,
    Id,
    ManifestNumber,
    CourierName,
    Status,
    TotalPackages,
    CreatedAt,
    HandedOverAt,
}

#[derive(DeriveIden)]
enum ManifestItems {
    Table,
    Id,
    ManifestId,
    OrderId,
    TrackingNumber,
    Status,
    ScannedAt,
}
