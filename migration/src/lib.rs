pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_orders;
mod m20261001_000002_create_address_verifications;
mod m20261001_000003_create_fulfillment_tasks;
mod m20261001_000004_create_manifests;
mod m20261001_000005_create_routes;
mod m20261001_000006_create_events;
mod m20261001_000007_create_integrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_orders::Migration),
            Box::new(m20261001_000002_create_address_verifications::Migration),
            Box::new(m20261001_000003_create_fulfillment_tasks::Migration),
            Box::new(m20261001_000004_create_manifests::Migration),
            Box::new(m20261001_000005_create_routes::Migration),
            Box::new(m20261001_000006_create_events::Migration),
            Box::new(m20261001_000007_create_integrations::Migration),
        ]
    }
}
