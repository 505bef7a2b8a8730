#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, EntityTrait};
use sea_orm_migration::MigratorTrait;

use saylogix_backend::config::AppConfig;
use saylogix_backend::entities::prelude::*;
use saylogix_backend::entities::{orders, pick_tasks};
use saylogix_backend::models::address::{ProviderAddress, VerificationSource};
use saylogix_backend::models::order::{Address, Coordinates, CreateOrderItemRequest, CreateOrderRequest, OrderStatus};
use saylogix_backend::services::address_provider::AddressProvider;
use saylogix_backend::services::error::ProviderError;
use saylogix_backend::services::nas::NasMatchPolicy;
use saylogix_backend::services::{fulfillment, order_lifecycle, orders as order_service};
use saylogix_backend::AppState;

/// Fresh in-memory database with all migrations applied.
///
/// SQLite in-memory databases live and die with their connection, so the
/// pool is pinned to exactly one.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// What a scripted provider does for one code
#[derive(Clone, Debug)]
pub enum Scripted {
    Found(ProviderAddress),
    NotFound,
    Fail(ProviderError),
    /// Never answers within any sane timeout
    Hang,
}

/// Address provider double. Unscripted codes are not found.
pub struct ScriptedProvider {
    source: VerificationSource,
    answers: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(source: VerificationSource) -> Self {
        Self {
            source,
            answers: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(self, code: &str, answer: Scripted) -> Self {
        self.answers.lock().insert(code.to_string(), answer);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AddressProvider for ScriptedProvider {
    fn source(&self) -> VerificationSource {
        self.source
    }

    async fn lookup(&self, short_code: &str) -> Result<Option<ProviderAddress>, ProviderError> {
        self.calls.lock().push(short_code.to_string());
        let answer = self.answers.lock().get(short_code).cloned();

        match answer {
            Some(Scripted::Found(address)) => Ok(Some(address)),
            Some(Scripted::NotFound) | None => Ok(None),
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(None)
            }
        }
    }
}

pub fn provider_address(code: &str, with_coordinates: bool) -> ProviderAddress {
    ProviderAddress {
        short_code: code.to_string(),
        full_address: format!("{} King Fahd Rd, Al Olaya, Riyadh 12214", code),
        city: Some("Riyadh".to_string()),
        district: Some("Al Olaya".to_string()),
        postal_code: Some("12214".to_string()),
        additional_code: Some("2342".to_string()),
        coordinates: with_coordinates.then_some(Coordinates {
            lat: 24.7136,
            lng: 46.6753,
        }),
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        provider_timeout: Duration::from_millis(200),
        batch_verify_concurrency: 2,
        nas_match_policy: NasMatchPolicy::First,
        ..Default::default()
    }
}

pub fn test_state(
    db: DatabaseConnection,
    spl: Arc<ScriptedProvider>,
    nas: Arc<ScriptedProvider>,
) -> AppState {
    AppState {
        db,
        spl,
        nas,
        config: Arc::new(test_config()),
    }
}

pub fn empty_providers() -> (Arc<ScriptedProvider>, Arc<ScriptedProvider>) {
    (
        Arc::new(ScriptedProvider::new(VerificationSource::Spl)),
        Arc::new(ScriptedProvider::new(VerificationSource::Nas)),
    )
}

/// Two-line order; shortcode RIYD2342 sits in the street line
pub fn order_request(source_order_number: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        source_order_number: source_order_number.to_string(),
        source_channel: "shopify".to_string(),
        customer_name: "Sara Al-Harbi".to_string(),
        customer_phone: Some("+966500000000".to_string()),
        customer_email: None,
        shipping_address: Address {
            address1: Some("12 Olaya St RIYD2342".to_string()),
            city: Some("Riyadh".to_string()),
            country: Some("SA".to_string()),
            ..Default::default()
        },
        billing_address: None,
        nas_code: None,
        order_value: dec!(223.25),
        currency: None,
        items: vec![
            CreateOrderItemRequest {
                sku: "MUG-01".to_string(),
                product_name: "Mug".to_string(),
                quantity: 2,
                unit_price: dec!(74.25),
            },
            CreateOrderItemRequest {
                sku: "TEE-01".to_string(),
                product_name: "T-shirt".to_string(),
                quantity: 1,
                unit_price: dec!(74.75),
            },
        ],
    }
}

pub async fn create_order(db: &DatabaseConnection, source_order_number: &str) -> orders::Model {
    let (order, _) = order_service::create_order(db, order_request(source_order_number), NasMatchPolicy::First)
        .await
        .expect("Failed to create order");
    order
}

pub async fn reload_order(db: &DatabaseConnection, order_id: i32) -> orders::Model {
    Orders::find_by_id(order_id)
        .one(db)
        .await
        .expect("Failed to load order")
        .expect("Order missing")
}

pub async fn pick_tasks_for(db: &DatabaseConnection, order_id: i32) -> Vec<pick_tasks::Model> {
    order_service::list_pick_tasks(db, order_id)
        .await
        .expect("Failed to list pick tasks")
}

pub async fn event_count(db: &DatabaseConnection) -> usize {
    Events::find().all(db).await.expect("Failed to list events").len()
}

/// fetched → validated → every pick task fully scanned → picked
pub async fn advance_to_picked(db: &DatabaseConnection, order_id: i32) -> orders::Model {
    order_lifecycle::advance_order_status(db, order_id, OrderStatus::Validated)
        .await
        .expect("validate");

    for task in pick_tasks_for(db, order_id).await {
        fulfillment::record_pick_scan(db, task.id, task.quantity, Some("A-01-03".to_string()))
            .await
            .expect("scan");
    }

    order_lifecycle::advance_order_status(db, order_id, OrderStatus::Picked)
        .await
        .expect("pick")
}

/// ... → picked → pack task completed → packed
pub async fn advance_to_packed(db: &DatabaseConnection, order_id: i32) -> orders::Model {
    advance_to_picked(db, order_id).await;

    let pack_tasks = order_service::list_pack_tasks(db, order_id)
        .await
        .expect("Failed to list pack tasks");
    for task in pack_tasks {
        fulfillment::complete_pack_task(
            db,
            task.id,
            saylogix_backend::models::fulfillment::CompletePackTaskRequest {
                weight: Some(dec!(1.25)),
                packaging_type: Some("box_small".to_string()),
                dimensions: Some("30x20x10".to_string()),
            },
        )
        .await
        .expect("pack");
    }

    order_lifecycle::advance_order_status(db, order_id, OrderStatus::Packed)
        .await
        .expect("packed")
}

pub async fn advance_to_dispatched(db: &DatabaseConnection, order_id: i32) -> orders::Model {
    advance_to_packed(db, order_id).await;
    order_lifecycle::advance_order_status(db, order_id, OrderStatus::Dispatched)
        .await
        .expect("dispatch")
}
