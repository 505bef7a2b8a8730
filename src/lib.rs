// src/lib.rs

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use config::AppConfig;
use services::{
    address_provider::AddressProvider, error::ProviderError, nas_provider::NasClient,
    spl::SplClient,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub spl: Arc<dyn AddressProvider>,
    pub nas: Arc<dyn AddressProvider>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// State backed by the real SPL and NAS clients
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Result<Self, ProviderError> {
        let spl = SplClient::new(&config.spl, config.provider_timeout)?;
        let nas = NasClient::new(&config.nas, config.provider_timeout)?;

        Ok(Self {
            db,
            spl: Arc::new(spl),
            nas: Arc::new(nas),
            config: Arc::new(config),
        })
    }
}

pub mod entities {
    pub mod prelude;
    pub mod address_verifications;
    pub mod events;
    pub mod integrations;
    pub mod manifest_items;
    pub mod manifests;
    pub mod order_items;
    pub mod orders;
    pub mod pack_tasks;
    pub mod pick_tasks;
    pub mod route_stops;
    pub mod routes;
}

pub mod services {
    pub mod address_provider;
    pub mod address_verification;
    pub mod delivery_routes;
    pub mod error;
    pub mod event_log;
    pub mod fulfillment;
    pub mod integration_registry;
    pub mod manifests;
    pub mod nas;
    pub mod nas_provider;
    pub mod order_lifecycle;
    pub mod orders;
    pub mod spl;
}

pub mod config;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod router;
