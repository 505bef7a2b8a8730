//! SPL national address database client
//!
//! GET {base_url}/address/shortcode/{code} with an `api_key` header.
//! 404 means the shortcode does not exist.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::models::address::{ProviderAddress, VerificationSource};
use crate::models::order::Coordinates;
use crate::services::address_provider::{new_provider_cache, AddressProvider, ProviderCache};
use crate::services::error::ProviderError;

#[derive(Clone)]
pub struct SplClient {
    client: Client,
    api_key: String,
    base_url: String,
    cache: ProviderCache,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SplAddressResponse {
    short_code: String,
    full_address: String,
    postal_code: Option<String>,
    additional_code: Option<String>,
    city: Option<String>,
    district: Option<String>,
    coordinates: Option<SplCoordinates>,
}

#[derive(Debug, Deserialize)]
struct SplCoordinates {
    lat: f64,
    lng: f64,
}

impl From<SplAddressResponse> for ProviderAddress {
    fn from(response: SplAddressResponse) -> Self {
        ProviderAddress {
            short_code: response.short_code.to_uppercase(),
            full_address: response.full_address,
            city: response.city,
            district: response.district,
            postal_code: response.postal_code,
            additional_code: response.additional_code,
            coordinates: response.coordinates.map(|c| Coordinates {
                lat: c.lat,
                lng: c.lng,
            }),
        }
    }
}

impl SplClient {
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to build SPL client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache: new_provider_cache(),
        })
    }
}

#[async_trait]
impl AddressProvider for SplClient {
    fn source(&self) -> VerificationSource {
        VerificationSource::Spl
    }

    async fn lookup(&self, short_code: &str) -> Result<Option<ProviderAddress>, ProviderError> {
        if let Some(cached) = self.cache.get(short_code).await {
            tracing::debug!("SPL cache hit for {}", short_code);
            return Ok(Some(cached));
        }

        tracing::info!("Looking up {} in SPL", short_code);

        let url = format!("{}/address/shortcode/{}", self.base_url, short_code);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .header("api_key", &self.api_key)
            .query(&[("format", "json"), ("language", "E")])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::info!("SPL has no address for {}", short_code);
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!(
                "SPL API error {}: {}",
                status, error_text
            )));
        }

        let data: SplAddressResponse = response.json().await?;
        let address = ProviderAddress::from(data);

        self.cache
            .insert(short_code.to_string(), address.clone())
            .await;

        Ok(Some(address))
    }
}
