//! Secondary NAS lookup service, used as the fallback behind SPL
//!
//! GET {base_url}/verify?code={code} with a bearer token.
//! Answers carry no coordinates.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::models::address::{ProviderAddress, VerificationSource};
use crate::services::address_provider::{new_provider_cache, AddressProvider, ProviderCache};
use crate::services::error::ProviderError;

#[derive(Clone)]
pub struct NasClient {
    client: Client,
    api_key: String,
    base_url: String,
    cache: ProviderCache,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NasVerifyResponse {
    address: String,
    city: Option<String>,
    district: Option<String>,
    postal_code: Option<String>,
}

impl NasClient {
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to build NAS client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache: new_provider_cache(),
        })
    }
}

/// Join the NAS parts into one line, skipping empty parts
fn format_nas_address(response: &NasVerifyResponse) -> String {
    [
        Some(response.address.as_str()),
        response.district.as_deref(),
        response.city.as_deref(),
        response.postal_code.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

#[async_trait]
impl AddressProvider for NasClient {
    fn source(&self) -> VerificationSource {
        VerificationSource::Nas
    }

    async fn lookup(&self, short_code: &str) -> Result<Option<ProviderAddress>, ProviderError> {
        if let Some(cached) = self.cache.get(short_code).await {
            tracing::debug!("NAS cache hit for {}", short_code);
            return Ok(Some(cached));
        }

        tracing::info!("Looking up {} in NAS fallback", short_code);

        let url = format!("{}/verify", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .bearer_auth(&self.api_key)
            .query(&[("code", short_code)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::info!("NAS has no address for {}", short_code);
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!(
                "NAS API error {}: {}",
                status, error_text
            )));
        }

        let data: NasVerifyResponse = response.json().await?;
        let address = ProviderAddress {
            short_code: short_code.to_uppercase(),
            full_address: format_nas_address(&data),
            city: data.city,
            district: data.district,
            postal_code: data.postal_code,
            additional_code: None,
            coordinates: None,
        };

        self.cache
            .insert(short_code.to_string(), address.clone())
            .await;

        Ok(Some(address))
    }
}
