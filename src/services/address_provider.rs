//! Seam between the verification workflow and external address databases

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::models::address::{ProviderAddress, VerificationSource};
use crate::services::error::ProviderError;

/// Positive lookups are cached for an hour
const CACHE_TTL_SECS: u64 = 3600;
const CACHE_CAPACITY: u64 = 10_000;

/// An external address database that resolves NAS shortcodes
#[async_trait]
pub trait AddressProvider: Send + Sync {
    fn source(&self) -> VerificationSource;

    /// `Ok(None)` means the provider answered and has no such code
    async fn lookup(&self, short_code: &str) -> Result<Option<ProviderAddress>, ProviderError>;
}

pub type ProviderCache = Arc<Cache<String, ProviderAddress>>;

pub fn new_provider_cache() -> ProviderCache {
    Arc::new(
        Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(Duration::from_secs(CACHE_TTL_SECS))
            .build(),
    )
}

/// Run a lookup under a hard deadline
pub async fn lookup_with_timeout(
    provider: &dyn AddressProvider,
    short_code: &str,
    timeout: Duration,
) -> Result<Option<ProviderAddress>, ProviderError> {
    match tokio::time::timeout(timeout, provider.lookup(short_code)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(format!(
            "{} did not answer within {}ms",
            provider.source(),
            timeout.as_millis()
        ))),
    }
}
