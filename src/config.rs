//! Environment-driven configuration
//!
//! Values come from the process environment, after `.env` has been loaded
//! with dotenvy in `main`.

use std::env;
use std::time::Duration;

use crate::services::nas::NasMatchPolicy;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SPL_BASE_URL: &str = "https://apina.address.gov.sa/NationalAddress/v3.1";
const DEFAULT_NAS_BASE_URL: &str = "https://api.nas.sa/v1";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_BATCH_VERIFY_CONCURRENCY: usize = 4;
const DEFAULT_VERIFICATION_PENDING_TTL_SECS: i64 = 300;
const DEFAULT_VERIFICATION_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_MANIFEST_RECONCILE_INTERVAL_SECS: u64 = 3600;

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => {
                write!(f, "{} has an invalid value: {}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Address provider connection settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub spl: ProviderConfig,
    pub nas: ProviderConfig,
    /// Upper bound on any single provider call
    pub provider_timeout: Duration,
    pub batch_verify_concurrency: usize,
    pub nas_match_policy: NasMatchPolicy,
    /// Age after which a pending verification row is swept to failed
    pub verification_pending_ttl_secs: i64,
    pub verification_sweep_interval_secs: u64,
    pub manifest_reconcile_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let nas_match_policy = match env::var("NAS_MATCH_POLICY") {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "NAS_MATCH_POLICY",
                value,
            })?,
            Err(_) => NasMatchPolicy::default(),
        };

        Ok(Self {
            database_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            spl: ProviderConfig {
                base_url: env::var("SPL_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_SPL_BASE_URL.to_string()),
                api_key: env::var("SPL_API_KEY").unwrap_or_default(),
            },
            nas: ProviderConfig {
                base_url: env::var("NAS_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_NAS_BASE_URL.to_string()),
                api_key: env::var("NAS_API_KEY").unwrap_or_default(),
            },
            provider_timeout: Duration::from_secs(parse_or(
                "PROVIDER_TIMEOUT_SECS",
                DEFAULT_PROVIDER_TIMEOUT_SECS,
            )?),
            batch_verify_concurrency: parse_or(
                "BATCH_VERIFY_CONCURRENCY",
                DEFAULT_BATCH_VERIFY_CONCURRENCY,
            )?
            .max(1),
            nas_match_policy,
            verification_pending_ttl_secs: parse_or(
                "VERIFICATION_PENDING_TTL_SECS",
                DEFAULT_VERIFICATION_PENDING_TTL_SECS,
            )?,
            verification_sweep_interval_secs: parse_or(
                "VERIFICATION_SWEEP_INTERVAL_SECS",
                DEFAULT_VERIFICATION_SWEEP_INTERVAL_SECS,
            )?,
            manifest_reconcile_interval_secs: parse_or(
                "MANIFEST_RECONCILE_INTERVAL_SECS",
                DEFAULT_MANIFEST_RECONCILE_INTERVAL_SECS,
            )?,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            spl: ProviderConfig {
                base_url: DEFAULT_SPL_BASE_URL.to_string(),
                api_key: String::new(),
            },
            nas: ProviderConfig {
                base_url: DEFAULT_NAS_BASE_URL.to_string(),
                api_key: String::new(),
            },
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            batch_verify_concurrency: DEFAULT_BATCH_VERIFY_CONCURRENCY,
            nas_match_policy: NasMatchPolicy::default(),
            verification_pending_ttl_secs: DEFAULT_VERIFICATION_PENDING_TTL_SECS,
            verification_sweep_interval_secs: DEFAULT_VERIFICATION_SWEEP_INTERVAL_SECS,
            manifest_reconcile_interval_secs: DEFAULT_MANIFEST_RECONCILE_INTERVAL_SECS,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}
