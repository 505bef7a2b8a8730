//! Address verification types
//!
//! Provider answers are normalized into [`ProviderAddress`] whichever
//! provider produced them; [`VerificationResult`] tags the answer with its
//! source so callers know who answered.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::order::{AddressInput, Coordinates};

/// How `verify_address` should query providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// SPL only
    Spl,
    /// SPL first, a single NAS fallback on not-found or failure
    #[default]
    Unified,
}

impl VerificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMode::Spl => "spl",
            VerificationMode::Unified => "unified",
        }
    }
}

/// Provider that produced a verification answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationSource {
    Spl,
    Nas,
}

impl VerificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationSource::Spl => "spl",
            VerificationSource::Nas => "nas",
        }
    }

    /// Integration registry name for this provider
    pub fn integration_name(&self) -> &'static str {
        match self {
            VerificationSource::Spl => "spl_national_address",
            VerificationSource::Nas => "nas_address_lookup",
        }
    }
}

impl std::fmt::Display for VerificationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of one address_verifications row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Failed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Address returned by a provider, normalized across SPL and NAS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAddress {
    pub short_code: String,
    pub full_address: String,
    pub city: Option<String>,
    pub district: Option<String>,
    pub postal_code: Option<String>,
    pub additional_code: Option<String>,
    pub coordinates: Option<Coordinates>,
}

/// Outcome of a verification attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    pub found: bool,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ProviderAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    pub source: VerificationSource,
    pub nas_code: String,
    /// address_verifications row recording this attempt
    pub verification_id: i32,
}

/// Request body for POST /api/orders/{id}/verify-address
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyAddressRequest {
    #[serde(default)]
    pub mode: VerificationMode,
}

/// Request body for POST /api/address/extract-nas
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractNasRequest {
    pub address: AddressInput,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractNasResponse {
    pub nas_code: Option<String>,
}

/// Request body for POST /api/address/verify-batch
#[derive(Debug, Clone, Deserialize)]
pub struct BatchVerifyRequest {
    pub codes: Vec<String>,
}

/// Code → validity map that keeps input order and holds each input once
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchVerificationResult {
    entries: Vec<(String, bool)>,
}

impl BatchVerificationResult {
    /// Record a code; a code already present keeps its first result
    pub fn insert(&mut self, code: String, valid: bool) {
        if !self.entries.iter().any(|(existing, _)| *existing == code) {
            self.entries.push((code, valid));
        }
    }

    pub fn get(&self, code: &str) -> Option<bool> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == code)
            .map(|(_, valid)| *valid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(code, _)| code.as_str())
    }
}

impl Serialize for BatchVerificationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (code, valid) in &self.entries {
            map.serialize_entry(code, valid)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_result_keeps_input_order() {
        let mut result = BatchVerificationResult::default();
        result.insert("RIYD2342".to_string(), true);
        result.insert("BADCODE9".to_string(), false);
        result.insert("JEDD1234".to_string(), true);

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"RIYD2342":true,"BADCODE9":false,"JEDD1234":true}"#);
    }

    #[test]
    fn test_batch_result_first_entry_wins() {
        let mut result = BatchVerificationResult::default();
        result.insert("RIYD2342".to_string(), true);
        result.insert("RIYD2342".to_string(), false);

        assert_eq!(result.len(), 1);
        assert_eq!(result.get("RIYD2342"), Some(true));
        assert_eq!(result.get("JEDD1234"), None);
    }

    #[test]
    fn test_verify_request_defaults_to_unified() {
        let request: VerifyAddressRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.mode, VerificationMode::Unified);

        let request: VerifyAddressRequest = serde_json::from_str(r#"{"mode":"spl"}"#).unwrap();
        assert_eq!(request.mode, VerificationMode::Spl);
    }
}
