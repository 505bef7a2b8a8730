//! National Address Shortcode extraction
//!
//! A shortcode is four ASCII letters followed by four digits (`RIYD2342`).
//! Matching is case-insensitive; results are always uppercased.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::order::{Address, AddressInput};

lazy_static! {
    static ref NAS_PATTERN: Regex = Regex::new(r"[A-Za-z]{4}[0-9]{4}").unwrap();
    static ref NAS_EXACT: Regex = Regex::new(r"^[A-Za-z]{4}[0-9]{4}$").unwrap();
}

/// What to do when an address contains more than one candidate code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NasMatchPolicy {
    /// Take the first candidate in the text
    #[default]
    First,
    /// Only accept an address with exactly one distinct candidate
    Unique,
}

impl std::str::FromStr for NasMatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(NasMatchPolicy::First),
            "unique" => Ok(NasMatchPolicy::Unique),
            _ => Err(format!("Unknown NAS match policy: {}", s)),
        }
    }
}

/// Text searched for a shortcode: the string itself, or
/// `address1 address2 city zip` joined with single spaces.
pub fn search_text(address: &AddressInput) -> String {
    match address {
        AddressInput::Text(text) => text.clone(),
        AddressInput::Structured(Address {
            address1,
            address2,
            city,
            zip,
            ..
        }) => [address1, address2, city, zip]
            .iter()
            .map(|field| field.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// All candidate shortcodes in the address, uppercased, in order of appearance
pub fn nas_candidates(address: &AddressInput) -> Vec<String> {
    NAS_PATTERN
        .find_iter(&search_text(address))
        .map(|m| m.as_str().to_uppercase())
        .collect()
}

/// Extract a shortcode under the given policy
pub fn extract_nas_with_policy(address: &AddressInput, policy: NasMatchPolicy) -> Option<String> {
    let candidates = nas_candidates(address);

    if candidates.len() > 1 {
        tracing::debug!(
            candidates = ?candidates,
            policy = ?policy,
            "Address contains more than one NAS candidate"
        );
    }

    match policy {
        NasMatchPolicy::First => candidates.into_iter().next(),
        NasMatchPolicy::Unique => {
            let first = candidates.first()?;
            if candidates.iter().all(|c| c == first) {
                Some(first.clone())
            } else {
                None
            }
        }
    }
}

/// First shortcode found in the address, uppercased. Pure; no I/O.
pub fn extract_nas_from_address(address: &AddressInput) -> Option<String> {
    extract_nas_with_policy(address, NasMatchPolicy::First)
}

/// Validate and normalize a standalone shortcode
pub fn normalize_short_code(code: &str) -> Option<String> {
    let trimmed = code.trim();
    if NAS_EXACT.is_match(trimmed) {
        Some(trimmed.to_uppercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured(address1: &str, city: &str, zip: &str) -> AddressInput {
        AddressInput::Structured(Address {
            address1: Some(address1.to_string()),
            city: Some(city.to_string()),
            zip: Some(zip.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_extract_from_free_text() {
        assert_eq!(
            extract_nas_from_address(&"12 Olaya St, RIYD2342, Riyadh".into()),
            Some("RIYD2342".to_string())
        );
    }

    #[test]
    fn test_extract_from_structured_address() {
        assert_eq!(
            extract_nas_from_address(&structured("Flat 5", "Jeddah", "JEDD1234")),
            Some("JEDD1234".to_string())
        );
    }

    #[test]
    fn test_no_code_returns_none() {
        assert_eq!(extract_nas_from_address(&"No code here".into()), None);
        assert_eq!(extract_nas_from_address(&AddressInput::Structured(Address::default())), None);
    }

    #[test]
    fn test_lowercase_input_is_uppercased() {
        assert_eq!(
            extract_nas_from_address(&"building riyd2342".into()),
            Some("RIYD2342".to_string())
        );
    }

    #[test]
    fn test_first_match_wins() {
        let address: AddressInput = "Ref ABCD0001 deliver to RIYD2342".into();
        assert_eq!(extract_nas_from_address(&address), Some("ABCD0001".to_string()));
        assert_eq!(
            nas_candidates(&address),
            vec!["ABCD0001".to_string(), "RIYD2342".to_string()]
        );
    }

    #[test]
    fn test_unique_policy_rejects_ambiguous_address() {
        let ambiguous: AddressInput = "Ref ABCD0001 deliver to RIYD2342".into();
        assert_eq!(extract_nas_with_policy(&ambiguous, NasMatchPolicy::Unique), None);

        let repeated: AddressInput = "RIYD2342 (riyd2342)".into();
        assert_eq!(
            extract_nas_with_policy(&repeated, NasMatchPolicy::Unique),
            Some("RIYD2342".to_string())
        );
    }

    #[test]
    fn test_structured_fields_joined_with_spaces() {
        let address = AddressInput::Structured(Address {
            address1: Some("RIYD".to_string()),
            zip: Some("2342".to_string()),
            ..Default::default()
        });
        // address1, empty address2, empty city, zip
        assert_eq!(search_text(&address), "RIYD   2342");
        assert_eq!(extract_nas_from_address(&address), None);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let address: AddressInput = "12 Olaya St, RIYD2342, Riyadh".into();
        let first = extract_nas_from_address(&address);
        for _ in 0..10 {
            assert_eq!(extract_nas_from_address(&address), first);
        }
    }

    #[test]
    fn test_normalize_short_code() {
        assert_eq!(normalize_short_code(" riyd2342 "), Some("RIYD2342".to_string()));
        assert_eq!(normalize_short_code("BADCODE9"), None);
        assert_eq!(normalize_short_code("RIYD23421"), None);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("first".parse::<NasMatchPolicy>(), Ok(NasMatchPolicy::First));
        assert_eq!("UNIQUE".parse::<NasMatchPolicy>(), Ok(NasMatchPolicy::Unique));
        assert!("best".parse::<NasMatchPolicy>().is_err());
    }
}
