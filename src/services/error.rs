//! Error taxonomy shared by the fulfillment services
//!
//! "Not found" from an address provider is not an error; it is a
//! `VerificationResult { found: false, .. }`. Everything here is a failure
//! the caller has to act on.

use sea_orm::DbErr;

use crate::models::order::OrderStatus;

/// Failure talking to an external address provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Request did not finish within the configured timeout
    Timeout(String),
    /// Connection failure or non-success HTTP status
    Transport(String),
    /// Response body did not match the expected shape
    InvalidResponse(String),
    /// Integration switched off in the registry
    Disabled(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Timeout(msg) => write!(f, "Provider timeout: {}", msg),
            ProviderError::Transport(msg) => write!(f, "Provider transport error: {}", msg),
            ProviderError::InvalidResponse(msg) => write!(f, "Invalid provider response: {}", msg),
            ProviderError::Disabled(name) => write!(f, "Provider disabled: {}", name),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

#[derive(Debug)]
pub enum ServiceError {
    /// Requested status change violates the lifecycle; nothing was written
    InvalidTransition {
        current: OrderStatus,
        target: OrderStatus,
    },
    /// Missing or invalid input, or an unmet precondition
    Validation { field: String, message: String },
    NotFound { entity: &'static str, id: String },
    Provider(ProviderError),
    /// Lost a concurrent write; retry with fresh state
    Conflict(String),
    Database(DbErr),
}

impl ServiceError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::InvalidTransition { current, target } => write!(
                f,
                "Invalid transition from {} to {}",
                current, target
            ),
            ServiceError::Validation { field, message } => {
                write!(f, "Validation error on {}: {}", field, message)
            }
            ServiceError::NotFound { entity, id } => write!(f, "{} {} not found", entity, id),
            ServiceError::Provider(err) => write!(f, "{}", err),
            ServiceError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ServiceError::Database(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Provider(err) => Some(err),
            ServiceError::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        ServiceError::Database(err)
    }
}

impl From<ProviderError> for ServiceError {
    fn from(err: ProviderError) -> Self {
        ServiceError::Provider(err)
    }
}

/// Unique-constraint violations surface as conflicts rather than 500s
pub fn map_unique_violation(err: DbErr, what: &str) -> ServiceError {
    match err.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
            ServiceError::Conflict(format!("{} already exists", what))
        }
        _ => ServiceError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ServiceError::InvalidTransition {
            current: OrderStatus::Picked,
            target: OrderStatus::Dispatched,
        };
        assert_eq!(err.to_string(), "Invalid transition from picked to dispatched");

        let err = ServiceError::validation("weight", "weight is required");
        assert_eq!(err.to_string(), "Validation error on weight: weight is required");

        let err = ServiceError::not_found("order", 42);
        assert_eq!(err.to_string(), "order 42 not found");

        let err = ServiceError::from(ProviderError::Disabled("spl_national_address".to_string()));
        assert_eq!(err.to_string(), "Provider disabled: spl_national_address");
    }
}
