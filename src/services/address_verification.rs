//! Address verification workflow
//!
//! Provider calls run with no transaction open. The verification row is
//! inserted as `pending` first and only ever leaves `pending` through a
//! conditional update, so a write-back racing the expiry sweep cannot
//! resurrect an expired attempt.

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::entities::address_verifications::{self, Entity as AddressVerifications};
use crate::entities::orders::{self, Entity as Orders};
use crate::models::address::{
    BatchVerificationResult, ProviderAddress, VerificationMode, VerificationResult,
    VerificationSource, VerificationStatus,
};
use crate::models::event::{event_types, EntityType};
use crate::models::integration::IntegrationCategory;
use crate::models::order::{Address, AddressInput};
use crate::services::address_provider::{lookup_with_timeout, AddressProvider};
use crate::services::error::{ProviderError, ServiceError};
use crate::services::event_log::{self, NewEvent};
use crate::services::integration_registry;
use crate::services::nas::{extract_nas_with_policy, normalize_short_code, NasMatchPolicy};
use crate::services::orders::get_order;
use crate::AppState;

pub const EXPIRED_MESSAGE: &str = "expired";

/// Result of walking the provider chain for one code
#[derive(Debug)]
enum LookupOutcome {
    Found {
        source: VerificationSource,
        address: ProviderAddress,
    },
    /// At least one provider answered and none had the code
    NotFound { source: VerificationSource },
    /// Every provider attempted failed or was disabled
    Failed(ProviderError),
}

/// The order's stored shortcode, else one found in its shipping address
pub fn resolve_short_code(order: &orders::Model, policy: NasMatchPolicy) -> Option<String> {
    if let Some(code) = order.nas_code.as_deref().and_then(normalize_short_code) {
        return Some(code);
    }
    let address = Address::from_stored(&order.shipping_address);
    extract_nas_with_policy(&AddressInput::Structured(address), policy)
}

fn providers_for(state: &AppState, mode: VerificationMode) -> Vec<&dyn AddressProvider> {
    match mode {
        VerificationMode::Spl => vec![state.spl.as_ref()],
        VerificationMode::Unified => vec![state.spl.as_ref(), state.nas.as_ref()],
    }
}

async fn provider_enabled(db: &DatabaseConnection, name: &str) -> bool {
    match integration_registry::is_enabled(db, name).await {
        Ok(enabled) => enabled,
        Err(e) => {
            warn!(integration = name, error = %e, "Could not read integration state, assuming enabled");
            true
        }
    }
}

async fn record_call(db: &DatabaseConnection, name: &str, error: Option<&ProviderError>) {
    let result = match error {
        None => integration_registry::record_success(db, name, IntegrationCategory::Address).await,
        Some(err) => {
            integration_registry::record_failure(db, name, IntegrationCategory::Address, &err.to_string())
                .await
        }
    };
    if let Err(e) = result {
        warn!(integration = name, error = %e, "Failed to update integration counters");
    }
}

/// Ask each provider in turn until one has the code. A provider is asked
/// at most once, so unified mode makes a single fallback attempt.
async fn query_providers(
    state: &AppState,
    short_code: &str,
    providers: &[&dyn AddressProvider],
) -> LookupOutcome {
    let mut not_found_by = None;
    let mut last_error = None;

    for provider in providers {
        let source = provider.source();
        let name = source.integration_name();

        if !provider_enabled(&state.db, name).await {
            debug!(provider = %source, "Provider disabled, skipping");
            last_error = Some(ProviderError::Disabled(name.to_string()));
            continue;
        }

        match lookup_with_timeout(*provider, short_code, state.config.provider_timeout).await {
            Ok(Some(address)) => {
                record_call(&state.db, name, None).await;
                return LookupOutcome::Found { source, address };
            }
            Ok(None) => {
                record_call(&state.db, name, None).await;
                debug!(provider = %source, short_code, "Shortcode not found");
                not_found_by = Some(source);
            }
            Err(e) => {
                record_call(&state.db, name, Some(&e)).await;
                warn!(provider = %source, short_code, error = %e, "Provider lookup failed");
                last_error = Some(e);
            }
        }
    }

    match (not_found_by, last_error) {
        (Some(source), _) => LookupOutcome::NotFound { source },
        (None, Some(err)) => LookupOutcome::Failed(err),
        (None, None) => LookupOutcome::Failed(ProviderError::Transport(
            "no address provider configured".to_string(),
        )),
    }
}

/// Verify an order's address and write the answer back onto the order
pub async fn verify_address(
    state: &AppState,
    order_id: i32,
    mode: VerificationMode,
) -> Result<VerificationResult, ServiceError> {
    let db = &state.db;
    let order = get_order(db, order_id).await?;

    let short_code = resolve_short_code(&order, state.config.nas_match_policy).ok_or_else(|| {
        ServiceError::validation(
            "nas_code",
            format!("order {} has no NAS shortcode and none was found in its address", order_id),
        )
    })?;

    let attempt = address_verifications::ActiveModel {
        order_id: Set(order.id),
        original_address: Set(order.shipping_address.clone()),
        verified_address: Set(None),
        status: Set(VerificationStatus::Pending.as_str().to_string()),
        verification_method: Set(mode.as_str().to_string()),
        nas_code: Set(Some(short_code.clone())),
        error_message: Set(None),
        created_at: Set(Utc::now()),
        completed_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(order_id, verification_id = attempt.id, short_code = %short_code, mode = mode.as_str(), "Verifying address");

    let providers = providers_for(state, mode);
    match query_providers(state, &short_code, &providers).await {
        LookupOutcome::Found { source, address } => {
            write_back(db, &order, attempt.id, &short_code, mode, source, address).await
        }
        LookupOutcome::NotFound { source } => {
            let message = format!("shortcode {} not found", short_code);
            mark_failed(db, &order, attempt.id, &short_code, &message).await?;
            Ok(VerificationResult {
                found: false,
                verified: false,
                address: None,
                coordinates: None,
                source,
                nas_code: short_code,
                verification_id: attempt.id,
            })
        }
        LookupOutcome::Failed(err) => {
            mark_failed(db, &order, attempt.id, &short_code, &err.to_string()).await?;
            Err(ServiceError::Provider(err))
        }
    }
}

async fn write_back(
    db: &DatabaseConnection,
    order: &orders::Model,
    verification_id: i32,
    short_code: &str,
    mode: VerificationMode,
    source: VerificationSource,
    address: ProviderAddress,
) -> Result<VerificationResult, ServiceError> {
    let now = Utc::now();
    let txn = db.begin().await?;

    let claimed = AddressVerifications::update_many()
        .col_expr(
            address_verifications::Column::Status,
            Expr::value(VerificationStatus::Verified.as_str()),
        )
        .col_expr(
            address_verifications::Column::VerifiedAddress,
            Expr::value(address.full_address.clone()),
        )
        .col_expr(
            address_verifications::Column::VerificationMethod,
            Expr::value(source.as_str()),
        )
        .col_expr(address_verifications::Column::CompletedAt, Expr::value(now))
        .filter(address_verifications::Column::Id.eq(verification_id))
        .filter(address_verifications::Column::Status.eq(VerificationStatus::Pending.as_str()))
        .exec(&txn)
        .await?;

    if claimed.rows_affected == 0 {
        return Err(ServiceError::Conflict(format!(
            "verification {} is no longer pending",
            verification_id
        )));
    }

    let mut update = Orders::update_many()
        .col_expr(orders::Column::NasCode, Expr::value(short_code))
        .col_expr(orders::Column::NasVerified, Expr::value(true))
        .col_expr(
            orders::Column::VerifiedAddress,
            Expr::value(address.full_address.clone()),
        )
        .col_expr(orders::Column::VerificationTimestamp, Expr::value(now))
        .col_expr(orders::Column::Version, Expr::col(orders::Column::Version).add(1))
        .col_expr(orders::Column::UpdatedAt, Expr::value(now));

    if let Some(coordinates) = address.coordinates {
        update = update.col_expr(
            orders::Column::Coordinates,
            Expr::value(json!({ "lat": coordinates.lat, "lng": coordinates.lng }).to_string()),
        );
    }

    update
        .filter(orders::Column::Id.eq(order.id))
        .exec(&txn)
        .await?;

    event_log::append(
        &txn,
        NewEvent::new(
            EntityType::Order,
            order.id,
            event_types::ADDRESS_VERIFIED,
            format!("Address verified via {} for {}", source, short_code),
        )
        .states(
            json!({ "nas_verified": order.nas_verified, "nas_code": order.nas_code }),
            json!({ "nas_verified": true, "nas_code": short_code }),
        )
        .metadata(json!({
            "verification_id": verification_id,
            "source": source.as_str(),
            "mode": mode.as_str(),
        })),
    )
    .await?;

    txn.commit().await?;

    info!(order_id = order.id, verification_id, source = %source, "Address verified");

    Ok(VerificationResult {
        found: true,
        verified: true,
        coordinates: address.coordinates,
        address: Some(address),
        source,
        nas_code: short_code.to_string(),
        verification_id,
    })
}

/// Close a pending attempt as failed; the order is not touched
async fn mark_failed(
    db: &DatabaseConnection,
    order: &orders::Model,
    verification_id: i32,
    short_code: &str,
    message: &str,
) -> Result<(), ServiceError> {
    AddressVerifications::update_many()
        .col_expr(
            address_verifications::Column::Status,
            Expr::value(VerificationStatus::Failed.as_str()),
        )
        .col_expr(address_verifications::Column::ErrorMessage, Expr::value(message))
        .col_expr(address_verifications::Column::CompletedAt, Expr::value(Utc::now()))
        .filter(address_verifications::Column::Id.eq(verification_id))
        .filter(address_verifications::Column::Status.eq(VerificationStatus::Pending.as_str()))
        .exec(db)
        .await?;

    event_log::append_detached(
        db,
        NewEvent::new(
            EntityType::Order,
            order.id,
            event_types::ADDRESS_VERIFICATION_FAILED,
            format!("Address verification failed for {}: {}", short_code, message),
        )
        .metadata(json!({ "verification_id": verification_id, "error": message })),
    )
    .await;

    info!(order_id = order.id, verification_id, error = message, "Address verification failed");
    Ok(())
}

/// Check a list of shortcodes. Every distinct input appears once in the
/// result, in input order; malformed codes and failed lookups are `false`.
pub async fn verify_address_batch(state: &AppState, codes: Vec<String>) -> BatchVerificationResult {
    let mut distinct: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes {
        if !distinct.contains(&code) {
            distinct.push(code);
        }
    }

    let providers: [&dyn AddressProvider; 2] = [state.spl.as_ref(), state.nas.as_ref()];
    let providers = &providers;

    let lookups: Vec<(String, Option<String>)> = distinct
        .iter()
        .map(|raw| (raw.clone(), normalize_short_code(raw)))
        .collect();

    let validity: Vec<bool> = stream::iter(lookups)
        .map(|(raw, code)| async move {
            match code {
                Some(code) => matches!(
                    query_providers(state, &code, providers).await,
                    LookupOutcome::Found { .. }
                ),
                None => {
                    debug!(code = %raw, "Malformed shortcode in batch");
                    false
                }
            }
        })
        .buffered(state.config.batch_verify_concurrency.max(1))
        .collect()
        .await;

    let mut result = BatchVerificationResult::default();
    for (code, valid) in distinct.into_iter().zip(validity) {
        result.insert(code, valid);
    }

    info!(codes = result.len(), "Batch verification complete");
    result
}

/// Fail every attempt left pending longer than `ttl_secs`
pub async fn sweep_pending_verifications(db: &DatabaseConnection, ttl_secs: i64) -> Result<u64, DbErr> {
    let now = Utc::now();
    let cutoff = now - chrono::Duration::seconds(ttl_secs);

    let result = AddressVerifications::update_many()
        .col_expr(
            address_verifications::Column::Status,
            Expr::value(VerificationStatus::Failed.as_str()),
        )
        .col_expr(address_verifications::Column::ErrorMessage, Expr::value(EXPIRED_MESSAGE))
        .col_expr(address_verifications::Column::CompletedAt, Expr::value(now))
        .filter(address_verifications::Column::Status.eq(VerificationStatus::Pending.as_str()))
        .filter(address_verifications::Column::CreatedAt.lt(cutoff))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        warn!(expired = result.rows_affected, "Expired stale pending verifications");
    }

    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn order(nas_code: Option<&str>, shipping_address: &str) -> orders::Model {
        let now = Utc::now();
        orders::Model {
            id: 7,
            saylogix_number: "SLX-TEST0007".to_string(),
            source_order_number: "7".to_string(),
            source_channel: "shopify".to_string(),
            status: "fetched".to_string(),
            customer_name: "Test".to_string(),
            customer_phone: None,
            customer_email: None,
            shipping_address: shipping_address.to_string(),
            billing_address: None,
            coordinates: None,
            nas_code: nas_code.map(str::to_string),
            nas_verified: false,
            verified_address: None,
            verification_timestamp: None,
            order_value: Decimal::ZERO,
            currency: "SAR".to_string(),
            order_fetched: Some(now),
            verify_completed: None,
            picking_started: None,
            picking_completed: None,
            packing_completed: None,
            dispatched: None,
            delivered: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_stored_code_takes_precedence() {
        let order = order(Some("jedd1234"), r#"{"address1":"RIYD2342","city":"Riyadh"}"#);
        assert_eq!(
            resolve_short_code(&order, NasMatchPolicy::First),
            Some("JEDD1234".to_string())
        );
    }

    #[test]
    fn test_code_extracted_from_address() {
        let order = order(None, r#"{"address1":"Olaya St RIYD2342","city":"Riyadh"}"#);
        assert_eq!(
            resolve_short_code(&order, NasMatchPolicy::First),
            Some("RIYD2342".to_string())
        );
    }

    #[test]
    fn test_no_code_anywhere() {
        let order = order(None, r#"{"address1":"Olaya St","city":"Riyadh"}"#);
        assert_eq!(resolve_short_code(&order, NasMatchPolicy::First), None);
    }
}
