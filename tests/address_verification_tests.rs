mod common;

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use saylogix_backend::entities::address_verifications;
use saylogix_backend::entities::prelude::AddressVerifications;
use saylogix_backend::models::address::{VerificationMode, VerificationSource};
use saylogix_backend::models::event::EntityType;
use saylogix_backend::models::integration::IntegrationCategory;
use saylogix_backend::services::address_verification::{
    sweep_pending_verifications, verify_address, verify_address_batch, EXPIRED_MESSAGE,
};
use saylogix_backend::services::error::{ProviderError, ServiceError};
use saylogix_backend::services::nas::NasMatchPolicy;
use saylogix_backend::services::{event_log, integration_registry, orders as order_service};

use crate::common::*;

fn spl() -> ScriptedProvider {
    ScriptedProvider::new(VerificationSource::Spl)
}

fn nas() -> ScriptedProvider {
    ScriptedProvider::new(VerificationSource::Nas)
}

#[tokio::test]
async fn test_found_address_is_written_back() {
    let db = setup_test_db().await.unwrap();
    let order = create_order(&db, "2001").await;

    let spl = Arc::new(spl().with("RIYD2342", Scripted::Found(provider_address("RIYD2342", true))));
    let nas = Arc::new(nas());
    let state = test_state(db.clone(), spl.clone(), nas.clone());

    let result = verify_address(&state, order.id, VerificationMode::Unified)
        .await
        .unwrap();

    assert!(result.found);
    assert!(result.verified);
    assert_eq!(result.source, VerificationSource::Spl);
    assert_eq!(result.nas_code, "RIYD2342");
    assert!(result.coordinates.is_some());
    // SPL answered, so NAS is never asked
    assert!(nas.calls().is_empty());

    let updated = reload_order(&db, order.id).await;
    assert!(updated.nas_verified);
    assert_eq!(updated.nas_code.as_deref(), Some("RIYD2342"));
    assert_eq!(
        updated.verified_address.as_deref(),
        Some("RIYD2342 King Fahd Rd, Al Olaya, Riyadh 12214")
    );
    assert!(updated.verification_timestamp.is_some());
    assert_eq!(updated.version, order.version + 1);
    let coordinates: serde_json::Value =
        serde_json::from_str(updated.coordinates.as_deref().unwrap()).unwrap();
    assert_eq!(coordinates["lat"], 24.7136);
    // Verification does not move the order through its lifecycle
    assert_eq!(updated.status, "fetched");

    let attempt = AddressVerifications::find_by_id(result.verification_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(attempt.status, "verified");
    assert_eq!(attempt.verification_method, "spl");
    assert!(attempt.completed_at.is_some());

    let events = event_log::list_for_entity(&db, EntityType::Order, order.id)
        .await
        .unwrap();
    assert_eq!(events.last().unwrap().event_type, "address_verified");
}

#[tokio::test]
async fn test_not_found_leaves_order_untouched() {
    let db = setup_test_db().await.unwrap();
    let order = create_order(&db, "2002").await;
    let (spl, nas) = empty_providers();
    let state = test_state(db.clone(), spl.clone(), nas.clone());

    let result = verify_address(&state, order.id, VerificationMode::Unified)
        .await
        .unwrap();

    assert!(!result.found);
    assert!(!result.verified);
    assert!(result.address.is_none());
    assert_eq!(spl.calls(), vec!["RIYD2342".to_string()]);
    assert_eq!(nas.calls(), vec!["RIYD2342".to_string()]);

    assert_eq!(reload_order(&db, order.id).await, order);

    let attempts = order_service::list_verifications(&db, order.id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, "failed");
    assert!(attempts[0].error_message.as_deref().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_unified_falls_back_to_nas_when_spl_misses() {
    let db = setup_test_db().await.unwrap();
    let order = create_order(&db, "2003").await;

    let spl = Arc::new(spl().with("RIYD2342", Scripted::NotFound));
    let nas = Arc::new(nas().with("RIYD2342", Scripted::Found(provider_address("RIYD2342", false))));
    let state = test_state(db.clone(), spl.clone(), nas.clone());

    let result = verify_address(&state, order.id, VerificationMode::Unified)
        .await
        .unwrap();

    assert!(result.found);
    assert_eq!(result.source, VerificationSource::Nas);
    assert!(result.coordinates.is_none());
    assert_eq!(spl.calls().len(), 1);
    assert_eq!(nas.calls().len(), 1);

    let updated = reload_order(&db, order.id).await;
    assert!(updated.nas_verified);
    assert!(updated.coordinates.is_none());

    let attempts = order_service::list_verifications(&db, order.id).await.unwrap();
    assert_eq!(attempts[0].verification_method, "nas");
}

#[tokio::test]
async fn test_unified_falls_back_to_nas_when_spl_errors() {
    let db = setup_test_db().await.unwrap();
    let order = create_order(&db, "2004").await;

    let spl = Arc::new(spl().with(
        "RIYD2342",
        Scripted::Fail(ProviderError::Transport("502 Bad Gateway".to_string())),
    ));
    let nas = Arc::new(nas().with("RIYD2342", Scripted::Found(provider_address("RIYD2342", false))));
    let state = test_state(db.clone(), spl, nas);

    let result = verify_address(&state, order.id, VerificationMode::Unified)
        .await
        .unwrap();
    assert!(result.found);
    assert_eq!(result.source, VerificationSource::Nas);

    let spl_record = integration_registry::get_integration(&db, "spl_national_address")
        .await
        .unwrap();
    assert_eq!(spl_record.failure_count, 1);
    assert_eq!(spl_record.last_error.as_deref(), Some("Provider transport error: 502 Bad Gateway"));

    let nas_record = integration_registry::get_integration(&db, "nas_address_lookup")
        .await
        .unwrap();
    assert_eq!(nas_record.success_count, 1);
    assert_eq!(nas_record.failure_count, 0);
}

#[tokio::test]
async fn test_spl_mode_never_asks_nas() {
    let db = setup_test_db().await.unwrap();
    let order = create_order(&db, "2005").await;

    let spl = Arc::new(spl().with("RIYD2342", Scripted::NotFound));
    let nas = Arc::new(nas().with("RIYD2342", Scripted::Found(provider_address("RIYD2342", false))));
    let state = test_state(db.clone(), spl, nas.clone());

    let result = verify_address(&state, order.id, VerificationMode::Spl)
        .await
        .unwrap();

    assert!(!result.found);
    assert_eq!(result.source, VerificationSource::Spl);
    assert!(nas.calls().is_empty());
}

#[tokio::test]
async fn test_every_provider_failing_is_a_provider_error() {
    let db = setup_test_db().await.unwrap();
    let order = create_order(&db, "2006").await;

    let spl = Arc::new(spl().with(
        "RIYD2342",
        Scripted::Fail(ProviderError::Transport("connection refused".to_string())),
    ));
    let nas = Arc::new(nas().with(
        "RIYD2342",
        Scripted::Fail(ProviderError::InvalidResponse("missing field".to_string())),
    ));
    let state = test_state(db.clone(), spl, nas);

    let result = verify_address(&state, order.id, VerificationMode::Unified).await;
    assert!(
        matches!(result, Err(ServiceError::Provider(ProviderError::InvalidResponse(_)))),
        "got {:?}",
        result
    );

    assert_eq!(reload_order(&db, order.id).await, order);
    let attempts = order_service::list_verifications(&db, order.id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, "failed");
    assert_eq!(attempts[0].verification_method, "unified");
}

#[tokio::test]
async fn test_hanging_provider_times_out() {
    let db = setup_test_db().await.unwrap();
    let order = create_order(&db, "2007").await;

    let spl = Arc::new(spl().with("RIYD2342", Scripted::Hang));
    let state = test_state(db.clone(), spl, Arc::new(nas()));

    let started = std::time::Instant::now();
    let result = verify_address(&state, order.id, VerificationMode::Spl).await;

    assert!(
        matches!(result, Err(ServiceError::Provider(ProviderError::Timeout(_)))),
        "got {:?}",
        result
    );
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert!(!reload_order(&db, order.id).await.nas_verified);
}

#[tokio::test]
async fn test_disabled_provider_is_skipped() {
    let db = setup_test_db().await.unwrap();
    let order = create_order(&db, "2008").await;

    integration_registry::upsert_integration(&db, "spl_national_address", IntegrationCategory::Address, None)
        .await
        .unwrap();
    integration_registry::set_enabled(&db, "spl_national_address", false)
        .await
        .unwrap();

    let spl = Arc::new(spl().with("RIYD2342", Scripted::Found(provider_address("RIYD2342", true))));
    let nas = Arc::new(nas().with("RIYD2342", Scripted::Found(provider_address("RIYD2342", false))));
    let state = test_state(db.clone(), spl.clone(), nas);

    let result = verify_address(&state, order.id, VerificationMode::Unified)
        .await
        .unwrap();
    assert_eq!(result.source, VerificationSource::Nas);
    assert!(spl.calls().is_empty());

    // Only the disabled provider in play: nothing can answer
    let order = create_order(&db, "2009").await;
    let result = verify_address(&state, order.id, VerificationMode::Spl).await;
    assert!(matches!(
        result,
        Err(ServiceError::Provider(ProviderError::Disabled(_)))
    ));

    let record = integration_registry::get_integration(&db, "spl_national_address")
        .await
        .unwrap();
    assert_eq!(record.success_count, 0);
    assert_eq!(record.failure_count, 0);
}

#[tokio::test]
async fn test_order_without_shortcode_is_rejected() {
    let db = setup_test_db().await.unwrap();

    let mut request = order_request("2010");
    request.shipping_address.address1 = Some("12 Olaya St".to_string());
    let (order, _) = order_service::create_order(&db, request, NasMatchPolicy::First)
        .await
        .unwrap();
    assert!(order.nas_code.is_none());

    let (spl, nas) = empty_providers();
    let state = test_state(db.clone(), spl.clone(), nas);

    match verify_address(&state, order.id, VerificationMode::Unified).await {
        Err(ServiceError::Validation { field, .. }) => assert_eq!(field, "nas_code"),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(spl.calls().is_empty());
    assert!(order_service::list_verifications(&db, order.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let db = setup_test_db().await.unwrap();
    let (spl, nas) = empty_providers();
    let state = test_state(db, spl, nas);

    assert!(matches!(
        verify_address(&state, 999, VerificationMode::Unified).await,
        Err(ServiceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_batch_keeps_every_input_in_order() {
    let db = setup_test_db().await.unwrap();

    let spl = Arc::new(
        spl()
            .with("RIYD2342", Scripted::Found(provider_address("RIYD2342", true)))
            .with("JEDD1234", Scripted::Fail(ProviderError::Transport("reset".to_string()))),
    );
    let nas = Arc::new(nas().with("JEDD1234", Scripted::Found(provider_address("JEDD1234", false))));
    let state = test_state(db, spl, nas.clone());

    let result = verify_address_batch(
        &state,
        vec![
            "RIYD2342".to_string(),
            "BADCODE9".to_string(),
            "JEDD1234".to_string(),
            "RIYD2342".to_string(),
        ],
    )
    .await;

    assert_eq!(result.len(), 3);
    assert_eq!(
        result.codes().collect::<Vec<_>>(),
        vec!["RIYD2342", "BADCODE9", "JEDD1234"]
    );
    assert_eq!(result.get("RIYD2342"), Some(true));
    assert_eq!(result.get("BADCODE9"), Some(false));
    assert_eq!(result.get("JEDD1234"), Some(true));
    // Malformed codes never reach a provider
    assert_eq!(nas.calls(), vec!["JEDD1234".to_string()]);
}

#[tokio::test]
async fn test_batch_counts_every_call_on_a_fresh_registry() {
    let db = setup_test_db().await.unwrap();
    let codes = ["RIYD2342", "RIYD2343", "JEDD1234", "JEDD1235", "DMMA0001", "DMMA0002"];

    let spl = Arc::new(codes.iter().fold(spl(), |provider, code| {
        provider.with(code, Scripted::Found(provider_address(code, false)))
    }));
    let state = test_state(db.clone(), spl.clone(), Arc::new(nas()));

    let result = verify_address_batch(&state, codes.iter().map(|c| c.to_string()).collect()).await;
    assert!(codes.iter().all(|code| result.get(code) == Some(true)));
    assert_eq!(spl.calls().len(), codes.len());

    // Concurrent first calls all land on one row
    let record = integration_registry::get_integration(&db, "spl_national_address")
        .await
        .unwrap();
    assert_eq!(record.success_count, codes.len() as i64);
    assert_eq!(record.failure_count, 0);
}

#[tokio::test]
async fn test_batch_of_nothing_is_empty() {
    let db = setup_test_db().await.unwrap();
    let (spl, nas) = empty_providers();
    let state = test_state(db, spl, nas);

    let result = verify_address_batch(&state, Vec::new()).await;
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_sweep_expires_only_stale_pending_attempts() {
    let db = setup_test_db().await.unwrap();
    let order = create_order(&db, "2011").await;

    let attempt = |created_at| address_verifications::ActiveModel {
        order_id: Set(order.id),
        original_address: Set(order.shipping_address.clone()),
        verified_address: Set(None),
        status: Set("pending".to_string()),
        verification_method: Set("unified".to_string()),
        nas_code: Set(Some("RIYD2342".to_string())),
        error_message: Set(None),
        created_at: Set(created_at),
        completed_at: Set(None),
        ..Default::default()
    };

    let stale = attempt(Utc::now() - chrono::Duration::minutes(10))
        .insert(&db)
        .await
        .unwrap();
    let fresh = attempt(Utc::now()).insert(&db).await.unwrap();

    let expired = sweep_pending_verifications(&db, 300).await.unwrap();
    assert_eq!(expired, 1);

    let stale = AddressVerifications::find_by_id(stale.id).one(&db).await.unwrap().unwrap();
    assert_eq!(stale.status, "failed");
    assert_eq!(stale.error_message.as_deref(), Some(EXPIRED_MESSAGE));
    assert!(stale.completed_at.is_some());

    let fresh = AddressVerifications::find_by_id(fresh.id).one(&db).await.unwrap().unwrap();
    assert_eq!(fresh.status, "pending");

    // Nothing left to expire
    assert_eq!(sweep_pending_verifications(&db, 300).await.unwrap(), 0);
}
