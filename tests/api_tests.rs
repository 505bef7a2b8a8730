mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use saylogix_backend::models::address::VerificationSource;
use saylogix_backend::router::app_router;
use saylogix_backend::services::orders as order_service;

use crate::common::*;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn order_body(number: &str) -> Value {
    json!({
        "source_order_number": number,
        "source_channel": "Shopify",
        "customer_name": "Sara Al-Harbi",
        "customer_phone": "+966500000000",
        "shipping_address": {
            "address1": "12 Olaya St RIYD2342",
            "city": "Riyadh",
            "country": "SA"
        },
        "order_value": "223.25",
        "items": [
            { "sku": "MUG-01", "product_name": "Mug", "quantity": 2, "unit_price": "74.25" },
            { "sku": "TEE-01", "product_name": "T-shirt", "quantity": 1, "unit_price": "74.75" }
        ]
    })
}

async fn test_app() -> (Router, sea_orm::DatabaseConnection) {
    let db = setup_test_db().await.expect("Failed to connect to test DB");
    let (spl, nas) = empty_providers();
    (app_router(test_state(db.clone(), spl, nas)), db)
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_create_and_fetch_order() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, "POST", "/api/orders", Some(order_body("5001"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order"]["status"], "fetched");
    assert_eq!(body["order"]["source_channel"], "shopify");
    assert_eq!(body["order"]["nas_code"], "RIYD2342");
    assert_eq!(body["order"]["shipping_address"]["city"], "Riyadh");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let id = body["order"]["id"].as_i64().unwrap();
    let (status, body) = send(&app, "GET", &format!("/api/orders/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["order"]["saylogix_number"].as_str().unwrap().starts_with("SLX-"));

    let (status, body) = send(&app, "GET", "/api/orders?status=fetched", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 1);

    let (status, body) = send(&app, "GET", &format!("/api/orders/{}/events", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"][0]["event_type"], "order_created");
}

#[tokio::test]
async fn test_create_order_validation_and_duplicates() {
    let (app, _) = test_app().await;

    let mut invalid = order_body("5002");
    invalid["items"][0]["quantity"] = json!(0);
    let (status, body) = send(&app, "POST", "/api/orders", Some(invalid)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("items[0].quantity"));

    let (status, _) = send(&app, "POST", "/api/orders", Some(order_body("5003"))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, "POST", "/api/orders", Some(order_body("5003"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_invalid_transition_reports_current_status() {
    let (app, _) = test_app().await;
    let (_, body) = send(&app, "POST", "/api/orders", Some(order_body("5004"))).await;
    let id = body["order"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/orders/{}/status", id),
        Some(json!({ "status": "dispatched" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");
    assert_eq!(body["current_status"], "fetched");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/orders/{}/status", id),
        Some(json!({ "status": "validated" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "validated");

    let (status, body) = send(&app, "GET", &format!("/api/orders/{}/pick-tasks", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 2);
}

#[tokio::test]
async fn test_empty_pack_completion_is_a_validation_error() {
    let (app, db) = test_app().await;
    let order = create_order(&db, "5005").await;
    advance_to_picked(&db, order.id).await;
    let task = order_service::list_pack_tasks(&db, order.id).await.unwrap().remove(0);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/pack-tasks/{}/complete", task.id),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (_, body) = send(&app, "GET", &format!("/api/orders/{}/pack-tasks", order.id), None).await;
    assert_eq!(body["tasks"][0]["status"], "pending");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/pack-tasks/{}/complete", task.id),
        Some(json!({ "weight": "1.25", "packaging_type": "box_small" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn test_missing_resources_are_not_found() {
    let (app, _) = test_app().await;

    for uri in [
        "/api/orders/999",
        "/api/orders/999/events",
        "/api/manifests/999",
        "/api/routes/999",
        "/api/integrations/unknown",
    ] {
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["code"], "NOT_FOUND", "{}", uri);
    }
}

#[tokio::test]
async fn test_extract_nas() {
    let (app, _) = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/address/extract-nas",
        Some(json!({ "address": "Villa 4, riyd2342, Riyadh" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nas_code"], "RIYD2342");

    let (status, body) = send(
        &app,
        "POST",
        "/api/address/extract-nas",
        Some(json!({ "address": { "address1": "King Fahd Rd", "city": "Riyadh" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["nas_code"].is_null());
}

#[tokio::test]
async fn test_verify_batch_returns_every_code() {
    let db = setup_test_db().await.unwrap();
    let spl = Arc::new(
        ScriptedProvider::new(VerificationSource::Spl)
            .with("RIYD2342", Scripted::Found(provider_address("RIYD2342", true))),
    );
    let nas = Arc::new(ScriptedProvider::new(VerificationSource::Nas));
    let app = app_router(test_state(db, spl, nas));

    let (status, body) = send(
        &app,
        "POST",
        "/api/address/verify-batch",
        Some(json!({ "codes": ["RIYD2342", "BADCODE9", "JEDD1234"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let map = body.as_object().unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(map["RIYD2342"], true);
    assert_eq!(map["BADCODE9"], false);
    assert_eq!(map["JEDD1234"], false);
}

#[tokio::test]
async fn test_verify_address_endpoint() {
    let db = setup_test_db().await.unwrap();
    let spl = Arc::new(
        ScriptedProvider::new(VerificationSource::Spl)
            .with("RIYD2342", Scripted::Found(provider_address("RIYD2342", true))),
    );
    let nas = Arc::new(ScriptedProvider::new(VerificationSource::Nas));
    let app = app_router(test_state(db.clone(), spl, nas));
    let order = create_order(&db, "5006").await;

    // No body means unified mode
    let (status, body) = send(&app, "POST", &format!("/api/orders/{}/verify-address", order.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], true);
    assert_eq!(body["source"], "spl");
    assert_eq!(body["coordinates"]["lat"], 24.7136);

    let (status, body) = send(&app, "GET", &format!("/api/orders/{}/verifications", order.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["status"], "verified");
}

#[tokio::test]
async fn test_integrations_crud() {
    let (app, _) = test_app().await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/integrations/smsa_express",
        Some(json!({ "category": "courier", "config": { "account": "SLX" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "smsa_express");
    assert_eq!(body["is_enabled"], true);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/integrations/smsa_express/enabled",
        Some(json!({ "enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_enabled"], false);

    let (status, body) = send(&app, "GET", "/api/integrations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["integrations"][0]["category"], "courier");
}
