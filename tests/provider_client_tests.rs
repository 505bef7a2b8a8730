use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;

use saylogix_backend::config::ProviderConfig;
use saylogix_backend::services::address_provider::AddressProvider;
use saylogix_backend::services::error::ProviderError;
use saylogix_backend::services::nas_provider::NasClient;
use saylogix_backend::services::spl::SplClient;

const KNOWN: &str = "RIYD2342";
const UNKNOWN: &str = "JEDD1234";
const BROKEN: &str = "FAIL0001";

/// Requests seen by the stub, as (code, credential header)
#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<(String, String)>>>);

impl Seen {
    fn record(&self, code: &str, credential: Option<&str>) {
        self.0
            .lock()
            .push((code.to_string(), credential.unwrap_or_default().to_string()));
    }

    fn codes(&self) -> Vec<String> {
        self.0.lock().iter().map(|(code, _)| code.clone()).collect()
    }

    fn credentials(&self) -> Vec<String> {
        self.0.lock().iter().map(|(_, credential)| credential.clone()).collect()
    }
}

async fn spl_shortcode(
    State(seen): State<Seen>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Response {
    seen.record(&code, headers.get("api_key").and_then(|v| v.to_str().ok()));

    match code.as_str() {
        KNOWN => Json(json!({
            "shortCode": "riyd2342",
            "fullAddress": "2342 King Fahd Rd, Al Olaya, Riyadh 12214",
            "postalCode": "12214",
            "additionalCode": "2342",
            "city": "Riyadh",
            "district": "Al Olaya",
            "coordinates": { "lat": 24.7136, "lng": 46.6753 }
        }))
        .into_response(),
        BROKEN => (StatusCode::BAD_GATEWAY, "upstream down").into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn nas_verify(
    State(seen): State<Seen>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let code = params.get("code").cloned().unwrap_or_default();
    seen.record(&code, headers.get("authorization").and_then(|v| v.to_str().ok()));

    if code == KNOWN {
        Json(json!({
            "address": "2342 King Fahd Rd",
            "city": "Riyadh",
            "district": "Al Olaya",
            "postalCode": "12214"
        }))
        .into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Serve the stub on an ephemeral port and return its base URL
async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spl_client(seen: &Seen) -> SplClient {
    let base_url = serve(
        Router::new()
            .route("/address/shortcode/{code}", get(spl_shortcode))
            .with_state(seen.clone()),
    )
    .await;

    SplClient::new(
        &ProviderConfig {
            base_url,
            api_key: "spl-key".to_string(),
        },
        Duration::from_secs(5),
    )
    .unwrap()
}

async fn nas_client(seen: &Seen) -> NasClient {
    let base_url = serve(
        Router::new()
            .route("/verify", get(nas_verify))
            .with_state(seen.clone()),
    )
    .await;

    NasClient::new(
        &ProviderConfig {
            base_url,
            api_key: "nas-key".to_string(),
        },
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_spl_serves_repeat_hits_from_cache() {
    let seen = Seen::default();
    let client = spl_client(&seen).await;

    let first = client.lookup(KNOWN).await.unwrap().unwrap();
    assert_eq!(first.short_code, "RIYD2342");
    assert_eq!(first.postal_code.as_deref(), Some("12214"));
    assert_eq!(first.coordinates.map(|c| c.lat), Some(24.7136));

    let second = client.lookup(KNOWN).await.unwrap().unwrap();
    assert_eq!(second, first);

    assert_eq!(seen.codes(), vec![KNOWN.to_string()]);
    assert_eq!(seen.credentials(), vec!["spl-key".to_string()]);
}

#[tokio::test]
async fn test_spl_asks_again_for_unknown_codes() {
    let seen = Seen::default();
    let client = spl_client(&seen).await;

    assert_eq!(client.lookup(UNKNOWN).await.unwrap(), None);
    assert_eq!(client.lookup(UNKNOWN).await.unwrap(), None);

    assert_eq!(seen.codes(), vec![UNKNOWN.to_string(), UNKNOWN.to_string()]);
}

#[tokio::test]
async fn test_spl_upstream_errors_are_not_cached() {
    let seen = Seen::default();
    let client = spl_client(&seen).await;

    for _ in 0..2 {
        match client.lookup(BROKEN).await {
            Err(ProviderError::Transport(message)) => assert!(message.contains("502")),
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    assert_eq!(seen.codes().len(), 2);
}

#[tokio::test]
async fn test_nas_caches_found_codes_only() {
    let seen = Seen::default();
    let client = nas_client(&seen).await;

    let found = client.lookup(KNOWN).await.unwrap().unwrap();
    assert_eq!(found.full_address, "2342 King Fahd Rd, Al Olaya, Riyadh, 12214");
    assert!(found.coordinates.is_none());
    assert_eq!(client.lookup(KNOWN).await.unwrap(), Some(found));

    assert_eq!(client.lookup(UNKNOWN).await.unwrap(), None);
    assert_eq!(client.lookup(UNKNOWN).await.unwrap(), None);

    assert_eq!(
        seen.codes(),
        vec![KNOWN.to_string(), UNKNOWN.to_string(), UNKNOWN.to_string()]
    );
    assert!(seen.credentials().iter().all(|c| c == "Bearer nas-key"));
}
