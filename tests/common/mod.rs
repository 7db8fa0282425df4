#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use harvester::client::{ApiClient, SessionExpiredHandler};
use harvester::config::ApiConfig;

/// Knobs and counters shared with the mock backend.
#[derive(Default)]
pub struct MockState {
    pub batch_requests: Mutex<Vec<Value>>,
    pub identify_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    /// Number of batch calls still to reject with 401.
    pub unauthorized_batches: AtomicUsize,
    pub refresh_rejected: AtomicBool,
    pub malformed_identify: AtomicBool,
}

impl MockState {
    pub fn batch_requests(&self) -> Vec<Value> {
        self.batch_requests.lock().unwrap().clone()
    }
}

/// Start the backend on an ephemeral port and return its base URL.
pub async fn spawn_backend(state: Arc<MockState>) -> String {
    let app = Router::new()
        .route("/api/lookup/batch", post(batch_lookup))
        .route("/api/indicators/identify", post(identify))
        .route("/api/lookup/providers", get(providers))
        .route("/api/auth/refresh", post(refresh))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn client(base_url: &str, on_expired: Arc<dyn SessionExpiredHandler>) -> Arc<ApiClient> {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        ..Default::default()
    };
    Arc::new(ApiClient::new(&config, on_expired).unwrap())
}

pub fn classify(value: &str) -> &'static str {
    if value.contains('@') {
        "email"
    } else if value.parse::<std::net::IpAddr>().is_ok() {
        "ip"
    } else if value.to_ascii_uppercase().starts_with("CVE-") {
        "cve"
    } else {
        "domain"
    }
}

async fn batch_lookup(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.batch_requests.lock().unwrap().push(body.clone());

    let pending = state.unauthorized_batches.load(Ordering::SeqCst);
    if pending > 0 {
        state.unauthorized_batches.store(pending - 1, Ordering::SeqCst);
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "token expired"}))).into_response();
    }

    let empty = serde_json::Map::new();
    let by_type = body["providers_by_type"].as_object().unwrap_or(&empty);
    let results: Vec<Value> = body["indicators"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(|indicator| {
            let records: Vec<Value> = by_type
                .iter()
                .flat_map(|(lookup_type, ids)| {
                    ids.as_array()
                        .into_iter()
                        .flatten()
                        .filter_map(Value::as_str)
                        .map(move |id| {
                            json!({
                                "lookup_type": lookup_type,
                                "provider": id,
                                "essential": {"source": id, "indicator": indicator},
                                "additional": {"raw": true}
                            })
                        })
                        .collect::<Vec<_>>()
                })
                .collect();
            json!({"indicator": indicator, "results": records})
        })
        .collect();

    Json(json!({"results": results})).into_response()
}

async fn identify(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.identify_calls.fetch_add(1, Ordering::SeqCst);
    if state.malformed_identify.load(Ordering::SeqCst) {
        return Json(json!({"status": "degraded"})).into_response();
    }
    let identified: Vec<Value> = body["indicators"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(|v| json!({"value": v, "type": classify(v)}))
        .collect();
    Json(Value::Array(identified)).into_response()
}

async fn providers() -> Json<Value> {
    Json(json!({
        "version": "test",
        "providers": {
            "whois": [{"id": "whois", "name": "WHOIS", "available": true}],
            "ip_info": [{"id": "ipinfo", "available": true}],
            "reputation": [{"id": "virustotal", "available": false}],
            "dns": [{"id": "dns", "available": true}, {"id": "cloudflare", "available": true}],
            "email_validator": [{"id": "email_validator", "available": true}],
            "cve_details": [{"id": "nvd", "available": true}]
        },
        "presets": [
            {"name": "Minimal", "description": "WHOIS only", "providers_by_type": {"whois": ["whois"]}}
        ]
    }))
}

async fn refresh(State(state): State<Arc<MockState>>) -> StatusCode {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if state.refresh_rejected.load(Ordering::SeqCst) {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::OK
    }
}
