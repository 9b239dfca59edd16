//! In-process HTTP remote speaking the `/api/{resource}` protocol.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

#[derive(Default)]
struct Inner {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    outage: AtomicBool,
    malformed_writes: AtomicBool,
    next_id: AtomicI64,
    writes: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct ServerState {
    inner: Arc<Inner>,
}

pub struct TestServer {
    pub url: String,
    pub state: ServerState,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    pub async fn start() -> Self {
        let state = ServerState::default();
        state.inner.next_id.store(1, Ordering::SeqCst);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    /// Every route answers 503 while set.
    pub fn set_outage(&self, outage: bool) {
        self.state.inner.outage.store(outage, Ordering::SeqCst);
    }

    /// Writes answer 200 with a bare string while set.
    pub fn set_malformed_writes(&self, malformed: bool) {
        self.state.inner.malformed_writes.store(malformed, Ordering::SeqCst);
    }

    pub fn seed(&self, resource: &str, records: Vec<Value>) {
        self.state
            .inner
            .tables
            .lock()
            .insert(resource.to_string(), records);
    }

    pub fn records(&self, resource: &str) -> Vec<Value> {
        self.state
            .inner
            .tables
            .lock()
            .get(resource)
            .cloned()
            .unwrap_or_default()
    }

    /// Create/update/delete requests received, including failed ones.
    pub fn write_count(&self) -> usize {
        self.state.inner.writes.load(Ordering::SeqCst)
    }
}

/// Address nothing listens on.
pub async fn closed_address() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/{resource}", get(list).post(create))
        .route(
            "/api/{resource}/{id}",
            get(fetch).put(update).delete(remove),
        )
        .with_state(state)
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"success": false, "message": "maintenance window"})),
    )
        .into_response()
}

fn not_found(resource: &str, id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "message": format!("{resource} {id} not found")})),
    )
        .into_response()
}

fn same_id(record: &Value, id: &str) -> bool {
    match record.get("id") {
        Some(Value::String(text)) => text == id,
        Some(Value::Number(number)) => number.to_string() == id,
        _ => false,
    }
}

async fn health(State(state): State<ServerState>) -> Response {
    if state.inner.outage.load(Ordering::SeqCst) {
        return unavailable();
    }
    Json(json!({"success": true, "status": "ok"})).into_response()
}

async fn list(State(state): State<ServerState>, Path(resource): Path<String>) -> Response {
    if state.inner.outage.load(Ordering::SeqCst) {
        return unavailable();
    }
    let records = state
        .inner
        .tables
        .lock()
        .get(&resource)
        .cloned()
        .unwrap_or_default();
    Json(json!({"success": true, "data": records})).into_response()
}

async fn fetch(
    State(state): State<ServerState>,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    if state.inner.outage.load(Ordering::SeqCst) {
        return unavailable();
    }
    let tables = state.inner.tables.lock();
    let found = tables
        .get(&resource)
        .and_then(|records| records.iter().find(|record| same_id(record, &id)))
        .cloned();
    match found {
        Some(record) => Json(json!({"success": true, "data": record})).into_response(),
        None => not_found(&resource, &id),
    }
}

async fn create(
    State(state): State<ServerState>,
    Path(resource): Path<String>,
    Json(mut body): Json<Value>,
) -> Response {
    state.inner.writes.fetch_add(1, Ordering::SeqCst);
    if state.inner.outage.load(Ordering::SeqCst) {
        return unavailable();
    }
    if state.inner.malformed_writes.load(Ordering::SeqCst) {
        return Json(json!("ok")).into_response();
    }

    let id = state.inner.next_id.fetch_add(1, Ordering::SeqCst);
    body["id"] = json!(id);
    state
        .inner
        .tables
        .lock()
        .entry(resource)
        .or_default()
        .push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update(
    State(state): State<ServerState>,
    Path((resource, id)): Path<(String, String)>,
    Json(mut body): Json<Value>,
) -> Response {
    state.inner.writes.fetch_add(1, Ordering::SeqCst);
    if state.inner.outage.load(Ordering::SeqCst) {
        return unavailable();
    }
    if state.inner.malformed_writes.load(Ordering::SeqCst) {
        return Json(json!("ok")).into_response();
    }

    let mut tables = state.inner.tables.lock();
    let records = tables.entry(resource.clone()).or_default();
    let Some(existing) = records.iter_mut().find(|record| same_id(record, &id)) else {
        return not_found(&resource, &id);
    };
    body["id"] = existing["id"].clone();
    *existing = body.clone();
    Json(json!({"success": true, "data": body})).into_response()
}

async fn remove(
    State(state): State<ServerState>,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    state.inner.writes.fetch_add(1, Ordering::SeqCst);
    if state.inner.outage.load(Ordering::SeqCst) {
        return unavailable();
    }

    let mut tables = state.inner.tables.lock();
    let records = tables.entry(resource.clone()).or_default();
    let before = records.len();
    records.retain(|record| !same_id(record, &id));
    if records.len() == before {
        return not_found(&resource, &id);
    }
    StatusCode::NO_CONTENT.into_response()
}
