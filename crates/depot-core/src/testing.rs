//! In-memory remote for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use crate::models::{position_of, Record, RecordId};
use crate::remote::RemoteStore;

/// Scriptable remote: toggle reachability, add latency, override responses
/// and inspect the calls it received.
pub struct MemoryRemote {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    online: AtomicBool,
    next_id: AtomicI64,
    latency: Mutex<Duration>,
    update_delays: Mutex<VecDeque<Duration>>,
    write_responses: Mutex<VecDeque<SyncResult<Value>>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            next_id: AtomicI64::new(100),
            latency: Mutex::new(Duration::ZERO),
            update_delays: Mutex::new(VecDeque::new()),
            write_responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Extra delay for the next `update` call only.
    pub fn push_update_delay(&self, delay: Duration) {
        self.update_delays.lock().push_back(delay);
    }

    /// Raw result for the next create/update, bypassing the table.
    pub fn push_write_response(&self, response: SyncResult<Value>) {
        self.write_responses.lock().push_back(response);
    }

    pub fn seed(&self, resource: &str, values: Vec<Value>) {
        let records = values.into_iter().filter_map(Record::from_value).collect();
        self.tables.lock().insert(resource.to_string(), records);
    }

    pub fn records(&self, resource: &str) -> Vec<Record> {
        self.tables
            .lock()
            .get(resource)
            .cloned()
            .unwrap_or_default()
    }

    /// Calls received so far, as `"<operation> <resource>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    async fn enter(&self, call: String) -> SyncResult<()> {
        self.calls.lock().push(call);
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::Network("connection refused".to_string()))
        }
    }

    fn scripted_write(&self) -> Option<SyncResult<Record>> {
        let response = self.write_responses.lock().pop_front()?;
        Some(response.and_then(|value| {
            Record::from_value(value)
                .ok_or_else(|| SyncError::MalformedResponse("expected a record".to_string()))
        }))
    }

    fn not_found(resource: &str, id: &RecordId) -> SyncError {
        SyncError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn list(&self, resource: &str) -> SyncResult<Vec<Record>> {
        self.enter(format!("list {resource}")).await?;
        Ok(self.records(resource))
    }

    async fn get(&self, resource: &str, id: &RecordId) -> SyncResult<Record> {
        self.enter(format!("get {resource}")).await?;
        let tables = self.tables.lock();
        let records = tables.get(resource).map(Vec::as_slice).unwrap_or_default();
        position_of(records, id)
            .map(|index| records[index].clone())
            .ok_or_else(|| Self::not_found(resource, id))
    }

    async fn create(&self, resource: &str, record: &Record) -> SyncResult<Record> {
        self.enter(format!("create {resource}")).await?;
        if let Some(scripted) = self.scripted_write() {
            return scripted;
        }

        let mut stored = record.clone();
        stored.set_id(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.tables
            .lock()
            .entry(resource.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, resource: &str, id: &RecordId, record: &Record) -> SyncResult<Record> {
        let delay = self.update_delays.lock().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.enter(format!("update {resource}")).await?;
        if let Some(scripted) = self.scripted_write() {
            return scripted;
        }

        let mut tables = self.tables.lock();
        let records = tables.entry(resource.to_string()).or_default();
        let index = position_of(records, id).ok_or_else(|| Self::not_found(resource, id))?;
        let mut stored = record.clone();
        stored.set_id(id.as_str());
        records[index] = stored.clone();
        Ok(stored)
    }

    async fn delete(&self, resource: &str, id: &RecordId) -> SyncResult<()> {
        self.enter(format!("delete {resource}")).await?;
        let mut tables = self.tables.lock();
        let records = tables.entry(resource.to_string()).or_default();
        let index = position_of(records, id).ok_or_else(|| Self::not_found(resource, id))?;
        records.remove(index);
        Ok(())
    }

    async fn health(&self) -> bool {
        self.enter("health".to_string()).await.is_ok()
    }
}
