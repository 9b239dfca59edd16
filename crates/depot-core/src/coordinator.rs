//! Remote-first reads and writes with a local fallback.
//!
//! Every caller-facing operation tries the remote store first. When the remote
//! cannot be reached or returns something unusable, the operation falls back
//! to the [`CacheStore`] and, for writes, queues a [`SyncTask`] so the write is
//! replayed later. None of these operations return an error to the caller;
//! the outcome types say whether the result came from the remote.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::cache::CacheStore;
use crate::config::{CacheRetention, SyncSettings};
use crate::error::{Result, SyncError, SyncResult};
use crate::health::{HealthMonitor, HealthStatus};
use crate::locks::KeyLocks;
use crate::models::{
    position_of, DeleteOutcome, FetchOutcome, FlushReport, LoadOutcome, Record, RecordId,
    SaveOutcome, SyncEvent, SyncOperation, SyncTask,
};
use crate::queue::{BusyGuard, RetryDecision, RetryQueue};
use crate::registry::TableRegistry;
use crate::remote::{HttpRemote, RemoteStore};
use crate::scheduler::Scheduler;
use crate::util::{next_fallback_id, now_rfc3339};

const EVENT_CAPACITY: usize = 16;

/// What a single retry-queue step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainStep {
    /// Queue was empty
    Idle,
    /// Another drain is in flight
    Busy,
    Replayed {
        collection: String,
        id: RecordId,
    },
    Requeued {
        collection: String,
        id: RecordId,
        retry_count: u32,
    },
    /// Retry budget spent; the record stays marked pending.
    Abandoned {
        collection: String,
        id: RecordId,
    },
}

/// Result of one health-triggered resync.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoSyncReport {
    pub flush: FlushReport,
    pub collections: BTreeMap<String, LoadOutcome>,
}

/// Coordinates the cache, the remote store, and the retry queue.
pub struct SyncCoordinator {
    settings: SyncSettings,
    registry: TableRegistry,
    cache: CacheStore,
    remote: Arc<dyn RemoteStore>,
    queue: RetryQueue,
    locks: KeyLocks,
    health: HealthMonitor,
    events: broadcast::Sender<SyncEvent>,
    scheduler: Mutex<Option<Scheduler>>,
    auto_syncing: AtomicBool,
}

impl SyncCoordinator {
    pub fn new(
        settings: SyncSettings,
        registry: TableRegistry,
        cache: CacheStore,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            queue: RetryQueue::new(settings.max_retries),
            settings,
            registry,
            cache,
            remote,
            locks: KeyLocks::new(),
            health: HealthMonitor::new(),
            events,
            scheduler: Mutex::new(None),
            auto_syncing: AtomicBool::new(false),
        }
    }

    /// Coordinator talking to the HTTP remote at `settings.api_url`.
    pub fn connect(
        settings: SyncSettings,
        registry: TableRegistry,
        cache: CacheStore,
    ) -> Result<Self> {
        let remote = HttpRemote::new(&settings)?;
        Ok(Self::new(settings, registry, cache, Arc::new(remote)))
    }

    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub const fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub const fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub const fn queue(&self) -> &RetryQueue {
        &self.queue
    }

    pub fn health_status(&self) -> HealthStatus {
        self.health.status()
    }

    /// Receive [`SyncEvent`]s emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Create or update a record.
    ///
    /// With `is_update` and an `id` the remote record is replaced; otherwise a
    /// new record is created. When the remote write fails, the record is
    /// stored locally, marked pending, and queued for replay.
    pub async fn save(
        &self,
        collection: &str,
        data: Record,
        is_update: bool,
        id: Option<RecordId>,
    ) -> SaveOutcome {
        let resource = self.registry.resolve(collection);
        let update_id = if is_update { id.clone() } else { None };
        let record_id = id.or_else(|| data.id());

        let _guard = match &record_id {
            Some(id) => Some(self.locks.acquire(resource, id).await),
            None => None,
        };

        let attempt = match &update_id {
            Some(id) => {
                self.within_deadline(self.remote.update(resource, id, &data))
                    .await
            }
            None => self.within_deadline(self.remote.create(resource, &data)).await,
        };

        match attempt.and_then(|stored| accept_write(stored, update_id.as_ref())) {
            Ok(stored) => {
                self.settle_write(collection, record_id.as_ref(), &stored);
                tracing::debug!(collection, id = ?stored.id(), "Saved record to remote");
                SaveOutcome::synced(stored)
            }
            Err(error) => {
                let operation = if update_id.is_some() {
                    SyncOperation::Update
                } else {
                    SyncOperation::Create
                };
                self.save_locally(collection, data, operation, record_id, &error)
            }
        }
    }

    /// All records of a collection; the cached copy when the remote fails.
    pub async fn load(&self, collection: &str) -> LoadOutcome {
        let resource = self.registry.resolve(collection);
        match self.within_deadline(self.remote.list(resource)).await {
            Ok(records) => {
                let records = match self.settings.cache_retention {
                    CacheRetention::Authoritative => records,
                    CacheRetention::KeepPending => self.overlay_pending(collection, records),
                };
                self.cache.write_all(collection, &records);
                tracing::debug!(collection, count = records.len(), "Loaded collection from remote");
                LoadOutcome {
                    data: records,
                    synced: true,
                    fallback: false,
                }
            }
            Err(error) => {
                let data = self.cache.read_all(collection);
                tracing::warn!(
                    collection,
                    kind = error.kind(),
                    %error,
                    cached = data.len(),
                    "Remote load failed; serving cached collection"
                );
                LoadOutcome {
                    data,
                    synced: false,
                    fallback: true,
                }
            }
        }
    }

    /// Load every registered collection and announce the result.
    pub async fn sync_all(&self) -> BTreeMap<String, LoadOutcome> {
        let mut results = BTreeMap::new();
        for collection in self.registry.collections() {
            let outcome = self.load(collection).await;
            results.insert(collection.clone(), outcome);
        }

        let collections: Vec<String> = results
            .iter()
            .filter(|(_, outcome)| outcome.synced)
            .map(|(name, _)| name.clone())
            .collect();
        tracing::info!(
            synced = collections.len(),
            total = results.len(),
            "Full sync finished"
        );
        // No subscribers is fine.
        let _ = self.events.send(SyncEvent::DataSynced { collections });
        results
    }

    /// One record by id; the cached copy when the remote fails.
    pub async fn fetch(&self, collection: &str, id: &RecordId) -> FetchOutcome {
        let resource = self.registry.resolve(collection);
        match self.within_deadline(self.remote.get(resource, id)).await {
            Ok(record) => {
                if !self.cache.is_pending(collection, id) {
                    self.cache.upsert(collection, &record);
                }
                FetchOutcome {
                    data: Some(record),
                    synced: true,
                    fallback: false,
                }
            }
            Err(SyncError::NotFound { .. }) if !self.cache.is_pending(collection, id) => {
                self.cache.remove(collection, id);
                FetchOutcome {
                    data: None,
                    synced: true,
                    fallback: false,
                }
            }
            Err(error) => {
                tracing::warn!(collection, %id, %error, "Remote fetch failed; serving cached record");
                FetchOutcome {
                    data: self.cache.find(collection, id),
                    synced: false,
                    fallback: true,
                }
            }
        }
    }

    /// Delete a record. A record the remote does not know counts as deleted.
    pub async fn delete(&self, collection: &str, id: &RecordId) -> DeleteOutcome {
        let resource = self.registry.resolve(collection);
        let _guard = self.locks.acquire(resource, id).await;

        match self.within_deadline(self.remote.delete(resource, id)).await {
            Ok(()) | Err(SyncError::NotFound { .. }) => {
                self.cache.remove(collection, id);
                self.cache.clear_pending(collection, id);
                self.queue.discard(collection, id);
                DeleteOutcome {
                    success: true,
                    synced: true,
                    fallback: false,
                }
            }
            Err(error) => {
                let snapshot = self.cache.find(collection, id).unwrap_or_else(|| {
                    let mut record = Record::new();
                    record.set_id(id.as_str());
                    record
                });
                let removed = self.cache.remove(collection, id);
                let marked =
                    self.cache
                        .mark_pending(collection, id, SyncOperation::Delete, &snapshot);
                self.queue.push(SyncTask::new(
                    collection,
                    SyncOperation::Delete,
                    snapshot,
                    error.to_string(),
                ));
                tracing::warn!(
                    collection,
                    %id,
                    kind = error.kind(),
                    %error,
                    "Remote delete failed; removed locally and queued for retry"
                );
                DeleteOutcome {
                    success: removed && marked,
                    synced: false,
                    fallback: true,
                }
            }
        }
    }

    /// Replay one task from the head of the retry queue.
    pub async fn drain_once(&self) -> DrainStep {
        let Some(_drain) = self.queue.try_begin() else {
            return DrainStep::Busy;
        };

        loop {
            let Some((collection, id)) = self.queue.peek_target() else {
                return DrainStep::Idle;
            };
            let Some(id) = id else {
                if let Some(task) = self.queue.pop_front() {
                    tracing::error!(
                        collection = %collection,
                        operation = %task.operation,
                        "Dropping queued write without a record id"
                    );
                }
                continue;
            };

            let resource = self.registry.resolve(&collection);
            let _guard = self.locks.acquire(resource, &id).await;
            // The head may have been settled while we waited for the lock.
            let Some(task) = self.queue.pop_target(&collection, &id) else {
                continue;
            };

            return match self.replay_locked(&task, &id).await {
                Ok(()) => {
                    tracing::info!(
                        collection = %collection,
                        %id,
                        operation = %task.operation,
                        attempt = task.retry_count + 1,
                        "Replayed queued write"
                    );
                    DrainStep::Replayed { collection, id }
                }
                Err(error) => self.handle_replay_failure(task, collection, id, &error),
            };
        }
    }

    /// Replay pending records that have no task in the retry queue, such as
    /// writes left over from a previous process.
    pub async fn flush_pending(&self) -> FlushReport {
        let mut report = FlushReport::default();

        for pending in self.cache.all_pending() {
            if self.queue.contains(&pending.collection, &pending.id) {
                report.skipped += 1;
                continue;
            }

            let resource = self.registry.resolve(&pending.collection);
            let _guard = self.locks.acquire(resource, &pending.id).await;
            if !self.cache.is_pending(&pending.collection, &pending.id)
                || self.queue.contains(&pending.collection, &pending.id)
            {
                continue;
            }

            let task = SyncTask {
                collection: pending.collection.clone(),
                operation: pending.operation,
                record: pending.record,
                retry_count: 0,
                last_error: None,
                enqueued_at: pending.marked_at,
            };

            match self.replay_locked(&task, &pending.id).await {
                Ok(()) => report.flushed += 1,
                Err(error) => {
                    report.failed += 1;
                    tracing::warn!(
                        collection = %pending.collection,
                        id = %pending.id,
                        operation = %pending.operation,
                        %error,
                        "Pending record still not accepted by remote"
                    );
                }
            }
        }

        if report.flushed + report.failed > 0 {
            tracing::info!(
                flushed = report.flushed,
                failed = report.failed,
                skipped = report.skipped,
                "Flushed pending records"
            );
        }
        report
    }

    /// Probe the remote once.
    pub async fn check_health(&self) -> bool {
        self.health
            .probe(self.remote.as_ref(), self.settings.request_timeout)
            .await
    }

    /// Probe the remote and, when it is healthy, flush pending records and
    /// resync every collection. `None` when unhealthy or already running.
    pub async fn auto_sync(&self) -> Option<AutoSyncReport> {
        if !self.check_health().await {
            return None;
        }
        let Some(_running) = BusyGuard::claim(&self.auto_syncing) else {
            tracing::debug!("Auto-sync already running");
            return None;
        };

        let flush = self.flush_pending().await;
        let collections = self.sync_all().await;
        Some(AutoSyncReport { flush, collections })
    }

    /// Start the retry and health tickers. Returns `false` if already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut scheduler = self.scheduler.lock();
        if scheduler.is_some() {
            return false;
        }
        *scheduler = Some(Scheduler::spawn(self));
        true
    }

    /// Stop the tickers, waiting for an in-flight tick to finish.
    pub async fn stop(&self) {
        let scheduler = self.scheduler.lock().take();
        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.lock().is_some()
    }

    async fn within_deadline<T>(
        &self,
        call: impl Future<Output = SyncResult<T>>,
    ) -> SyncResult<T> {
        let deadline = self.settings.request_timeout;
        tokio::time::timeout(deadline, call)
            .await
            .unwrap_or_else(|_| {
                Err(SyncError::Network(format!(
                    "remote call exceeded {}s deadline",
                    deadline.as_secs_f64()
                )))
            })
    }

    /// Replay a task against the remote. The caller holds the record's lock.
    async fn replay_locked(&self, task: &SyncTask, id: &RecordId) -> SyncResult<()> {
        let collection = task.collection.as_str();
        let resource = self.registry.resolve(collection);

        match task.operation {
            SyncOperation::Create => {
                let stored = self
                    .within_deadline(self.remote.create(resource, &task.record))
                    .await
                    .and_then(|stored| accept_write(stored, None))?;
                self.settle_replay(collection, Some(id), &stored);
            }
            SyncOperation::Update => {
                let stored = self
                    .within_deadline(self.remote.update(resource, id, &task.record))
                    .await
                    .and_then(|stored| accept_write(stored, Some(id)))?;
                self.settle_replay(collection, Some(id), &stored);
            }
            SyncOperation::Delete => {
                match self.within_deadline(self.remote.delete(resource, id)).await {
                    Ok(()) | Err(SyncError::NotFound { .. }) => {
                        self.cache.remove(collection, id);
                        self.cache.clear_pending(collection, id);
                    }
                    Err(error) => return Err(error),
                }
            }
        }
        Ok(())
    }

    fn handle_replay_failure(
        &self,
        task: SyncTask,
        collection: String,
        id: RecordId,
        error: &SyncError,
    ) -> DrainStep {
        let operation = task.operation;
        match self.queue.record_failure(task, error) {
            RetryDecision::Requeued { retry_count } => {
                tracing::warn!(
                    collection = %collection,
                    %id,
                    %operation,
                    retry_count,
                    retryable = error.is_retryable(),
                    %error,
                    "Queued write failed again; will retry"
                );
                DrainStep::Requeued {
                    collection,
                    id,
                    retry_count,
                }
            }
            RetryDecision::Abandoned(task) => {
                tracing::error!(
                    collection = %collection,
                    %id,
                    %operation,
                    retry_count = task.retry_count,
                    %error,
                    "Giving up on queued write; record stays pending locally"
                );
                DrainStep::Abandoned { collection, id }
            }
        }
    }

    /// Bring local state in line after the remote accepted a caller's write.
    fn settle_write(&self, collection: &str, local_id: Option<&RecordId>, stored: &Record) {
        match self.settings.cache_retention {
            CacheRetention::Authoritative => {
                self.forget_pending(collection, local_id, stored.id().as_ref());
                self.cache.clear(collection);
            }
            CacheRetention::KeepPending => self.settle_replay(collection, local_id, stored),
        }
    }

    /// Settle one replayed record. Other unsynced records in the collection
    /// stay cached whatever the retention policy.
    fn settle_replay(&self, collection: &str, local_id: Option<&RecordId>, stored: &Record) {
        let stored_id = stored.id();
        self.forget_pending(collection, local_id, stored_id.as_ref());

        if let Some(local_id) = local_id {
            if stored_id.as_ref() != Some(local_id) {
                self.cache.remove(collection, local_id);
            }
        }
        self.cache.upsert(collection, stored);
    }

    fn forget_pending(
        &self,
        collection: &str,
        local_id: Option<&RecordId>,
        stored_id: Option<&RecordId>,
    ) {
        for id in local_id.into_iter().chain(stored_id) {
            self.cache.clear_pending(collection, id);
            self.queue.discard(collection, id);
        }
    }

    fn save_locally(
        &self,
        collection: &str,
        mut data: Record,
        operation: SyncOperation,
        id: Option<RecordId>,
        error: &SyncError,
    ) -> SaveOutcome {
        let id = match id {
            Some(id) => {
                if data.id().as_ref() != Some(&id) {
                    data.set_id(id.as_str());
                }
                id
            }
            None => {
                let fallback_id = next_fallback_id();
                data.set_id(fallback_id);
                RecordId::from(fallback_id)
            }
        };
        data.stamp_local_write(&now_rfc3339());

        let cached = self.cache.upsert(collection, &data);
        let marked = self.cache.mark_pending(collection, &id, operation, &data);
        self.queue.push(SyncTask::new(
            collection,
            operation,
            data.clone(),
            error.to_string(),
        ));

        tracing::warn!(
            collection,
            %id,
            %operation,
            kind = error.kind(),
            %error,
            "Remote write failed; saved locally and queued for retry"
        );
        SaveOutcome::fallback(data, cached && marked)
    }

    /// Lay pending local writes over a fresh remote listing.
    fn overlay_pending(&self, collection: &str, mut records: Vec<Record>) -> Vec<Record> {
        for pending in self.cache.pending(collection) {
            let position = position_of(&records, &pending.id);
            match (pending.operation, position) {
                (SyncOperation::Delete, Some(index)) => {
                    records.remove(index);
                }
                (SyncOperation::Delete, None) => {}
                (_, Some(index)) => records[index] = pending.record,
                (_, None) => records.push(pending.record),
            }
        }
        records
    }
}

/// Check that a remote write result is a genuine stored record.
fn accept_write(mut stored: Record, update_id: Option<&RecordId>) -> SyncResult<Record> {
    if stored.is_empty() {
        return Err(SyncError::MalformedResponse(
            "remote returned an empty record".to_string(),
        ));
    }
    if stored.is_fallback_marked() {
        return Err(SyncError::MalformedResponse(
            "remote result carries a fallback or error marker".to_string(),
        ));
    }

    if let Some(requested) = update_id {
        match stored.id() {
            Some(returned) if &returned != requested => {
                return Err(SyncError::MalformedResponse(format!(
                    "remote returned id {returned} for update of {requested}"
                )));
            }
            Some(_) => {}
            None => stored.set_id(requested.as_str()),
        }
    }
    Ok(stored)
}
