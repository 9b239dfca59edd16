//! Retry queue for writes that failed remotely.
//!
//! The queue only holds state; replaying tasks against the remote is the
//! coordinator's job (see [`SyncCoordinator::drain_once`](crate::SyncCoordinator::drain_once)).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::SyncError;
use crate::models::{RecordId, SyncTask};

/// What happened to a task after a failed replay.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Put back at the tail with the new retry count.
    Requeued { retry_count: u32 },
    /// Retry budget spent; the task has been dropped.
    Abandoned(SyncTask),
}

/// In-memory FIFO of [`SyncTask`]s with a bounded retry budget.
///
/// Holds at most one task per `(collection, id)`: a newer write for the same
/// record is folded into the queued task, which keeps its position.
pub struct RetryQueue {
    tasks: Mutex<VecDeque<SyncTask>>,
    busy: AtomicBool,
    max_retries: u32,
}

/// Holds a single-flight flag; dropping it clears the flag.
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    /// Set `flag`, or `None` if it is already set.
    pub fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl RetryQueue {
    pub fn new(max_retries: u32) -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
            busy: AtomicBool::new(false),
            max_retries,
        }
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Enqueue a task, coalescing with a queued task for the same record.
    pub fn push(&self, task: SyncTask) {
        let mut tasks = self.tasks.lock();

        let existing = task.record_id().and_then(|id| {
            tasks
                .iter()
                .position(|queued| queued.targets(&task.collection, &id))
        });

        let Some(index) = existing else {
            tasks.push_back(task);
            return;
        };

        match tasks[index].operation.coalesce(task.operation) {
            Some(operation) => {
                let queued = &mut tasks[index];
                queued.operation = operation;
                queued.record = task.record;
                queued.retry_count = 0;
                queued.last_error = task.last_error;
            }
            None => {
                tasks.remove(index);
            }
        }
    }

    /// Claim the single drain slot, or `None` if a drain is already running.
    pub fn try_begin(&self) -> Option<BusyGuard<'_>> {
        BusyGuard::claim(&self.busy)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Take the oldest task.
    pub fn pop_front(&self) -> Option<SyncTask> {
        self.tasks.lock().pop_front()
    }

    /// Collection and record id of the oldest task.
    pub fn peek_target(&self) -> Option<(String, Option<RecordId>)> {
        self.tasks
            .lock()
            .front()
            .map(|task| (task.collection.clone(), task.record_id()))
    }

    /// Take the oldest task only if it still targets `id` in `collection`.
    pub fn pop_target(&self, collection: &str, id: &RecordId) -> Option<SyncTask> {
        let mut tasks = self.tasks.lock();
        if tasks.front()?.targets(collection, id) {
            tasks.pop_front()
        } else {
            None
        }
    }

    /// Account for a failed replay of a popped task.
    pub fn record_failure(&self, mut task: SyncTask, error: &SyncError) -> RetryDecision {
        task.retry_count = task.retry_count.saturating_add(1);
        task.last_error = Some(error.to_string());

        if task.retry_count < self.max_retries {
            let retry_count = task.retry_count;
            self.tasks.lock().push_back(task);
            RetryDecision::Requeued { retry_count }
        } else {
            RetryDecision::Abandoned(task)
        }
    }

    /// Drop the queued task for a record, if any.
    pub fn discard(&self, collection: &str, id: &RecordId) -> bool {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|task| !task.targets(collection, id));
        tasks.len() != before
    }

    pub fn contains(&self, collection: &str, id: &RecordId) -> bool {
        self.tasks
            .lock()
            .iter()
            .any(|task| task.targets(collection, id))
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Copy of the queued tasks, head first.
    pub fn snapshot(&self) -> Vec<SyncTask> {
        self.tasks.lock().iter().cloned().collect()
    }
}
