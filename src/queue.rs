//! Job queue and store contract (C8): durable FIFO queue, job lifecycle,
//! result TTL, and admin reset (spec §4.8). `Store` is the seam across which
//! a real deployment would plug in its shared queue/cache backend; this
//! module ships exactly one implementation, `InMemoryStore`, sized for
//! tests and local runs rather than production durability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

use crate::domain::{JobId, JobStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub input: serde_json::Value,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobRecord {
    /// Enforces the monotonic-status and result/error invariants of spec §3.
    fn check_invariant(&self) -> bool {
        match self.status {
            JobStatus::Completed => self.result.is_some(),
            JobStatus::Failed => self.error.is_some(),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total_jobs: u64,
    pub active_jobs: usize,
    pub queue_length: usize,
    pub results_cached: usize,
}

/// The operations a shared store must provide (spec §4.8.2): FIFO queue,
/// hash metadata per job, KV+TTL result storage, and a monotonic counter.
/// Every method is `async` so a networked backend (Redis, etc.) can be
/// dropped in without changing call sites.
#[allow(async_fn_in_trait)]
pub trait Store: Send + Sync {
    fn submit(&self, input: serde_json::Value) -> impl std::future::Future<Output = JobId> + Send;
    /// Blocks up to `timeout` for a queued job, CAS-ing it to `in_progress`
    /// on success. Returns `None` on timeout or a lost CAS race.
    fn claim(
        &self,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Option<JobId>> + Send;
    fn complete(
        &self,
        id: JobId,
        result: serde_json::Value,
    ) -> impl std::future::Future<Output = ()> + Send;
    fn fail(&self, id: JobId, error: String) -> impl std::future::Future<Output = ()> + Send;
    fn status(
        &self,
        id: JobId,
    ) -> impl std::future::Future<Output = Option<JobRecord>> + Send;
    /// Removes metadata and any cached result atomically; `true` if the job existed.
    fn delete(&self, id: JobId) -> impl std::future::Future<Output = bool> + Send;
    fn stats(&self) -> impl std::future::Future<Output = QueueStats> + Send;
    /// Drops every namespaced key (spec §4.8.3 "effect: drops all namespaced keys").
    fn admin_reset(&self) -> impl std::future::Future<Output = ()> + Send;
    /// Garbage-collects `completed`/`failed` records older than `ttl` (spec
    /// §4.8.1 "garbage-collected" after `T_result`). Not required by the
    /// trait's callers to run on any particular schedule.
    fn sweep_expired(&self, ttl: Duration) -> impl std::future::Future<Output = ()> + Send;
}

struct Inner {
    queue: VecDeque<JobId>,
    jobs: HashMap<JobId, JobRecord>,
}

pub struct InMemoryStore {
    inner: Mutex<Inner>,
    notify: Notify,
    total_jobs: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                jobs: HashMap::new(),
            }),
            notify: Notify::new(),
            total_jobs: AtomicU64::new(0),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for InMemoryStore {
    async fn submit(&self, input: serde_json::Value) -> JobId {
        let id = JobId::new();
        let now = Utc::now();
        let record = JobRecord {
            id: id.clone(),
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            input,
            result: None,
            error: None,
        };
        {
            let mut guard = self.inner.lock().await;
            guard.jobs.insert(id.clone(), record);
            guard.queue.push_back(id.clone());
        }
        self.total_jobs.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
        id
    }

    async fn claim(&self, timeout: Duration) -> Option<JobId> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let mut guard = self.inner.lock().await;
                if let Some(id) = guard.queue.pop_front() {
                    match guard.jobs.get_mut(&id) {
                        Some(record) if record.status == JobStatus::Queued => {
                            record.status = JobStatus::InProgress;
                            record.updated_at = Utc::now();
                            return Some(id);
                        }
                        // CAS lost or metadata missing: drop and keep looking.
                        _ => continue,
                    }
                }
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let _ = tokio::time::timeout(remaining, self.notify.notified()).await;
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
        }
    }

    async fn complete(&self, id: JobId, result: serde_json::Value) {
        let mut guard = self.inner.lock().await;
        if let Some(record) = guard.jobs.get_mut(&id) {
            record.status = JobStatus::Completed;
            record.result = Some(result);
            record.updated_at = Utc::now();
            debug_assert!(record.check_invariant());
        }
    }

    async fn fail(&self, id: JobId, error: String) {
        let mut guard = self.inner.lock().await;
        if let Some(record) = guard.jobs.get_mut(&id) {
            record.status = JobStatus::Failed;
            record.error = Some(error);
            record.updated_at = Utc::now();
            debug_assert!(record.check_invariant());
        }
    }

    async fn status(&self, id: JobId) -> Option<JobRecord> {
        self.inner.lock().await.jobs.get(&id).cloned()
    }

    async fn delete(&self, id: JobId) -> bool {
        let mut guard = self.inner.lock().await;
        guard.queue.retain(|queued| *queued != id);
        guard.jobs.remove(&id).is_some()
    }

    async fn stats(&self) -> QueueStats {
        let guard = self.inner.lock().await;
        let active_jobs = guard.jobs.values().filter(|j| j.status == JobStatus::InProgress).count();
        let results_cached = guard.jobs.values().filter(|j| j.status == JobStatus::Completed).count();
        QueueStats {
            total_jobs: self.total_jobs.load(Ordering::Relaxed),
            active_jobs,
            queue_length: guard.queue.len(),
            results_cached,
        }
    }

    async fn admin_reset(&self) {
        let mut guard = self.inner.lock().await;
        guard.queue.clear();
        guard.jobs.clear();
        self.total_jobs.store(0, Ordering::Relaxed);
    }

    async fn sweep_expired(&self, ttl: Duration) {
        let cutoff = Utc::now() - chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        let mut guard = self.inner.lock().await;
        guard.jobs.retain(|_, record| {
            let terminal = matches!(record.status, JobStatus::Completed | JobStatus::Failed);
            !(terminal && record.updated_at < cutoff)
        });
    }
}
