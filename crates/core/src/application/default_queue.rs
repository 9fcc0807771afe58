// Default Queue Facade

use std::sync::Arc;

use crate::domain::{ClaimedJob, JobArgs, JobId, QueueConfig};
use crate::error::Result;
use crate::port::{JobStore, TimeProvider, WorkSignal};

use super::queue::Queue;

/// Process-wide convenience binding to the well-known `"default"` queue.
///
/// A thin wrapper: it owns an ordinary top-level [`Queue`] and forwards
/// every operation to it. Construct one at process start and pass it around
/// explicitly - there is no hidden ambient global behind it.
pub struct DefaultQueue {
    inner: Queue,
}

impl DefaultQueue {
    pub fn new(store: Arc<dyn JobStore>, time: Arc<dyn TimeProvider>) -> Self {
        Self {
            inner: Queue::new(QueueConfig::default_queue(), store, time),
        }
    }

    pub fn with_signal(mut self, signal: Arc<dyn WorkSignal>) -> Self {
        self.inner = self.inner.with_signal(signal);
        self
    }

    /// The underlying queue, for callers that want the full surface.
    pub fn queue(&self) -> &Queue {
        &self.inner
    }

    pub async fn enqueue(&self, method: &str, args: JobArgs) -> Result<JobId> {
        self.inner.enqueue(method, args).await
    }

    pub async fn enqueue_if_not_queued(
        &self,
        method: &str,
        args: JobArgs,
    ) -> Result<Option<JobId>> {
        self.inner.enqueue_if_not_queued(method, args).await
    }

    pub async fn lock(&self) -> Result<Option<ClaimedJob>> {
        self.inner.lock().await
    }

    pub async fn count(&self) -> Result<i64> {
        self.inner.count().await
    }

    pub async fn job_count(&self, method: &str, args: JobArgs) -> Result<i64> {
        self.inner.job_count(method, args).await
    }

    pub async fn delete(&self, id: JobId) -> Result<()> {
        self.inner.delete(id).await
    }

    pub async fn delete_all(&self) -> Result<u64> {
        self.inner.delete_all().await
    }
}
