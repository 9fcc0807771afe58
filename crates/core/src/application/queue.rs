// Queue - queue-scoped access to durable job records

use std::sync::Arc;

use tracing::debug;

use crate::domain::{ClaimedJob, JobArgs, JobId, QueueConfig, Signature};
use crate::error::Result;
use crate::port::{JobStore, TimeProvider, WorkSignal};

/// A named, independent partition of the job store.
///
/// Two queues with different names never interact: counting, claiming and
/// deleting are strictly scoped to the queue's name. Coordination
/// correctness (claim exclusivity, dedup exclusivity) is delegated entirely
/// to the store's atomic statements, so it holds across process boundaries,
/// not just within one.
///
/// A failed mutating call is never re-attempted internally; the caller may
/// assume no durable effect occurred and retry explicitly (`delete` being
/// idempotent, retrying it is always safe).
pub struct Queue {
    config: QueueConfig,
    store: Arc<dyn JobStore>,
    time: Arc<dyn TimeProvider>,
    signal: Option<Arc<dyn WorkSignal>>,
}

impl Queue {
    pub fn new(config: QueueConfig, store: Arc<dyn JobStore>, time: Arc<dyn TimeProvider>) -> Self {
        Self {
            config,
            store,
            time,
            signal: None,
        }
    }

    /// Attach the wake-up collaborator. Only top-level queues publish.
    pub fn with_signal(mut self, signal: Arc<dyn WorkSignal>) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Notification channel bound to this queue.
    pub fn channel(&self) -> &str {
        &self.config.name
    }

    pub fn is_top_level(&self) -> bool {
        self.config.top_level
    }

    /// Insert a new unlocked job, returning its store-assigned id.
    pub async fn enqueue(&self, method: &str, args: JobArgs) -> Result<JobId> {
        let signature = Signature::new(method, args);
        let id = self
            .store
            .insert(self.name(), &signature, self.time.now_millis())
            .await?;
        debug!(queue = %self.name(), job_id = id, method = %signature.method(), "job enqueued");
        self.publish_work_available();
        Ok(id)
    }

    /// Insert only if no pending or in-flight job in this queue carries the
    /// same `(method, args)` signature.
    ///
    /// The store makes the check-and-insert indivisible, so two concurrent
    /// calls with an identical signature produce exactly one row. Returns
    /// `None` when a duplicate already existed; once prior instances are
    /// deleted the signature can be re-enqueued freely.
    pub async fn enqueue_if_not_queued(
        &self,
        method: &str,
        args: JobArgs,
    ) -> Result<Option<JobId>> {
        let signature = Signature::new(method, args);
        let inserted = self
            .store
            .insert_if_absent(self.name(), &signature, self.time.now_millis())
            .await?;
        match inserted {
            Some(id) => {
                debug!(queue = %self.name(), job_id = id, method = %signature.method(), "job enqueued");
                self.publish_work_available();
                Ok(Some(id))
            }
            None => {
                debug!(queue = %self.name(), method = %signature.method(), "signature already queued, skipped");
                Ok(None)
            }
        }
    }

    /// Claim the oldest unlocked job and mark it owned by this consumer.
    ///
    /// Never blocks waiting for a row another claimant holds: locked rows
    /// are skipped, and `None` comes back when nothing is claimable at this
    /// instant - even if locked rows exist. A claim is released only by
    /// `delete`; there is no timeout in this layer.
    pub async fn lock(&self) -> Result<Option<ClaimedJob>> {
        let claimed = self
            .store
            .claim_next(self.name(), self.time.now_millis())
            .await?;
        if let Some(job) = &claimed {
            debug!(queue = %self.name(), job_id = job.id, method = %job.method, "job claimed");
        }
        Ok(claimed)
    }

    /// Number of jobs in this queue, claimed or not.
    pub async fn count(&self) -> Result<i64> {
        self.store.count(self.name()).await
    }

    /// Number of jobs whose `(method, args)` exactly match, claimed or not.
    pub async fn job_count(&self, method: &str, args: JobArgs) -> Result<i64> {
        let signature = Signature::new(method, args);
        self.store.count_matching(self.name(), &signature).await
    }

    /// Remove one job. Idempotent: deleting an id that is already gone is a
    /// no-op, so an at-least-once worker may delete twice after a retry.
    pub async fn delete(&self, id: JobId) -> Result<()> {
        let removed = self.store.delete(self.name(), id).await?;
        if removed == 0 {
            debug!(queue = %self.name(), job_id = id, "delete of absent job ignored");
        }
        Ok(())
    }

    /// Remove every job belonging to this queue, returning how many went.
    /// Rows in other queues are unaffected.
    pub async fn delete_all(&self) -> Result<u64> {
        let removed = self.store.delete_all(self.name()).await?;
        debug!(queue = %self.name(), removed, "queue cleared");
        Ok(removed)
    }

    fn publish_work_available(&self) {
        if !self.config.top_level {
            return;
        }
        if let Some(signal) = &self.signal {
            signal.publish(self.channel());
        }
    }
}
