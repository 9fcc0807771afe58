// Job Store Port (Interface)

use crate::domain::{ClaimedJob, Job, JobId, Signature};
use crate::error::Result;
use async_trait::async_trait;

/// Storage interface for durable job records.
///
/// Implementations must make `insert_if_absent` and `claim_next` atomic with
/// respect to concurrent callers across process boundaries; the queue layer
/// adds no locking of its own. Every method is scoped to one queue name -
/// rows in other queues are invisible to it.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new unlocked job, returning the store-assigned id.
    async fn insert(&self, queue: &str, signature: &Signature, now_millis: i64) -> Result<JobId>;

    /// Insert only if no live row in the queue carries the same signature.
    /// Locked rows count as live; deleted rows never do. Returns `None`
    /// when a duplicate already existed.
    async fn insert_if_absent(
        &self,
        queue: &str,
        signature: &Signature,
        now_millis: i64,
    ) -> Result<Option<JobId>>;

    /// Atomically claim the lowest-id unlocked row, stamping `locked_at`.
    /// Rows locked by other claimants are skipped, never waited on.
    async fn claim_next(&self, queue: &str, now_millis: i64) -> Result<Option<ClaimedJob>>;

    /// Number of rows in the queue, locked or not.
    async fn count(&self, queue: &str) -> Result<i64>;

    /// Number of rows exactly matching the signature, locked or not.
    async fn count_matching(&self, queue: &str, signature: &Signature) -> Result<i64>;

    /// Remove one row by id. Returns the number of rows removed (0 or 1).
    async fn delete(&self, queue: &str, id: JobId) -> Result<u64>;

    /// Remove every row belonging to the queue. Returns the number removed.
    async fn delete_all(&self, queue: &str) -> Result<u64>;

    /// Fetch one row by id, for inspection by workers and tests.
    async fn find_by_id(&self, queue: &str, id: JobId) -> Result<Option<Job>>;
}
