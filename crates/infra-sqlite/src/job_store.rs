// SQLite JobStore Implementation

use std::sync::Arc;

use async_trait::async_trait;

use dispatchq_core::domain::{ClaimedJob, Job, JobArgs, JobId, Signature};
use dispatchq_core::error::Result;
use dispatchq_core::port::JobStore;

use crate::connection::ResilientConnection;

/// `JobStore` over a single self-healing SQLite link.
///
/// Claim and dedup are each one statement, so SQLite's serialized writers
/// make them atomic across connections and processes - no locking happens in
/// this layer. Arguments travel as their canonical JSON text, which lets
/// signature matching be plain text equality.
pub struct SqliteJobStore {
    conn: Arc<ResilientConnection>,
}

impl SqliteJobStore {
    pub fn new(conn: Arc<ResilientConnection>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn insert(&self, queue: &str, signature: &Signature, now_millis: i64) -> Result<JobId> {
        let queue = queue.to_owned();
        let method = signature.method().to_owned();
        let args = signature.args().encode()?;
        self.conn
            .run(move |conn| {
                Box::pin(async move {
                    sqlx::query_scalar(
                        "INSERT INTO jobs (queue_name, method, args, created_at) \
                         VALUES (?1, ?2, ?3, ?4) RETURNING id",
                    )
                    .bind(&queue)
                    .bind(&method)
                    .bind(&args)
                    .bind(now_millis)
                    .fetch_one(&mut *conn)
                    .await
                })
            })
            .await
    }

    async fn insert_if_absent(
        &self,
        queue: &str,
        signature: &Signature,
        now_millis: i64,
    ) -> Result<Option<JobId>> {
        let queue = queue.to_owned();
        let method = signature.method().to_owned();
        let args = signature.args().encode()?;
        // One statement, so the existence check and the insert cannot be
        // separated by a concurrent writer. Locked rows still exist and
        // therefore still block re-enqueue; deleted rows are gone and don't.
        self.conn
            .run(move |conn| {
                Box::pin(async move {
                    sqlx::query_scalar(
                        "INSERT INTO jobs (queue_name, method, args, created_at) \
                         SELECT ?1, ?2, ?3, ?4 \
                         WHERE NOT EXISTS (\
                             SELECT 1 FROM jobs \
                             WHERE queue_name = ?1 AND method = ?2 AND args = ?3\
                         ) \
                         RETURNING id",
                    )
                    .bind(&queue)
                    .bind(&method)
                    .bind(&args)
                    .bind(now_millis)
                    .fetch_optional(&mut *conn)
                    .await
                })
            })
            .await
    }

    async fn claim_next(&self, queue: &str, now_millis: i64) -> Result<Option<ClaimedJob>> {
        let queue = queue.to_owned();
        // Eligibility is decided inside the statement: only unlocked rows
        // are candidates, so a row held by another claimant is skipped, not
        // waited on. Lowest id wins - arrival order.
        let row: Option<(i64, String, String)> = self
            .conn
            .run(move |conn| {
                Box::pin(async move {
                    sqlx::query_as(
                        "UPDATE jobs SET locked_at = ?1 \
                         WHERE id = (\
                             SELECT id FROM jobs \
                             WHERE queue_name = ?2 AND locked_at IS NULL \
                             ORDER BY id LIMIT 1\
                         ) \
                         RETURNING id, method, args",
                    )
                    .bind(now_millis)
                    .bind(&queue)
                    .fetch_optional(&mut *conn)
                    .await
                })
            })
            .await?;

        row.map(|(id, method, args)| {
            Ok(ClaimedJob {
                id,
                method,
                args: JobArgs::decode(&args)?,
            })
        })
        .transpose()
    }

    async fn count(&self, queue: &str) -> Result<i64> {
        let queue = queue.to_owned();
        self.conn
            .run(move |conn| {
                Box::pin(async move {
                    sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE queue_name = ?1")
                        .bind(&queue)
                        .fetch_one(&mut *conn)
                        .await
                })
            })
            .await
    }

    async fn count_matching(&self, queue: &str, signature: &Signature) -> Result<i64> {
        let queue = queue.to_owned();
        let method = signature.method().to_owned();
        let args = signature.args().encode()?;
        self.conn
            .run(move |conn| {
                Box::pin(async move {
                    sqlx::query_scalar(
                        "SELECT COUNT(*) FROM jobs \
                         WHERE queue_name = ?1 AND method = ?2 AND args = ?3",
                    )
                    .bind(&queue)
                    .bind(&method)
                    .bind(&args)
                    .fetch_one(&mut *conn)
                    .await
                })
            })
            .await
    }

    async fn delete(&self, queue: &str, id: JobId) -> Result<u64> {
        let queue = queue.to_owned();
        self.conn
            .run(move |conn| {
                Box::pin(async move {
                    let done = sqlx::query("DELETE FROM jobs WHERE queue_name = ?1 AND id = ?2")
                        .bind(&queue)
                        .bind(id)
                        .execute(&mut *conn)
                        .await?;
                    Ok(done.rows_affected())
                })
            })
            .await
    }

    async fn delete_all(&self, queue: &str) -> Result<u64> {
        let queue = queue.to_owned();
        self.conn
            .run(move |conn| {
                Box::pin(async move {
                    let done = sqlx::query("DELETE FROM jobs WHERE queue_name = ?1")
                        .bind(&queue)
                        .execute(&mut *conn)
                        .await?;
                    Ok(done.rows_affected())
                })
            })
            .await
    }

    async fn find_by_id(&self, queue: &str, id: JobId) -> Result<Option<Job>> {
        let queue = queue.to_owned();
        let row: Option<JobRow> = self
            .conn
            .run(move |conn| {
                Box::pin(async move {
                    sqlx::query_as(
                        "SELECT id, queue_name, method, args, locked_at, created_at \
                         FROM jobs WHERE queue_name = ?1 AND id = ?2",
                    )
                    .bind(&queue)
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await
                })
            })
            .await?;

        row.map(JobRow::into_job).transpose()
    }
}

/// Row shape as persisted.
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: i64,
    queue_name: String,
    method: String,
    args: String,
    locked_at: Option<i64>,
    created_at: i64,
}

impl JobRow {
    fn into_job(self) -> Result<Job> {
        Ok(Job {
            id: self.id,
            queue_name: self.queue_name,
            method: self.method,
            args: JobArgs::decode(&self.args)?,
            created_at: self.created_at,
            locked_at: self.locked_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{run_migrations, StoreConfig};
    use dispatchq_core::application::Queue;
    use dispatchq_core::domain::QueueConfig;
    use dispatchq_core::port::{FixedTimeProvider, SystemTimeProvider};
    use serde_json::json;

    async fn setup_store() -> (Arc<ResilientConnection>, SqliteJobStore) {
        let conn = Arc::new(
            ResilientConnection::connect(StoreConfig::new(":memory:"))
                .await
                .unwrap(),
        );
        run_migrations(&conn).await.unwrap();
        let store = SqliteJobStore::new(conn.clone());
        (conn, store)
    }

    fn sig(method: &str, args: Vec<serde_json::Value>) -> Signature {
        Signature::new(method, JobArgs::new(args))
    }

    #[tokio::test]
    async fn insert_assigns_ascending_ids() {
        let (_, store) = setup_store().await;

        let first = store.insert("q", &sig("M.a", vec![]), 1_000).await.unwrap();
        let second = store.insert("q", &sig("M.b", vec![]), 2_000).await.unwrap();

        assert!(second > first);
        assert_eq!(store.count("q").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn find_by_id_reads_back_the_row() {
        let (_, store) = setup_store().await;
        let id = store
            .insert("q", &sig("M.a", vec![json!("a1"), json!(2)]), 1_000)
            .await
            .unwrap();

        let job = store.find_by_id("q", id).await.unwrap().unwrap();
        assert_eq!(job.method, "M.a");
        assert_eq!(job.args, JobArgs::new(vec![json!("a1"), json!(2)]));
        assert_eq!(job.created_at, 1_000);
        assert!(!job.is_locked());

        assert!(store.find_by_id("other", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_walks_arrival_order_and_skips_locked_rows() {
        let (_, store) = setup_store().await;
        let a = store.insert("q", &sig("M.a", vec![]), 1_000).await.unwrap();
        let b = store.insert("q", &sig("M.b", vec![]), 1_000).await.unwrap();

        let first = store.claim_next("q", 2_000).await.unwrap().unwrap();
        assert_eq!(first.id, a);

        // The claimed row is skipped, never waited on.
        let second = store.claim_next("q", 2_001).await.unwrap().unwrap();
        assert_eq!(second.id, b);

        assert!(store.claim_next("q", 2_002).await.unwrap().is_none());

        let held = store.find_by_id("q", a).await.unwrap().unwrap();
        assert_eq!(held.locked_at, Some(2_000));
    }

    #[tokio::test]
    async fn claim_on_empty_queue_returns_none() {
        let (_, store) = setup_store().await;
        assert!(store.claim_next("q", 1_000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_snapshot_has_empty_args_not_null() {
        let (_, store) = setup_store().await;
        store.insert("q", &sig("M.a", vec![]), 1_000).await.unwrap();

        let claimed = store.claim_next("q", 2_000).await.unwrap().unwrap();
        assert_eq!(claimed.args, JobArgs::empty());
    }

    #[tokio::test]
    async fn count_matching_includes_locked_rows_and_matches_exactly() {
        let (_, store) = setup_store().await;
        let s = sig("M.a", vec![json!("a1"), json!("a2")]);
        for _ in 0..3 {
            store.insert("q", &s, 1_000).await.unwrap();
        }
        store
            .insert("q", &sig("M.a", vec![json!("a3"), json!("a4")]), 1_000)
            .await
            .unwrap();
        store
            .insert("q", &sig("N.a", vec![json!("a1"), json!("a2")]), 1_000)
            .await
            .unwrap();

        store.claim_next("q", 2_000).await.unwrap();

        assert_eq!(store.count_matching("q", &s).await.unwrap(), 3);
        assert_eq!(store.count("q").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn insert_if_absent_blocks_pending_and_inflight_duplicates() {
        let (_, store) = setup_store().await;
        let s = sig("M.a", vec![json!("a1")]);

        let first = store.insert_if_absent("q", &s, 1_000).await.unwrap();
        assert!(first.is_some());
        assert!(store.insert_if_absent("q", &s, 1_001).await.unwrap().is_none());

        // Claiming keeps the row live; re-enqueue stays blocked.
        store.claim_next("q", 2_000).await.unwrap().unwrap();
        assert!(store.insert_if_absent("q", &s, 2_001).await.unwrap().is_none());

        // Deletion frees the signature.
        store.delete("q", first.unwrap()).await.unwrap();
        assert!(store.insert_if_absent("q", &s, 3_000).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn insert_if_absent_is_scoped_to_the_queue() {
        let (_, store) = setup_store().await;
        let s = sig("M.a", vec![json!("a1")]);

        assert!(store.insert_if_absent("q1", &s, 1_000).await.unwrap().is_some());
        assert!(store.insert_if_absent("q2", &s, 1_000).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_scoped() {
        let (_, store) = setup_store().await;
        let id = store.insert("q", &sig("M.a", vec![]), 1_000).await.unwrap();

        assert_eq!(store.delete("other", id).await.unwrap(), 0);
        assert_eq!(store.delete("q", id).await.unwrap(), 1);
        assert_eq!(store.delete("q", id).await.unwrap(), 0);
        assert_eq!(store.count("q").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_all_leaves_other_queues_untouched() {
        let (_, store) = setup_store().await;
        store.insert("a", &sig("M.a", vec![]), 1_000).await.unwrap();
        store.insert("a", &sig("M.b", vec![]), 1_000).await.unwrap();
        store.insert("b", &sig("M.a", vec![]), 1_000).await.unwrap();

        assert_eq!(store.delete_all("a").await.unwrap(), 2);
        assert_eq!(store.count("a").await.unwrap(), 0);
        assert_eq!(store.count("b").await.unwrap(), 1);
    }

    // The repair scenario end to end: a link failure during enqueue surfaces
    // a queue error and persists nothing; the following enqueue runs on the
    // repaired link and lands.
    #[tokio::test]
    async fn queue_survives_a_link_failure_between_enqueues() {
        let path = "/tmp/dispatchq_store_repair.db";
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{path}{suffix}"));
        }

        let conn = Arc::new(
            ResilientConnection::connect(StoreConfig::new(path))
                .await
                .unwrap(),
        );
        run_migrations(&conn).await.unwrap();
        let queue = Queue::new(
            QueueConfig::new("jobs", false),
            Arc::new(SqliteJobStore::new(conn.clone())),
            Arc::new(SystemTimeProvider),
        );

        queue.enqueue("M.a", JobArgs::empty()).await.unwrap();
        assert_eq!(queue.count().await.unwrap(), 1);

        conn.inject_link_failure();
        let err = queue.enqueue("M.b", JobArgs::empty()).await.unwrap_err();
        assert!(err.is_connection());
        assert_eq!(queue.count().await.unwrap(), 1);

        queue.enqueue("M.b", JobArgs::empty()).await.unwrap();
        assert_eq!(queue.count().await.unwrap(), 2);

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{path}{suffix}"));
        }
    }

    #[tokio::test]
    async fn claim_timestamp_comes_from_the_caller_clock() {
        let (_, store) = setup_store().await;
        let store = Arc::new(store);
        let queue = Queue::new(
            QueueConfig::new("jobs", false),
            store.clone(),
            Arc::new(FixedTimeProvider(42_000)),
        );

        queue.enqueue("M.a", JobArgs::empty()).await.unwrap();
        let claimed = queue.lock().await.unwrap().unwrap();

        let job = store.find_by_id("jobs", claimed.id).await.unwrap().unwrap();
        assert_eq!(job.created_at, 42_000);
        assert_eq!(job.locked_at, Some(42_000));
    }
}
