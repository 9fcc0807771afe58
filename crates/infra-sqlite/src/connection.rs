// Self-Healing SQLite Connection

use futures::future::BoxFuture;
use sqlx::sqlite::SqliteConnection;
use sqlx::{ConnectOptions, Connection};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{info, warn};

use dispatchq_core::error::{QueueError, Result};

use crate::config::StoreConfig;

/// Lifecycle of the single live link to the store.
enum Link {
    Connected(SqliteConnection),
    Broken,
}

/// The one live handle to the durable store.
///
/// Executes parameterized statements on behalf of the queue layer and
/// repairs the link after connection-class failures. Repair never replays
/// the statement that observed the failure: an insert whose commit status is
/// unknown must not be re-attempted behind the caller's back, so the failure
/// is surfaced and the *next* call runs on the fresh link.
pub struct ResilientConnection {
    config: StoreConfig,
    link: Mutex<Link>,
    #[cfg(test)]
    fail_next: std::sync::atomic::AtomicBool,
}

impl ResilientConnection {
    /// Open the initial link.
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let conn = config
            .connect_options()?
            .connect()
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))?;
        Ok(Self {
            config,
            link: Mutex::new(Link::Connected(conn)),
            #[cfg(test)]
            fail_next: std::sync::atomic::AtomicBool::new(false),
        })
    }

    /// Execute one statement against the live link.
    ///
    /// A statement-class rejection (constraint violation, busy database,
    /// malformed statement) leaves the link alone and is wrapped as an
    /// operation error. A connection-class failure tears the dead handle
    /// down, makes one best-effort reestablish so the next call starts
    /// clean, and surfaces the failure unretried; if the reestablish also
    /// fails, the link stays broken and the next call repairs it lazily.
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, sqlx::Result<T>> + Send,
    {
        let mut link = self.link.lock().await;
        if let Link::Broken = &*link {
            *link = Link::Connected(self.reestablish().await?);
        }

        #[cfg(test)]
        if self
            .fail_next
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            let err = sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "injected link failure",
            ));
            return Err(self.fail_link(&mut link, err).await);
        }

        let Link::Connected(conn) = &mut *link else {
            unreachable!("link repaired above");
        };
        let result = op(conn).await;
        match result {
            Ok(value) => Ok(value),
            Err(err) if is_connection_error(&err) => Err(self.fail_link(&mut link, err).await),
            Err(err) => Err(QueueError::Operation(err.to_string())),
        }
    }

    /// Tear the link down explicitly. The next operation reconnects lazily.
    pub async fn disconnect(&self) {
        let mut link = self.link.lock().await;
        if let Link::Connected(conn) = std::mem::replace(&mut *link, Link::Broken) {
            let _ = conn.close().await;
        }
    }

    /// Whether a live link is currently held.
    pub async fn connected(&self) -> bool {
        matches!(&*self.link.lock().await, Link::Connected(_))
    }

    async fn fail_link(&self, link: &mut Link, err: sqlx::Error) -> QueueError {
        warn!(error = %err, "store link failed");
        if let Link::Connected(dead) = std::mem::replace(link, Link::Broken) {
            let _ = dead.close().await;
        }
        match self.reestablish().await {
            Ok(conn) => *link = Link::Connected(conn),
            Err(reconnect_err) => {
                warn!(error = %reconnect_err, "link not reestablished, will repair on next use");
            }
        }
        QueueError::Connection(err.to_string())
    }

    /// Bounded reconnect with exponential backoff; surfaces the last failure
    /// once the attempt budget is spent instead of looping forever.
    async fn reestablish(&self) -> Result<SqliteConnection> {
        let policy = &self.config.reconnect;
        let mut delay = policy.base_delay;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.config.connect_options()?.connect().await {
                Ok(conn) => {
                    info!(attempt, "store link reestablished");
                    return Ok(conn);
                }
                Err(err) => {
                    if attempt >= policy.max_attempts {
                        return Err(QueueError::Connection(err.to_string()));
                    }
                    warn!(attempt, error = %err, "reconnect attempt failed");
                    sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn inject_link_failure(&self) {
        self.fail_next
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

/// Structural split between a dead link and a rejected statement. Database
/// rejections leave the link usable; anything touching the transport or the
/// driver's worker does not.
fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}
