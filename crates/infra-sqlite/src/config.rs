// Store Configuration

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};

use dispatchq_core::error::{QueueError, Result};

const DB_PATH_ENV: &str = "DISPATCHQ_DB_PATH";
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounded reconnect schedule for the resilient connection.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Attempts per repair before the failure is surfaced.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each attempt after that.
    pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Connection settings for the SQLite-backed job store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_path: String,
    pub busy_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl StoreConfig {
    pub fn new(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Read the store location from `DISPATCHQ_DB_PATH`, defaulting to an
    /// in-memory database.
    pub fn from_env() -> Self {
        let path = std::env::var(DB_PATH_ENV).unwrap_or_else(|_| ":memory:".to_string());
        Self::new(path)
    }

    /// SQLite options with WAL journaling and a busy timeout, so concurrent
    /// writers queue briefly instead of failing outright.
    pub fn connect_options(&self) -> Result<SqliteConnectOptions> {
        let options = SqliteConnectOptions::from_str(&self.database_path)
            .map_err(|e| QueueError::Config(format!("invalid database path: {e}")))?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true);
        Ok(options)
    }
}
