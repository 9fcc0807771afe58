// Dispatchq Infrastructure - SQLite Adapter
// Implements: JobStore over a single self-healing connection

mod config;
mod connection;
mod job_store;
mod migration;

pub use config::{ReconnectPolicy, StoreConfig};
pub use connection::ResilientConnection;
pub use job_store::SqliteJobStore;
pub use migration::{drop_schema, run_migrations};

// Note: sqlx::Error classification and wrapping happen in the connection
// layer; orphan rules prevent a From<sqlx::Error> impl for QueueError here.
