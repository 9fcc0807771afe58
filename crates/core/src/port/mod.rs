// Port Layer - Interfaces for external dependencies

pub mod job_store;
pub mod time_provider;
pub mod work_signal;

// Re-exports
pub use job_store::JobStore;
pub use time_provider::{FixedTimeProvider, SystemTimeProvider, TimeProvider};
pub use work_signal::{LocalWorkSignal, WorkSignal};
