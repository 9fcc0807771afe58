// Domain Layer - Pure data model, no behavior beyond its invariants

pub mod job;
pub mod queue;

// Re-exports
pub use job::{ClaimedJob, Job, JobArgs, JobId, Signature};
pub use queue::{QueueConfig, QueueName, DEFAULT_QUEUE_NAME};
