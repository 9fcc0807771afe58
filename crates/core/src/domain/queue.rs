// Queue Domain Model

/// Queue identifier
pub type QueueName = String;

/// Name of the process-wide default queue binding.
pub const DEFAULT_QUEUE_NAME: &str = "default";

/// Configuration of one named partition.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub name: QueueName,
    /// Top-level queues publish a work-available signal when a row arrives;
    /// secondary queues are polling-only.
    pub top_level: bool,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>, top_level: bool) -> Self {
        Self {
            name: name.into(),
            top_level,
        }
    }

    /// Configuration of the well-known default queue.
    pub fn default_queue() -> Self {
        Self::new(DEFAULT_QUEUE_NAME, true)
    }
}
