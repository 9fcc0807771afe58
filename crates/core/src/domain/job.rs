// Job Domain Model

use serde::{Deserialize, Serialize};

/// Store-assigned job identifier. Ids ascend with arrival, so they double as
/// the claim scan order and the delete key.
pub type JobId = i64;

/// Ordered argument sequence attached to a job.
///
/// The core never interprets arguments; they are encoded to a canonical JSON
/// array for durable storage and decoded verbatim on read. Two sequences are
/// the same iff their decoded values are exactly equal, so the canonical text
/// can stand in for the sequence when the store compares signatures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobArgs(Vec<serde_json::Value>);

impl JobArgs {
    pub fn new(values: Vec<serde_json::Value>) -> Self {
        Self(values)
    }

    /// The zero-argument sequence. Encodes as `[]`, never as null.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn as_slice(&self) -> &[serde_json::Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical storage encoding (JSON array text).
    pub fn encode(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Decode stored argument text back into the ordered sequence.
    pub fn decode(text: &str) -> crate::error::Result<Self> {
        Ok(Self(serde_json::from_str(text)?))
    }
}

impl From<Vec<serde_json::Value>> for JobArgs {
    fn from(values: Vec<serde_json::Value>) -> Self {
        Self(values)
    }
}

/// The `(method, args)` pair identifying a unit of work for deduplication
/// and filtered counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    method: String,
    args: JobArgs,
}

impl Signature {
    pub fn new(method: impl Into<String>, args: JobArgs) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn args(&self) -> &JobArgs {
        &self.args
    }
}

/// Job Entity - one unit of deferred work.
///
/// `(method, args)` is never mutated after creation. Claiming only sets
/// `locked_at`; deletion is the sole terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub queue_name: String,
    /// Opaque callable target, e.g. `"Receiver.action"`.
    pub method: String,
    pub args: JobArgs,
    pub created_at: i64, // epoch ms
    /// `None` = eligible for claiming; `Some` = owned by a consumer.
    pub locked_at: Option<i64>,
}

impl Job {
    pub fn is_locked(&self) -> bool {
        self.locked_at.is_some()
    }

    pub fn signature(&self) -> Signature {
        Signature::new(self.method.clone(), self.args.clone())
    }
}

/// Snapshot handed to the consumer that won a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedJob {
    pub id: JobId,
    pub method: String,
    pub args: JobArgs,
}
