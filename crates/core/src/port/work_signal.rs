// Work-Available Signal Port

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

/// Opaque "work available" signal, published on a named channel when a
/// top-level queue gains a row. The transport is a boundary: idle consumers
/// that subscribe get woken out of their poll loop; everything else about
/// delivery belongs to the implementation.
pub trait WorkSignal: Send + Sync {
    /// Announce that the channel's queue may have claimable work.
    fn publish(&self, channel: &str);
}

/// In-process signal for producers and consumers sharing one process.
///
/// Wake-ups carry no payload. A single permit is stored when nobody is
/// waiting, so a publish is never lost between two consumer polls; a woken
/// consumer keeps claiming until the queue runs dry.
#[derive(Default)]
pub struct LocalWorkSignal {
    channels: Mutex<HashMap<String, Arc<Notify>>>,
}

impl LocalWorkSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to await wake-ups on a channel.
    pub fn subscribe(&self, channel: &str) -> Arc<Notify> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(channels.entry(channel.to_owned()).or_default())
    }
}

impl WorkSignal for LocalWorkSignal {
    fn publish(&self, channel: &str) {
        let notify = {
            let channels = self
                .channels
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            channels.get(channel).cloned()
        };
        if let Some(notify) = notify {
            notify.notify_one();
        }
    }
}
