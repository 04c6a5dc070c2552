//! Write-through persistence queue.
//!
//! Every committed mutation enqueues a full snapshot; a newer snapshot
//! replaces one that has not been written yet. The queue is flushed before
//! the committing call returns. A failed write keeps the snapshot pending,
//! raises a warning for the host to show, and is retried on the next flush.
//! The in-memory document is never rolled back.

use log::{debug, info, warn};
use sb_core::store::snapshot;
use sb_core::{Document, Gateway};

pub struct PersistQueue {
    gateway: Gateway,
    pending: Option<String>,
    warning: Option<String>,
}

impl PersistQueue {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            pending: None,
            warning: None,
        }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Load through the underlying gateway.
    pub fn load(&self) -> Document {
        self.gateway.load()
    }

    /// Queue a snapshot of `doc`, superseding any unwritten one.
    pub fn enqueue(&mut self, doc: &Document) {
        match snapshot(doc) {
            Ok(json) => {
                if self.pending.replace(json).is_some() {
                    debug!("superseding an unwritten snapshot");
                }
            }
            Err(e) => {
                warn!("could not serialize storyboard: {e}");
                self.warning = Some(format!("Changes could not be saved: {e}"));
            }
        }
    }

    /// Write the pending snapshot, retrying immediately up to the configured
    /// count. Returns `true` when nothing is left pending.
    pub fn flush(&mut self) -> bool {
        let Some(json) = self.pending.take() else {
            return true;
        };
        let attempts = self.gateway.config().write_retries + 1;
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.gateway.write_snapshot(&json) {
                Ok(()) => {
                    if self.warning.take().is_some() {
                        info!("storage writes recovered");
                    }
                    return true;
                }
                Err(e) => {
                    warn!("storyboard write failed (attempt {attempt}/{attempts}): {e}");
                    last_error = e.to_string();
                }
            }
        }
        self.pending = Some(json);
        self.warning = Some(format!("Changes could not be saved: {last_error}"));
        false
    }

    /// Enqueue and flush in one step.
    pub fn commit(&mut self, doc: &Document) -> bool {
        self.enqueue(doc);
        self.flush()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Non-blocking warning for the host, set while writes are failing.
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_core::{BoardConfig, MemoryStore};

    fn queue() -> (PersistQueue, MemoryStore) {
        let store = MemoryStore::new();
        let gateway = Gateway::new(store.clone(), BoardConfig::default());
        (PersistQueue::new(gateway), store)
    }

    #[test]
    fn newer_snapshot_supersedes_pending() {
        let (mut q, store) = queue();
        q.enqueue(&Document::new("first"));
        q.enqueue(&Document::new("second"));
        assert!(q.flush());
        assert_eq!(store.write_count(), 1);
        let saved = store.record("storyboard-state").unwrap();
        assert!(saved.contains("second"));
        assert!(!q.is_pending());
    }

    #[test]
    fn failed_write_stays_pending_and_warns() {
        let (mut q, store) = queue();
        store.set_fail_writes(true);
        assert!(!q.commit(&Document::new("offline")));
        assert!(q.is_pending());
        assert!(q.warning().unwrap().starts_with("Changes could not be saved"));

        store.set_fail_writes(false);
        assert!(q.flush());
        assert!(q.warning().is_none());
        assert!(store.record("storyboard-state").unwrap().contains("offline"));
    }

    #[test]
    fn flush_with_nothing_pending_is_a_no_op() {
        let (mut q, store) = queue();
        assert!(q.flush());
        assert_eq!(store.write_count(), 0);
    }
}
