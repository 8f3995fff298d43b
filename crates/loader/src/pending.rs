use std::collections::HashMap;

use fontreq_core::RequestKey;

use crate::dispatch::Subscriber;

/// Result of [`PendingRegistry::try_join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A resolution for the key is already in flight; the subscriber was
    /// queued behind it and no new job may be submitted.
    Joined,
    /// Nothing was in flight. An entry now exists and the caller owns
    /// submitting the job and draining the entry when it completes.
    NotPending,
}

/// Subscribers waiting on in-flight resolutions, keyed by request.
///
/// Guarded by the loader's registry lock together with the result cache.
#[derive(Default)]
pub struct PendingRegistry {
    entries: HashMap<RequestKey, Vec<Subscriber>>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join an in-flight resolution or start tracking a new one.
    ///
    /// A `None` subscriber still marks the key in flight so later callers
    /// coalesce onto the same job.
    pub fn try_join(&mut self, key: &RequestKey, subscriber: Option<Subscriber>) -> JoinOutcome {
        match self.entries.get_mut(key) {
            Some(waiting) => {
                waiting.extend(subscriber);
                JoinOutcome::Joined
            }
            None => {
                self.entries.insert(key.clone(), subscriber.into_iter().collect());
                JoinOutcome::NotPending
            }
        }
    }

    /// Remove the entry for `key` and return its subscribers in registration
    /// order. Absent keys yield an empty list.
    pub fn drain(&mut self, key: &RequestKey) -> Vec<Subscriber> {
        self.entries.remove(key).unwrap_or_default()
    }

    pub fn is_pending(&self, key: &RequestKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of subscribers waiting on `key`.
    pub fn waiting(&self, key: &RequestKey) -> usize {
        self.entries.get(key).map_or(0, Vec::len)
    }

    /// Number of keys currently in flight.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
