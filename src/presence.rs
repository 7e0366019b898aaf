use std::time::Duration;

use tokio::time::Instant;

use crate::models::{Item, Snapshot};

/// An item counts as present only if it was seen within this window.
pub const RECENCY_WINDOW: Duration = Duration::from_secs(3);

/// Last-seen timestamps per item. Presence is always derived from the
/// timestamps and the caller's `now`, never stored, so it decays on its own
/// as wall-clock time passes.
#[derive(Debug)]
pub struct PresenceTracker {
    last_seen: [Option<Instant>; Item::ALL.len()],
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self {
            last_seen: [None; Item::ALL.len()],
        }
    }

    pub fn record_seen(&mut self, item: Item, at: Instant) {
        self.last_seen[item.index()] = Some(at);
    }

    pub fn snapshot(&self, now: Instant) -> Snapshot {
        Snapshot::from_fn(|item| {
            self.last_seen[item.index()]
                .map(|seen| now.duration_since(seen) <= RECENCY_WINDOW)
                .unwrap_or(false)
        })
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}
