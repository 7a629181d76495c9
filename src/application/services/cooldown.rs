use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::value_objects::RecipientId;

/// Last dispatch attempt per recipient. Owned by the dispatch loop.
pub struct CooldownTracker {
    interval: Duration,
    last_dispatch: HashMap<RecipientId, Instant>,
}

impl CooldownTracker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_dispatch: HashMap::new(),
        }
    }

    pub fn can_send(&self, recipient: RecipientId, now: Instant) -> bool {
        match self.last_dispatch.get(&recipient) {
            Some(last) => now.saturating_duration_since(*last) >= self.interval,
            None => true,
        }
    }

    pub fn record_dispatch(&mut self, recipient: RecipientId, now: Instant) {
        self.last_dispatch.insert(recipient, now);
    }

    pub fn last_dispatch(&self, recipient: RecipientId) -> Option<Instant> {
        self.last_dispatch.get(&recipient).copied()
    }
}
