// src/search/pacing.rs
use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::search::types::SourceId;

/// Per-source minimum request spacing.
///
/// The clock is keyed by [`SourceId`], not global: one slow portal must never
/// throttle the others. Concurrent callers of the same source reserve
/// consecutive slots under the map lock and sleep outside it, so two
/// back-to-back requests to the same portal are always at least `spacing`
/// apart at the transport boundary.
pub struct SourcePacer {
    spacing: Duration,
    slots: Mutex<HashMap<SourceId, Instant>>,
}

impl SourcePacer {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until this source's next allowed slot, claiming it for the caller.
    pub async fn wait_turn(&self, source: SourceId) {
        if self.spacing.is_zero() {
            return;
        }
        let slot = {
            let mut slots = self.slots.lock().await;
            let now = Instant::now();
            let slot = match slots.get(&source) {
                Some(prev) => (*prev + self.spacing).max(now),
                None => now,
            };
            slots.insert(source, slot);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}
