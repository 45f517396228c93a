//! Time-pruned log of compression events.
//!
//! The log keeps every event younger than the retention window, which is
//! the calculation window plus a buffer so an event never falls out of the
//! log before it falls out of the cadence window.

use std::collections::VecDeque;

/// Milliseconds on the trainer's monotonic clock.
pub type Millis = u64;

/// Append-only, age-pruned log of compression instants.
#[derive(Debug, Clone)]
pub struct EventTimestampStore {
    /// Events in chronological order
    events: VecDeque<Millis>,
    /// Span used by `snapshot`
    calculation_window_ms: Millis,
    /// Span kept in memory
    retention_window_ms: Millis,
}

impl EventTimestampStore {
    /// Create a store; the retention window is `calculation + buffer`.
    pub fn new(calculation_window_ms: Millis, retention_buffer_ms: Millis) -> Self {
        Self {
            events: VecDeque::new(),
            calculation_window_ms,
            retention_window_ms: calculation_window_ms + retention_buffer_ms,
        }
    }

    /// Append an event at `now` and prune anything older than the retention window.
    ///
    /// A timestamp earlier than the newest entry is clamped to it so the log
    /// stays ordered.
    pub fn record(&mut self, now: Millis) {
        let at = match self.events.back() {
            Some(&latest) if now < latest => latest,
            _ => now,
        };
        self.events.push_back(at);
        self.prune(at);
    }

    /// Events strictly inside `(now - calculation_window, now]`.
    pub fn snapshot(&mut self, now: Millis) -> Vec<Millis> {
        self.prune(now);
        let start = now.checked_sub(self.calculation_window_ms);
        self.events
            .iter()
            .copied()
            .filter(|&ts| start.map_or(true, |start| ts > start))
            .collect()
    }

    /// Number of events in the calculation window ending at `now`.
    pub fn count_in_window(&mut self, now: Millis) -> usize {
        self.snapshot(now).len()
    }

    /// Drop every event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Most recent event, if any.
    pub fn latest(&self) -> Option<Millis> {
        self.events.back().copied()
    }

    pub fn calculation_window_ms(&self) -> Millis {
        self.calculation_window_ms
    }

    pub fn retention_window_ms(&self) -> Millis {
        self.retention_window_ms
    }

    fn prune(&mut self, now: Millis) {
        let cutoff = now.saturating_sub(self.retention_window_ms);
        while let Some(&oldest) = self.events.front() {
            if oldest < cutoff {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_prunes_beyond_retention() {
        let mut store = EventTimestampStore::new(10_000, 5_000);
        for t in (0..40_000).step_by(700) {
            store.record(t);
            let now = t;
            assert!(store
                .snapshot(now)
                .iter()
                .all(|&e| now - e <= store.retention_window_ms()));
            assert!(store.events.iter().all(|&e| now - e <= 15_000));
        }
    }

    #[test]
    fn test_snapshot_excludes_window_boundary() {
        let mut store = EventTimestampStore::new(10_000, 5_000);
        store.record(20_000);
        store.record(25_000);
        store.record(29_999);

        // Boundary is exclusive: 30_000 - 10_000 = 20_000 is out
        assert_eq!(store.snapshot(30_000), vec![25_000, 29_999]);
        // Retained but outside the calculation window
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_snapshot_prunes_on_read() {
        let mut store = EventTimestampStore::new(10_000, 5_000);
        store.record(1_000);
        store.record(2_000);
        assert!(store.snapshot(30_000).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_late_timestamp_is_clamped_to_keep_order() {
        let mut store = EventTimestampStore::new(10_000, 5_000);
        store.record(5_000);
        store.record(4_900);
        assert_eq!(store.snapshot(5_000), vec![5_000, 5_000]);
        assert_eq!(store.latest(), Some(5_000));
    }

    #[test]
    fn test_clear() {
        let mut store = EventTimestampStore::new(10_000, 5_000);
        store.record(100);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.latest(), None);
    }
}
