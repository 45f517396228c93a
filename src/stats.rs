//! Session counters.
//!
//! Tracks what the pipeline has done since the trainer started: samples
//! processed, compressions detected, coach calls made and discarded. Nothing
//! is persisted; counters live only as long as the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Live counters, shareable across threads.
#[derive(Debug)]
pub struct SessionStats {
    sessions_started: AtomicU64,
    samples_processed: AtomicU64,
    compressions_detected: AtomicU64,
    manual_taps: AtomicU64,
    samples_debounced: AtomicU64,
    feedback_requests: AtomicU64,
    feedback_failures: AtomicU64,
    stale_responses: AtomicU64,
    started_at: DateTime<Utc>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            sessions_started: AtomicU64::new(0),
            samples_processed: AtomicU64::new(0),
            compressions_detected: AtomicU64::new(0),
            manual_taps: AtomicU64::new(0),
            samples_debounced: AtomicU64::new(0),
            feedback_requests: AtomicU64::new(0),
            feedback_failures: AtomicU64::new(0),
            stale_responses: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample(&self) {
        self.samples_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compression(&self) {
        self.compressions_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_manual_tap(&self) {
        self.manual_taps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_debounced(&self) {
        self.samples_debounced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_feedback_request(&self) {
        self.feedback_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_feedback_failure(&self) {
        self.feedback_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_response(&self) {
        self.stale_responses.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            samples_processed: self.samples_processed.load(Ordering::Relaxed),
            compressions_detected: self.compressions_detected.load(Ordering::Relaxed),
            manual_taps: self.manual_taps.load(Ordering::Relaxed),
            samples_debounced: self.samples_debounced.load(Ordering::Relaxed),
            feedback_requests: self.feedback_requests.load(Ordering::Relaxed),
            feedback_failures: self.feedback_failures.load(Ordering::Relaxed),
            stale_responses: self.stale_responses.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Human-readable summary for the end of a run.
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "Training Statistics:\n\
             - Sessions started: {}\n\
             - Motion samples processed: {}\n\
             - Compressions detected: {}\n\
             - Manual taps: {}\n\
             - Spikes suppressed by debounce: {}\n\
             - Coach requests: {} ({} failed, {} stale)\n\
             - Run time: {} seconds\n\
             \n\
             Reminder:\n\
             - Rate practice only; compression depth is not measured\n\
             - Follow official CPR guidelines",
            s.sessions_started,
            s.samples_processed,
            s.compressions_detected,
            s.manual_taps,
            s.samples_debounced,
            s.feedback_requests,
            s.feedback_failures,
            s.stale_responses,
            s.uptime_secs
        )
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of the counters at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub sessions_started: u64,
    pub samples_processed: u64,
    pub compressions_detected: u64,
    pub manual_taps: u64,
    pub samples_debounced: u64,
    pub feedback_requests: u64,
    pub feedback_failures: u64,
    pub stale_responses: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Thread-safe shared counters.
pub type SharedSessionStats = Arc<SessionStats>;

pub fn create_shared_stats() -> SharedSessionStats {
    Arc::new(SessionStats::new())
}
