//! Debounced feedback requests.
//!
//! The scheduler holds a single pending timer. Each cadence recompute
//! replaces it with one that fires `debounce_ms` later carrying the latest
//! cadence. A cancel-and-replace timer never fires if recomputes arrive
//! faster than the debounce, so the deadline is also capped at
//! `max_wait_ms` after the first reschedule of a burst.
//!
//! Fired requests are identified by a [`FeedbackTicket`]; only the ticket
//! issued last in the current generation may update the display.

use crate::core::store::Millis;
use serde::{Deserialize, Serialize};

/// Scheduler tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub debounce_ms: Millis,
    pub max_wait_ms: Millis,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1_500,
            max_wait_ms: 3_000,
        }
    }
}

/// Identifies one issued feedback request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedbackTicket {
    /// Session generation the request belongs to
    pub generation: u64,
    /// Monotonic id within the scheduler
    pub request_id: u64,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    deadline: Millis,
    burst_start: Millis,
    rate: u32,
}

/// Single-slot debounce timer with stale-response rejection.
#[derive(Debug, Clone)]
pub struct FeedbackScheduler {
    config: SchedulerConfig,
    pending: Option<Pending>,
    generation: u64,
    next_request_id: u64,
    latest: Option<FeedbackTicket>,
    last_request_at: Option<Millis>,
}

impl FeedbackScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let config = SchedulerConfig {
            debounce_ms: config.debounce_ms,
            max_wait_ms: config.max_wait_ms.max(config.debounce_ms),
        };
        Self {
            config,
            pending: None,
            generation: 0,
            next_request_id: 0,
            latest: None,
            last_request_at: None,
        }
    }

    /// Replace the pending timer with one carrying `rate`.
    pub fn reschedule(&mut self, now: Millis, rate: u32) {
        let burst_start = self.pending.map_or(now, |p| p.burst_start);
        let deadline =
            (now + self.config.debounce_ms).min(burst_start + self.config.max_wait_ms);
        self.pending = Some(Pending {
            deadline,
            burst_start,
            rate,
        });
    }

    /// Drop the pending timer, if any.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Cancel everything and move to a new generation; outstanding tickets become stale.
    pub fn reset(&mut self, generation: u64) {
        self.pending = None;
        self.latest = None;
        self.last_request_at = None;
        self.generation = generation;
    }

    /// Take the pending rate if its deadline has passed.
    pub fn poll(&mut self, now: Millis) -> Option<u32> {
        match self.pending {
            Some(p) if p.deadline <= now => {
                self.pending = None;
                Some(p.rate)
            }
            _ => None,
        }
    }

    /// Mint a ticket for a request about to be sent; it supersedes earlier tickets.
    pub fn issue(&mut self, now: Millis) -> FeedbackTicket {
        self.next_request_id += 1;
        let ticket = FeedbackTicket {
            generation: self.generation,
            request_id: self.next_request_id,
        };
        self.latest = Some(ticket);
        self.last_request_at = Some(now);
        ticket
    }

    /// Invalidate any in-flight request without issuing a new one.
    pub fn supersede(&mut self) {
        self.latest = None;
    }

    /// Accept a completion only for the latest ticket; consumes it.
    pub fn complete(&mut self, ticket: FeedbackTicket) -> bool {
        if self.latest == Some(ticket) {
            self.latest = None;
            true
        } else {
            false
        }
    }

    /// A request has been issued and not yet completed or superseded.
    pub fn is_in_flight(&self) -> bool {
        self.latest.is_some()
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.pending.map(|p| p.deadline)
    }

    pub fn pending_rate(&self) -> Option<u32> {
        self.pending.map(|p| p.rate)
    }

    pub fn last_request_at(&self) -> Option<Millis> {
        self.last_request_at
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
