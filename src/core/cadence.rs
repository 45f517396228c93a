//! Windowed-count cadence estimation.
//!
//! Cadence is `round(count / window_seconds * 60)` over the trailing
//! calculation window. This tolerates irregular spacing but undercounts
//! until the window has been populated for a full window length.

use crate::core::store::{EventTimestampStore, Millis};
use serde::{Deserialize, Serialize};

/// When cadence is recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecomputePolicy {
    /// Recompute on a fixed tick while active; smooth, up to one tick of latency.
    #[default]
    FixedTick,
    /// Recompute whenever an event is appended; immediate but jumpy for sparse input.
    OnAppend,
}

/// Estimator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub calculation_window_ms: Millis,
    pub tick_interval_ms: Millis,
    pub policy: RecomputePolicy,
    /// Report 0 until the oldest in-window event is at least this old (0 disables)
    pub min_span_ms: Millis,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            calculation_window_ms: 10_000,
            tick_interval_ms: 1_000,
            policy: RecomputePolicy::FixedTick,
            min_span_ms: 0,
        }
    }
}

/// Compressions-per-minute from an event count over a window.
pub fn rate_per_minute(count: usize, window_ms: Millis) -> u32 {
    if count == 0 || window_ms == 0 {
        return 0;
    }
    let window_secs = window_ms as f64 / 1000.0;
    (count as f64 / window_secs * 60.0).round() as u32
}

/// Recomputes cadence from the timestamp log.
#[derive(Debug, Clone)]
pub struct CadenceEstimator {
    config: CadenceConfig,
    current: u32,
    running: bool,
    next_tick: Option<Millis>,
}

impl CadenceEstimator {
    pub fn new(config: CadenceConfig) -> Self {
        Self {
            config,
            current: 0,
            running: false,
            next_tick: None,
        }
    }

    /// Recompute cadence at `now` from the store's window snapshot.
    pub fn compute(&mut self, now: Millis, store: &mut EventTimestampStore) -> u32 {
        let snapshot = store.snapshot(now);
        let oldest = snapshot.first().copied();
        let rate = match oldest {
            None => 0,
            Some(oldest) if now.saturating_sub(oldest) < self.config.min_span_ms => 0,
            Some(_) => rate_per_minute(snapshot.len(), self.config.calculation_window_ms),
        };
        self.current = rate;
        if self.config.policy == RecomputePolicy::OnAppend && self.running {
            self.next_tick = self.drain_deadline(now, oldest);
        }
        rate
    }

    /// Next instant the window contents change without a new event: the
    /// min-span guard lifting, or the oldest event sliding out.
    fn drain_deadline(&self, now: Millis, oldest: Option<Millis>) -> Option<Millis> {
        let oldest = oldest?;
        let span_ready = oldest + self.config.min_span_ms;
        if span_ready > now {
            Some(span_ready)
        } else {
            Some(oldest + self.config.calculation_window_ms)
        }
    }

    /// Zero the output and arm the first tick.
    ///
    /// Under [`RecomputePolicy::OnAppend`] no tick is armed until an event
    /// arrives; after that a single drain tick stays armed while the window
    /// is non-empty, so the output falls to 0 once compressions stop.
    pub fn start(&mut self, now: Millis) {
        self.current = 0;
        self.running = true;
        self.next_tick = match self.config.policy {
            RecomputePolicy::FixedTick => Some(now + self.config.tick_interval_ms.max(1)),
            RecomputePolicy::OnAppend => None,
        };
    }

    /// Zero the output and disarm the tick.
    pub fn stop(&mut self) {
        self.current = 0;
        self.running = false;
        self.next_tick = None;
    }

    /// Recompute if a tick is due, advancing past any ticks missed while busy.
    pub fn on_tick(&mut self, now: Millis, store: &mut EventTimestampStore) -> Option<u32> {
        let due = self.next_tick.filter(|&t| t <= now)?;
        if self.config.policy == RecomputePolicy::FixedTick {
            let interval = self.config.tick_interval_ms.max(1);
            let missed = (now - due) / interval;
            self.next_tick = Some(due + (missed + 1) * interval);
        }
        Some(self.compute(now, store))
    }

    /// Recompute after an append, when that is the configured policy.
    pub fn on_append(&mut self, now: Millis, store: &mut EventTimestampStore) -> Option<u32> {
        match self.config.policy {
            RecomputePolicy::OnAppend => Some(self.compute(now, store)),
            RecomputePolicy::FixedTick => None,
        }
    }

    /// Last computed cadence.
    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn next_tick(&self) -> Option<Millis> {
        self.next_tick
    }

    pub fn policy(&self) -> RecomputePolicy {
        self.config.policy
    }
}
