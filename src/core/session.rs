//! Session life cycle and pipeline coordination.
//!
//! The controller owns every core component and is the only thing that
//! mutates them, in the fixed order detector → store → estimator →
//! scheduler. It performs no IO: the driver feeds it samples, taps, clock
//! readings and coach completions, and executes the feedback requests it
//! returns.
//!
//! Each `start` bumps a generation counter. Feedback tickets carry the
//! generation they were issued in, so a coach response that resolves after
//! a stop or a restart can never reach the display.

use crate::coach::CoachError;
use crate::collector::types::{MotionSample, PermissionState, SensorStatus};
use crate::collector::SensorError;
use crate::core::cadence::{CadenceConfig, CadenceEstimator};
use crate::core::detector::{Detection, DetectorConfig, MotionSpikeDetector};
use crate::core::display::{DisplayState, RateZone};
use crate::core::feedback::{FeedbackResult, MSG_AWAITING, MSG_STOPPED};
use crate::core::scheduler::{FeedbackScheduler, FeedbackTicket, SchedulerConfig};
use crate::core::store::{EventTimestampStore, Millis};
use crate::stats::{create_shared_stats, SharedSessionStats};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inclusive bounds for the target tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for TempoBounds {
    fn default() -> Self {
        Self { min: 60, max: 150 }
    }
}

impl TempoBounds {
    pub fn clamp(&self, bpm: u32) -> u32 {
        bpm.clamp(self.min, self.max.max(self.min))
    }
}

/// Everything the controller needs to build its pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub cadence: CadenceConfig,
    /// Added to the calculation window to get the retention window
    pub retention_buffer_ms: Millis,
    pub detector: DetectorConfig,
    pub scheduler: SchedulerConfig,
    pub tempo_bounds: TempoBounds,
    pub target_tempo: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cadence: CadenceConfig::default(),
            retention_buffer_ms: 5_000,
            detector: DetectorConfig::default(),
            scheduler: SchedulerConfig::default(),
            tempo_bounds: TempoBounds::default(),
            target_tempo: 110,
        }
    }
}

/// Result of a start/stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started { generation: u64, session_id: Uuid },
    Stopped { generation: u64 },
    /// Already in the requested state
    Unchanged,
}

/// A coach call the driver should make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackRequest {
    pub ticket: FeedbackTicket,
    pub rate: u32,
}

/// Two-state (inactive/active) session controller.
pub struct SessionController {
    settings: SessionSettings,
    active: bool,
    generation: u64,
    session_id: Option<Uuid>,
    started_at: Option<Millis>,
    store: EventTimestampStore,
    detector: MotionSpikeDetector,
    estimator: CadenceEstimator,
    scheduler: FeedbackScheduler,
    display: DisplayState,
    stats: SharedSessionStats,
}

impl SessionController {
    pub fn new(settings: SessionSettings) -> Self {
        Self::with_stats(settings, create_shared_stats())
    }

    pub fn with_stats(mut settings: SessionSettings, stats: SharedSessionStats) -> Self {
        settings.target_tempo = settings.tempo_bounds.clamp(settings.target_tempo);
        Self {
            store: EventTimestampStore::new(
                settings.cadence.calculation_window_ms,
                settings.retention_buffer_ms,
            ),
            detector: MotionSpikeDetector::new(settings.detector),
            estimator: CadenceEstimator::new(settings.cadence),
            scheduler: FeedbackScheduler::new(settings.scheduler),
            display: DisplayState::new(settings.target_tempo),
            active: false,
            generation: 0,
            session_id: None,
            started_at: None,
            stats,
            settings,
        }
    }

    /// Begin a session with a clean pipeline. No-op if already active.
    pub fn start(&mut self, now: Millis) -> Transition {
        if self.active {
            return Transition::Unchanged;
        }
        self.active = true;
        self.generation += 1;
        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        self.started_at = Some(now);

        self.store.clear();
        self.estimator.start(now);
        self.scheduler.reset(self.generation);
        self.detector.reset();
        self.detector.set_status(SensorStatus::Inactive);

        self.display = DisplayState {
            active: true,
            cadence: 0,
            target_tempo: self.settings.target_tempo,
            zone: RateZone::Idle,
            feedback: FeedbackResult::neutral(MSG_AWAITING),
            loading: false,
            sensor_status: SensorStatus::Inactive,
        };

        self.stats.record_session_started();
        tracing::info!(%session_id, generation = self.generation, tempo = self.settings.target_tempo, "session started");
        Transition::Started {
            generation: self.generation,
            session_id,
        }
    }

    /// End the session, cancelling pending feedback. No-op if inactive.
    pub fn stop(&mut self, now: Millis) -> Transition {
        if !self.active {
            return Transition::Unchanged;
        }
        self.active = false;

        // Invalidates both the pending timer and any in-flight ticket
        self.scheduler.reset(self.generation);
        self.estimator.stop();
        self.store.clear();
        self.detector.reset();
        self.detector.set_status(SensorStatus::Inactive);

        self.display.active = false;
        self.display.cadence = 0;
        self.display.zone = RateZone::Idle;
        self.display.feedback = FeedbackResult::neutral(MSG_STOPPED);
        self.display.loading = false;
        self.display.sensor_status = SensorStatus::Inactive;

        let duration_ms = self.started_at.take().map(|t| now.saturating_sub(t));
        if let Some(session_id) = self.session_id.take() {
            tracing::info!(%session_id, generation = self.generation, ?duration_ms, "session stopped");
        }
        Transition::Stopped {
            generation: self.generation,
        }
    }

    /// Flip between active and inactive.
    pub fn toggle(&mut self, now: Millis) -> Transition {
        if self.active {
            self.stop(now)
        } else {
            self.start(now)
        }
    }

    /// Record the outcome of the permission prompt for this session.
    pub fn on_permission(&mut self, state: PermissionState) {
        if !self.active {
            return;
        }
        match state {
            PermissionState::Granted => tracing::debug!("motion permission granted"),
            PermissionState::Denied => tracing::warn!("motion permission denied; manual taps only"),
            PermissionState::Unsupported => {
                tracing::warn!("motion sensing unsupported; manual taps only")
            }
        }
        self.set_sensor_status(state.into());
    }

    /// The driver could not subscribe to the motion source.
    pub fn on_subscribe_failed(&mut self, error: &SensorError) {
        if !self.active {
            return;
        }
        tracing::warn!(error = %error, "motion subscription failed");
        self.set_sensor_status(error.status());
    }

    /// The motion stream reported a failure.
    pub fn on_sensor_error(&mut self, message: &str) {
        if !self.active {
            return;
        }
        tracing::warn!(error = message, "motion stream error");
        self.set_sensor_status(SensorStatus::Error);
    }

    /// The motion stream ended without an error.
    pub fn on_sensor_closed(&mut self) {
        if self.active && self.detector.status() == SensorStatus::Active {
            tracing::debug!("motion stream ended");
            self.set_sensor_status(SensorStatus::Inactive);
        }
    }

    /// Feed one motion sample. Returns `None` while inactive.
    pub fn on_sample(&mut self, sample: &MotionSample) -> Option<Detection> {
        if !self.active {
            return None;
        }
        self.stats.record_sample();
        let detection = self.detector.process(sample, &mut self.store);
        match detection {
            Detection::Accepted => {
                self.stats.record_compression();
                self.after_append(sample.timestamp);
            }
            Detection::Debounced => self.stats.record_debounced(),
            Detection::BelowThreshold => {}
        }
        Some(detection)
    }

    /// Manual compression trigger. Ignored while inactive.
    pub fn record_tap(&mut self, now: Millis) -> bool {
        if !self.active {
            return false;
        }
        self.store.record(now);
        self.stats.record_manual_tap();
        self.after_append(now);
        true
    }

    /// Run due ticks and timers; returns a coach call to make, if one fired.
    pub fn poll(&mut self, now: Millis) -> Option<FeedbackRequest> {
        if !self.active {
            return None;
        }

        if let Some(rate) = self.estimator.on_tick(now, &mut self.store) {
            self.apply_cadence(now, rate);
        }

        let rate = self.scheduler.poll(now)?;
        if rate == 0 && self.store.is_empty() {
            // Nothing to coach on yet; answer locally
            self.scheduler.supersede();
            self.display.feedback = FeedbackResult::neutral(MSG_AWAITING);
            self.refresh_loading();
            return None;
        }

        let ticket = self.scheduler.issue(now);
        self.stats.record_feedback_request();
        self.refresh_loading();
        tracing::debug!(rate, request_id = ticket.request_id, "requesting feedback");
        Some(FeedbackRequest { ticket, rate })
    }

    /// Apply a coach completion. Returns false if it was stale and discarded.
    pub fn on_feedback(&mut self, ticket: FeedbackTicket, result: Result<String, CoachError>) -> bool {
        if !self.active || ticket.generation != self.generation || !self.scheduler.complete(ticket) {
            self.stats.record_stale_response();
            tracing::debug!(?ticket, generation = self.generation, "discarding stale feedback");
            return false;
        }

        let result = result.and_then(|text| {
            let text = text.trim();
            if text.is_empty() {
                Err(CoachError::EmptyResponse)
            } else {
                Ok(text.to_string())
            }
        });

        self.display.feedback = match result {
            Ok(text) => FeedbackResult::from_text(text),
            Err(e) => {
                tracing::warn!(error = %e, "coach request failed");
                self.stats.record_feedback_failure();
                FeedbackResult::failure()
            }
        };
        self.refresh_loading();
        true
    }

    /// Change the metronome tempo, clamped to the configured bounds.
    pub fn set_target_tempo(&mut self, bpm: u32) -> u32 {
        let clamped = self.settings.tempo_bounds.clamp(bpm);
        if clamped != bpm {
            tracing::warn!(requested = bpm, applied = clamped, "tempo out of range; clamped");
        }
        self.settings.target_tempo = clamped;
        self.display.target_tempo = clamped;
        self.display.zone = RateZone::classify(self.display.cadence, clamped);
        clamped
    }

    /// Cadence over the window ending at `now`, without rescheduling feedback.
    pub fn estimate(&mut self, now: Millis) -> u32 {
        self.estimator.compute(now, &mut self.store)
    }

    /// Earliest instant at which `poll` has work to do.
    pub fn next_deadline(&self) -> Option<Millis> {
        if !self.active {
            return None;
        }
        match (self.estimator.next_tick(), self.scheduler.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Milliseconds since the active session started, on the caller's clock.
    pub fn elapsed(&self, now: Millis) -> Option<Millis> {
        self.started_at.map(|t| now.saturating_sub(t))
    }

    pub fn target_tempo(&self) -> u32 {
        self.settings.target_tempo
    }

    pub fn sensor_status(&self) -> SensorStatus {
        self.detector.status()
    }

    /// Time of the last coach request in this session.
    pub fn last_feedback_request_at(&self) -> Option<Millis> {
        self.scheduler.last_request_at()
    }

    pub fn stats(&self) -> &SharedSessionStats {
        &self.stats
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    fn after_append(&mut self, now: Millis) {
        if let Some(rate) = self.estimator.on_append(now, &mut self.store) {
            self.apply_cadence(now, rate);
        }
        self.refresh_loading();
    }

    fn apply_cadence(&mut self, now: Millis, rate: u32) {
        self.display.cadence = rate;
        self.display.zone = RateZone::classify(rate, self.settings.target_tempo);
        self.scheduler.reschedule(now, rate);
    }

    fn refresh_loading(&mut self) {
        self.display.loading = self.scheduler.is_in_flight() && !self.store.is_empty();
    }

    fn set_sensor_status(&mut self, status: SensorStatus) {
        self.detector.set_status(status);
        self.display.sensor_status = status;
    }
}
