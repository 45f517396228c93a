//! Threshold + debounce compression detector.
//!
//! A sample counts as a compression when the magnitude of its vertical axis
//! exceeds the threshold and at least the debounce interval has passed since
//! the previously accepted compression. The debounce alone caps the
//! detectable rate at `60_000 / debounce_ms` per minute (240 at 250 ms).

use crate::collector::types::{Axis, MotionSample, SensorStatus};
use crate::core::store::{EventTimestampStore, Millis};
use serde::{Deserialize, Serialize};

/// Detector tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum |vertical acceleration| in m/s² for a compression
    pub acceleration_threshold: f64,
    /// Minimum spacing between accepted compressions
    pub debounce_ms: Millis,
    /// Axis treated as vertical
    pub axis: Axis,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            acceleration_threshold: 15.0,
            debounce_ms: 250,
            axis: Axis::Z,
        }
    }
}

/// Accepted range for a configured acceleration threshold, in m/s².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for ThresholdBounds {
    fn default() -> Self {
        Self {
            min: 12.0,
            max: 18.0,
        }
    }
}

impl ThresholdBounds {
    /// Usable when both ends are finite, positive and ordered.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min > 0.0 && self.min <= self.max
    }

    pub fn clamp(&self, threshold: f64) -> f64 {
        threshold.clamp(self.min, self.max)
    }
}

/// Verdict for a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Accepted,
    BelowThreshold,
    Debounced,
}

/// Classifies motion samples as compression events.
#[derive(Debug, Clone)]
pub struct MotionSpikeDetector {
    config: DetectorConfig,
    last_accepted: Option<Millis>,
    status: SensorStatus,
}

impl MotionSpikeDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            last_accepted: None,
            status: SensorStatus::Inactive,
        }
    }

    /// Test one sample; on acceptance the sample time is recorded in `store`.
    pub fn process(&mut self, sample: &MotionSample, store: &mut EventTimestampStore) -> Detection {
        let vertical = sample
            .acceleration_including_gravity
            .axis(self.config.axis)
            .abs();
        if vertical.is_nan() || vertical <= self.config.acceleration_threshold {
            return Detection::BelowThreshold;
        }

        if let Some(last) = self.last_accepted {
            if sample.timestamp.saturating_sub(last) < self.config.debounce_ms {
                return Detection::Debounced;
            }
        }

        store.record(sample.timestamp);
        self.last_accepted = Some(sample.timestamp);
        tracing::debug!(at = sample.timestamp, magnitude = vertical, "compression detected");
        Detection::Accepted
    }

    /// Forget the last acceptance so the next spike is accepted immediately.
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }

    pub fn last_accepted(&self) -> Option<Millis> {
        self.last_accepted
    }

    pub fn status(&self) -> SensorStatus {
        self.status
    }

    pub fn set_status(&mut self, status: SensorStatus) {
        if self.status != status {
            tracing::debug!(from = ?self.status, to = ?status, "sensor status changed");
            self.status = status;
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Highest rate the debounce interval can report.
    pub fn max_detectable_rate(&self) -> u32 {
        (60_000 / self.config.debounce_ms.max(1)) as u32
    }
}
