//! Motion sample and sensor status types.
//!
//! Samples mirror the device-motion shape (`accelerationIncludingGravity`
//! plus a timestamp) so recorded browser traces can be replayed verbatim.

use serde::{Deserialize, Serialize};

/// Three-axis acceleration in m/s², gravity included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Acceleration {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Read a single axis.
    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// Device axis used as the vertical (compression) direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

/// A single accelerometer reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionSample {
    /// Acceleration including gravity
    pub acceleration_including_gravity: Acceleration,
    /// Milliseconds on the trainer's monotonic clock
    pub timestamp: u64,
}

impl MotionSample {
    pub fn new(acceleration: Acceleration, timestamp: u64) -> Self {
        Self {
            acceleration_including_gravity: acceleration,
            timestamp,
        }
    }

    /// A sample with only the vertical (z) axis set, for synthetic streams.
    pub fn vertical(z: f64, timestamp: u64) -> Self {
        Self::new(Acceleration::new(0.0, 0.0, z), timestamp)
    }
}

/// Message delivered by a motion subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorMessage {
    Sample(MotionSample),
    /// The stream failed mid-session; no further samples will follow.
    Error(String),
}

/// Outcome of the one-time permission negotiation at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionState {
    Granted,
    Denied,
    Unsupported,
}

/// Detector status surfaced to the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensorStatus {
    #[default]
    Inactive,
    Active,
    PermissionDenied,
    Error,
    Unsupported,
}

impl SensorStatus {
    /// Short label for status lines.
    pub fn label(&self) -> &'static str {
        match self {
            SensorStatus::Inactive => "inactive",
            SensorStatus::Active => "active",
            SensorStatus::PermissionDenied => "permission denied",
            SensorStatus::Error => "error",
            SensorStatus::Unsupported => "unsupported",
        }
    }
}

impl From<PermissionState> for SensorStatus {
    fn from(state: PermissionState) -> Self {
        match state {
            PermissionState::Granted => SensorStatus::Active,
            PermissionState::Denied => SensorStatus::PermissionDenied,
            PermissionState::Unsupported => SensorStatus::Unsupported,
        }
    }
}
