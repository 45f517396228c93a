//! Motion-sensor collaborators.
//!
//! A [`MotionSource`] negotiates permission once per session start, then
//! delivers [`SensorMessage`]s over a bounded channel until unsubscribed.

pub mod noop;
pub mod replay;
pub mod simulated;
pub mod types;

// Re-export commonly used types
pub use noop::NoopSource;
pub use replay::ReplaySource;
pub use simulated::{SimulatedConfig, SimulatedSource};
pub use types::{
    Acceleration, Axis, MotionSample, PermissionState, SensorMessage, SensorStatus,
};

use crossbeam_channel::Receiver;
use std::time::Instant;

/// Capacity of every sample channel; full channels drop samples rather than block.
pub const SAMPLE_CHANNEL_CAPACITY: usize = 1_024;

/// A subscribable stream of acceleration samples.
pub trait MotionSource {
    /// Resolve the platform permission gate. Called once per session start,
    /// before [`MotionSource::subscribe`].
    fn request_permission(&mut self) -> PermissionState;

    /// Begin delivering samples stamped relative to `epoch`.
    fn subscribe(&mut self, epoch: Instant) -> Result<Receiver<SensorMessage>, SensorError>;

    /// Tear down the subscription. Must be idempotent.
    fn unsubscribe(&mut self);

    fn is_subscribed(&self) -> bool;
}

impl<S: MotionSource + ?Sized> MotionSource for Box<S> {
    fn request_permission(&mut self) -> PermissionState {
        (**self).request_permission()
    }

    fn subscribe(&mut self, epoch: Instant) -> Result<Receiver<SensorMessage>, SensorError> {
        (**self).subscribe(epoch)
    }

    fn unsubscribe(&mut self) {
        (**self).unsubscribe()
    }

    fn is_subscribed(&self) -> bool {
        (**self).is_subscribed()
    }
}

/// Errors that can occur while subscribing to a motion source.
#[derive(Debug)]
pub enum SensorError {
    AlreadySubscribed,
    PermissionDenied,
    Unsupported,
    Io(String),
    Parse { line: usize, message: String },
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorError::AlreadySubscribed => write!(f, "Motion source is already subscribed"),
            SensorError::PermissionDenied => write!(f, "Motion sensor permission not granted"),
            SensorError::Unsupported => write!(f, "Motion sensing is not supported here"),
            SensorError::Io(e) => write!(f, "IO error: {e}"),
            SensorError::Parse { line, message } => {
                write!(f, "Invalid sample on line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for SensorError {}

impl SensorError {
    /// Status the detector should report after this failure.
    pub fn status(&self) -> SensorStatus {
        match self {
            SensorError::PermissionDenied => SensorStatus::PermissionDenied,
            SensorError::Unsupported => SensorStatus::Unsupported,
            SensorError::AlreadySubscribed | SensorError::Io(_) | SensorError::Parse { .. } => {
                SensorStatus::Error
            }
        }
    }
}
