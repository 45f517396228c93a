//! Motion source for platforms without an accelerometer.
//!
//! Permission always resolves to `unsupported`, so sessions run on manual
//! taps only.

use crate::collector::types::{PermissionState, SensorMessage};
use crate::collector::{MotionSource, SensorError};
use crossbeam_channel::Receiver;
use std::time::Instant;

/// A source that never emits samples.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSource;

impl NoopSource {
    pub fn new() -> Self {
        Self
    }
}

impl MotionSource for NoopSource {
    fn request_permission(&mut self) -> PermissionState {
        PermissionState::Unsupported
    }

    fn subscribe(&mut self, _epoch: Instant) -> Result<Receiver<SensorMessage>, SensorError> {
        Err(SensorError::Unsupported)
    }

    fn unsubscribe(&mut self) {}

    fn is_subscribed(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_reports_unsupported() {
        let mut source = NoopSource::new();
        assert_eq!(source.request_permission(), PermissionState::Unsupported);
        assert!(matches!(
            source.subscribe(Instant::now()),
            Err(SensorError::Unsupported)
        ));
        source.unsubscribe();
        source.unsubscribe();
        assert!(!source.is_subscribed());
    }
}
