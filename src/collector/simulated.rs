//! Synthetic motion source.
//!
//! Generates a resting ~1g vertical signal with a short acceleration spike
//! for every compression at a configurable rate. Each spike spans several
//! samples so the detector's debounce is exercised the same way a real
//! handset trace would exercise it.

use crate::collector::types::{MotionSample, PermissionState, SensorMessage};
use crate::collector::{MotionSource, SensorError, SAMPLE_CHANNEL_CAPACITY};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Standard gravity in m/s².
pub const GRAVITY: f64 = 9.81;

/// Configuration for the synthetic compression stream.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Compressions per minute to synthesize
    pub rate_cpm: u32,
    /// Samples per second
    pub sample_hz: u32,
    /// Vertical acceleration at the top of each spike
    pub peak: f64,
    /// How long each spike stays at its peak
    pub spike_duration: Duration,
    /// Outcome of the permission prompt
    pub permission: PermissionState,
    /// Emit a stream error after this long, if set
    pub fail_after: Option<Duration>,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            rate_cpm: 110,
            sample_hz: 60,
            peak: 22.0,
            spike_duration: Duration::from_millis(60),
            permission: PermissionState::Granted,
            fail_after: None,
        }
    }
}

/// A background-thread source producing synthetic compressions.
pub struct SimulatedSource {
    config: SimulatedConfig,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SimulatedSource {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Change the synthesized rate; takes effect on the next subscription.
    pub fn set_rate(&mut self, rate_cpm: u32) {
        self.config.rate_cpm = rate_cpm;
    }
}

impl MotionSource for SimulatedSource {
    fn request_permission(&mut self) -> PermissionState {
        self.config.permission
    }

    fn subscribe(&mut self, epoch: Instant) -> Result<Receiver<SensorMessage>, SensorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SensorError::AlreadySubscribed);
        }
        if self.config.permission == PermissionState::Denied {
            return Err(SensorError::PermissionDenied);
        }
        // Reap a generator that already stopped on its own
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        let (sender, receiver) = bounded(SAMPLE_CHANNEL_CAPACITY);
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let config = self.config.clone();
        let handle = thread::spawn(move || {
            generate(sender, running, config, epoch);
        });

        self.thread_handle = Some(handle);
        Ok(receiver)
    }

    fn unsubscribe(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Simulated sensor thread panicked during shutdown");
            }
        }
    }

    fn is_subscribed(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Vertical acceleration at `elapsed_ms` into the stream.
pub fn synthetic_z(config: &SimulatedConfig, elapsed_ms: u64) -> f64 {
    if config.rate_cpm == 0 {
        return GRAVITY;
    }
    let period_ms = 60_000 / u64::from(config.rate_cpm);
    let phase_ms = elapsed_ms % period_ms.max(1);
    if phase_ms < config.spike_duration.as_millis() as u64 {
        config.peak
    } else {
        GRAVITY
    }
}

fn generate(
    sender: Sender<SensorMessage>,
    running: Arc<AtomicBool>,
    config: SimulatedConfig,
    epoch: Instant,
) {
    let period = Duration::from_micros(1_000_000 / u64::from(config.sample_hz.max(1)));
    let started = Instant::now();

    while running.load(Ordering::SeqCst) {
        if let Some(limit) = config.fail_after {
            if started.elapsed() >= limit {
                let _ = sender.try_send(SensorMessage::Error(
                    "simulated sensor stream failure".to_string(),
                ));
                break;
            }
        }

        let timestamp = epoch.elapsed().as_millis() as u64;
        let elapsed = started.elapsed().as_millis() as u64;
        let sample = MotionSample::vertical(synthetic_z(&config, elapsed), timestamp);

        // Don't block if the consumer is behind - just drop the sample
        if let Err(crossbeam_channel::TrySendError::Disconnected(_)) =
            sender.try_send(SensorMessage::Sample(sample))
        {
            break;
        }

        thread::sleep(period);
    }
    running.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_signal_spikes_once_per_period() {
        let config = SimulatedConfig {
            rate_cpm: 120,
            ..SimulatedConfig::default()
        };
        // 500 ms period, 60 ms spike
        assert_eq!(synthetic_z(&config, 0), config.peak);
        assert_eq!(synthetic_z(&config, 59), config.peak);
        assert_eq!(synthetic_z(&config, 60), GRAVITY);
        assert_eq!(synthetic_z(&config, 499), GRAVITY);
        assert_eq!(synthetic_z(&config, 500), config.peak);
    }

    #[test]
    fn test_zero_rate_is_flat() {
        let config = SimulatedConfig {
            rate_cpm: 0,
            ..SimulatedConfig::default()
        };
        assert_eq!(synthetic_z(&config, 0), GRAVITY);
    }

    #[test]
    fn test_subscribe_delivers_samples_and_unsubscribe_is_idempotent() {
        let mut source = SimulatedSource::new(SimulatedConfig {
            sample_hz: 200,
            ..SimulatedConfig::default()
        });
        assert_eq!(source.request_permission(), PermissionState::Granted);

        let rx = source.subscribe(Instant::now()).expect("subscribe");
        assert!(source.is_subscribed());
        assert!(matches!(
            source.subscribe(Instant::now()),
            Err(SensorError::AlreadySubscribed)
        ));

        let msg = rx.recv_timeout(Duration::from_secs(1)).expect("sample");
        assert!(matches!(msg, SensorMessage::Sample(_)));

        source.unsubscribe();
        source.unsubscribe();
        assert!(!source.is_subscribed());
    }

    #[test]
    fn test_denied_permission_blocks_subscription() {
        let mut source = SimulatedSource::new(SimulatedConfig {
            permission: PermissionState::Denied,
            ..SimulatedConfig::default()
        });
        assert_eq!(source.request_permission(), PermissionState::Denied);
        assert!(matches!(
            source.subscribe(Instant::now()),
            Err(SensorError::PermissionDenied)
        ));
    }
}
