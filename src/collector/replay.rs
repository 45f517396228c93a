//! Replays recorded motion traces.
//!
//! Traces are JSON lines, one [`MotionSample`] per line, as captured from a
//! handset's device-motion stream. Blank lines and lines starting with `#`
//! are skipped. On subscription the trace is re-stamped onto the trainer's
//! clock and emitted with its original spacing.

use crate::collector::types::{MotionSample, PermissionState, SensorMessage};
use crate::collector::{MotionSource, SensorError, SAMPLE_CHANNEL_CAPACITY};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A source that plays back a recorded trace once per subscription.
pub struct ReplaySource {
    samples: Arc<Vec<MotionSample>>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ReplaySource {
    /// Load a trace from a JSON-lines file.
    pub fn from_path(path: &Path) -> Result<Self, SensorError> {
        let file = std::fs::File::open(path).map_err(|e| SensorError::Io(e.to_string()))?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Parse a trace from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, SensorError> {
        Ok(Self::from_samples(parse_trace(reader)?))
    }

    pub fn from_samples(samples: Vec<MotionSample>) -> Self {
        Self {
            samples: Arc::new(samples),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Parse JSON-lines samples, rejecting traces whose timestamps go backwards.
pub fn parse_trace<R: BufRead>(reader: R) -> Result<Vec<MotionSample>, SensorError> {
    let mut samples: Vec<MotionSample> = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SensorError::Io(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let sample: MotionSample =
            serde_json::from_str(trimmed).map_err(|e| SensorError::Parse {
                line: index + 1,
                message: e.to_string(),
            })?;

        if let Some(prev) = samples.last() {
            if sample.timestamp < prev.timestamp {
                return Err(SensorError::Parse {
                    line: index + 1,
                    message: format!(
                        "timestamp {} precedes previous sample at {}",
                        sample.timestamp, prev.timestamp
                    ),
                });
            }
        }
        samples.push(sample);
    }

    Ok(samples)
}

impl MotionSource for ReplaySource {
    fn request_permission(&mut self) -> PermissionState {
        PermissionState::Granted
    }

    fn subscribe(&mut self, epoch: Instant) -> Result<Receiver<SensorMessage>, SensorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SensorError::AlreadySubscribed);
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        let (sender, receiver) = bounded(SAMPLE_CHANNEL_CAPACITY);
        self.running.store(true, Ordering::SeqCst);

        let samples = self.samples.clone();
        let running = self.running.clone();
        let handle = thread::spawn(move || {
            play(sender, running, samples, epoch);
        });

        self.thread_handle = Some(handle);
        Ok(receiver)
    }

    fn unsubscribe(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    fn is_subscribed(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

fn play(
    sender: Sender<SensorMessage>,
    running: Arc<AtomicBool>,
    samples: Arc<Vec<MotionSample>>,
    epoch: Instant,
) {
    let Some(first) = samples.first() else {
        running.store(false, Ordering::SeqCst);
        return;
    };
    let trace_origin = first.timestamp;
    let started = Instant::now();
    let base = epoch.elapsed().as_millis() as u64;

    for sample in samples.iter() {
        let offset = sample.timestamp - trace_origin;
        let due = Duration::from_millis(offset);

        // Sleep in short slices so unsubscribe is never held up by a long gap
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            let elapsed = started.elapsed();
            if elapsed >= due {
                break;
            }
            thread::sleep((due - elapsed).min(Duration::from_millis(20)));
        }

        let restamped = MotionSample::new(sample.acceleration_including_gravity, base + offset);
        if let Err(crossbeam_channel::TrySendError::Disconnected(_)) =
            sender.try_send(SensorMessage::Sample(restamped))
        {
            break;
        }
    }
    running.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TRACE: &str = r#"
# recorded on a handset, 3 samples
{"accelerationIncludingGravity":{"x":0.1,"y":0.2,"z":9.8},"timestamp":1000}
{"accelerationIncludingGravity":{"x":0.0,"y":0.3,"z":21.4},"timestamp":1016}

{"accelerationIncludingGravity":{"x":0.2,"y":0.1,"z":9.7},"timestamp":1033}
"#;

    #[test]
    fn test_parse_trace_skips_comments_and_blanks() {
        let samples = parse_trace(Cursor::new(TRACE)).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1].timestamp, 1016);
        assert!((samples[1].acceleration_including_gravity.z - 21.4).abs() < 1e-9);
    }

    #[test]
    fn test_parse_trace_reports_line_of_bad_sample() {
        let input = "{\"accelerationIncludingGravity\":{\"x\":0,\"y\":0,\"z\":9.8},\"timestamp\":5}\nnot json\n";
        match parse_trace(Cursor::new(input)) {
            Err(SensorError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_trace_rejects_backwards_time() {
        let input = concat!(
            "{\"accelerationIncludingGravity\":{\"x\":0,\"y\":0,\"z\":9.8},\"timestamp\":50}\n",
            "{\"accelerationIncludingGravity\":{\"x\":0,\"y\":0,\"z\":9.8},\"timestamp\":40}\n",
        );
        assert!(matches!(
            parse_trace(Cursor::new(input)),
            Err(SensorError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_replay_restamps_onto_trainer_clock() {
        let mut source = ReplaySource::from_reader(Cursor::new(TRACE)).unwrap();
        let epoch = Instant::now();
        let rx = source.subscribe(epoch).unwrap();

        let mut stamps = Vec::new();
        while let Ok(SensorMessage::Sample(s)) = rx.recv_timeout(Duration::from_secs(1)) {
            stamps.push(s.timestamp);
        }
        assert_eq!(stamps.len(), 3);
        assert_eq!(stamps[1] - stamps[0], 16);
        assert_eq!(stamps[2] - stamps[0], 33);
        source.unsubscribe();
    }
}
