//! Integration tests for the trainer event loop, on the real clock.

use cpr_pacer::coach::{Coach, CoachError, RuleCoach};
use cpr_pacer::collector::{
    MotionSample, NoopSource, ReplaySource, SensorStatus, SimulatedConfig, SimulatedSource,
};
use cpr_pacer::core::feedback::MSG_STOPPED;
use cpr_pacer::core::{DisplayState, FeedbackResult, SchedulerConfig};
use cpr_pacer::runtime::{Command, Trainer, TrainerEvent};
use cpr_pacer::Config;
use crossbeam_channel::{unbounded, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Short windows and timers so a session settles within a couple of seconds.
fn fast_config() -> Config {
    let mut config = Config::default();
    config.cadence.calculation_window_ms = 2_000;
    config.cadence.tick_interval_ms = 100;
    config.scheduler = SchedulerConfig {
        debounce_ms: 200,
        max_wait_ms: 400,
    };
    config.retention_buffer = Duration::from_millis(500);
    config.feedback_timeout = Duration::from_secs(2);
    config.metronome_muted = true;
    config
}

fn simulated(rate_cpm: u32) -> SimulatedSource {
    SimulatedSource::new(SimulatedConfig {
        rate_cpm,
        ..SimulatedConfig::default()
    })
}

/// Send each command after its delay, in order.
fn script(commands: Sender<Command>, steps: Vec<(u64, Command)>) {
    thread::spawn(move || {
        for (delay_ms, command) in steps {
            thread::sleep(Duration::from_millis(delay_ms));
            if commands.send(command).is_err() {
                break;
            }
        }
    });
}

/// Coach that records every rate it is asked about.
#[derive(Clone, Default)]
struct RecordingCoach {
    rates: Arc<Mutex<Vec<u32>>>,
}

impl Coach for RecordingCoach {
    async fn feedback(&self, rate: u32) -> Result<String, CoachError> {
        self.rates.lock().unwrap().push(rate);
        Ok("Good pace".to_string())
    }
}

#[test]
fn test_simulated_session_measures_rate_and_gets_feedback() {
    let coach = RecordingCoach::default();
    let mut trainer = Trainer::new(&fast_config(), simulated(120), coach.clone()).unwrap();

    let (tx, rx) = unbounded();
    script(tx, vec![(2_500, Command::Quit)]);

    trainer.start_session();
    let mut states: Vec<DisplayState> = Vec::new();
    let stats = trainer.run(&rx, |event| {
        if let TrainerEvent::Display(state) = event {
            states.push(state.clone());
        }
    });

    assert!(states
        .iter()
        .any(|s| s.active && (90..=150).contains(&s.cadence)));
    assert!(states.iter().any(|s| s.feedback.text == "Good pace"));
    assert!(!coach.rates.lock().unwrap().is_empty());

    let last = states.last().unwrap();
    assert!(!last.active);
    assert_eq!(last.feedback.text, MSG_STOPPED);
    assert!(stats.compressions_detected >= 3);
    assert!(stats.feedback_requests >= 1);
}

#[test]
fn test_response_after_stop_is_ignored() {
    let coach = RuleCoach::new().with_delay(Duration::from_millis(1_000));
    let mut trainer = Trainer::new(&fast_config(), simulated(60), coach).unwrap();

    let (tx, rx) = unbounded();
    script(tx, vec![(1_000, Command::Stop), (1_500, Command::Quit)]);

    trainer.start_session();
    let mut states: Vec<DisplayState> = Vec::new();
    let stats = trainer.run(&rx, |event| {
        if let TrainerEvent::Display(state) = event {
            states.push(state.clone());
        }
    });

    assert!(stats.feedback_requests >= 1);
    assert!(stats.stale_responses >= 1);
    // Every response resolved after the stop, so none reached the display
    assert!(states.iter().all(|s| s.feedback.text != "Press faster"));
    let first_stopped = states.iter().position(|s| !s.active && s.feedback.text == MSG_STOPPED);
    let first_stopped = first_stopped.expect("a stopped display");
    assert!(states[first_stopped..]
        .iter()
        .all(|s| s.feedback.text == MSG_STOPPED && s.cadence == 0));
}

#[test]
fn test_manual_taps_without_motion_sensor() {
    let mut trainer = Trainer::new(&fast_config(), NoopSource::new(), RuleCoach::new()).unwrap();

    let (tx, rx) = unbounded();
    script(
        tx,
        vec![
            (50, Command::Tap),
            (100, Command::Tap),
            (100, Command::Tap),
            (100, Command::Tap),
            (400, Command::Quit),
        ],
    );

    trainer.start_session();
    let mut states: Vec<DisplayState> = Vec::new();
    let stats = trainer.run(&rx, |event| {
        if let TrainerEvent::Display(state) = event {
            states.push(state.clone());
        }
    });

    assert!(states
        .iter()
        .any(|s| s.sensor_status == SensorStatus::Unsupported));
    assert!(states.iter().any(|s| s.active && s.cadence == 120));
    assert_eq!(stats.manual_taps, 4);
    assert_eq!(stats.samples_processed, 0);
}

#[test]
fn test_tempo_locked_while_session_runs() {
    let mut trainer = Trainer::new(&fast_config(), NoopSource::new(), RuleCoach::new()).unwrap();

    let (tx, rx) = unbounded();
    tx.send(Command::SetTempo(100)).unwrap();
    tx.send(Command::Start).unwrap();
    tx.send(Command::SetTempo(130)).unwrap();
    tx.send(Command::AdjustTempo(5)).unwrap();
    tx.send(Command::Quit).unwrap();

    let mut locked = 0;
    trainer.run(&rx, |event| {
        if let TrainerEvent::TempoLocked = event {
            locked += 1;
        }
    });

    assert_eq!(locked, 2);
    assert_eq!(trainer.controller().target_tempo(), 100);
    assert_eq!(trainer.metronome().bpm(), 100);
}

#[test]
fn test_replay_end_returns_sensor_to_inactive() {
    let samples = (0..5)
        .map(|i| MotionSample::vertical(if i == 2 { 20.0 } else { 9.8 }, i * 10))
        .collect();
    let mut trainer = Trainer::new(
        &fast_config(),
        ReplaySource::from_samples(samples),
        RuleCoach::new(),
    )
    .unwrap();

    let (tx, rx) = unbounded();
    script(tx, vec![(500, Command::Quit)]);

    trainer.start_session();
    let mut states: Vec<DisplayState> = Vec::new();
    let stats = trainer.run(&rx, |event| {
        if let TrainerEvent::Display(state) = event {
            states.push(state.clone());
        }
    });

    let active_at = states
        .iter()
        .position(|s| s.sensor_status == SensorStatus::Active)
        .expect("sensor became active");
    assert!(states[active_at..]
        .iter()
        .any(|s| s.active && s.sensor_status == SensorStatus::Inactive));
    assert_eq!(stats.samples_processed, 5);
    assert_eq!(stats.compressions_detected, 1);
}

#[test]
fn test_slow_coach_times_out_as_failure() {
    let mut config = fast_config();
    config.feedback_timeout = Duration::from_millis(100);
    let coach = RuleCoach::new().with_delay(Duration::from_millis(800));
    let mut trainer = Trainer::new(&config, simulated(110), coach).unwrap();

    let (tx, rx) = unbounded();
    script(tx, vec![(1_500, Command::Quit)]);

    trainer.start_session();
    let mut states: Vec<DisplayState> = Vec::new();
    let stats = trainer.run(&rx, |event| {
        if let TrainerEvent::Display(state) = event {
            states.push(state.clone());
        }
    });

    assert!(states
        .iter()
        .any(|s| s.active && s.feedback == FeedbackResult::failure()));
    assert!(stats.feedback_failures >= 1);
}

#[test]
fn test_time_limit_ends_run() {
    let mut trainer = Trainer::new(&fast_config(), NoopSource::new(), RuleCoach::new())
        .unwrap()
        .with_time_limit(Duration::from_millis(300));

    // Keep the sender alive so only the limit can end the run
    let (_tx, rx) = unbounded::<Command>();
    trainer.start_session();
    let started = std::time::Instant::now();
    trainer.run(&rx, |_| {});

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!trainer.controller().is_active());
}
