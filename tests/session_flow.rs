//! End-to-end flows through the session controller on a virtual clock.

use cpr_pacer::coach::{CoachError, RuleCoach};
use cpr_pacer::collector::simulated::synthetic_z;
use cpr_pacer::collector::{MotionSample, PermissionState, SensorStatus, SimulatedConfig};
use cpr_pacer::core::feedback::{MSG_AWAITING, MSG_STOPPED};
use cpr_pacer::core::{
    CadenceConfig, FeedbackClass, FeedbackRequest, Millis, RateZone, RecomputePolicy,
    SessionController, SessionSettings, Transition,
};

/// Sensor sampling step on the virtual clock.
const STEP_MS: Millis = 10;

fn controller() -> SessionController {
    SessionController::new(SessionSettings::default())
}

/// Feed a synthetic stream at `rate_cpm` over `[from, to)`, polling as a driver would.
fn stream(
    c: &mut SessionController,
    rate_cpm: u32,
    from: Millis,
    to: Millis,
) -> Vec<(Millis, FeedbackRequest)> {
    let config = SimulatedConfig {
        rate_cpm,
        ..SimulatedConfig::default()
    };
    let mut requests = Vec::new();
    for now in (from..to).step_by(STEP_MS as usize) {
        let sample = MotionSample::vertical(synthetic_z(&config, now - from), now);
        c.on_sample(&sample);
        if let Some(request) = c.poll(now) {
            requests.push((now, request));
        }
    }
    requests
}

#[test]
fn test_steady_stream_reaches_target_and_gets_coached() {
    let mut c = controller();
    c.start(0);
    c.on_permission(PermissionState::Granted);
    assert_eq!(c.display().sensor_status, SensorStatus::Active);

    let coach = RuleCoach::new();
    let requests = stream(&mut c, 110, 0, 13_000);
    assert!(!requests.is_empty());

    // Answer the latest request only; earlier ones were superseded
    let (_, last) = requests[requests.len() - 1];
    assert!(c.on_feedback(last.ticket, Ok(coach.advise(last.rate).to_string())));

    let display = c.display();
    assert!((100..=120).contains(&display.cadence), "cadence {}", display.cadence);
    assert_eq!(display.zone, RateZone::Ideal);
    assert_eq!(display.feedback.classification, FeedbackClass::Good);
    assert_eq!(c.stats().snapshot().samples_processed, 1_300);
}

#[test]
fn test_at_most_one_request_per_debounce_interval() {
    let mut c = controller();
    c.start(0);
    let requests = stream(&mut c, 100, 0, 30_000);
    assert!(requests.len() >= 5);
    for pair in requests.windows(2) {
        assert!(pair[1].0 - pair[0].0 >= 1_500, "requests at {} and {}", pair[0].0, pair[1].0);
    }
}

#[test]
fn test_stop_then_late_response_changes_nothing() {
    let mut c = controller();
    c.start(0);
    let requests = stream(&mut c, 120, 0, 6_000);
    let (_, pending) = *requests.last().expect("a request fired");

    assert!(matches!(c.stop(6_000), Transition::Stopped { .. }));
    assert_eq!(c.display().cadence, 0);
    assert_eq!(c.display().feedback.text, MSG_STOPPED);
    assert_eq!(c.next_deadline(), None);
    let before = c.display().clone();

    assert!(!c.on_feedback(pending.ticket, Ok("Press slower".to_string())));
    assert!(!c.on_feedback(pending.ticket, Err(CoachError::Timeout)));
    assert_eq!(c.display(), &before);

    // Nothing fires after stop either
    assert!(stream(&mut c, 120, 6_000, 12_000).is_empty());
}

#[test]
fn test_restart_clears_prior_timestamps() {
    let mut c = controller();
    c.start(0);
    stream(&mut c, 120, 0, 8_000);
    assert!(c.estimate(8_000) > 0);

    c.stop(8_000);
    c.start(8_010);
    assert_eq!(c.estimate(8_010), 0);
    assert_eq!(c.display().cadence, 0);
    assert_eq!(c.display().feedback.text, MSG_AWAITING);
}

#[test]
fn test_superseded_request_in_same_session_is_discarded() {
    let mut c = controller();
    c.start(0);
    let requests = stream(&mut c, 90, 0, 10_000);
    assert!(requests.len() >= 2);
    let (_, first) = requests[0];
    let (_, latest) = requests[requests.len() - 1];

    assert!(!c.on_feedback(first.ticket, Ok("Good pace".to_string())));
    assert!(c.on_feedback(latest.ticket, Ok("Press faster".to_string())));
    assert_eq!(c.display().feedback.text, "Press faster");
    assert_eq!(c.display().feedback.classification, FeedbackClass::Warning);
}

#[test]
fn test_denied_permission_still_counts_taps() {
    let mut c = controller();
    c.start(0);
    c.on_permission(PermissionState::Denied);
    assert_eq!(c.display().sensor_status, SensorStatus::PermissionDenied);

    for i in 0..10 {
        assert!(c.record_tap(i * 500));
    }
    c.poll(5_000);
    assert_eq!(c.display().cadence, 60);
    assert_eq!(c.display().zone, RateZone::Critical);
    assert_eq!(c.stats().snapshot().manual_taps, 10);
}

#[test]
fn test_cadence_drains_to_zero_after_compressions_stop() {
    let mut c = controller();
    c.start(0);
    stream(&mut c, 110, 0, 5_000);
    // Ticks keep running with no new events
    for now in (5_000..=16_000).step_by(100) {
        c.poll(now);
    }
    assert_eq!(c.display().cadence, 0);
    assert_eq!(c.display().zone, RateZone::Idle);
}

#[test]
fn test_on_append_cadence_drains_to_zero_after_compressions_stop() {
    let mut c = SessionController::new(SessionSettings {
        cadence: CadenceConfig {
            policy: RecomputePolicy::OnAppend,
            ..CadenceConfig::default()
        },
        ..SessionSettings::default()
    });
    c.start(0);
    for i in 0..20 {
        c.record_tap(i * 500);
    }
    assert_eq!(c.display().cadence, 120);

    // Only polls from here on; the window empties by 19.5s
    for now in (9_600..=60_000).step_by(100) {
        c.poll(now);
    }
    assert_eq!(c.display().cadence, 0);
    assert_eq!(c.display().zone, RateZone::Idle);
    assert_eq!(c.estimate(60_000), 0);
}
