//! The trainer event loop.
//!
//! [`Trainer`] owns the session controller, the metronome, a motion source
//! and a coach. A single thread multiplexes user commands, sensor samples,
//! coach completions and timer deadlines with `crossbeam_channel::select!`,
//! sleeping until the next deadline. Coach calls run on a small tokio
//! runtime owned by the trainer and report back over a channel.

use crate::coach::{Coach, CoachError};
use crate::collector::{MotionSource, PermissionState, SensorMessage};
use crate::config::Config;
use crate::core::{DisplayState, FeedbackRequest, FeedbackTicket, Millis, SessionController, Transition};
use crate::metronome::Metronome;
use crate::stats::StatsSnapshot;
use crossbeam_channel::{never, select, unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest the loop sleeps without checking for shutdown.
const MAX_IDLE: Duration = Duration::from_millis(100);

/// User input to a running trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start if inactive, stop if active
    Toggle,
    Start,
    Stop,
    /// Manual compression
    Tap,
    SetTempo(u32),
    /// Nudge the tempo by a signed number of BPM
    AdjustTempo(i32),
    ToggleMute,
    Quit,
}

/// What the trainer reports to its front end.
#[derive(Debug)]
pub enum TrainerEvent<'a> {
    /// The display state changed
    Display(&'a DisplayState),
    /// A metronome beat fell due
    Beat { audible: bool },
    /// Mute was toggled
    MuteChanged(bool),
    /// Tempo edits are refused while a session runs
    TempoLocked,
}

/// Errors that can occur while building a trainer.
#[derive(Debug)]
pub enum TrainerError {
    Runtime(String),
}

impl std::fmt::Display for TrainerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainerError::Runtime(e) => write!(f, "Failed to start async runtime: {e}"),
        }
    }
}

impl std::error::Error for TrainerError {}

struct Completion {
    ticket: FeedbackTicket,
    result: Result<String, CoachError>,
}

/// Single-threaded driver around a [`SessionController`].
pub struct Trainer<S: MotionSource, C: Coach> {
    controller: SessionController,
    metronome: Metronome,
    source: S,
    coach: Arc<C>,
    runtime: tokio::runtime::Runtime,
    feedback_timeout: Duration,
    epoch: Instant,
    samples: Option<Receiver<SensorMessage>>,
    completion_tx: Sender<Completion>,
    completion_rx: Receiver<Completion>,
    shutdown: Arc<AtomicBool>,
    time_limit: Option<Millis>,
    last_display: Option<DisplayState>,
}

impl<S: MotionSource, C: Coach> Trainer<S, C> {
    pub fn new(config: &Config, source: S, coach: C) -> Result<Self, TrainerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("cpr-pacer-coach")
            .enable_all()
            .build()
            .map_err(|e| TrainerError::Runtime(e.to_string()))?;

        let mut metronome = Metronome::new(config.target_tempo, config.tempo_bounds);
        metronome.set_muted(config.metronome_muted);

        let (completion_tx, completion_rx) = unbounded();

        Ok(Self {
            controller: SessionController::new(config.session_settings()),
            metronome,
            source,
            coach: Arc::new(coach),
            runtime,
            feedback_timeout: config.feedback_timeout,
            epoch: Instant::now(),
            samples: None,
            completion_tx,
            completion_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
            time_limit: None,
            last_display: None,
        })
    }

    /// Quit on its own once `limit` has passed since construction.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit.as_millis() as Millis);
        self
    }

    /// Flag that stops the loop when set, e.g. from a Ctrl+C handler.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Milliseconds since the trainer was built.
    pub fn now(&self) -> Millis {
        self.epoch.elapsed().as_millis() as Millis
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    /// Start a session outside of the command stream.
    pub fn start_session(&mut self) -> Transition {
        let now = self.now();
        let transition = self.controller.start(now);
        self.apply_transition(transition, now);
        transition
    }

    /// Run until `Quit`, the command channel closing, the time limit or shutdown.
    pub fn run<F>(&mut self, commands: &Receiver<Command>, mut on_event: F) -> StatsSnapshot
    where
        F: FnMut(TrainerEvent<'_>),
    {
        self.publish(&mut on_event);

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::debug!("shutdown requested");
                break;
            }
            let now = self.now();
            if self.time_limit.is_some_and(|limit| now >= limit) {
                tracing::info!("time limit reached");
                break;
            }

            self.poll_timers(now, &mut on_event);
            self.publish(&mut on_event);

            let timeout = self.idle_timeout(now);
            let samples = self.samples.clone().unwrap_or_else(never);
            let completions = self.completion_rx.clone();

            select! {
                recv(commands) -> msg => match msg {
                    Ok(command) => {
                        if !self.handle_command(command, &mut on_event) {
                            break;
                        }
                    }
                    Err(_) => {
                        tracing::debug!("command channel closed");
                        break;
                    }
                },
                recv(samples) -> msg => match msg {
                    Ok(SensorMessage::Sample(sample)) => {
                        self.controller.on_sample(&sample);
                    }
                    Ok(SensorMessage::Error(message)) => {
                        self.controller.on_sensor_error(&message);
                    }
                    Err(_) => {
                        self.samples = None;
                        self.controller.on_sensor_closed();
                    }
                },
                recv(completions) -> msg => {
                    if let Ok(completion) = msg {
                        self.controller.on_feedback(completion.ticket, completion.result);
                    }
                },
                default(timeout) => {}
            }

            self.publish(&mut on_event);
        }

        let now = self.now();
        let transition = self.controller.stop(now);
        self.apply_transition(transition, now);
        self.publish(&mut on_event);
        self.controller.stats().snapshot()
    }

    fn handle_command<F>(&mut self, command: Command, on_event: &mut F) -> bool
    where
        F: FnMut(TrainerEvent<'_>),
    {
        let now = self.now();
        match command {
            Command::Toggle => {
                let transition = self.controller.toggle(now);
                self.apply_transition(transition, now);
            }
            Command::Start => {
                let transition = self.controller.start(now);
                self.apply_transition(transition, now);
            }
            Command::Stop => {
                let transition = self.controller.stop(now);
                self.apply_transition(transition, now);
            }
            Command::Tap => {
                self.controller.record_tap(now);
            }
            Command::SetTempo(bpm) => self.set_tempo(bpm, on_event),
            Command::AdjustTempo(delta) => {
                let bpm = self.controller.target_tempo().saturating_add_signed(delta);
                self.set_tempo(bpm, on_event);
            }
            Command::ToggleMute => {
                let muted = self.metronome.toggle_mute();
                on_event(TrainerEvent::MuteChanged(muted));
            }
            Command::Quit => return false,
        }
        true
    }

    fn set_tempo<F>(&mut self, bpm: u32, on_event: &mut F)
    where
        F: FnMut(TrainerEvent<'_>),
    {
        if self.controller.is_active() {
            on_event(TrainerEvent::TempoLocked);
            return;
        }
        let applied = self.controller.set_target_tempo(bpm);
        self.metronome.set_bpm(applied);
    }

    fn apply_transition(&mut self, transition: Transition, now: Millis) {
        match transition {
            Transition::Started { .. } => {
                self.subscribe();
                self.metronome.play(now);
            }
            Transition::Stopped { .. } => {
                self.unsubscribe();
                self.metronome.pause();
            }
            Transition::Unchanged => {}
        }
    }

    fn subscribe(&mut self) {
        let permission = self.source.request_permission();
        self.controller.on_permission(permission);
        if permission != PermissionState::Granted {
            return;
        }
        match self.source.subscribe(self.epoch) {
            Ok(receiver) => self.samples = Some(receiver),
            Err(e) => self.controller.on_subscribe_failed(&e),
        }
    }

    fn unsubscribe(&mut self) {
        self.source.unsubscribe();
        if let Some(receiver) = self.samples.take() {
            let dropped = receiver.try_iter().count();
            if dropped > 0 {
                tracing::debug!(dropped, "discarded samples queued before stop");
            }
        }
    }

    fn poll_timers<F>(&mut self, now: Millis, on_event: &mut F)
    where
        F: FnMut(TrainerEvent<'_>),
    {
        if self.metronome.poll(now) {
            on_event(TrainerEvent::Beat {
                audible: self.metronome.audible(),
            });
        }
        if let Some(request) = self.controller.poll(now) {
            self.dispatch(request);
        }
    }

    fn dispatch(&self, request: FeedbackRequest) {
        let coach = Arc::clone(&self.coach);
        let sender = self.completion_tx.clone();
        let timeout = self.feedback_timeout;
        self.runtime.spawn(async move {
            let result = match tokio::time::timeout(timeout, coach.feedback(request.rate)).await {
                Ok(result) => result,
                Err(_) => Err(CoachError::Timeout),
            };
            // The trainer may already be gone
            let _ = sender.send(Completion {
                ticket: request.ticket,
                result,
            });
        });
    }

    fn idle_timeout(&self, now: Millis) -> Duration {
        let deadlines = [
            self.controller.next_deadline(),
            self.metronome.next_beat(),
            self.time_limit,
        ];
        deadlines
            .into_iter()
            .flatten()
            .min()
            .map(|deadline| Duration::from_millis(deadline.saturating_sub(now)))
            .map_or(MAX_IDLE, |wait| wait.min(MAX_IDLE))
    }

    fn publish<F>(&mut self, on_event: &mut F)
    where
        F: FnMut(TrainerEvent<'_>),
    {
        let display = self.controller.display();
        if self.last_display.as_ref() != Some(display) {
            on_event(TrainerEvent::Display(display));
            self.last_display = Some(display.clone());
        }
    }
}

impl<S: MotionSource, C: Coach> Drop for Trainer<S, C> {
    fn drop(&mut self) {
        self.source.unsubscribe();
    }
}
