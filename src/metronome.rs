//! Beat clock for the terminal metronome.
//!
//! The metronome only decides when beats fall; the driver rings the bell.

use crate::core::{Millis, TempoBounds};

/// Play/pause beat generator at a fixed tempo.
#[derive(Debug, Clone)]
pub struct Metronome {
    bpm: u32,
    bounds: TempoBounds,
    playing: bool,
    muted: bool,
    next_beat: Option<Millis>,
}

impl Metronome {
    pub fn new(bpm: u32, bounds: TempoBounds) -> Self {
        Self {
            bpm: bounds.clamp(bpm),
            bounds,
            playing: false,
            muted: false,
            next_beat: None,
        }
    }

    /// Start beating; the first beat falls at `now`.
    pub fn play(&mut self, now: Millis) {
        self.playing = true;
        self.next_beat = Some(now);
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.next_beat = None;
    }

    /// Change tempo, clamped to bounds. Returns the tempo applied.
    pub fn set_bpm(&mut self, bpm: u32) -> u32 {
        self.bpm = self.bounds.clamp(bpm);
        self.bpm
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Milliseconds between beats.
    pub fn interval_ms(&self) -> Millis {
        60_000 / u64::from(self.bpm.max(1))
    }

    /// Returns true if a beat fell due at or before `now`. Missed beats collapse into one.
    pub fn poll(&mut self, now: Millis) -> bool {
        let due = match self.next_beat {
            Some(due) if self.playing && due <= now => due,
            _ => return false,
        };
        let interval = self.interval_ms();
        let missed = (now - due) / interval;
        self.next_beat = Some(due + (missed + 1) * interval);
        true
    }

    /// True if the beat should be audible.
    pub fn audible(&self) -> bool {
        self.playing && !self.muted
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn next_beat(&self) -> Option<Millis> {
        self.next_beat
    }
}
