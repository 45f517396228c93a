//! What the UI consumer renders.

use crate::collector::types::SensorStatus;
use crate::core::feedback::{FeedbackResult, MSG_ANALYZING};
use serde::{Deserialize, Serialize};

/// Where the live rate sits relative to the metronome tempo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateZone {
    /// No compressions in the window
    #[default]
    Idle,
    /// Within 10% of the tempo
    Ideal,
    /// Within 20% of the tempo
    Warning,
    /// Further off
    Critical,
}

impl RateZone {
    pub fn classify(rate: u32, tempo: u32) -> Self {
        if rate == 0 {
            return RateZone::Idle;
        }
        let (rate, tempo) = (u64::from(rate) * 10, u64::from(tempo));
        if rate >= tempo * 9 && rate <= tempo * 11 {
            RateZone::Ideal
        } else if rate >= tempo * 8 && rate <= tempo * 12 {
            RateZone::Warning
        } else {
            RateZone::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RateZone::Idle => "idle",
            RateZone::Ideal => "on target",
            RateZone::Warning => "drifting",
            RateZone::Critical => "off target",
        }
    }
}

/// Rounded ideal range (±10%) around a tempo, for display.
pub fn ideal_range(tempo: u32) -> (u32, u32) {
    ((tempo * 9 + 5) / 10, (tempo * 11 + 5) / 10)
}

/// Snapshot of everything the UI shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayState {
    pub active: bool,
    /// Compressions per minute
    pub cadence: u32,
    pub target_tempo: u32,
    pub zone: RateZone,
    pub feedback: FeedbackResult,
    /// A coach request is in flight and compressions have been seen
    pub loading: bool,
    pub sensor_status: SensorStatus,
}

impl DisplayState {
    pub fn new(target_tempo: u32) -> Self {
        Self {
            active: false,
            cadence: 0,
            target_tempo,
            zone: RateZone::Idle,
            feedback: FeedbackResult::default(),
            loading: false,
            sensor_status: SensorStatus::Inactive,
        }
    }

    /// Text for the coach line.
    pub fn feedback_text(&self) -> &str {
        if self.loading && self.active {
            MSG_ANALYZING
        } else {
            &self.feedback.text
        }
    }

    /// Single status line for terminals.
    pub fn status_line(&self) -> String {
        let (low, high) = ideal_range(self.target_tempo);
        format!(
            "{:>3} CPM [{}] target {}-{} | coach: {} | sensor: {}",
            self.cadence,
            self.zone.label(),
            low,
            high,
            self.feedback_text(),
            self.sensor_status.label()
        )
    }
}
