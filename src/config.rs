//! Configuration for the CPR pacer.

use crate::core::{
    CadenceConfig, DetectorConfig, SchedulerConfig, SessionSettings, TempoBounds, ThresholdBounds,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Spike detection tuning
    pub detector: DetectorConfig,

    /// Allowed acceleration threshold range
    pub threshold_bounds: ThresholdBounds,

    /// Cadence window, tick and recompute policy
    pub cadence: CadenceConfig,

    /// Feedback debounce and max-wait
    pub scheduler: SchedulerConfig,

    /// Extra history kept beyond the calculation window
    #[serde(with = "duration_serde")]
    pub retention_buffer: Duration,

    /// Upper bound on a single coach call
    #[serde(with = "duration_serde")]
    pub feedback_timeout: Duration,

    /// Metronome tempo in beats per minute
    pub target_tempo: u32,

    /// Allowed tempo range
    pub tempo_bounds: TempoBounds,

    /// Where feedback comes from
    pub coach: CoachSettings,

    /// Where motion samples come from
    pub source: SourceKind,

    /// Compression rate produced by the simulated source
    pub simulated_rate_cpm: u32,

    /// Start with the metronome bell silenced
    pub metronome_muted: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            threshold_bounds: ThresholdBounds::default(),
            cadence: CadenceConfig::default(),
            scheduler: SchedulerConfig::default(),
            retention_buffer: Duration::from_secs(5),
            feedback_timeout: Duration::from_secs(10),
            target_tempo: 110,
            tempo_bounds: TempoBounds::default(),
            coach: CoachSettings::default(),
            source: SourceKind::Simulated,
            simulated_rate_cpm: 110,
            metronome_muted: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config.clamped())
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cpr-pacer")
            .join("config.json")
    }

    /// Pull every value back inside its valid range, logging what changed.
    pub fn clamped(mut self) -> Self {
        let defaults = Self::default();

        if self.tempo_bounds.min == 0 || self.tempo_bounds.min > self.tempo_bounds.max {
            tracing::warn!(bounds = ?self.tempo_bounds, "invalid tempo bounds; using defaults");
            self.tempo_bounds = defaults.tempo_bounds;
        }
        let tempo = self.tempo_bounds.clamp(self.target_tempo);
        if tempo != self.target_tempo {
            tracing::warn!(requested = self.target_tempo, applied = tempo, "target tempo clamped");
            self.target_tempo = tempo;
        }

        if !self.threshold_bounds.is_valid() {
            tracing::warn!(bounds = ?self.threshold_bounds, "invalid threshold bounds; using defaults");
            self.threshold_bounds = defaults.threshold_bounds;
        }
        let threshold = self.detector.acceleration_threshold;
        if !threshold.is_finite() {
            tracing::warn!(threshold, "invalid acceleration threshold; using default");
            self.detector.acceleration_threshold = defaults.detector.acceleration_threshold;
        } else {
            let applied = self.threshold_bounds.clamp(threshold);
            if applied != threshold {
                tracing::warn!(requested = threshold, applied, "acceleration threshold clamped");
                self.detector.acceleration_threshold = applied;
            }
        }
        if self.detector.debounce_ms == 0 {
            tracing::warn!("detector debounce of 0 ms; using default");
            self.detector.debounce_ms = defaults.detector.debounce_ms;
        }

        if self.cadence.calculation_window_ms < 1_000 {
            tracing::warn!(
                window_ms = self.cadence.calculation_window_ms,
                "calculation window too short; raised to 1000 ms"
            );
            self.cadence.calculation_window_ms = 1_000;
        }
        if self.cadence.tick_interval_ms < 50 {
            tracing::warn!(
                tick_ms = self.cadence.tick_interval_ms,
                "tick interval too short; raised to 50 ms"
            );
            self.cadence.tick_interval_ms = 50;
        }

        if self.scheduler.max_wait_ms < self.scheduler.debounce_ms {
            tracing::warn!(
                debounce_ms = self.scheduler.debounce_ms,
                max_wait_ms = self.scheduler.max_wait_ms,
                "feedback max-wait below debounce; raised to match"
            );
            self.scheduler.max_wait_ms = self.scheduler.debounce_ms;
        }

        if self.feedback_timeout.is_zero() {
            tracing::warn!("feedback timeout of 0; using default");
            self.feedback_timeout = defaults.feedback_timeout;
        }

        self
    }

    /// Pipeline settings for a [`crate::core::SessionController`].
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            cadence: self.cadence,
            retention_buffer_ms: self.retention_buffer.as_millis() as u64,
            detector: self.detector,
            scheduler: self.scheduler,
            tempo_bounds: self.tempo_bounds,
            target_tempo: self.target_tempo,
        }
    }
}

/// Which coach answers feedback requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoachKind {
    /// Built-in guideline rules
    #[default]
    Rule,
    /// Remote feedback service
    Http,
}

impl std::str::FromStr for CoachKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rule" | "local" => Ok(CoachKind::Rule),
            "http" | "remote" => Ok(CoachKind::Http),
            other => Err(ConfigError::ParseError(format!("unknown coach '{other}'"))),
        }
    }
}

/// Coach selection and endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachSettings {
    pub kind: CoachKind,
    /// Base URL of the feedback service
    pub url: String,
}

impl Default for CoachSettings {
    fn default() -> Self {
        Self {
            kind: CoachKind::Rule,
            url: "http://127.0.0.1:8787".to_string(),
        }
    }
}

/// Which motion source feeds the detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Synthetic spikes at a fixed rate
    #[default]
    Simulated,
    /// Recorded JSON-lines trace
    Replay,
    /// No motion sensor; manual taps only
    None,
}

impl std::str::FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "sim" => Ok(SourceKind::Simulated),
            "replay" => Ok(SourceKind::Replay),
            "none" | "manual" => Ok(SourceKind::None),
            other => Err(ConfigError::ParseError(format!("unknown source '{other}'"))),
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration, in milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
