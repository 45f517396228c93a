//! CPR Pacer - real-time CPR compression-rate trainer.
//!
//! Counts chest compressions from motion-sensor spikes (or manual taps),
//! turns them into a compressions-per-minute cadence over a sliding window,
//! and periodically asks a coach for short advice on the current rate.
//!
//! # Scope
//!
//! - **Rate only**: compression depth and recoil are not measured
//! - **Training only**: not a medical device, not for real emergencies
//! - **Local**: no session data is persisted
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Trainer loop                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐  │
//! │  │ Motion   │──▶│ Detector │──▶│  Store   │──▶│ Estimator │  │
//! │  │ source   │   │ (spikes) │   │ (window) │   │ (CPM)     │  │
//! │  └──────────┘   └──────────┘   └──────────┘   └───────────┘  │
//! │   manual tap ─────────────────────▲                 │        │
//! │                                                     ▼        │
//! │  ┌──────────┐   ┌──────────┐                  ┌───────────┐  │
//! │  │ Display  │◀──│  Coach   │◀─────────────────│ Scheduler │  │
//! │  │  state   │   │ (async)  │                  │ (debounce)│  │
//! │  └──────────┘   └──────────┘                  └───────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cpr_pacer::{coach::RuleCoach, collector::NoopSource, runtime::{Command, Trainer}, Config};
//!
//! let config = Config::default();
//! let mut trainer = Trainer::new(&config, NoopSource::new(), RuleCoach::new())
//!     .expect("Failed to build trainer");
//!
//! let (commands, rx) = crossbeam_channel::unbounded();
//! commands.send(Command::Start).unwrap();
//! commands.send(Command::Tap).unwrap();
//! commands.send(Command::Quit).unwrap();
//!
//! let stats = trainer.run(&rx, |_event| {});
//! println!("{} taps", stats.manual_taps);
//! ```

pub mod coach;
pub mod collector;
pub mod config;
pub mod core;
pub mod metronome;
pub mod runtime;
pub mod stats;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use coach::{AnyCoach, Coach, CoachError, RuleCoach};
pub use collector::{MotionSample, MotionSource, SensorError, SensorMessage, SensorStatus};
pub use config::{CoachKind, Config, ConfigError, SourceKind};
pub use core::{
    DisplayState, EventTimestampStore, FeedbackClass, FeedbackResult, Millis, RateZone,
    SessionController, SessionSettings,
};
pub use metronome::Metronome;
pub use runtime::{Command, Trainer, TrainerError, TrainerEvent};
pub use stats::{SessionStats, SharedSessionStats, StatsSnapshot};

#[cfg(feature = "remote")]
pub use coach::HttpCoach;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Training disclaimer that can be displayed to users.
pub const SAFETY_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                 CPR PACER - TRAINING DISCLAIMER                  ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This tool helps you practise compression RATE on a manikin.     ║
║                                                                  ║
║  ✓ WHAT IT DOES:                                                 ║
║    • Counts compressions from motion spikes or manual taps       ║
║    • Shows your rate against a 100-120 per minute target         ║
║    • Plays a metronome at the chosen tempo                       ║
║                                                                  ║
║  ✗ WHAT IT DOES NOT DO:                                          ║
║    • Measure compression depth or chest recoil                   ║
║    • Replace certified CPR training                              ║
║    • Guide care in a real emergency                              ║
║                                                                  ║
║  In an emergency, call your local emergency number and follow    ║
║  the dispatcher's instructions.                                  ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
