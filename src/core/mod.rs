//! Core pipeline for the CPR pacer.
//!
//! This module contains:
//! - The time-pruned compression log
//! - Spike detection from motion samples
//! - Windowed cadence estimation
//! - Debounced, stale-safe feedback scheduling
//! - The session controller tying them together

pub mod cadence;
pub mod detector;
pub mod display;
pub mod feedback;
pub mod scheduler;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use cadence::{rate_per_minute, CadenceConfig, CadenceEstimator, RecomputePolicy};
pub use detector::{Detection, DetectorConfig, MotionSpikeDetector, ThresholdBounds};
pub use display::{ideal_range, DisplayState, RateZone};
pub use feedback::{classify, FeedbackClass, FeedbackResult};
pub use scheduler::{FeedbackScheduler, FeedbackTicket, SchedulerConfig};
pub use session::{FeedbackRequest, SessionController, SessionSettings, TempoBounds, Transition};
pub use store::{EventTimestampStore, Millis};
