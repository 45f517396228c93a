//! Coaching feedback results and their classification.

use serde::{Deserialize, Serialize};

/// Shown before any session has started.
pub const MSG_IDLE: &str = "Start a session to get feedback.";
/// Shown right after a session starts, and when no compressions have arrived.
pub const MSG_AWAITING: &str = "Awaiting compressions...";
/// Shown after a session stops.
pub const MSG_STOPPED: &str = "Start a session and activate metronome.";
/// Shown when the coach call fails.
pub const MSG_ERROR: &str = "Error fetching feedback. Please try again.";
/// Shown in place of the feedback text while a request is in flight.
pub const MSG_ANALYZING: &str = "Analyzing...";

/// Tone of a feedback message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackClass {
    #[default]
    Neutral,
    Good,
    Warning,
}

/// The latest coaching message and its tone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackResult {
    pub text: String,
    pub classification: FeedbackClass,
}

impl FeedbackResult {
    /// Classify coach text by keyword.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let classification = classify(&text);
        Self {
            text,
            classification,
        }
    }

    pub fn neutral(text: &str) -> Self {
        Self {
            text: text.to_string(),
            classification: FeedbackClass::Neutral,
        }
    }

    /// Result used whenever the coach call fails.
    pub fn failure() -> Self {
        Self {
            text: MSG_ERROR.to_string(),
            classification: FeedbackClass::Warning,
        }
    }
}

impl Default for FeedbackResult {
    fn default() -> Self {
        Self::neutral(MSG_IDLE)
    }
}

/// Case-insensitive keyword classification; "good" wins over "faster"/"slower".
pub fn classify(text: &str) -> FeedbackClass {
    let lower = text.to_lowercase();
    if lower.contains("good") {
        FeedbackClass::Good
    } else if lower.contains("faster") || lower.contains("slower") {
        FeedbackClass::Warning
    } else {
        FeedbackClass::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_vocabulary() {
        assert_eq!(classify("Good pace"), FeedbackClass::Good);
        assert_eq!(classify("Press faster"), FeedbackClass::Warning);
        assert_eq!(classify("Press slower"), FeedbackClass::Warning);
        assert_eq!(classify("Keep going"), FeedbackClass::Neutral);
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(classify("GOOD job"), FeedbackClass::Good);
        assert_eq!(classify("a bit FASTER please"), FeedbackClass::Warning);
        assert_eq!(classify("Good, but slightly slower"), FeedbackClass::Good);
    }

    #[test]
    fn test_failure_result() {
        let result = FeedbackResult::failure();
        assert_eq!(result.classification, FeedbackClass::Warning);
        assert_eq!(result.text, MSG_ERROR);
    }
}
