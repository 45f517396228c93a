//! Coaching feedback collaborators.
//!
//! A [`Coach`] turns a compression rate into a short piece of advice. The
//! offline [`RuleCoach`] applies the 100-120 CPM guideline directly; the
//! [`HttpCoach`] (feature `remote`) asks a feedback service over HTTP.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Lower bound of the recommended compression rate.
pub const GUIDELINE_MIN_CPM: u32 = 100;
/// Upper bound of the recommended compression rate.
pub const GUIDELINE_MAX_CPM: u32 = 120;

/// Request body for the feedback endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachRequest {
    pub compression_rate: u32,
}

/// Response body from the feedback endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachResponse {
    pub feedback: String,
}

/// Coach call error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoachError {
    /// Configuration error
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Server returned an error response
    Server { status: u16, message: String },
    /// JSON serialization error
    Serialization(String),
    /// No answer within the feedback timeout
    Timeout,
    /// The coach answered with no text
    EmptyResponse,
}

impl std::fmt::Display for CoachError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoachError::Config(msg) => write!(f, "Coach config error: {msg}"),
            CoachError::Network(msg) => write!(f, "Coach network error: {msg}"),
            CoachError::Server { status, message } => {
                write!(f, "Coach server error ({status}): {message}")
            }
            CoachError::Serialization(msg) => write!(f, "Coach serialization error: {msg}"),
            CoachError::Timeout => write!(f, "Coach request timed out"),
            CoachError::EmptyResponse => write!(f, "Coach returned empty feedback"),
        }
    }
}

impl std::error::Error for CoachError {}

/// Something that can comment on a compression rate.
pub trait Coach: Send + Sync + 'static {
    fn feedback(&self, rate: u32) -> impl Future<Output = Result<String, CoachError>> + Send;
}

/// Offline coach applying the guideline band.
#[derive(Debug, Clone)]
pub struct RuleCoach {
    min_cpm: u32,
    max_cpm: u32,
    delay: Duration,
}

impl Default for RuleCoach {
    fn default() -> Self {
        Self {
            min_cpm: GUIDELINE_MIN_CPM,
            max_cpm: GUIDELINE_MAX_CPM,
            delay: Duration::ZERO,
        }
    }
}

impl RuleCoach {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer only after `delay`, to mimic a remote round trip.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The advice for `rate`, without any delay.
    pub fn advise(&self, rate: u32) -> &'static str {
        if rate < self.min_cpm {
            "Press faster"
        } else if rate > self.max_cpm {
            "Press slower"
        } else {
            "Good pace"
        }
    }
}

impl Coach for RuleCoach {
    async fn feedback(&self, rate: u32) -> Result<String, CoachError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.advise(rate).to_string())
    }
}

/// Coach backed by a remote feedback service.
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpCoach {
    base_url: String,
    client: reqwest::Client,
}

#[cfg(feature = "remote")]
impl HttpCoach {
    /// Create a client for the service at `base_url` (e.g. `http://127.0.0.1:8787`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CoachError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoachError::Config(format!("Failed to create HTTP client: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(CoachError::Config("Coach URL is empty".to_string()));
        }
        Ok(Self { base_url, client })
    }

    pub fn feedback_url(&self) -> String {
        format!("{}/feedback", self.base_url)
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }

    /// Test connection to the service.
    pub async fn test_connection(&self) -> Result<bool, CoachError> {
        let response = self
            .client
            .get(self.health_url())
            .send()
            .await
            .map_err(map_reqwest)?;
        Ok(response.status().is_success())
    }
}

#[cfg(feature = "remote")]
impl Coach for HttpCoach {
    async fn feedback(&self, rate: u32) -> Result<String, CoachError> {
        let response = self
            .client
            .post(self.feedback_url())
            .json(&CoachRequest {
                compression_rate: rate,
            })
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CoachError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body: CoachResponse = response
            .json()
            .await
            .map_err(|e| CoachError::Serialization(e.to_string()))?;
        if body.feedback.trim().is_empty() {
            return Err(CoachError::EmptyResponse);
        }
        Ok(body.feedback)
    }
}

#[cfg(feature = "remote")]
fn map_reqwest(e: reqwest::Error) -> CoachError {
    if e.is_timeout() {
        CoachError::Timeout
    } else {
        CoachError::Network(e.to_string())
    }
}

/// Runtime choice between the available coaches.
#[derive(Debug, Clone)]
pub enum AnyCoach {
    Rule(RuleCoach),
    #[cfg(feature = "remote")]
    Http(HttpCoach),
}

impl Coach for AnyCoach {
    async fn feedback(&self, rate: u32) -> Result<String, CoachError> {
        match self {
            AnyCoach::Rule(coach) => coach.feedback(rate).await,
            #[cfg(feature = "remote")]
            AnyCoach::Http(coach) => coach.feedback(rate).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_coach_vocabulary() {
        let coach = RuleCoach::new();
        assert_eq!(coach.advise(0), "Press faster");
        assert_eq!(coach.advise(99), "Press faster");
        assert_eq!(coach.advise(100), "Good pace");
        assert_eq!(coach.advise(120), "Good pace");
        assert_eq!(coach.advise(121), "Press slower");
    }

    #[test]
    fn test_request_wire_format() {
        let json = serde_json::to_string(&CoachRequest {
            compression_rate: 112,
        })
        .unwrap();
        assert_eq!(json, r#"{"compressionRate":112}"#);
    }

    #[tokio::test]
    async fn test_any_coach_dispatch() {
        let coach = AnyCoach::Rule(RuleCoach::new());
        assert_eq!(coach.feedback(130).await.unwrap(), "Press slower");
    }

    #[test]
    fn test_error_display() {
        let err = CoachError::Server {
            status: 503,
            message: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "Coach server error (503): busy");
        assert_eq!(CoachError::Timeout.to_string(), "Coach request timed out");
    }

    #[cfg(feature = "remote")]
    #[test]
    fn test_http_coach_urls() {
        let coach = HttpCoach::new("http://127.0.0.1:8787/", Duration::from_secs(1)).unwrap();
        assert_eq!(coach.feedback_url(), "http://127.0.0.1:8787/feedback");
        assert_eq!(coach.health_url(), "http://127.0.0.1:8787/health");
        assert!(HttpCoach::new("", Duration::from_secs(1)).is_err());
    }
}
