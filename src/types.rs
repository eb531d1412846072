//! Core data types for the alternative generation engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier for downstream LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    Groq,
    GoogleAi,
    OpenRouter,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Groq => "groq",
            ProviderId::GoogleAi => "googleai",
            ProviderId::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(ProviderId::Groq),
            "googleai" => Ok(ProviderId::GoogleAi),
            "openrouter" => Ok(ProviderId::OpenRouter),
            other => Err(format!(
                "unknown provider '{other}' (expected groq, googleai or openrouter)"
            )),
        }
    }
}

/// Ad asset categories with fixed length ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetType {
    Headline,
    LongHeadline,
    Description,
}

impl AssetType {
    /// Parse the asset-type cell of a table row. Unknown labels yield `None`;
    /// callers fall back to the default length ceiling.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "headline" => Some(AssetType::Headline),
            "long_headline" => Some(AssetType::LongHeadline),
            "description" => Some(AssetType::Description),
            _ => None,
        }
    }

    /// Maximum character count accepted for this asset type.
    pub fn max_chars(&self) -> usize {
        match self {
            AssetType::Headline => 30,
            AssetType::LongHeadline => 60,
            AssetType::Description => 90,
        }
    }
}

/// Categorical performance signal attached to each asset row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceLabel {
    Low,
    Good,
    Best,
    Unknown,
}

impl PerformanceLabel {
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "LOW" => PerformanceLabel::Low,
            "GOOD" => PerformanceLabel::Good,
            "BEST" => PerformanceLabel::Best,
            _ => PerformanceLabel::Unknown,
        }
    }
}

/// Per-model throughput ceilings enforced by the rate limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub rpm: u32,
    pub rps: u32,
}

/// One generation attempt, immutable once built.
///
/// `exclusions` is a snapshot of the alternatives already accepted for this
/// source text, across the batch and prior persisted runs.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub provider: ProviderId,
    pub model: String,
    pub asset_type: String,
    pub source_text: String,
    pub max_chars: usize,
    pub exclusions: Vec<String>,
}

/// Failure reasons for a single provider request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderFailure {
    /// Provider declared a rate limit, possibly with a retry-after hint
    RateLimited { retry_after_ms: Option<u64> },
    /// Missing or rejected API key
    AuthenticationFailed,
    /// Provider-declared error or unexpected HTTP status
    ServerError(String),
    /// Transport-level failure
    NetworkError(String),
    /// Response body was not the expected shape
    MalformedResponse(String),
    /// Response parsed but carried no generated text
    EmptyResponse,
}

impl ProviderFailure {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ProviderFailure::RateLimited { .. })
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderFailure::RateLimited {
                retry_after_ms: Some(ms),
            } => write!(f, "rate limit exceeded, retry after {ms}ms"),
            ProviderFailure::RateLimited {
                retry_after_ms: None,
            } => write!(f, "rate limit exceeded"),
            ProviderFailure::AuthenticationFailed => write!(f, "authentication failed"),
            ProviderFailure::ServerError(message) => write!(f, "provider error: {message}"),
            ProviderFailure::NetworkError(message) => write!(f, "network error: {message}"),
            ProviderFailure::MalformedResponse(message) => {
                write!(f, "malformed response: {message}")
            }
            ProviderFailure::EmptyResponse => write!(f, "empty response"),
        }
    }
}

/// Terminal result of the retry controller for one slot
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// Raw generated text, not yet normalized or validated
    Generated(String),
    /// All retries consumed; `last_failure` distinguishes a fatal rate-limit
    /// exhaustion from an ordinary degraded slot
    Exhausted {
        last_failure: Option<ProviderFailure>,
    },
}

/// Row window and consecutive-error state for one batch run
#[derive(Debug, Clone)]
pub struct BatchCursor {
    pub start_row: u32,
    pub end_row: u32,
    pub consecutive_errors: u32,
}

impl BatchCursor {
    pub fn new(start_row: u32) -> Self {
        Self {
            start_row,
            end_row: start_row,
            consecutive_errors: 0,
        }
    }
}

/// Reason a batch stopped before reaching the end row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Run-control flag flipped to STOP
    Cancelled,
    /// A rate-limit error survived all retries
    RateLimitExhausted(String),
    /// Circuit breaker: too many Rejected/Errored slots in a row
    ConsecutiveErrors(u32),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "stopped by user"),
            StopReason::RateLimitExhausted(detail) => {
                write!(f, "rate limit exhausted after retries: {detail}")
            }
            StopReason::ConsecutiveErrors(count) => {
                write!(f, "too many consecutive errors ({count})")
            }
        }
    }
}

/// User-visible summary of one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub rows_scanned: u32,
    pub rows_processed: u32,
    pub slots_written: u32,
    pub slots_cleared: u32,
    pub stopped: Option<StopReason>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            started_at: Utc::now(),
            rows_scanned: 0,
            rows_processed: 0,
            slots_written: 0,
            slots_cleared: 0,
            stopped: None,
        }
    }

    /// True when the batch reached the end row without aborting.
    pub fn completed(&self) -> bool {
        self.stopped.is_none()
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_id_round_trips_through_strings() {
        for provider in [ProviderId::Groq, ProviderId::GoogleAi, ProviderId::OpenRouter] {
            assert_eq!(provider.as_str().parse::<ProviderId>(), Ok(provider));
        }
        assert!("grok".parse::<ProviderId>().is_err());
    }

    #[test]
    fn asset_type_ceilings() {
        assert_eq!(AssetType::parse("headline").unwrap().max_chars(), 30);
        assert_eq!(AssetType::parse("Long_Headline").unwrap().max_chars(), 60);
        assert_eq!(AssetType::parse("description").unwrap().max_chars(), 90);
        assert!(AssetType::parse("sitelink").is_none());
    }

    #[test]
    fn performance_label_is_case_sensitive() {
        assert_eq!(PerformanceLabel::parse("LOW"), PerformanceLabel::Low);
        assert_eq!(PerformanceLabel::parse("low"), PerformanceLabel::Unknown);
        assert_eq!(PerformanceLabel::parse("BEST"), PerformanceLabel::Best);
    }
}
