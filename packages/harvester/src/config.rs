//! Configuration constants and validation functions for the harvester.

use std::time::Duration;

use crate::error::{HarvesterError, Result};

/// Default MediaWiki API endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "https://warhammer40k.fandom.com/api.php";

/// HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default politeness ceiling: about one request per second.
pub const DEFAULT_REQUESTS_PER_SEC: f64 = 1.0;

/// Maximum number of attempts for a single logical request.
pub const MAX_ATTEMPTS: u32 = 6;

/// Initial retry backoff.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(2);

/// Upper bound on the retry backoff.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// `maxlag` politeness parameter sent with every request (seconds).
pub const MAXLAG_SECS: u32 = 5;

/// Per-request page batch size for the `allpages` generator.
///
/// 500 is the API maximum for non-bot clients; 200 is the polite default.
pub const DEFAULT_BATCH_SIZE: u32 = 200;
pub const MAX_BATCH_SIZE: u32 = 500;

/// Maximum length of a generated filename slug, in characters.
pub const SLUG_MAX_LEN: usize = 100;

/// Fallback slug when a title normalizes to nothing.
pub const SLUG_FALLBACK: &str = "page";

/// Section headings that are always excluded from normalized output.
///
/// Matching is case-insensitive against the cleaned heading, by exact match
/// or by first word (so "Sources and Notes" is banned via "sources").
pub const BANNED_SECTIONS: &[&str] = &["contents", "videos", "sources", "gallery", "bibliography"];

/// Tunables for the rate-limited API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API endpoint URL (an `api.php` entry point).
    pub endpoint: String,
    /// Requests-per-second ceiling; the minimum inter-request gap is its
    /// reciprocal.
    pub requests_per_sec: f64,
    /// Attempt budget per logical request (first try included).
    pub max_attempts: u32,
    /// First retry delay; doubles on every further retry.
    pub initial_backoff: Duration,
    /// Backoff cap.
    pub max_backoff: Duration,
    /// Transport timeout per request.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_API_ENDPOINT.to_string(),
            requests_per_sec: DEFAULT_REQUESTS_PER_SEC,
            max_attempts: MAX_ATTEMPTS,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Create a config for a given endpoint, other settings at defaults.
    #[must_use]
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Minimum wall-clock gap between request starts.
    #[must_use]
    pub fn min_request_gap(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.requests_per_sec.max(0.01))
    }
}

/// Validate a requests-per-second ceiling.
///
/// # Examples
/// ```
/// use wikirag_harvester::config::validate_requests_per_sec;
///
/// assert!(validate_requests_per_sec(1.0).is_ok());
/// assert!(validate_requests_per_sec(0.0).is_err());
/// ```
pub fn validate_requests_per_sec(rps: f64) -> Result<()> {
    if rps.is_finite() && rps > 0.0 {
        Ok(())
    } else {
        Err(HarvesterError::InvalidConfig(format!(
            "requests per second must be a positive number, got {rps}"
        )))
    }
}

/// Validate an `allpages` batch size (1..=500 per the API limits).
pub fn validate_batch_size(batch_size: u32) -> Result<()> {
    if (1..=MAX_BATCH_SIZE).contains(&batch_size) {
        Ok(())
    } else {
        Err(HarvesterError::InvalidConfig(format!(
            "batch size must be between 1 and {MAX_BATCH_SIZE}, got {batch_size}"
        )))
    }
}
