//! Error types for the harvester.
//!
//! One enum covers the whole pipeline; the variants mirror the failure
//! taxonomy: transient failures are retried inside the HTTP client and only
//! surface here as `RetriesExhausted`, structured API errors are fatal for
//! the current call, and input problems are fatal for the whole run.

use thiserror::Error;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// HTTP transport failed in a non-retryable way.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a structured error object that is not retryable.
    #[error("API error [{code}]: {info}")]
    Api { code: String, info: String },

    /// All retry attempts for a single request were used up.
    #[error("Retries exhausted after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// A response arrived but did not carry the expected payload.
    #[error("Missing '{what}' payload in API response")]
    MissingPayload { what: &'static str },

    /// The page parsed successfully but produced no renderable content.
    #[error("Empty content for page {page_id}")]
    EmptyContent { page_id: u64 },

    /// The input file is structurally unusable (missing columns, no header).
    #[error("Invalid input file: {0}")]
    InvalidInput(String),

    /// A single input row could not be parsed.
    #[error("Invalid record on line {line}: {message}")]
    InvalidRecord { line: usize, message: String },

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding failed.
    #[error("JSON decoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML frontmatter serialization failed.
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HarvesterError {
    /// Whether this error aborts the whole run rather than a single page.
    ///
    /// Per-page failures are recorded in the failure log and the crawl
    /// moves on; run-fatal errors stop everything.
    #[must_use]
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::InvalidRecord { .. }
                | Self::InvalidConfig(_)
                | Self::Io(_)
        )
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
