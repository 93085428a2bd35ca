//! Rate-limited, retry-aware HTTP client for the MediaWiki API.
//!
//! Every request goes through [`ApiClient::get`], which enforces a minimum
//! wall-clock gap between request starts (politeness rate limit) and retries
//! transient failures with capped exponential backoff. Retryable conditions
//! are HTTP 429, any 5xx, transport timeout/connect errors, and the API's
//! `maxlag`/`ratelimited` error payloads; any other structured API error is
//! fatal for the current call.

use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::{ClientConfig, MAXLAG_SECS};
use crate::error::{HarvesterError, Result};

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("wikirag-harvester/", env!("CARGO_PKG_VERSION"));

/// Create a configured HTTP client.
pub fn create_client(config: &ClientConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(config.timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Enforces a minimum gap between the starts of consecutive requests.
///
/// Owned by one [`ApiClient`]; the limit is per client instance, not global.
#[derive(Debug)]
pub struct RateLimiter {
    min_gap: Duration,
    last_request_at: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter with the given minimum inter-request gap.
    #[must_use]
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_request_at: None,
        }
    }

    /// How much longer to wait before the next request may start.
    ///
    /// Returns `None` when a request may start immediately.
    #[must_use]
    pub fn gap_remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request_at?;
        self.min_gap
            .checked_sub(now.duration_since(last))
            .filter(|remaining| !remaining.is_zero())
    }

    /// Sleep out the remainder of the gap and mark a request as started.
    pub fn wait(&mut self) {
        if let Some(remaining) = self.gap_remaining(Instant::now()) {
            tracing::trace!(sleep_ms = remaining.as_millis() as u64, "Rate limit gap");
            thread::sleep(remaining);
        }
        self.last_request_at = Some(Instant::now());
    }
}

/// Capped exponential backoff schedule.
///
/// `next_delay` yields the current delay and doubles it for next time,
/// never exceeding the cap: 2s, 4s, 8s, ..., 60s, 60s, ...
#[derive(Debug)]
pub struct Backoff {
    delay: Duration,
    cap: Duration,
}

impl Backoff {
    /// Start a schedule at `initial`, capped at `cap`.
    #[must_use]
    pub fn new(initial: Duration, cap: Duration) -> Self {
        Self { delay: initial, cap }
    }

    /// The delay to sleep before the next retry.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.delay.min(self.cap);
        self.delay = (current * 2).min(self.cap);
        current
    }
}

/// How a response (or transport error) should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// Usable response; hand the payload to the caller.
    Ok,
    /// Transient failure; sleep the backoff and retry.
    Retry(String),
    /// Server-signaled throttle; retry with a jittered backoff.
    RetryJittered(String),
    /// Structured API error that retrying will not fix.
    Fatal { code: String, info: String },
}

/// Classify an HTTP status code: 429 and 5xx are transient.
pub(crate) fn classify_status(status: StatusCode) -> Disposition {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Disposition::Retry(format!("HTTP {status}"))
    } else {
        Disposition::Ok
    }
}

/// Classify a decoded API payload.
///
/// A `maxlag` (or `ratelimited`) error object is the API asking us to back
/// off; any other error object is fatal for this call.
pub(crate) fn classify_payload(payload: &Value) -> Disposition {
    let Some(error) = payload.get("error") else {
        return Disposition::Ok;
    };
    let code = error
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let info = error
        .get("info")
        .and_then(Value::as_str)
        .unwrap_or("no details");

    match code {
        "maxlag" | "ratelimited" => Disposition::RetryJittered(format!("API throttle: {code}")),
        _ => Disposition::Fatal {
            code: code.to_string(),
            info: info.to_string(),
        },
    }
}

/// Random backoff addend for server-signaled throttles, in [0, 1s).
fn jitter() -> Duration {
    Duration::from_secs_f64(rand::rng().random_range(0.0..1.0))
}

/// Outcome of one request attempt inside the retry loop.
enum AttemptOutcome {
    Success(Value),
    Transient { reason: String, jittered: bool },
    Fatal(HarvesterError),
}

/// Blocking MediaWiki API client with politeness rate limiting and retries.
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
    limiter: RateLimiter,
}

impl ApiClient {
    /// Build a client for the configured endpoint.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = create_client(&config)?;
        let limiter = RateLimiter::new(config.min_request_gap());
        Ok(Self {
            http,
            config,
            limiter,
        })
    }

    /// The API endpoint this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Issue a GET against the API and decode the JSON response.
    ///
    /// `format=json`, `formatversion=2` and the `maxlag` politeness hint are
    /// merged into every request. Transient failures are retried with
    /// backoff up to the configured attempt budget; exhaustion surfaces as
    /// [`HarvesterError::RetriesExhausted`].
    pub fn get(&mut self, params: &[(&str, String)]) -> Result<Value> {
        let maxlag = MAXLAG_SECS.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("format", "json"),
            ("formatversion", "2"),
            ("maxlag", maxlag.as_str()),
        ];
        query.extend(params.iter().map(|(k, v)| (*k, v.as_str())));

        let mut backoff = Backoff::new(self.config.initial_backoff, self.config.max_backoff);
        let mut last_error = String::new();

        for attempt in 1..=self.config.max_attempts {
            self.limiter.wait();
            tracing::debug!(attempt, endpoint = %self.config.endpoint, "API request");

            let (reason, jittered) = match self.try_once(&query) {
                AttemptOutcome::Success(payload) => return Ok(payload),
                AttemptOutcome::Fatal(err) => return Err(err),
                AttemptOutcome::Transient { reason, jittered } => (reason, jittered),
            };
            last_error = reason;

            // No point sleeping when no attempt follows.
            if attempt == self.config.max_attempts {
                break;
            }

            let mut delay = backoff.next_delay();
            if jittered {
                delay += jitter();
            }
            tracing::warn!(
                attempt,
                max_attempts = self.config.max_attempts,
                delay_ms = delay.as_millis() as u64,
                reason = %last_error,
                "Transient failure, will retry"
            );
            thread::sleep(delay);
        }

        Err(HarvesterError::RetriesExhausted {
            attempts: self.config.max_attempts,
            message: last_error,
        })
    }

    /// One request attempt: send, classify the status, decode, classify the
    /// payload.
    fn try_once(&self, query: &[(&str, &str)]) -> AttemptOutcome {
        let response = match self.http.get(&self.config.endpoint).query(query).send() {
            Ok(response) => response,
            Err(e) if e.is_timeout() || e.is_connect() => {
                return AttemptOutcome::Transient {
                    reason: format!("Connection error: {e}"),
                    jittered: false,
                };
            }
            Err(e) => return AttemptOutcome::Fatal(HarvesterError::Http(e)),
        };

        if let Disposition::Retry(reason) = classify_status(response.status()) {
            return AttemptOutcome::Transient {
                reason,
                jittered: false,
            };
        }

        let payload = match response.json::<Value>() {
            Ok(payload) => payload,
            // A non-JSON body behind a healthy status is almost always an
            // intermediary hiccup; retry it.
            Err(e) => {
                return AttemptOutcome::Transient {
                    reason: format!("JSON decode failed: {e}"),
                    jittered: false,
                };
            }
        };

        match classify_payload(&payload) {
            Disposition::Ok => AttemptOutcome::Success(payload),
            Disposition::RetryJittered(reason) => AttemptOutcome::Transient {
                reason,
                jittered: true,
            },
            Disposition::Retry(reason) => AttemptOutcome::Transient {
                reason,
                jittered: false,
            },
            Disposition::Fatal { code, info } => {
                AttemptOutcome::Fatal(HarvesterError::Api { code, info })
            }
        }
    }
}
