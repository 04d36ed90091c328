//! Shared HTTP plumbing: client configuration, transport errors and bounded
//! retry with exponential backoff.
//!
//! Every remote call in this crate goes through [`retry`], so a flaky
//! endpoint is retried a fixed number of times and then reported as
//! [`TransportError::RetriesExhausted`] instead of looping forever.

use std::future::Future;
use std::io;
use std::time::Duration;

use reqwest::{Client, Response};
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "wikialign/0.1 (infobox alignment research)";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of attempts per request, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Transport-level errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description.
        message: String,
    },
    /// The request failed before a status was received.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        source: io::Error,
    },
    /// Every attempt failed with a retryable error.
    #[error("giving up on {url} after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Fully qualified request URL.
        url: String,
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        source: Box<TransportError>,
    },
}

impl TransportError {
    /// Whether another attempt might succeed.
    ///
    /// Rate limiting (429), server errors (5xx) and network failures are
    /// retryable; every other status is final.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || (*status >= 500 && *status <= 599),
            Self::Network { .. } => true,
            Self::RetriesExhausted { .. } => false,
        }
    }

    /// Error from the last attempt, looking through
    /// [`TransportError::RetriesExhausted`].
    #[must_use]
    pub fn last_attempt(&self) -> &Self {
        match self {
            Self::RetriesExhausted { source, .. } => source.last_attempt(),
            other => other,
        }
    }
}

/// Bounded retry schedule.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use wikialign_data::http::RetryPolicy;
///
/// let policy = RetryPolicy::default().with_max_attempts(3);
/// assert_eq!(policy.backoff(1), Duration::from_millis(500));
/// assert_eq!(policy.backoff(2), Duration::from_millis(1000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per request, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Override the number of attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Override the initial backoff.
    #[must_use]
    pub const fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Delay after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(2_u32.saturating_pow(exponent))
    }

    const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }
}

/// Client settings shared by every HTTP adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Retry schedule.
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpClientConfig {
    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the retry schedule.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build a `reqwest` client honouring the timeout and user agent.
    ///
    /// # Errors
    /// Returns [`ClientBuildError::HttpClient`] when the TLS backend cannot
    /// be initialised.
    pub fn build_client(&self) -> Result<Client, ClientBuildError> {
        Client::builder()
            .user_agent(&self.user_agent)
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .build()
            .map_err(ClientBuildError::HttpClient)
    }
}

/// Failures while constructing an HTTP adapter.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] io::Error),
}

/// Run `operation` until it succeeds, fails with a final error, or the
/// policy runs out of attempts.
///
/// # Errors
/// Returns the first non-retryable error unchanged, or
/// [`TransportError::RetriesExhausted`] wrapping the last retryable one.
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use std::time::Duration;
/// use wikialign_data::http::{RetryPolicy, TransportError, retry};
///
/// let calls = Cell::new(0);
/// let policy = RetryPolicy::default().with_initial_backoff(Duration::ZERO);
/// let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
/// let body = runtime.block_on(retry(&policy, "https://example.org", || {
///     calls.set(calls.get() + 1);
///     let attempt = calls.get();
///     async move {
///         if attempt < 3 {
///             Err(TransportError::Http { url: "https://example.org".into(), status: 503, message: String::new() })
///         } else {
///             Ok("ok")
///         }
///     }
/// }))?;
/// assert_eq!((body, calls.get()), ("ok", 3));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    url: &str,
    mut operation: F,
) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) if attempt >= attempts => {
                return Err(TransportError::RetriesExhausted {
                    url: url.to_owned(),
                    attempts,
                    source: Box::new(err),
                });
            }
            Err(err) => {
                let delay = policy.backoff(attempt);
                log::warn!("attempt {attempt}/{attempts} for {url} failed ({err}); retrying in {delay:?}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Fail on non-success statuses, keeping the request URL for context.
pub(crate) fn check_status(response: Response, url: &str) -> Result<Response, TransportError> {
    response
        .error_for_status()
        .map_err(|err| convert_reqwest_error(err, url))
}

/// Read the full response body.
pub(crate) async fn read_body(response: Response, url: &str) -> Result<Vec<u8>, TransportError> {
    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|err| convert_reqwest_error(err, url))
}

pub(crate) fn convert_reqwest_error(error: reqwest::Error, url: &str) -> TransportError {
    if let Some(status) = error.status() {
        return TransportError::Http {
            url: url.to_owned(),
            status: status.as_u16(),
            message: error.to_string(),
        };
    }

    let kind = if error.is_timeout() {
        io::ErrorKind::TimedOut
    } else {
        io::ErrorKind::Other
    };
    TransportError::Network {
        url: url.to_owned(),
        source: io::Error::new(kind, error),
    }
}

/// Trim trailing slashes, falling back to `default` for an empty URL.
pub(crate) fn sanitise_base_url(url: impl Into<String>, default: &str) -> String {
    let raw = url.into();
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        default.to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Build the current-thread runtime owned by a synchronous adapter.
pub(crate) fn build_runtime() -> Result<Runtime, ClientBuildError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ClientBuildError::Runtime)
}

/// Drive `future` to completion from synchronous code.
///
/// Inside a multi-threaded runtime the caller's handle is used through
/// `block_in_place`; otherwise (no runtime, or a current-thread one) the
/// adapter's own runtime runs the future.
pub(crate) fn block_on<F: Future>(runtime: &Runtime, future: F) -> F::Output {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(future))
        }
        _ => runtime.block_on(future),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::Cell;

    fn http_error(status: u16) -> TransportError {
        TransportError::Http {
            url: "https://example.org".to_owned(),
            status,
            message: String::new(),
        }
    }

    fn run<T>(future: impl Future<Output = T>) -> T {
        build_runtime().expect("runtime").block_on(future)
    }

    fn instant() -> RetryPolicy {
        RetryPolicy::default().with_initial_backoff(Duration::ZERO)
    }

    #[rstest]
    #[case(429, true)]
    #[case(500, true)]
    #[case(503, true)]
    #[case(404, false)]
    #[case(400, false)]
    fn classifies_statuses(#[case] status: u16, #[case] retryable: bool) {
        assert_eq!(http_error(status).is_retryable(), retryable);
    }

    #[rstest]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(3), Duration::from_millis(2000));
    }

    #[rstest]
    fn gives_up_after_max_attempts() {
        let calls = Cell::new(0_u32);
        let result: Result<(), _> = run(retry(&instant().with_max_attempts(3), "u", || {
            calls.set(calls.get() + 1);
            async { Err(http_error(503)) }
        }));

        assert_eq!(calls.get(), 3);
        let err = result.expect_err("retries exhausted");
        assert!(matches!(
            err,
            TransportError::RetriesExhausted { attempts: 3, .. }
        ));
        assert!(matches!(
            err.last_attempt(),
            TransportError::Http { status: 503, .. }
        ));
    }

    #[rstest]
    fn final_errors_are_not_retried() {
        let calls = Cell::new(0_u32);
        let result: Result<(), _> = run(retry(&instant(), "u", || {
            calls.set(calls.get() + 1);
            async { Err(http_error(404)) }
        }));

        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(TransportError::Http { status: 404, .. })));
    }

    #[rstest]
    fn network_errors_are_retried() {
        let calls = Cell::new(0_u32);
        let result = run(retry(&instant(), "u", || {
            calls.set(calls.get() + 1);
            let attempt = calls.get();
            async move {
                if attempt == 1 {
                    Err(TransportError::Network {
                        url: "u".to_owned(),
                        source: io::Error::other("reset"),
                    })
                } else {
                    Ok(attempt)
                }
            }
        }));
        assert_eq!(result.expect("second attempt succeeds"), 2);
    }

    #[rstest]
    fn zero_attempts_still_try_once() {
        let calls = Cell::new(0_u32);
        let _ = run(retry(&RetryPolicy::none().with_max_attempts(0), "u", || {
            calls.set(calls.get() + 1);
            async { Err::<(), _>(http_error(500)) }
        }));
        assert_eq!(calls.get(), 1);
    }

    #[rstest]
    #[case("https://query.wikidata.org/sparql/", "https://query.wikidata.org/sparql")]
    #[case("", "https://fallback.example")]
    fn sanitises_base_urls(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitise_base_url(raw, "https://fallback.example"), expected);
    }

    #[rstest]
    fn config_builder_pattern() {
        let config = HttpClientConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent/1.0")
            .with_retry(RetryPolicy::none());
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent/1.0");
        assert_eq!(config.retry.max_attempts, 1);
        assert!(config.build_client().is_ok());
    }
}
