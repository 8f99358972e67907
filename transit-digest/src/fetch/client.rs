//! HTTP fetcher with retries and content validation.
//!
//! Downloads go straight to their local artifact path. A download only
//! counts as successful once the caller's validator accepts the written
//! file; otherwise it is retried up to the configured attempt count.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::FetchError;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Pause before the first retry. Doubles on each later retry.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Upper bound on the pause between attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(8);

/// User-Agent string for source requests.
const USER_AGENT: &str = concat!("transit-digest/", env!("CARGO_PKG_VERSION"));

/// Checks a downloaded artifact before it is accepted.
pub type Validator = fn(&Path) -> bool;

/// Downloads a remote artifact to a local path.
///
/// This abstraction lets the builders and the schedule pipeline run
/// against canned pages in tests.
pub trait Fetcher: Send + Sync {
    /// Fetch `uri` into `dest`, succeeding only once `validate` passes.
    fn fetch(
        &self,
        uri: &str,
        dest: &Path,
        validate: Validator,
    ) -> impl Future<Output = Result<(), FetchError>> + Send;
}

/// Accepts any file that exists and is not empty.
pub fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Create the parent directory of `path` if needed.
pub(crate) async fn ensure_parent(path: &Path) -> Result<(), FetchError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FetchError::io(parent, e))?;
    }
    Ok(())
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Attempts per artifact before giving up
    pub max_attempts: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Pause before the first retry
    pub retry_delay: Duration,
}

impl FetcherConfig {
    /// Create a config with the given attempt bound.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// How often and how patiently a download is retried.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Pause before `attempt`; nothing before the first one.
    fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u32 << (attempt - 2).min(4);
        self.delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
    }
}

/// Run `download` until `validate` accepts `dest` or attempts run out.
///
/// Returns the error of the last attempt when none succeeds.
async fn fetch_with_retries<D, Fut>(
    policy: RetryPolicy,
    uri: &str,
    dest: &Path,
    validate: Validator,
    mut download: D,
) -> Result<(), FetchError>
where
    D: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(), FetchError>>,
{
    let mut last_error = None;
    for attempt in 1..=policy.max_attempts {
        let pause = policy.delay_before(attempt);
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        match download(attempt).await {
            Ok(()) if validate(dest) => {
                debug!(%uri, path = ?dest, attempt, "downloaded");
                return Ok(());
            }
            Ok(()) => {
                warn!(%uri, path = ?dest, attempt, "downloaded content failed validation");
                last_error = Some(FetchError::Invalid {
                    path: dest.to_path_buf(),
                    attempts: attempt,
                });
            }
            Err(e) => {
                warn!(%uri, attempt, error = %e, "download attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(FetchError::Invalid {
        path: dest.to_path_buf(),
        attempts: 0,
    }))
}

/// Fetcher over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            retry: RetryPolicy {
                max_attempts: config.max_attempts.max(1),
                delay: config.retry_delay,
            },
        })
    }

    async fn download(&self, url: reqwest::Url, dest: &Path) -> Result<(), FetchError> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                uri: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        tokio::fs::write(dest, &body)
            .await
            .map_err(|e| FetchError::io(dest, e))
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, uri: &str, dest: &Path, validate: Validator) -> Result<(), FetchError> {
        let url = reqwest::Url::parse(uri).map_err(|e| FetchError::InvalidAddress {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(uri.to_string()));
        }

        ensure_parent(dest).await?;
        fetch_with_retries(self.retry, uri, dest, validate, |_| {
            self.download(url.clone(), dest)
        })
        .await
    }
}
