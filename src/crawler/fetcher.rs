//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the site's fixed header set
//! - GET requests for list and detail pages
//! - Streaming attachment downloads to disk
//! - Retry with exponential backoff and jitter
//! - Redirect following

use crate::config::HttpConfig;
use crate::FetchError;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, DNT, PRAGMA,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::{redirect::Policy, Client, Response};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36 Edg/141.0.0.0";

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,\
     image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

const MAX_REDIRECTS: usize = 10;

/// Bounded-attempt retry with exponential backoff and random jitter
///
/// The delay before attempt `n + 1` is
/// `min(initial_backoff * 2^(n - 1), max_backoff) + uniform(0, jitter)`.
///
/// | Condition | Action |
/// |-----------|--------|
/// | Transport error (timeout, connect, body) | Retry |
/// | Any non-2xx status | Retry |
/// | Local disk error | Fail immediately |
///
/// After the last attempt the last error is returned unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            jitter: Duration::from_millis(config.jitter_ms),
        }
    }

    /// A policy that retries without sleeping
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Returns the delay to wait after the given (1-based) failed attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let exponential = self
            .initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff);

        if self.jitter.is_zero() {
            exponential
        } else {
            let fraction: f64 = rand::thread_rng().gen();
            exponential + self.jitter.mul_f64(fraction)
        }
    }

    /// Runs `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent
    pub async fn run<T, F, Fut>(&self, url: &str, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        url,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Retrying HTTP client shared by list, detail, and attachment requests
///
/// Construct one per crawl; dropping it releases the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Builds a client from the HTTP configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use policy_harvester::config::HttpConfig;
    /// use policy_harvester::crawler::HttpClient;
    ///
    /// let client = HttpClient::new(&HttpConfig::default()).unwrap();
    /// ```
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Self::with_retry(config, RetryPolicy::from_config(config))
    }

    /// Builds a client with an explicit retry policy
    pub fn with_retry(config: &HttpConfig, retry: RetryPolicy) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self { client, retry })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetches a page body as text
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.retry
            .run(url, || async move {
                let response = self.send_checked(url).await?;
                response.text().await.map_err(|source| FetchError::Transport {
                    url: url.to_string(),
                    source,
                })
            })
            .await
    }

    /// Opens a streaming response; the body is read by the caller
    pub async fn stream(&self, url: &str) -> Result<Response, FetchError> {
        self.retry.run(url, || self.send_checked(url)).await
    }

    /// Streams `url` into `target` and returns the response Content-Type
    ///
    /// Bytes go to `<target>.part` first and are renamed into place only
    /// after the whole body has been written, so an interrupted download
    /// never leaves a file at `target`. Each retry restarts the body.
    pub async fn download_to(&self, url: &str, target: &Path) -> Result<Option<String>, FetchError> {
        let partial = partial_path(target);
        let partial_ref = partial.as_path();

        let result = self
            .retry
            .run(url, || self.stream_to_file(url, partial_ref))
            .await;

        match result {
            Ok(content_type) => {
                tokio::fs::rename(&partial, target)
                    .await
                    .map_err(|source| io_error(target, source))?;
                Ok(content_type)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    tracing::debug!("No partial file to remove at {}: {}", partial.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    async fn send_checked(&self, url: &str) -> Result<Response, FetchError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn stream_to_file(&self, url: &str, path: &Path) -> Result<Option<String>, FetchError> {
        let mut response = self.send_checked(url).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|source| io_error(path, source))?;

        while let Some(chunk) = response.chunk().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })? {
            file.write_all(&chunk)
                .await
                .map_err(|source| io_error(path, source))?;
        }

        file.flush().await.map_err(|source| io_error(path, source))?;

        Ok(content_type)
    }
}

/// Builds the underlying reqwest client
///
/// Redirects are followed (up to 10 hops) and the fixed browser-like header
/// set is attached to every request.
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .default_headers(default_headers())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn io_error(path: &Path, source: std::io::Error) -> FetchError {
    FetchError::Io {
        path: path.display().to_string(),
        source,
    }
}
