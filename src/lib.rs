//! Policy-Harvester: a policy-site crawler with an idempotent local store
//!
//! This crate crawls the policy listing of a government policy website, turns
//! list and detail pages into typed [`Policy`] records, downloads their
//! attachments exactly once, and merges everything into a JSON-lines store
//! keyed by a natural deduplication key.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod storage;

use thiserror::Error;

/// Main error type for Policy-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Export error: {0}")]
    Export(#[from] output::ExportError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while talking to the crawled site
///
/// `Transport` and `Status` are transient and retried by the
/// [`RetryPolicy`](crawler::RetryPolicy); `Io` is a local disk failure and
/// is surfaced immediately.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl FetchError {
    /// Returns true if another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Status { .. })
    }
}

/// Result type alias for Policy-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{HttpClient, PolicyCrawl, RetryPolicy, SiteClient};
pub use model::{Attachment, ListItem, Policy, RegionLevel};
pub use storage::{JsonlRepository, PolicyKey, PolicyStore};
