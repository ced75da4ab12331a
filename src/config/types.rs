use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Policy-Harvester
///
/// Every section has defaults, so an empty file (or no file) is valid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// The crawled site
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root URL the list and detail paths are resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Category whose listing is crawled
    #[serde(rename = "category-id")]
    pub category_id: u32,

    /// Source identifier stored on every policy and used in its id
    pub tag: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://www.zxkc.org.cn".to_string(),
            category_id: 2,
            tag: "zxkc".to_string(),
        }
    }
}

/// HTTP client behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Total attempts per request, including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt (milliseconds)
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on the exponential part of the backoff (milliseconds)
    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,

    /// Upper bound on the random jitter added to each backoff (milliseconds)
    #[serde(rename = "jitter-ms")]
    pub jitter_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            connect_timeout_secs: 10,
            max_attempts: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
            jitter_ms: 1_000,
        }
    }
}

/// Local storage locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `policies.jsonl`
    pub root: PathBuf,

    /// Directory attachments are downloaded into
    #[serde(rename = "download-dir")]
    pub download_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/policies_npc"),
            download_dir: PathBuf::from("data/policies_npc/attachments"),
        }
    }
}

/// Document export settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Where exported documents are written; export is unavailable when unset
    #[serde(rename = "output-dir")]
    pub output_dir: Option<PathBuf>,
}
