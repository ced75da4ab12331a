use crate::model::RegionLevel;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A file referenced from a policy document
///
/// `url` is always absolute; the parser resolves relative links against the
/// page URL before constructing the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Display name (link text, alt text, or URL basename)
    pub name: String,

    /// Absolute remote URL
    pub url: String,

    /// Set once the file has been downloaded or found in the cache
    #[serde(default)]
    pub local_path: Option<String>,

    #[serde(default)]
    pub mime_type: Option<String>,

    // Filled by an exporter only
    #[serde(default)]
    pub drive_file_id: Option<String>,
    #[serde(default)]
    pub drive_view_url: Option<String>,
    #[serde(default)]
    pub drive_download_url: Option<String>,
}

impl Attachment {
    /// Creates an attachment that has not been downloaded yet
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            local_path: None,
            mime_type: None,
            drive_file_id: None,
            drive_view_url: None,
            drive_download_url: None,
        }
    }

    /// Returns true if the URL ends in a raster image extension
    pub fn is_image(&self) -> bool {
        let lower = self.url.to_ascii_lowercase();
        [".jpg", ".jpeg", ".png", ".gif", ".bmp"]
            .iter()
            .any(|ext| lower.ends_with(ext))
    }
}

/// A reference discovered on a list page
///
/// Never persisted. It only drives the detail fetch that follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    /// Opaque site identifier taken from the `id` query parameter
    pub article_id: String,
    pub title: String,
    /// Absolute detail page URL
    pub url: String,
    /// `None` when the list entry has no date or it failed to parse
    pub publish_date: Option<NaiveDate>,
}

/// The canonical crawled record
///
/// Serialized as one JSON object per line. Dates use `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// `"<site>-<article_id>"`
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub region_level: Option<RegionLevel>,
    #[serde(default)]
    pub publish_date: Option<NaiveDate>,
    #[serde(default)]
    pub site: Option<String>,
    pub source_url: String,
    #[serde(default)]
    pub content_html: Option<String>,
    #[serde(default)]
    pub content_text: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub google_doc_id: Option<String>,
    #[serde(default)]
    pub google_doc_url: Option<String>,
}

impl Policy {
    /// Returns the site tag, falling back to `default_site` when unset
    pub fn site_or<'a>(&'a self, default_site: &'a str) -> &'a str {
        self.site.as_deref().unwrap_or(default_site)
    }

    /// Returns true once an exporter has published this policy
    pub fn is_exported(&self) -> bool {
        self.google_doc_id.is_some()
    }
}
