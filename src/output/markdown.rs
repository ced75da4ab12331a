//! Local Markdown exporter
//!
//! Publishes each policy as a Markdown document under the configured output
//! directory and copies its downloaded attachments next to it.
//!
//! # Layout
//!
//! | Path | Content |
//! |------|---------|
//! | `<output-dir>/<id>.md` | The policy document |
//! | `<output-dir>/files/<id>/<file>` | Copies of downloaded attachments |

use crate::config::ExportConfig;
use crate::model::{Attachment, Policy};
use crate::output::traits::{ExportError, ExportOutcome, ExportResult, Exporter};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use url::Url;

/// Maximum length, in characters, of a document title
pub const MAX_TITLE_CHARS: usize = 300;

const UNKNOWN_DATE: &str = "未知";
const DEFAULT_SOURCE: &str = "中小科创";

/// Exporter writing Markdown documents to a local directory
#[derive(Debug, Clone)]
pub struct MarkdownExporter {
    output_dir: PathBuf,
}

impl MarkdownExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Builds the exporter from the `[export]` section
    ///
    /// # Returns
    ///
    /// * `Ok(MarkdownExporter)` - `output-dir` is set
    /// * `Err(ExportError::NotConfigured)` - `output-dir` is missing
    pub fn from_config(config: &ExportConfig) -> ExportOutcome<Self> {
        config
            .output_dir
            .as_ref()
            .map(|dir| Self::new(dir.clone()))
            .ok_or_else(|| ExportError::NotConfigured("[export] output-dir is not set".to_string()))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn copy_attachments(&self, policy: &Policy, doc_id: &str) -> ExportOutcome<Vec<Attachment>> {
        let files_dir = self.output_dir.join("files").join(doc_id);
        let mut exported = Vec::new();

        for attachment in &policy.attachments {
            let Some(local) = attachment.local_path.as_deref().map(Path::new) else {
                continue;
            };
            if !local.is_file() {
                tracing::debug!("Attachment {} has no local file, not copied", attachment.url);
                continue;
            }

            let Some(file_name) = local.file_name() else {
                continue;
            };
            std::fs::create_dir_all(&files_dir)?;
            let copy = files_dir.join(file_name);
            std::fs::copy(local, &copy)?;

            let file_url = file_url(&copy)?;
            let relative = Path::new("files").join(doc_id).join(file_name);

            let mut updated = attachment.clone();
            updated.drive_file_id = Some(relative.to_string_lossy().into_owned());
            updated.drive_view_url = Some(file_url.clone());
            updated.drive_download_url = Some(file_url);
            exported.push(updated);
        }

        Ok(exported)
    }
}

#[async_trait]
impl Exporter for MarkdownExporter {
    async fn export(&self, policy: &Policy) -> ExportOutcome<ExportResult> {
        std::fs::create_dir_all(&self.output_dir)?;

        let doc_id = document_id(&policy.id);
        let attachments = self.copy_attachments(policy, &doc_id)?;

        let doc_path = self.output_dir.join(format!("{}.md", doc_id));
        std::fs::write(&doc_path, render_document(policy))?;
        tracing::debug!("Exported {} to {}", policy.id, doc_path.display());

        Ok(ExportResult {
            document_id: doc_id,
            document_url: file_url(&doc_path)?,
            attachments,
        })
    }
}

/// Builds the document title: `"<date> <title>"`, capped at 300 characters
pub fn document_title(policy: &Policy) -> String {
    let date = policy
        .publish_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let title = format!("{} {}", date, policy.title.trim());
    title.trim().chars().take(MAX_TITLE_CHARS).collect()
}

/// Renders the full Markdown document for a policy
pub fn render_document(policy: &Policy) -> String {
    let date = policy
        .publish_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());

    let mut md = String::new();
    md.push_str(&format!("# {}\n\n", document_title(policy)));
    md.push_str(&format!("{}\n", policy.title.trim()));
    md.push_str(&format!("发布日期：{}\n", date));
    md.push_str(&format!("来源：{}\n", policy.site_or(DEFAULT_SOURCE)));
    md.push_str(&format!("原始链接：{}\n\n", policy.source_url));

    if let Some(text) = policy.content_text.as_deref() {
        md.push_str(text.trim());
        md.push('\n');
    }

    if !policy.attachments.is_empty() {
        md.push_str("\n附件：\n");
        for attachment in &policy.attachments {
            md.push_str(&format!("- {}: {}\n", attachment.name, attachment.url));
        }
    }

    md
}

/// Makes a policy id safe to use as a file stem
fn document_id(policy_id: &str) -> String {
    policy_id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn file_url(path: &Path) -> ExportOutcome<String> {
    let absolute = path.canonicalize()?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|_| ExportError::Failed(format!("cannot build file URL for {}", absolute.display())))
}
