//! Attachment resolution and download
//!
//! An attachment is stored under the download directory using the basename
//! of its URL path. A file already at that path is a cache hit and is never
//! fetched again. New downloads are streamed to a `.part` file and renamed
//! into place, so anything found at the target path is a complete file.

use crate::crawler::fetcher::HttpClient;
use crate::crawler::parser::url_basename;
use crate::model::Attachment;
use crate::FetchError;
use std::path::{Path, PathBuf};
use url::Url;

/// How an attachment's local copy was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded,
    Cached,
}

/// An attachment with `local_path` (and usually `mime_type`) filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttachment {
    pub attachment: Attachment,
    pub outcome: DownloadOutcome,
}

/// Computes the local file name for an attachment
///
/// Uses the URL path basename, or `<name>.bin` when the URL has none.
pub fn target_file_name(attachment: &Attachment) -> String {
    Url::parse(&attachment.url)
        .ok()
        .and_then(|url| url_basename(&url))
        .unwrap_or_else(|| format!("{}.bin", sanitize_file_name(&attachment.name)))
}

/// Computes the full local path for an attachment
pub fn target_path(attachment: &Attachment, download_dir: &Path) -> PathBuf {
    download_dir.join(target_file_name(attachment))
}

/// Makes sure `attachment` exists under `download_dir`
///
/// On a cache hit only the MIME type is backfilled (guessed from the file
/// name) when it is not already known. Otherwise the file is downloaded and
/// the MIME type is taken from the response's Content-Type.
pub async fn resolve_attachment(
    http: &HttpClient,
    mut attachment: Attachment,
    download_dir: &Path,
) -> Result<ResolvedAttachment, FetchError> {
    tokio::fs::create_dir_all(download_dir)
        .await
        .map_err(|source| FetchError::Io {
            path: download_dir.display().to_string(),
            source,
        })?;

    let target = target_path(&attachment, download_dir);

    let exists = tokio::fs::try_exists(&target)
        .await
        .map_err(|source| FetchError::Io {
            path: target.display().to_string(),
            source,
        })?;

    let outcome = if exists {
        tracing::debug!(
            "Attachment already exists, skipping download: {}",
            target.display()
        );
        if attachment.mime_type.is_none() {
            attachment.mime_type = guess_mime_type(&target);
        }
        DownloadOutcome::Cached
    } else {
        tracing::debug!("Downloading {} -> {}", attachment.url, target.display());
        let content_type = http.download_to(&attachment.url, &target).await?;
        attachment.mime_type = content_type.or(attachment.mime_type);
        DownloadOutcome::Downloaded
    };

    attachment.local_path = Some(target.to_string_lossy().into_owned());

    Ok(ResolvedAttachment {
        attachment,
        outcome,
    })
}

/// Guesses a MIME type from a file name's extension
pub fn guess_mime_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first().map(|mime| mime.to_string())
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}
