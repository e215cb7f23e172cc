use std::path::{Path, PathBuf};

use {estuary_common::types::MediaRef, tempfile::TempDir, tracing::debug, url::Url};

use crate::error::{Context, Error, Result};

/// A downloaded attachment scoped to one inbound event.
///
/// The backing temp directory is removed when this guard drops, on every
/// exit path including early returns and panicking handlers.
pub struct ScopedMedia {
    // Held only for its Drop impl.
    _dir: TempDir,
    path: PathBuf,
    mime_type: Option<String>,
}

impl ScopedMedia {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The attachment as the canonical media reference, with the MIME type
    /// the platform reported, if any.
    #[must_use]
    pub fn media_ref(&self) -> MediaRef {
        let media = MediaRef::new(self.path.to_string_lossy());
        match &self.mime_type {
            Some(mime) => media.with_mime(mime.as_str()),
            None => media,
        }
    }
}

/// Download `url` into a fresh temp directory and return the scoped guard.
///
/// Callers must keep the guard alive for as long as downstream handling
/// needs the file; the file disappears with the guard.
pub async fn download_to_temp(client: &reqwest::Client, url: &str) -> Result<ScopedMedia> {
    let dir = TempDir::new().context("create media temp dir")?;
    let filename = filename_from_url(url);
    let path = dir.path().join(filename);

    let response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| Error::external("download media", e))?;
    let mime_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::external("read media body", e))?;
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("write media file {}", path.display()))?;

    debug!(url, path = %path.display(), bytes = bytes.len(), "media downloaded");
    Ok(ScopedMedia {
        _dir: dir,
        path,
        mime_type,
    })
}

/// Derive a safe local filename from the URL's last path segment.
fn filename_from_url(url: &str) -> String {
    let last = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_owned))
        })
        .unwrap_or_default();
    let stem: String = last
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .take(64)
        .collect();
    if stem.is_empty() {
        "attachment.bin".to_owned()
    } else {
        stem
    }
}
