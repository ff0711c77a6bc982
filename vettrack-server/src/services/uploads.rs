//! Storage for uploaded images
//!
//! Files land in the root folder's `uploads/` directory as
//! `<uuid>_<sanitized name>` and are served back under `/uploads/`.

use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;
use vettrack_common::Result;

/// URL prefix the router serves the upload directory under
pub const UPLOADS_URL_PREFIX: &str = "uploads";

const FALLBACK_FILE_NAME: &str = "upload";
const MAX_NAME_LEN: usize = 100;

/// A file written to the upload directory
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUpload {
    pub file_name: String,
    /// Relative URL (`uploads/<file_name>`)
    pub url: String,
}

/// Reduce a client-supplied file name to a safe basename
///
/// Path components are dropped, whitespace becomes `_`, anything outside
/// `[A-Za-z0-9._-]` is removed and leading dots are stripped.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(&['/', '\\'][..]).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return FALLBACK_FILE_NAME.to_string();
    }

    cleaned.chars().take(MAX_NAME_LEN).collect()
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under a fresh unique name derived from `original_name`
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<StoredUpload> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(original_name));
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        info!(file = %file_name, bytes = bytes.len(), "Stored upload");

        Ok(StoredUpload {
            url: format!("{}/{}", UPLOADS_URL_PREFIX, file_name),
            file_name,
        })
    }
}
