//! Attachment management
//!
//! Uploaded media is written to a [`BlobStore`] and referenced from a stage
//! form by a public URL (`<prefix>/<filename>`). Removal is best-effort: a
//! blob that is already gone is not an error.

use std::sync::Arc;
use thiserror::Error;

pub mod blob;

pub use blob::{BlobStore, LocalBlobStore};

/// Errors raised while storing or reading attachments
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Invalid attachment reference: {0}")]
    InvalidReference(String),

    #[error("Attachment I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type AttachmentResult<T> = std::result::Result<T, AttachmentError>;

/// An uploaded file
#[derive(Debug, Clone, Default)]
pub struct Upload {
    /// Name supplied by the client
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: Option<String>, bytes: Vec<u8>) -> Self {
        Self { file_name, bytes }
    }

    /// Lowercased alphanumeric extension of the client filename
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        let (_, ext) = name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext)
    }
}

/// Associates uploads with stage data
#[derive(Clone)]
pub struct AttachmentManager {
    blobs: Arc<dyn BlobStore>,
    public_prefix: String,
}

impl AttachmentManager {
    pub fn new(blobs: Arc<dyn BlobStore>, public_prefix: impl Into<String>) -> Self {
        let prefix = public_prefix.into();
        Self {
            blobs,
            public_prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Prefix under which media references are published
    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Public URL for a stored filename
    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.public_prefix, filename)
    }

    /// Filename referenced by a public URL
    pub fn filename_of<'a>(&self, url: &'a str) -> Option<&'a str> {
        let filename = url.strip_prefix(self.public_prefix.as_str())?.strip_prefix('/')?;
        blob::validate_filename(filename).ok()?;
        Some(filename)
    }

    /// Store an upload and return its public URL
    pub async fn store(&self, upload: &Upload) -> AttachmentResult<String> {
        let ext = upload.extension();
        let filename = self.blobs.put(&upload.bytes, ext.as_deref()).await?;
        Ok(self.url_for(&filename))
    }

    /// Remove the blob behind `url` if it exists
    ///
    /// Never fails: problems are logged. Returns whether a blob was removed.
    pub async fn discard(&self, url: &str) -> bool {
        let Some(filename) = self.filename_of(url) else {
            tracing::warn!(url, "not a managed attachment, skipping removal");
            return false;
        };

        match self.blobs.exists(filename).await {
            Ok(false) => false,
            Ok(true) => match self.blobs.delete(filename).await {
                Ok(()) => {
                    tracing::debug!(file = filename, "removed attachment");
                    true
                }
                Err(e) => {
                    tracing::warn!(file = filename, error = %e, "failed to remove attachment");
                    false
                }
            },
            Err(e) => {
                tracing::warn!(file = filename, error = %e, "failed to check attachment");
                false
            }
        }
    }

    /// Remove every blob in `urls`, returning how many were removed
    pub async fn discard_all<'a, I>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        // Owned before the first await so borrowing adapters never live in the future.
        let urls: Vec<String> = urls.into_iter().map(str::to_string).collect();
        let mut removed = 0;
        for url in &urls {
            if self.discard(url).await {
                removed += 1;
            }
        }
        removed
    }

    /// Read a stored file by filename
    pub async fn read(&self, filename: &str) -> AttachmentResult<Option<Vec<u8>>> {
        self.blobs.get(filename).await
    }

    /// Whether the blob behind `url` exists
    pub async fn exists(&self, url: &str) -> AttachmentResult<bool> {
        match self.filename_of(url) {
            Some(filename) => self.blobs.exists(filename).await,
            None => Err(AttachmentError::InvalidReference(url.to_string())),
        }
    }
}
