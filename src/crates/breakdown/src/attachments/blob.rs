//! Blob storage for uploaded media

use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{AttachmentError, AttachmentResult};

/// Opaque file storage keyed by generated filenames
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Store `bytes` under a fresh filename and return it
    async fn put(&self, bytes: &[u8], extension: Option<&str>) -> AttachmentResult<String>;

    async fn exists(&self, filename: &str) -> AttachmentResult<bool>;

    /// Remove a blob. Removing a missing blob is not an error.
    async fn delete(&self, filename: &str) -> AttachmentResult<()>;

    /// Read a blob, `None` if it does not exist
    async fn get(&self, filename: &str) -> AttachmentResult<Option<Vec<u8>>>;
}

/// Generate a collision-improbable filename: `<millis>-<uuid><.ext>`
pub fn generate_filename(extension: Option<&str>) -> String {
    let stem = format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    );
    match extension {
        Some(ext) if !ext.is_empty() => format!("{}.{}", stem, ext),
        _ => stem,
    }
}

/// Reject anything that is not a single plain path component
pub fn validate_filename(filename: &str) -> AttachmentResult<()> {
    let valid = !filename.is_empty()
        && filename != "."
        && filename != ".."
        && !filename.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(AttachmentError::InvalidReference(filename.to_string()))
    }
}

/// Blob store writing files into a local directory
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the storage directory if needed
    pub async fn ensure_dir(&self) -> AttachmentResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, filename: &str) -> AttachmentResult<PathBuf> {
        validate_filename(filename)?;
        Ok(self.root.join(filename))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, bytes: &[u8], extension: Option<&str>) -> AttachmentResult<String> {
        let filename = generate_filename(extension);
        let path = self.path_for(&filename)?;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(file = %filename, size = bytes.len(), "stored blob");
        Ok(filename)
    }

    async fn exists(&self, filename: &str) -> AttachmentResult<bool> {
        let path = self.path_for(filename)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, filename: &str) -> AttachmentResult<()> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, filename: &str) -> AttachmentResult<Option<Vec<u8>>> {
        let path = self.path_for(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_filename() {
        let name = generate_filename(Some("jpg"));
        assert!(name.ends_with(".jpg"));
        assert!(validate_filename(&name).is_ok());
        assert_ne!(name, generate_filename(Some("jpg")));
        assert!(!generate_filename(None).contains('.'));
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("1700000000000-abc.png").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("a\\b").is_err());
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("uploads"));
        store.ensure_dir().await.unwrap();

        let name = store.put(b"photo", Some("png")).await.unwrap();
        assert!(store.exists(&name).await.unwrap());
        assert_eq!(store.get(&name).await.unwrap().unwrap(), b"photo");

        store.delete(&name).await.unwrap();
        assert!(!store.exists(&name).await.unwrap());
        assert!(store.get(&name).await.unwrap().is_none());

        // Already gone
        store.delete(&name).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        assert!(matches!(
            store.get("../secret").await,
            Err(AttachmentError::InvalidReference(_))
        ));
    }
}
