//! Durable storage for edited documents and scraped images
//!
//! Handlers only see the [`TextStorage`] trait. The backend is chosen
//! once at startup:
//!
//! - [`FileTextStorage`]: files under a local root directory
//! - [`GcsStorage`]: objects in a Cloud Storage bucket

pub mod gcs;
pub mod local;

pub use gcs::{GcsStorage, GcsUploader, MetadataTokenSource, ObjectUploader};
pub use local::FileTextStorage;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::config::{Args, StorageBackend};

pub const TEXT_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const DEFAULT_BINARY_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend refused the write for lack of permission
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("storage configuration error: {0}")]
    Config(String),
}

impl StorageError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

/// Write access to the document store
#[async_trait]
pub trait TextStorage: Send + Sync {
    /// Store a UTF-8 document at `path`, replacing any previous content
    async fn save_text(&self, path: &str, text: &str) -> Result<(), StorageError>;

    /// Store binary data at `path` with the given content type
    async fn save_binary(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;
}

/// Lexically clean a relative slash-separated path.
///
/// `.` segments and duplicate slashes are dropped and `..` is resolved.
/// A leading slash is ignored. Paths that resolve to nothing or climb
/// above the root are rejected.
pub fn clean_relative_path(path: &str) -> Result<String, StorageError> {
    if path.trim().is_empty() {
        return Err(StorageError::InvalidPath("path is required".into()));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(StorageError::InvalidPath(format!(
                        "{} escapes the storage root",
                        path
                    )));
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(StorageError::InvalidPath(format!(
            "{} does not name a file",
            path
        )));
    }
    Ok(segments.join("/"))
}

/// Build the storage backend selected by configuration
pub fn build_storage(args: &Args) -> Result<Arc<dyn TextStorage>, StorageError> {
    match args.storage_backend {
        StorageBackend::Local => Ok(Arc::new(FileTextStorage::new(&args.backend_save_root)?)),
        StorageBackend::Gcs => {
            let bucket = args.resources_bucket.trim();
            if bucket.is_empty() {
                return Err(StorageError::Config(
                    "FORFAN_RESOURCES_BUCKET is required for gcs storage".into(),
                ));
            }
            let uploader = GcsUploader::new(bucket, Arc::new(MetadataTokenSource::new()?))?;
            Ok(Arc::new(GcsStorage::new(
                Arc::new(uploader),
                &args.resources_prefix,
            )))
        }
    }
}
