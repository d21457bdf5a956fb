//! Local filesystem backend

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{clean_relative_path, StorageError, TextStorage};

/// Stores every document as a file under `root`
#[derive(Debug, Clone)]
pub struct FileTextStorage {
    root: PathBuf,
}

impl FileTextStorage {
    /// Create the root directory if needed and resolve it to an absolute path
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(StorageError::Config("storage root is required".into()));
        }
        std::fs::create_dir_all(root)?;
        let root = std::fs::canonicalize(root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = clean_relative_path(path)?;
        Ok(self.root.join(relative))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, data).await?;
        debug!(path = %target.display(), bytes = data.len(), "Wrote file");
        Ok(())
    }
}

#[async_trait]
impl TextStorage for FileTextStorage {
    async fn save_text(&self, path: &str, text: &str) -> Result<(), StorageError> {
        self.write(path, text.as_bytes()).await
    }

    async fn save_binary(
        &self,
        path: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        self.write(path, &data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_text_creates_directories() {
        let dir = TempDir::new().unwrap();
        let storage = FileTextStorage::new(dir.path()).unwrap();

        storage
            .save_text("editedAchievementData/battle/dungeon.json", r#"{"ok":true}"#)
            .await
            .unwrap();

        let saved = std::fs::read_to_string(
            dir.path().join("editedAchievementData/battle/dungeon.json"),
        )
        .unwrap();
        assert_eq!(saved, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_save_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let storage = FileTextStorage::new(dir.path()).unwrap();

        storage.save_text("tag/tag.json", "[1]").await.unwrap();
        storage.save_text("tag/tag.json", "[2]").await.unwrap();

        let saved = std::fs::read_to_string(dir.path().join("tag/tag.json")).unwrap();
        assert_eq!(saved, "[2]");
    }

    #[tokio::test]
    async fn test_save_binary_writes_bytes() {
        let dir = TempDir::new().unwrap();
        let storage = FileTextStorage::new(dir.path()).unwrap();

        storage
            .save_binary(
                "achievementData/img/battle/dungeon/icon.png",
                Bytes::from_static(&[0x89, 0x50, 0x4e, 0x47]),
                "image/png",
            )
            .await
            .unwrap();

        let saved =
            std::fs::read(dir.path().join("achievementData/img/battle/dungeon/icon.png")).unwrap();
        assert_eq!(saved, vec![0x89, 0x50, 0x4e, 0x47]);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        let storage = FileTextStorage::new(&root).unwrap();

        let err = storage.save_text("../outside.json", "x").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
        assert!(!dir.path().join("outside.json").exists());
    }

    #[test]
    fn test_new_creates_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested/root");
        let storage = FileTextStorage::new(&root).unwrap();
        assert!(storage.root().is_dir());
    }
}
