//! Portfolio images as plain files in one directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use super::BlobStore;

/// [`BlobStore`] over a directory. The directory is created on first write;
/// a missing directory lists as empty.
#[derive(Debug, Clone)]
pub struct DiskBlobStore {
    dir: PathBuf,
}

impl DiskBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    fn backend(&self) -> &'static str {
        "disk"
    }

    async fn put(&self, name: &str, data: Vec<u8>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create image directory {}", self.dir.display()))?;
        let path = self.path_of(name);
        fs::write(&path, data)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_of(name);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read image directory {}", self.dir.display())
                });
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .context("failed to read image directory entry")?
        {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_owned());
                }
            }
        }
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_of(name);
        fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to delete {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_directory_lists_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = DiskBlobStore::new(tmp.path().join("image"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn put_get_list_delete() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = DiskBlobStore::new(tmp.path().join("image"));

        store.put("a.jpg", vec![1, 2, 3]).await.unwrap();
        store.put("b.jpg", vec![4]).await.unwrap();
        std::fs::create_dir(store.dir().join("nested")).unwrap();
        std::fs::write(store.dir().join(".DS_Store"), b"x").unwrap();

        let mut names = store.list().await.unwrap();
        names.sort();
        assert_eq!(names, ["a.jpg", "b.jpg"]);

        assert_eq!(store.get("a.jpg").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.get("zzz.jpg").await.unwrap(), None);

        store.delete("a.jpg").await.unwrap();
        assert_eq!(store.list().await.unwrap(), ["b.jpg"]);
    }

    #[tokio::test]
    async fn delete_absent_file_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = DiskBlobStore::new(tmp.path());
        let err = store.delete("ghost.jpg").await.unwrap_err();
        assert!(
            format!("{err:#}").contains("failed to delete"),
            "unexpected error: {err:#}"
        );
    }
}
