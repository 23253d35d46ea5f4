use std::collections::BTreeMap;

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::BlobStore;

/// Process-local [`BlobStore`]. Lists names in lexical order.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, name: &str, data: Vec<u8>) -> Result<()> {
        self.blobs.write().await.insert(name.to_owned(), data);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().await.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.blobs.read().await.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        if self.blobs.write().await.remove(name).is_none() {
            bail!("no stored image named {name}");
        }
        Ok(())
    }
}
