//! Photo portfolio: image listing, uploads and deletion over a pluggable
//! blob store.

pub mod disk;
pub mod memory;
pub mod upload;

use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SalonError};

pub use disk::DiskBlobStore;
pub use memory::MemoryBlobStore;
pub use upload::{MAX_FILE_SIZE, MAX_FILES, UploadedFile};

/// Public path prefix under which stored images are served.
pub const IMAGE_URL_PREFIX: &str = "/image";

/// A stored portfolio image as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioImage {
    pub filename: String,
    pub url: String,
}

impl PortfolioImage {
    pub fn new(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let url = format!("{IMAGE_URL_PREFIX}/{filename}");
        Self { filename, url }
    }
}

/// Byte storage keyed by filename.
///
/// `delete` must fail when the name is absent; `list` order is up to the
/// implementation.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Short backend name for logs (e.g. "disk", "memory").
    fn backend(&self) -> &'static str;

    async fn put(&self, name: &str, data: Vec<u8>) -> AnyResult<()>;

    async fn get(&self, name: &str) -> AnyResult<Option<Vec<u8>>>;

    async fn list(&self) -> AnyResult<Vec<String>>;

    async fn delete(&self, name: &str) -> AnyResult<()>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn BlobStore) {}
};

/// Whether `name` can address a single blob: no separators, no parent
/// references, no hidden files.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && !name.contains("..")
}

fn check_filename(name: &str) -> Result<()> {
    if is_safe_filename(name) {
        Ok(())
    } else {
        Err(SalonError::validation(format!("Invalid filename: {name:?}")))
    }
}

/// Portfolio operations exposed to the API layer.
#[derive(Clone)]
pub struct PortfolioService {
    blobs: Arc<dyn BlobStore>,
}

impl PortfolioService {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub fn backend(&self) -> &'static str {
        self.blobs.backend()
    }

    pub async fn list(&self) -> Result<Vec<PortfolioImage>> {
        let names = self.blobs.list().await?;
        Ok(names.into_iter().map(PortfolioImage::new).collect())
    }

    /// Store a batch of uploaded images.
    ///
    /// The batch is checked as a whole first; if a write fails part way,
    /// files already written for this batch are removed again.
    pub async fn upload(&self, files: Vec<UploadedFile>) -> Result<Vec<PortfolioImage>> {
        upload::check_batch(&files)?;

        let now = Utc::now();
        let mut stored: Vec<PortfolioImage> = Vec::with_capacity(files.len());
        for file in files {
            let filename = upload::unique_filename(&file, now);
            let size = file.data.len();
            if let Err(e) = self.blobs.put(&filename, file.data).await {
                self.rollback(&stored).await;
                return Err(SalonError::Storage(
                    e.context(format!("failed to store {filename}")),
                ));
            }
            info!(
                filename = %filename,
                original_name = file.original_name.as_deref().unwrap_or(""),
                size,
                "portfolio image stored"
            );
            stored.push(PortfolioImage::new(filename));
        }

        Ok(stored)
    }

    async fn rollback(&self, stored: &[PortfolioImage]) {
        for image in stored {
            if let Err(e) = self.blobs.delete(&image.filename).await {
                warn!(filename = %image.filename, error = %e, "failed to roll back upload");
            }
        }
    }

    /// Remove an image. A name that is not stored is a storage failure.
    pub async fn delete(&self, filename: &str) -> Result<()> {
        check_filename(filename)?;
        self.blobs.delete(filename).await?;
        info!(filename, "portfolio image deleted");
        Ok(())
    }

    /// Raw bytes of a stored image.
    pub async fn fetch(&self, filename: &str) -> Result<Vec<u8>> {
        check_filename(filename)?;
        self.blobs
            .get(filename)
            .await?
            .ok_or_else(|| SalonError::not_found(format!("Image {filename} not found")))
    }
}
