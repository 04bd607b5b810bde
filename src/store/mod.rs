//! Remote object store seam.
//!
//! The sync engine only needs two operations from the blob service: list the
//! objects under a name prefix and fetch one object's bytes to a local path.
//! Everything else about the service (auth, paging, wire format) stays
//! behind this trait.

pub mod azure;
pub mod error;

use std::path::Path;

use async_trait::async_trait;

pub use azure::AzureBlobStore;
pub use error::StoreError;

/// A remote object as reported by a listing call: full hierarchical name
/// and size in bytes. Transient; nothing is persisted between listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub name: String,
    pub size: u64,
}

/// Listing and fetching against a blob container.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object whose name starts with `prefix`. Exhausts the full
    /// listing before returning; virtual directory markers (names with a
    /// trailing `/`) are excluded.
    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, StoreError>;

    /// Stream one object's full content to `dest`, overwriting. Returns the
    /// number of bytes written. A failure mid-transfer leaves a truncated
    /// file at `dest`; the next run re-downloads it on size mismatch.
    async fn fetch(&self, name: &str, dest: &Path) -> Result<u64, StoreError>;
}
