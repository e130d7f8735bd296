//! Storage module: S3 client and local directory upload

pub mod s3;
pub mod uploader;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub use s3::{S3Client, S3Config};
pub use uploader::upload_directory;

/// Result of an upload operation
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub bucket: String,
    pub key: String,
    pub size_bytes: u64,
}

/// Destination for uploaded files
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Unconditional put of a local file at `key`
    async fn put_file(&self, local_path: &Path, key: &str) -> Result<UploadResult>;
}
