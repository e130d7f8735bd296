//! S3 client for uploading exported files

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;

use super::{ObjectStore, UploadResult};

/// Credentials and destination bucket for uploads
#[derive(Debug, Clone, Default)]
pub struct S3Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
}

/// S3 client bound to a single bucket
pub struct S3Client {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client with static credentials
    pub async fn new(config: &S3Config) -> Result<Self> {
        // Trim whitespace from credentials (common copy-paste issue)
        let access_key = config.access_key_id.trim();
        let secret_key = config.secret_access_key.trim();

        tracing::info!(
            "Creating S3 client: bucket={}, region={}, access_key={}...",
            config.bucket,
            config.region,
            access_key.chars().take(8).collect::<String>()
        );

        let creds = Credentials::new(access_key, secret_key, None, None, "static");

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.trim().to_string()))
            .credentials_provider(creds)
            .load()
            .await;

        Ok(Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: config.bucket.trim().to_string(),
        })
    }

    /// Get bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put_file(&self, local_path: &Path, key: &str) -> Result<UploadResult> {
        let body = ByteStream::from_path(local_path)
            .await
            .with_context(|| format!("Error reading {} for upload", local_path.display()))?;

        let size_bytes = local_path.metadata().map(|m| m.len()).unwrap_or(0);

        tracing::info!("Uploading {} to s3://{}/{}", local_path.display(), self.bucket, key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 upload error details: {:?}", e);
                anyhow::anyhow!(
                    "Error uploading to S3 bucket='{}' key='{}': {}",
                    self.bucket,
                    key,
                    e
                )
            })?;

        Ok(UploadResult {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_trims_bucket() {
        let config = S3Config {
            access_key_id: " AKIAEXAMPLEKEY ".to_string(),
            secret_access_key: "secret\n".to_string(),
            region: "eu-west-1 ".to_string(),
            bucket: " data-lake ".to_string(),
        };

        let client = S3Client::new(&config).await.unwrap();
        assert_eq!(client.bucket(), "data-lake");
    }
}
