//! Object storage for todo attachments.
//!
//! Objects are keyed by todo id. Clients upload directly to the store through
//! a presigned URL, and the public download URL is derived from the key alone
//! so it can be recorded on the item without a round trip.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use opendal::{Operator, services};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage configuration error: {0}")]
    Configuration(String),

    #[error("presign operation not supported by storage provider")]
    PresignNotSupported,

    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::Unsupported => Self::PresignNotSupported,
            _ => Self::Operation(err.to_string()),
        }
    }
}

/// Settings for the S3-compatible attachment bucket.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub endpoint: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Base for download URLs; defaults to the bucket's virtual-host address.
    pub public_base_url: Option<String>,
    /// Lifetime of presigned upload URLs in seconds.
    pub upload_ttl_secs: u64,
}

impl StorageConfig {
    pub const DEFAULT_ENDPOINT: &'static str = "https://s3.amazonaws.com";
    pub const DEFAULT_REGION: &'static str = "us-east-1";
    pub const DEFAULT_UPLOAD_TTL: u64 = 300;

    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            region: Self::DEFAULT_REGION.to_string(),
            access_key_id: None,
            secret_access_key: None,
            public_base_url: None,
            upload_ttl_secs: Self::DEFAULT_UPLOAD_TTL,
        }
    }

    pub fn download_base_url(&self) -> String {
        match &self.public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}.s3.amazonaws.com", self.bucket),
        }
    }
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Short-lived URL the client can PUT the object to. No ownership check happens here.
    async fn upload_url(&self, todo_id: &str) -> Result<String, StorageError>;

    /// Stable public URL of the object stored for `todo_id`.
    fn download_url(&self, todo_id: &str) -> String;

    async fn remove(&self, todo_id: &str) -> Result<(), StorageError>;
}

pub struct S3AttachmentStore {
    operator: Operator,
    download_base_url: String,
    upload_ttl: Duration,
}

impl S3AttachmentStore {
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut builder = services::S3::default()
            .bucket(&config.bucket)
            .endpoint(&config.endpoint)
            .region(&config.region);

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder.access_key_id(key_id).secret_access_key(secret);
        }

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::Configuration(e.to_string()))?
            .finish();

        Ok(Self {
            operator,
            download_base_url: config.download_base_url(),
            upload_ttl: Duration::from_secs(config.upload_ttl_secs),
        })
    }
}

#[async_trait]
impl AttachmentStore for S3AttachmentStore {
    async fn upload_url(&self, todo_id: &str) -> Result<String, StorageError> {
        let presigned = self.operator.presign_write(todo_id, self.upload_ttl).await?;
        debug!(todo_id, ttl = ?self.upload_ttl, "presigned attachment upload");
        Ok(presigned.uri().to_string())
    }

    fn download_url(&self, todo_id: &str) -> String {
        format!("{}/{}", self.download_base_url, todo_id)
    }

    async fn remove(&self, todo_id: &str) -> Result<(), StorageError> {
        self.operator.delete(todo_id).await?;
        Ok(())
    }
}

/// In-process store that hands out URLs under a fixed base and records removals.
pub struct MemoryAttachmentStore {
    base_url: String,
    removed: Mutex<Vec<String>>,
}

impl MemoryAttachmentStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn upload_url(&self, todo_id: &str) -> Result<String, StorageError> {
        Ok(format!("{}/uploads/{}", self.base_url, todo_id))
    }

    fn download_url(&self, todo_id: &str) -> String {
        format!("{}/attachments/{}", self.base_url, todo_id)
    }

    async fn remove(&self, todo_id: &str) -> Result<(), StorageError> {
        self.removed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(todo_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s3_config() -> StorageConfig {
        let mut config = StorageConfig::new("todo-attachments");
        config.access_key_id = Some("AKIDEXAMPLE".to_string());
        config.secret_access_key = Some("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string());
        config
    }

    #[test]
    fn test_download_url_defaults_to_bucket_host() {
        let store = S3AttachmentStore::from_config(&s3_config()).unwrap();
        assert_eq!(
            store.download_url("abc-123"),
            "https://todo-attachments.s3.amazonaws.com/abc-123"
        );
    }

    #[test]
    fn test_download_url_uses_public_base() {
        let mut config = s3_config();
        config.public_base_url = Some("https://cdn.example.com/images/".to_string());

        let store = S3AttachmentStore::from_config(&config).unwrap();
        assert_eq!(
            store.download_url("abc-123"),
            "https://cdn.example.com/images/abc-123"
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = StorageConfig::new("bucket");
        assert_eq!(config.upload_ttl_secs, StorageConfig::DEFAULT_UPLOAD_TTL);
        assert_eq!(config.region, "us-east-1");
        assert!(config.access_key_id.is_none());
    }

    #[tokio::test]
    async fn test_presigned_upload_targets_todo_key() {
        let store = S3AttachmentStore::from_config(&s3_config()).unwrap();

        let url = store.upload_url("abc-123").await.unwrap();

        assert!(url.contains("todo-attachments"));
        assert!(url.contains("abc-123"));
        assert!(url.contains("X-Amz-Signature"));
    }

    #[tokio::test]
    async fn test_memory_store_records_removals() {
        let store = MemoryAttachmentStore::new("http://localhost:9000/");
        assert_eq!(
            store.upload_url("t1").await.unwrap(),
            "http://localhost:9000/uploads/t1"
        );
        assert_eq!(store.download_url("t1"), "http://localhost:9000/attachments/t1");

        store.remove("t1").await.unwrap();
        assert_eq!(store.removed(), vec!["t1".to_string()]);
    }
}
