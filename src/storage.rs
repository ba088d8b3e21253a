use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to store object {key}: {reason}")]
    Put { key: String, reason: String },
    #[error("failed to delete object {key}: {reason}")]
    Delete { key: String, reason: String },
}

// 1. StorageService Contract
/// StorageService
///
/// The object store behind every uploaded file (provider pictures and documents,
/// category images). Handlers only ever see this trait: the S3 client runs in the
/// server, the in-memory mock runs in tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if it is missing. Only called in `Env::Local`.
    async fn ensure_bucket_exists(&self) -> Result<(), StorageError>;

    /// Stores `bytes` under `key`. The key is sanitized before use and returned.
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError>;

    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

// 2. The Real Implementation (S3/MinIO)
/// S3StorageClient
///
/// `aws-sdk-s3` client pointed at any S3-compatible endpoint. Path-style addressing is
/// forced so MinIO works without virtual-host DNS.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) -> Result<(), StorageError> {
        let exists = self
            .client
            .head_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
            .is_ok();
        if exists {
            return Ok(());
        }

        self.client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
            .map_err(|e| StorageError::Put {
                key: self.bucket_name.clone(),
                reason: e.to_string(),
            })?;
        tracing::info!(bucket = %self.bucket_name, "created storage bucket");
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let key = sanitize_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Put {
                key: key.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!(%key, "stored object");
        Ok(key)
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let key = sanitize_key(key);
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                key,
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a caller-supplied name can never climb out of
/// its prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Builds a fresh `<prefix>/<uuid>.<ext>` key, keeping the extension of the uploaded
/// file name when it has a short alphanumeric one.
pub fn object_key(prefix: &str, file_name: Option<&str>) -> String {
    let ext = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    let id = Uuid::new_v4();
    match ext {
        Some(ext) => sanitize_key(&format!("{prefix}/{id}.{ext}")),
        None => sanitize_key(&format!("{prefix}/{id}")),
    }
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// Keeps objects in memory so tests can assert on what handlers stored.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    objects: Arc<Mutex<HashMap<String, (String, Vec<u8>)>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Content type and bytes stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<(String, Vec<u8>)> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let key = sanitize_key(key);
        if self.should_fail {
            return Err(StorageError::Put {
                key,
                reason: "Mock Storage Error: Simulation requested".to_string(),
            });
        }
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(key.clone(), (content_type.to_string(), bytes));
        }
        Ok(key)
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let key = sanitize_key(key);
        if self.should_fail {
            return Err(StorageError::Delete {
                key,
                reason: "Mock Storage Error: Simulation requested".to_string(),
            });
        }
        if let Ok(mut objects) = self.objects.lock() {
            objects.remove(&key);
        }
        Ok(())
    }
}

/// StorageState
///
/// The shared handle to the storage service held in the application state.
pub type StorageState = Arc<dyn StorageService>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_segments_are_removed() {
        assert_eq!(sanitize_key("../../etc/passwd"), "etc/passwd");
        assert_eq!(sanitize_key("categories//./a.png"), "categories/a.png");
    }

    #[test]
    fn object_keys_keep_safe_extensions_only() {
        let key = object_key("categories", Some("Photo.PNG"));
        assert!(key.starts_with("categories/"));
        assert!(key.ends_with(".png"));

        let key = object_key("service-providers", Some("evil.p/../hp"));
        assert!(!key.contains(".."));

        let key = object_key("service-providers", None);
        assert_eq!(key.matches('.').count(), 0);
    }
}
