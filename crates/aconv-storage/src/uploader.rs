//! Artifact upload seam.

use std::path::Path;

use async_trait::async_trait;

use crate::client::{S3Client, S3Config};
use crate::error::{StorageError, StorageResult};

/// Publishes a local artifact and returns its public URL.
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    async fn upload(&self, path: &Path) -> StorageResult<String>;
}

/// [`ArtifactUploader`] writing to an S3-compatible bucket.
pub struct S3Uploader {
    client: S3Client,
    public_base_url: String,
    key_prefix: String,
}

impl S3Uploader {
    pub fn new(config: &S3Config) -> Self {
        Self {
            client: S3Client::new(config),
            public_base_url: config.public_base_url.clone(),
            key_prefix: config.key_prefix.clone(),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(&S3Config::from_env()?))
    }

    /// Object key for a local file: `<prefix><file name>`.
    pub fn object_key(&self, path: &Path) -> StorageResult<String> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| StorageError::invalid_key(path.display().to_string()))?;
        Ok(format!("{}{}", self.key_prefix, name))
    }

    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ArtifactUploader for S3Uploader {
    async fn upload(&self, path: &Path) -> StorageResult<String> {
        let key = self.object_key(path)?;
        self.client.upload_file(path, &key, "audio/mpeg").await?;
        Ok(self.public_url(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            endpoint_url: "http://localhost:9000".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket_name: "media".to_string(),
            region: "auto".to_string(),
            public_base_url: "https://cdn.example.com/".to_string(),
            key_prefix: "audio/".to_string(),
        }
    }

    #[test]
    fn test_object_key_and_public_url() {
        let uploader = S3Uploader::new(&config());
        let key = uploader
            .object_key(Path::new("/tmp/aconv/job-1.mp3"))
            .unwrap();

        assert_eq!(key, "audio/job-1.mp3");
        assert_eq!(
            uploader.public_url(&key),
            "https://cdn.example.com/audio/job-1.mp3"
        );
    }

    #[test]
    fn test_object_key_requires_file_name() {
        let uploader = S3Uploader::new(&config());
        assert!(matches!(
            uploader.object_key(Path::new("/")),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = S3Uploader::new(&config());

        let err = uploader
            .upload(&dir.path().join("missing.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UploadFailed(_)));
    }
}
