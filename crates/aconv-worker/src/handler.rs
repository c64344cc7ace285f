//! Job handlers.

use std::sync::Arc;

use aconv_media::MediaConverter;
use aconv_models::{ConvertRequest, JobId};
use aconv_storage::ArtifactUploader;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::HandlerResult;

/// Work performed for one job. Returns the public URL of the result.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job_id: &JobId, request: &ConvertRequest) -> HandlerResult<String>;
}

/// Converts the media to MP3 and uploads the artifact.
pub struct MediaToMp3Handler {
    converter: Arc<dyn MediaConverter>,
    uploader: Arc<dyn ArtifactUploader>,
}

impl MediaToMp3Handler {
    pub fn new(converter: Arc<dyn MediaConverter>, uploader: Arc<dyn ArtifactUploader>) -> Self {
        Self {
            converter,
            uploader,
        }
    }
}

#[async_trait]
impl JobHandler for MediaToMp3Handler {
    async fn handle(&self, job_id: &JobId, request: &ConvertRequest) -> HandlerResult<String> {
        let artifact = self
            .converter
            .convert(&request.media_url, job_id.as_str(), request.bitrate())
            .await?;

        let uploaded = self.uploader.upload(&artifact).await;

        // The artifact is local scratch either way.
        match tokio::fs::remove_file(&artifact).await {
            Ok(()) => debug!(job_id = %job_id, "Removed local artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(job_id = %job_id, "Failed to remove local artifact: {}", e),
        }

        Ok(uploaded?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aconv_media::{MediaError, MediaResult};
    use aconv_storage::{StorageError, StorageResult};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    struct FileConverter {
        dir: PathBuf,
        seen: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl MediaConverter for FileConverter {
        async fn convert(&self, media_url: &str, job_id: &str, bitrate: &str) -> MediaResult<PathBuf> {
            self.seen
                .lock()
                .unwrap()
                .push((media_url.to_string(), job_id.to_string(), bitrate.to_string()));
            let path = self.dir.join(format!("{job_id}.mp3"));
            tokio::fs::write(&path, b"ID3").await?;
            Ok(path)
        }
    }

    struct FailingConverter;

    #[async_trait]
    impl MediaConverter for FailingConverter {
        async fn convert(&self, _: &str, _: &str, _: &str) -> MediaResult<PathBuf> {
            Err(MediaError::ffmpeg_failed("FFmpeg exited with non-zero status", None, Some(1)))
        }
    }

    struct Uploader {
        fail: bool,
    }

    #[async_trait]
    impl ArtifactUploader for Uploader {
        async fn upload(&self, path: &Path) -> StorageResult<String> {
            assert!(path.exists());
            if self.fail {
                return Err(StorageError::upload_failed("bucket unavailable"));
            }
            let name = path.file_name().unwrap().to_string_lossy();
            Ok(format!("https://cdn.example.com/audio/{name}"))
        }
    }

    fn converter(dir: &Path) -> Arc<FileConverter> {
        Arc::new(FileConverter {
            dir: dir.to_path_buf(),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_success_returns_url_and_removes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let conv = converter(dir.path());
        let handler = MediaToMp3Handler::new(conv.clone(), Arc::new(Uploader { fail: false }));

        let url = handler
            .handle(
                &JobId::from("j1"),
                &ConvertRequest::new("https://example.com/a.mp4"),
            )
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/audio/j1.mp3");
        assert!(!dir.path().join("j1.mp3").exists());
        let seen = conv.seen.lock().unwrap();
        assert_eq!(seen[0].2, "128k");
    }

    #[tokio::test]
    async fn test_upload_failure_still_removes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let handler = MediaToMp3Handler::new(converter(dir.path()), Arc::new(Uploader { fail: true }));

        let err = handler
            .handle(
                &JobId::from("j2"),
                &ConvertRequest::new("https://example.com/a.mp4").with_bitrate("64k"),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("bucket unavailable"));
        assert!(!dir.path().join("j2.mp3").exists());
    }

    #[tokio::test]
    async fn test_conversion_failure_is_reported() {
        let handler = MediaToMp3Handler::new(Arc::new(FailingConverter), Arc::new(Uploader { fail: false }));

        let err = handler
            .handle(
                &JobId::from("j3"),
                &ConvertRequest::new("https://example.com/a.mp4"),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Conversion failed"));
    }
}
