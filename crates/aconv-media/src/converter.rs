//! Media-to-MP3 conversion.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Turns a media URL into a local MP3 file.
#[async_trait]
pub trait MediaConverter: Send + Sync {
    /// Convert `media_url` at `bitrate`, returning the path of the artifact.
    async fn convert(&self, media_url: &str, job_id: &str, bitrate: &str) -> MediaResult<PathBuf>;
}

/// [`MediaConverter`] backed by the FFmpeg CLI reading the URL directly.
pub struct FfmpegConverter {
    work_dir: PathBuf,
    timeout_secs: u64,
}

impl FfmpegConverter {
    pub fn new(work_dir: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            work_dir: work_dir.into(),
            timeout_secs,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// `<work_dir>/<job_id>-<uuid>.mp3`, with the id reduced to a safe file stem.
    ///
    /// Each call yields a fresh name; ids sharing a stem never share a file.
    pub fn output_path(&self, job_id: &str) -> PathBuf {
        self.work_dir
            .join(format!("{}-{}.mp3", file_stem(job_id), Uuid::new_v4()))
    }

    fn command(&self, media_url: &str, output: &Path, bitrate: &str) -> FfmpegCommand {
        FfmpegCommand::new(media_url, output)
            .no_video()
            .audio_codec("libmp3lame")
            .audio_bitrate(bitrate)
    }
}

#[async_trait]
impl MediaConverter for FfmpegConverter {
    async fn convert(&self, media_url: &str, job_id: &str, bitrate: &str) -> MediaResult<PathBuf> {
        if media_url.trim().is_empty() {
            return Err(MediaError::invalid_input("media_url is empty"));
        }

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let output = self.output_path(job_id);
        let cmd = self.command(media_url, &output, bitrate);

        info!(job_id, bitrate, output = %output.display(), "Starting MP3 conversion");

        let progress_job = job_id.to_string();
        let result = FfmpegRunner::new()
            .with_timeout(self.timeout_secs)
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    job_id = %progress_job,
                    out_time_secs = progress.out_time_secs(),
                    speed = progress.speed,
                    "Conversion progress"
                );
            })
            .await;

        if let Err(e) = result {
            if let Err(rm) = tokio::fs::remove_file(&output).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!(job_id, "Failed to remove partial output: {}", rm);
                }
            }
            return Err(e);
        }

        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg produced no output file",
                None,
                None,
            ));
        }

        info!(job_id, output = %output.display(), "MP3 conversion complete");
        Ok(output)
    }
}

fn file_stem(job_id: &str) -> String {
    let stem: String = job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "job".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_name(path: &Path) -> String {
        path.file_name().unwrap().to_str().unwrap().to_string()
    }

    #[test]
    fn test_output_path_is_sanitized() {
        let converter = FfmpegConverter::new("/tmp/aconv", 60);

        let out = converter.output_path("4f1c-77_a");
        assert_eq!(out.parent(), Some(Path::new("/tmp/aconv")));
        assert!(file_name(&out).starts_with("4f1c-77_a-"));
        assert!(file_name(&out).ends_with(".mp3"));

        let out = converter.output_path("../../etc/passwd");
        assert_eq!(out.parent(), Some(Path::new("/tmp/aconv")));
        assert!(file_name(&out).starts_with("______etc_passwd-"));

        assert!(file_name(&converter.output_path("")).starts_with("job-"));
    }

    #[test]
    fn test_output_path_unique_per_run() {
        let converter = FfmpegConverter::new("/tmp/aconv", 60);

        // All three reduce to the stem `a_b`
        let paths = [
            converter.output_path("a.b"),
            converter.output_path("a_b"),
            converter.output_path("a/b"),
        ];
        for (i, a) in paths.iter().enumerate() {
            assert!(file_name(a).starts_with("a_b-"));
            for b in &paths[i + 1..] {
                assert_ne!(a, b);
            }
        }

        assert_ne!(converter.output_path("same"), converter.output_path("same"));
    }

    #[test]
    fn test_command_shape() {
        let converter = FfmpegConverter::new("/tmp/aconv", 60);
        let out = converter.output_path("j1");
        let args = converter
            .command("https://example.com/a.mp4", &out, "128k")
            .build_args();

        assert!(args.windows(2).any(|w| w == ["-c:a", "libmp3lame"]));
        assert!(args.windows(2).any(|w| w == ["-b:a", "128k"]));
        assert!(args.contains(&"-vn".to_string()));
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let converter = FfmpegConverter::new(dir.path(), 60);

        let err = converter.convert("  ", "j1", "128k").await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }
}
