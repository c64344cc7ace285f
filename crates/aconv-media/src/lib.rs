//! FFmpeg CLI wrapper for audio extraction.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - The `MediaConverter` seam and its FFmpeg-backed implementation

pub mod command;
pub mod converter;
pub mod error;
pub mod progress;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use converter::{FfmpegConverter, MediaConverter};
pub use error::{MediaError, MediaResult};
pub use progress::FfmpegProgress;
