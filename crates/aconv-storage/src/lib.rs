//! S3-compatible artifact storage.
//!
//! This crate provides:
//! - `S3Client`: thin wrapper over the AWS SDK for S3-compatible endpoints
//! - `ArtifactUploader`: upload seam used by the conversion handler

pub mod client;
pub mod error;
pub mod uploader;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use uploader::{ArtifactUploader, S3Uploader};
