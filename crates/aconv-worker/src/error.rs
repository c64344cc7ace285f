//! Worker error types.

use thiserror::Error;

pub type HandlerResult<T> = Result<T, HandlerError>;

/// Failure raised by a job handler. Captured at the executor boundary.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<aconv_media::MediaError> for HandlerError {
    fn from(e: aconv_media::MediaError) -> Self {
        Self::Conversion(e.detailed())
    }
}

impl From<aconv_storage::StorageError> for HandlerError {
    fn from(e: aconv_storage::StorageError) -> Self {
        Self::Upload(e.to_string())
    }
}

/// Failure delivering a webhook.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Connect, DNS, timeout or body errors
    #[error("Webhook request failed: {0}")]
    Transport(String),

    /// The endpoint answered with a non-2xx status
    #[error("Webhook returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Webhook payload error: {0}")]
    Payload(String),
}

impl DeliveryError {
    /// Whether another attempt might succeed: transport errors, 5xx and 429.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::HttpStatus { status } => *status >= 500 || *status == 429,
            Self::Payload(_) => false,
        }
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DeliveryError::Transport("connection refused".into()).is_transient());
        assert!(DeliveryError::HttpStatus { status: 503 }.is_transient());
        assert!(DeliveryError::HttpStatus { status: 429 }.is_transient());
        assert!(!DeliveryError::HttpStatus { status: 404 }.is_transient());
        assert!(!DeliveryError::HttpStatus { status: 400 }.is_transient());
        assert!(!DeliveryError::Payload("bad".into()).is_transient());
    }

    #[test]
    fn test_media_error_keeps_ffmpeg_detail() {
        let media = aconv_media::MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("Server returned 404 Not Found".to_string()),
            Some(1),
        );
        let err = HandlerError::from(media);
        assert!(err.to_string().contains("404 Not Found"));
    }
}
