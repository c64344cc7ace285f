//! Conversion request payload.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use validator::Validate;

/// Bitrate used when the caller does not pick one.
pub const DEFAULT_BITRATE: &str = "128k";

static BITRATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+k$").expect("static bitrate pattern"));

/// Body accepted by `POST /media-to-mp3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ConvertRequest {
    /// Source media location
    #[validate(url(message = "media_url must be a valid URI"))]
    pub media_url: String,

    /// Callback receiving the terminal outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "webhook_url must be a valid URI"))]
    pub webhook_url: Option<String>,

    /// Client-chosen job identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 128, message = "id must be 1-128 characters"))]
    pub id: Option<String>,

    /// Target MP3 bitrate, e.g. `192k`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(regex(path = *BITRATE_RE, message = "bitrate must match ^[0-9]+k$"))]
    pub bitrate: Option<String>,
}

impl ConvertRequest {
    pub fn new(media_url: impl Into<String>) -> Self {
        Self {
            media_url: media_url.into(),
            webhook_url: None,
            id: None,
            bitrate: None,
        }
    }

    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = Some(bitrate.into());
        self
    }

    /// Effective bitrate, falling back to [`DEFAULT_BITRATE`].
    pub fn bitrate(&self) -> &str {
        self.bitrate.as_deref().unwrap_or(DEFAULT_BITRATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bitrate() {
        let req = ConvertRequest::new("https://example.com/a.mp4");
        assert_eq!(req.bitrate(), "128k");

        let req = req.with_bitrate("320k");
        assert_eq!(req.bitrate(), "320k");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let body = r#"{"media_url":"https://example.com/a.mp4","format":"wav"}"#;
        assert!(serde_json::from_str::<ConvertRequest>(body).is_err());
    }

    #[test]
    fn test_missing_media_url_rejected() {
        let body = r#"{"bitrate":"128k"}"#;
        assert!(serde_json::from_str::<ConvertRequest>(body).is_err());
    }

    #[test]
    fn test_validation_rules() {
        let ok = ConvertRequest::new("https://example.com/a.mp4")
            .with_webhook("https://hooks.example.com/x")
            .with_id("abc")
            .with_bitrate("192k");
        assert!(ok.validate().is_ok());

        let bad_bitrate = ConvertRequest::new("https://example.com/a.mp4").with_bitrate("192kbps");
        let errors = bad_bitrate.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("bitrate"));

        let bad_url = ConvertRequest::new("not a url");
        let errors = bad_url.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("media_url"));

        let empty_id = ConvertRequest::new("https://example.com/a.mp4").with_id("");
        assert!(empty_id.validate().is_err());
    }
}
