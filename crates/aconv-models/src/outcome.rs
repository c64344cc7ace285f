//! Terminal job outcome.

use serde::{Deserialize, Serialize};

use crate::{JobId, JobStatus};

/// Success value or captured error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeBody {
    /// Public URL of the uploaded artifact
    Result(String),
    /// Failure description captured at the executor boundary
    Error(String),
}

/// What a handler run produced, plus routing metadata.
///
/// Serialized flat: `{job_id, id?, route, code, status, result | error}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: JobId,

    /// Client-supplied id, echoed back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub route: String,

    /// HTTP-style status code (200 on success, 500 on failure)
    pub code: u16,

    pub status: JobStatus,

    #[serde(flatten)]
    pub body: OutcomeBody,
}

impl JobOutcome {
    pub fn success(
        job_id: JobId,
        id: Option<String>,
        route: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            id,
            route: route.into(),
            code: 200,
            status: JobStatus::Succeeded,
            body: OutcomeBody::Result(url.into()),
        }
    }

    pub fn failure(
        job_id: JobId,
        id: Option<String>,
        route: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            id,
            route: route.into(),
            code: 500,
            status: JobStatus::Failed,
            body: OutcomeBody::Error(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.body, OutcomeBody::Result(_))
    }

    pub fn result(&self) -> Option<&str> {
        match &self.body {
            OutcomeBody::Result(url) => Some(url),
            OutcomeBody::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.body {
            OutcomeBody::Error(msg) => Some(msg),
            OutcomeBody::Result(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_serializes_flat() {
        let outcome = JobOutcome::success(
            JobId::from("job-1"),
            Some("client-7".to_string()),
            "/media-to-mp3",
            "https://cdn.example.com/audio/job-1.mp3",
        );
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["job_id"], "job-1");
        assert_eq!(json["id"], "client-7");
        assert_eq!(json["code"], 200);
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["result"], "https://cdn.example.com/audio/job-1.mp3");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_serializes_flat() {
        let outcome = JobOutcome::failure(JobId::from("job-2"), None, "/media-to-mp3", "ffmpeg exited 1");
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["code"], 500);
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "ffmpeg exited 1");
        assert!(json.get("id").is_none());
        assert!(json.get("result").is_none());
    }
}
