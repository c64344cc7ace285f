//! Webhook delivery bookkeeping.

use serde::{Deserialize, Serialize};

/// Delivery state of a job's callback. Independent of the job status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// No webhook URL on the request
    #[default]
    NotRequested,
    /// Waiting for the terminal outcome or retrying
    Pending,
    Delivered { attempts: u32 },
    Failed { attempts: u32, error: String },
}

impl DeliveryStatus {
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Delivered { .. } | DeliveryStatus::Failed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let status = DeliveryStatus::Failed {
            attempts: 4,
            error: "connection refused".to_string(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["attempts"], 4);

        let json = serde_json::to_value(DeliveryStatus::NotRequested).unwrap();
        assert_eq!(json["state"], "not_requested");
    }
}
