use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed,
}

/// Record of a single webhook delivery attempt series, mirroring what a
/// caller can query back out of `/_doubleagent/webhooks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub id: String,
    pub event_type: String,
    pub payload: Value,
    pub target_url: String,
    pub namespace: String,
    pub status: DeliveryStatus,
    pub attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub response_code: Option<u16>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WebhookDelivery {
    pub fn new(id: String, event_type: String, payload: Value, target_url: String, namespace: String) -> Self {
        Self {
            id,
            event_type,
            payload,
            target_url,
            namespace,
            status: DeliveryStatus::Pending,
            attempts: 0,
            last_attempt_at: None,
            response_code: None,
            error: None,
            created_at: Utc::now(),
        }
    }
}
