use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Email,
    Sms,
    Whatsapp,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::Email => write!(f, "email"),
            ChannelType::Sms => write!(f, "sms"),
            ChannelType::Whatsapp => write!(f, "whatsapp"),
        }
    }
}

/// A delivery transport bound to one user contact method. Rows are never
/// deleted; deactivation flips `verified` to false, which removes the
/// channel from the attempt order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub channel_type: ChannelType,
    pub destination: String,
    pub verified: bool,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendNotificationRequest {
    pub subject: String,
    pub body: String,
    pub notification_type: String,
    pub metadata: Option<Value>,
}

impl SendNotificationRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.subject.trim().is_empty() {
            return Err("subject must not be empty".to_string());
        }
        if self.body.trim().is_empty() {
            return Err("body must not be empty".to_string());
        }
        if self.notification_type.trim().is_empty() {
            return Err("notification_type must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChannelRequest {
    pub channel_type: ChannelType,
    pub destination: String,
    pub is_primary: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Success,
    Failed,
}

/// One try of sending through one channel. Attempts are appended in the
/// exact order channels were tried; nothing is appended after a success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    pub channel_type: ChannelType,
    pub status: AttemptStatus,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl DeliveryAttempt {
    pub fn success(channel_type: ChannelType) -> Self {
        Self {
            channel_type,
            status: AttemptStatus::Success,
            error: None,
            attempted_at: Utc::now(),
        }
    }

    pub fn failed(channel_type: ChannelType, error: String) -> Self {
        Self {
            channel_type,
            status: AttemptStatus::Failed,
            error: Some(error),
            attempted_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

/// Durable, immutable summary of all attempts for one notification request.
/// Written exactly once per request, in every terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub user_id: Uuid,
    pub notification_type: String,
    pub status: DeliveryStatus,
    pub delivered_via: Option<ChannelType>,
    pub attempts: Vec<DeliveryAttempt>,
    pub metadata: Value,
    pub dedupe_key: String,
    pub created_at: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn new(user_id: Uuid, notification_type: &str, metadata: Option<Value>) -> Self {
        let created_at = Utc::now();
        Self {
            user_id,
            notification_type: notification_type.to_string(),
            status: DeliveryStatus::Failed,
            delivered_via: None,
            attempts: Vec::new(),
            metadata: metadata.unwrap_or(Value::Null),
            dedupe_key: Self::dedupe_key_for(user_id, notification_type, created_at),
            created_at,
        }
    }

    /// Idempotency key for the delivery log: two submissions of the same
    /// record carry the same key and collapse to one row on conflict.
    pub fn dedupe_key_for(
        user_id: Uuid,
        notification_type: &str,
        created_at: DateTime<Utc>,
    ) -> String {
        format!(
            "{}:{}:{}",
            user_id,
            notification_type,
            created_at.timestamp_millis()
        )
    }

    pub fn mark_delivered(&mut self, via: ChannelType) {
        self.status = DeliveryStatus::Delivered;
        self.delivered_via = Some(via);
    }
}

/// Orchestration state for a single notification request.
///
/// `Idle -> Attempting -> {Delivered | Attempting} -> {Delivered | Exhausted}`
/// with an `Idle -> Rejected` short-circuit when no verified channels exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Idle,
    Attempting,
    Delivered,
    Exhausted,
    Rejected,
}

impl DeliveryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryState::Delivered | DeliveryState::Exhausted | DeliveryState::Rejected
        )
    }

    pub fn can_transition_to(&self, target: &DeliveryState) -> bool {
        use DeliveryState::*;
        match (self, target) {
            (Idle, Attempting) => true,
            (Idle, Rejected) => true,
            (Attempting, Attempting) => true,
            (Attempting, Delivered) => true,
            (Attempting, Exhausted) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendNotificationResponse {
    pub success: bool,
    pub delivered_via: Option<ChannelType>,
    pub delivery_log: Vec<DeliveryAttempt>,
}
