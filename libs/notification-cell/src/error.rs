use thiserror::Error;

use crate::models::DeliveryAttempt;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("No notification channels configured")]
    NoChannelsConfigured,

    #[error("All notification channels failed")]
    AllChannelsExhausted { attempts: Vec<DeliveryAttempt> },

    #[error("Delivery log write failed: {0}")]
    Persistence(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(uuid::Uuid),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Notification transport not configured")]
    NotConfigured,

    #[error("Validation error: {0}")]
    Validation(String),
}
