pub mod email;
pub mod sms;

use std::fmt;

use async_trait::async_trait;

use crate::models::NotificationChannel;

pub use email::ResendEmailSender;
pub use sms::TwilioSmsSender;

/// Normalized failure from one transport call. Adapters surface every
/// failure mode (network, auth, invalid recipient, vendor rejection) as
/// this type so the orchestrator can advance to the next channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendError {
    pub message: String,
}

impl SendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Uniform interface over one external transport. Implementations must
/// never panic past this boundary and must never return anything but
/// `SendError` on failure.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(
        &self,
        channel: &NotificationChannel,
        subject: &str,
        body: &str,
    ) -> Result<(), SendError>;
}
