use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::{ChannelType, NotificationChannel};
use crate::services::senders::{ChannelSender, SendError};

/// SMS and WhatsApp adapter backed by the Twilio Messages API. The two
/// channel types share one transport; WhatsApp is distinguished purely by
/// the `whatsapp:` prefix on the To/From addresses.
/// Based on: https://www.twilio.com/docs/sms/api/message-resource
pub struct TwilioSmsSender {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    whatsapp_from: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: Option<String>,
    code: Option<i64>,
}

impl TwilioSmsSender {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_sms_configured() {
            return Err(NotificationError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_from_number.clone(),
            whatsapp_from: config.twilio_whatsapp_number.clone(),
            base_url: config.twilio_base_url.clone(),
        })
    }

    /// SMS has no subject field, so subject and body are collapsed into a
    /// single message string.
    fn compose_body(subject: &str, body: &str) -> String {
        if subject.trim().is_empty() {
            body.to_string()
        } else {
            format!("{}\n\n{}", subject, body)
        }
    }

    fn addresses(&self, channel: &NotificationChannel) -> (String, String) {
        match channel.channel_type {
            ChannelType::Whatsapp => (
                format!("whatsapp:{}", channel.destination),
                format!("whatsapp:{}", self.whatsapp_from),
            ),
            _ => (channel.destination.clone(), self.from_number.clone()),
        }
    }

    fn normalize_error(status: reqwest::StatusCode, body: &str) -> String {
        match serde_json::from_str::<TwilioErrorBody>(body) {
            Ok(parsed) => {
                let code = parsed
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let message = parsed.message.unwrap_or_else(|| body.to_string());
                format!("Twilio {} (code {}): {}", status.as_u16(), code, message)
            }
            Err(_) => format!("Twilio {}: {}", status.as_u16(), body),
        }
    }
}

#[async_trait]
impl ChannelSender for TwilioSmsSender {
    async fn send(
        &self,
        channel: &NotificationChannel,
        subject: &str,
        body: &str,
    ) -> Result<(), SendError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        let (to, from) = self.addresses(channel);
        let message = Self::compose_body(subject, body);

        debug!("Sending {} message to {} via {}", channel.channel_type, to, url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to.as_str()), ("From", from.as_str()), ("Body", message.as_str())])
            .send()
            .await
            .map_err(|e| SendError::new(format!("{} transport error: {}", channel.channel_type, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let normalized = Self::normalize_error(status, &text);
            error!(
                "{} send failed for user {}: {}",
                channel.channel_type, channel.user_id, normalized
            );
            return Err(SendError::new(normalized));
        }

        info!("{} message accepted for user {}", channel.channel_type, channel.user_id);
        Ok(())
    }
}
