use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::NotificationChannel;
use crate::services::senders::{ChannelSender, SendError};

/// Email adapter backed by the Resend API.
/// Based on: https://resend.com/docs/api-reference/emails/send-email
pub struct ResendEmailSender {
    client: Client,
    api_key: String,
    from_address: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    message: Option<String>,
    name: Option<String>,
}

impl ResendEmailSender {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_email_configured() {
            return Err(NotificationError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            api_key: config.resend_api_key.clone(),
            from_address: config.resend_from_address.clone(),
            base_url: config.resend_base_url.clone(),
        })
    }

    fn normalize_error(status: reqwest::StatusCode, body: &str) -> String {
        // Vendor error shapes stay inside the adapter; the orchestrator
        // only ever sees the normalized message.
        match serde_json::from_str::<ResendErrorBody>(body) {
            Ok(parsed) => {
                let name = parsed.name.unwrap_or_else(|| "error".to_string());
                let message = parsed.message.unwrap_or_else(|| body.to_string());
                format!("Resend {} ({}): {}", status.as_u16(), name, message)
            }
            Err(_) => format!("Resend {}: {}", status.as_u16(), body),
        }
    }
}

#[async_trait]
impl ChannelSender for ResendEmailSender {
    async fn send(
        &self,
        channel: &NotificationChannel,
        subject: &str,
        body: &str,
    ) -> Result<(), SendError> {
        let url = format!("{}/emails", self.base_url);
        debug!("Sending email to {} via {}", channel.destination, url);

        let request_body = json!({
            "from": self.from_address,
            "to": [channel.destination],
            "subject": subject,
            "html": body,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| SendError::new(format!("Email transport error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = Self::normalize_error(status, &text);
            error!("Email send failed for user {}: {}", channel.user_id, message);
            return Err(SendError::new(message));
        }

        info!("Email accepted for user {}", channel.user_id);
        Ok(())
    }
}
