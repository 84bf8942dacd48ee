use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::{
    ChannelType, DeliveryAttempt, DeliveryRecord, DeliveryState, NotificationChannel,
    SendNotificationRequest,
};
use crate::services::channels::ChannelService;
use crate::services::log_store::{DeliveryLog, SupabaseDeliveryLog};
use crate::services::registry::ChannelRegistry;
use crate::services::senders::{ChannelSender, ResendEmailSender, SendError, TwilioSmsSender};

#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub delivered_via: ChannelType,
    pub attempts: Vec<DeliveryAttempt>,
}

/// Sequences delivery attempts across a user's channels: primary first,
/// one channel at a time, stopping at the first success. Channel diversity
/// is the resilience mechanism here; there is no same-channel retry.
pub struct DeliveryOrchestrator {
    registry: ChannelRegistry,
    log: Arc<dyn DeliveryLog>,
    senders: HashMap<ChannelType, Arc<dyn ChannelSender>>,
    send_timeout: Duration,
}

impl DeliveryOrchestrator {
    pub fn new(registry: ChannelRegistry, log: Arc<dyn DeliveryLog>, send_timeout: Duration) -> Self {
        Self {
            registry,
            log,
            senders: HashMap::new(),
            send_timeout,
        }
    }

    pub fn with_sender(mut self, channel_type: ChannelType, sender: Arc<dyn ChannelSender>) -> Self {
        self.senders.insert(channel_type, sender);
        self
    }

    /// Wires the production stack: Supabase-backed registry and log,
    /// Resend for email, Twilio for SMS and WhatsApp. Transports that are
    /// not configured are simply not registered; attempts on their channel
    /// types fail over like any other send failure.
    pub fn from_config(config: &AppConfig) -> Self {
        let registry = ChannelRegistry::new(Arc::new(ChannelService::new(config)));
        let log = Arc::new(SupabaseDeliveryLog::new(config));

        let mut orchestrator = Self::new(
            registry,
            log,
            Duration::from_secs(config.send_timeout_seconds),
        );

        if let Ok(email) = ResendEmailSender::new(config) {
            orchestrator = orchestrator.with_sender(ChannelType::Email, Arc::new(email));
        } else {
            warn!("Email transport not configured, email channels will fail over");
        }

        match TwilioSmsSender::new(config) {
            Ok(sms) => {
                let sms: Arc<dyn ChannelSender> = Arc::new(sms);
                orchestrator = orchestrator
                    .with_sender(ChannelType::Sms, sms.clone())
                    .with_sender(ChannelType::Whatsapp, sms);
            }
            Err(_) => {
                warn!("SMS transport not configured, sms/whatsapp channels will fail over");
            }
        }

        orchestrator
    }

    /// Delivers one notification, trying each eligible channel in order.
    ///
    /// Terminal states and their results:
    /// - Rejected (no verified channels): `Err(NoChannelsConfigured)`, zero
    ///   attempts logged, no adapter ever invoked.
    /// - Delivered: `Ok(DeliveryOutcome)` with the full attempt log.
    /// - Exhausted: `Err(AllChannelsExhausted)` carrying every attempt.
    ///
    /// The delivery record is persisted in all three terminal states. A
    /// failed log write never overturns the delivery result; it is reported
    /// separately.
    pub async fn deliver(
        &self,
        user_id: Uuid,
        request: &SendNotificationRequest,
        auth_token: &str,
    ) -> Result<DeliveryOutcome, NotificationError> {
        request
            .validate()
            .map_err(NotificationError::Validation)?;

        let mut record =
            DeliveryRecord::new(user_id, &request.notification_type, request.metadata.clone());
        let mut state = DeliveryState::Idle;

        let channels = self.registry.resolve_channels(user_id, auth_token).await?;

        if channels.is_empty() {
            state = transition(state, DeliveryState::Rejected);
            warn!(
                "No verified notification channels for user {} (type: {}), state: {:?}",
                user_id, request.notification_type, state
            );
            self.persist(&record, auth_token).await;
            return Err(NotificationError::NoChannelsConfigured);
        }

        let mut delivered: Option<ChannelType> = None;

        for channel in &channels {
            state = transition(state, DeliveryState::Attempting);
            info!(
                "Attempting {} delivery for user {} (type: {})",
                channel.channel_type, user_id, request.notification_type
            );

            match self.attempt(channel, request).await {
                Ok(()) => {
                    record.attempts.push(DeliveryAttempt::success(channel.channel_type));
                    record.mark_delivered(channel.channel_type);
                    delivered = Some(channel.channel_type);
                    state = transition(state, DeliveryState::Delivered);
                    info!(
                        "Notification delivered to user {} via {}",
                        user_id, channel.channel_type
                    );
                    break;
                }
                Err(send_error) => {
                    warn!(
                        "{} delivery failed for user {}: {}",
                        channel.channel_type, user_id, send_error
                    );
                    record
                        .attempts
                        .push(DeliveryAttempt::failed(channel.channel_type, send_error.message));
                }
            }
        }

        if delivered.is_none() {
            state = transition(state, DeliveryState::Exhausted);
        }
        debug_assert!(state.is_terminal());

        self.persist(&record, auth_token).await;

        match delivered {
            Some(via) => Ok(DeliveryOutcome {
                delivered_via: via,
                attempts: record.attempts,
            }),
            None => {
                error!(
                    "All {} notification channels failed for user {} (type: {})",
                    record.attempts.len(),
                    user_id,
                    request.notification_type
                );
                Err(NotificationError::AllChannelsExhausted {
                    attempts: record.attempts,
                })
            }
        }
    }

    /// One bounded attempt through one channel. A missing transport, a
    /// timed-out call, and a panicking adapter all come back as `SendError`
    /// so the loop can move on to the next channel.
    async fn attempt(
        &self,
        channel: &NotificationChannel,
        request: &SendNotificationRequest,
    ) -> Result<(), SendError> {
        let sender = match self.senders.get(&channel.channel_type) {
            Some(sender) => sender,
            None => {
                return Err(SendError::new(format!(
                    "No transport configured for {}",
                    channel.channel_type
                )))
            }
        };

        let send = AssertUnwindSafe(sender.send(channel, &request.subject, &request.body))
            .catch_unwind();

        match timeout(self.send_timeout, send).await {
            Err(_) => Err(SendError::new(format!(
                "{} send timed out after {}s",
                channel.channel_type,
                self.send_timeout.as_secs()
            ))),
            Ok(Err(_)) => Err(SendError::new(format!(
                "{} sender panicked",
                channel.channel_type
            ))),
            Ok(Ok(result)) => result,
        }
    }

    async fn persist(&self, record: &DeliveryRecord, auth_token: &str) {
        if let Err(e) = self.log.record(record, auth_token).await {
            // A delivered notification stays delivered even when the audit
            // write fails; the failure is reported on its own.
            error!(
                "Failed to persist delivery record {}: {}",
                record.dedupe_key, e
            );
        }
    }
}

fn transition(from: DeliveryState, to: DeliveryState) -> DeliveryState {
    debug_assert!(
        from.can_transition_to(&to),
        "invalid delivery state transition {:?} -> {:?}",
        from,
        to
    );
    to
}
