use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::NotificationError;
use crate::models::NotificationChannel;

/// Backing store for a user's notification channels. Implementations only
/// need to return the user's channels; eligibility filtering and attempt
/// ordering live in the registry.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    async fn channels_for_user(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<NotificationChannel>, NotificationError>;
}

/// Resolves the ordered set of channels eligible for delivery attempts:
/// verified only, primary first, then stable creation order.
pub struct ChannelRegistry {
    store: Arc<dyn ChannelStore>,
}

impl ChannelRegistry {
    pub fn new(store: Arc<dyn ChannelStore>) -> Self {
        Self { store }
    }

    /// An empty result is not an error here; the orchestrator decides what
    /// an empty channel list means.
    pub async fn resolve_channels(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<NotificationChannel>, NotificationError> {
        let mut channels: Vec<NotificationChannel> = self
            .store
            .channels_for_user(user_id, auth_token)
            .await?
            .into_iter()
            .filter(|c| c.verified)
            .collect();

        // sort_by is stable, so equal keys keep their relative order.
        channels.sort_by(|a, b| {
            b.is_primary
                .cmp(&a.is_primary)
                .then(a.created_at.cmp(&b.created_at))
        });

        Ok(channels)
    }
}
