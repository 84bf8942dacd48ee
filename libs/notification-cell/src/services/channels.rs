use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::error::NotificationError;
use crate::models::{CreateChannelRequest, NotificationChannel};
use crate::services::registry::ChannelStore;

/// Channel CRUD against the `notification_channels` table. Channels are
/// never deleted; deactivation clears the verified flag so the row drops
/// out of the attempt order but keeps its audit history.
pub struct ChannelService {
    supabase: SupabaseClient,
}

impl ChannelService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    pub async fn create_channel(
        &self,
        user_id: Uuid,
        request: CreateChannelRequest,
        auth_token: &str,
    ) -> Result<NotificationChannel, NotificationError> {
        debug!("Registering {} channel for user {}", request.channel_type, user_id);

        // on_conflict keeps one authoritative row per
        // (user, channel type, destination).
        let path = "/rest/v1/notification_channels?on_conflict=user_id,channel_type,destination";

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("return=representation,resolution=merge-duplicates"),
        );

        let body = json!({
            "user_id": user_id,
            "channel_type": request.channel_type,
            "destination": request.destination,
            "verified": false,
            "is_primary": request.is_primary.unwrap_or(false),
        });

        let result: Vec<NotificationChannel> = self
            .supabase
            .request_with_headers(Method::POST, path, Some(auth_token), Some(body), Some(headers))
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| NotificationError::Database("Channel creation returned no row".to_string()))
    }

    pub async fn verify_channel(
        &self,
        user_id: Uuid,
        channel_id: Uuid,
        auth_token: &str,
    ) -> Result<NotificationChannel, NotificationError> {
        debug!("Verifying channel {} for user {}", channel_id, user_id);

        let path = format!(
            "/rest/v1/notification_channels?id=eq.{}&user_id=eq.{}",
            channel_id, user_id
        );

        let result: Vec<NotificationChannel> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "verified": true })),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or(NotificationError::ChannelNotFound(channel_id))
    }

    pub async fn make_primary(
        &self,
        user_id: Uuid,
        channel_id: Uuid,
        auth_token: &str,
    ) -> Result<NotificationChannel, NotificationError> {
        debug!("Making channel {} primary for user {}", channel_id, user_id);

        // Promote the target first. An empty result set means the channel
        // does not exist (or belongs to someone else), and nothing has been
        // written yet, so the existing primary designation survives.
        let path = format!(
            "/rest/v1/notification_channels?id=eq.{}&user_id=eq.{}",
            channel_id, user_id
        );

        let result: Vec<NotificationChannel> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "is_primary": true })),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))?;

        let channel = result
            .into_iter()
            .next()
            .ok_or(NotificationError::ChannelNotFound(channel_id))?;

        // Then demote every other row so exactly one primary remains.
        let clear_path = format!(
            "/rest/v1/notification_channels?user_id=eq.{}&id=neq.{}&is_primary=is.true",
            user_id, channel_id
        );
        let _: Value = self
            .supabase
            .request(
                Method::PATCH,
                &clear_path,
                Some(auth_token),
                Some(json!({ "is_primary": false })),
            )
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))?;

        Ok(channel)
    }

    pub async fn deactivate_channel(
        &self,
        user_id: Uuid,
        channel_id: Uuid,
        auth_token: &str,
    ) -> Result<NotificationChannel, NotificationError> {
        debug!("Deactivating channel {} for user {}", channel_id, user_id);

        let path = format!(
            "/rest/v1/notification_channels?id=eq.{}&user_id=eq.{}",
            channel_id, user_id
        );

        let result: Vec<NotificationChannel> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "verified": false, "is_primary": false })),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or(NotificationError::ChannelNotFound(channel_id))
    }
}

#[async_trait]
impl ChannelStore for ChannelService {
    async fn channels_for_user(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<NotificationChannel>, NotificationError> {
        let path = format!(
            "/rest/v1/notification_channels?user_id=eq.{}&verified=is.true&order=is_primary.desc,created_at.asc",
            user_id
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))
    }
}
