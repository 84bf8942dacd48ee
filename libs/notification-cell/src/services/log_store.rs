use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::error::NotificationError;
use crate::models::DeliveryRecord;

/// Append-only sink for delivery records. Logs are immutable once written;
/// there is no update or delete surface.
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    async fn record(
        &self,
        record: &DeliveryRecord,
        auth_token: &str,
    ) -> Result<(), NotificationError>;
}

/// Delivery log backed by the `notification_delivery_log` table.
///
/// `record` is idempotent: the insert carries the record's `dedupe_key`
/// (`user_id:notification_type:created_at_millis`) as the conflict target
/// with `resolution=ignore-duplicates`, so submitting the same record twice
/// leaves a single row.
pub struct SupabaseDeliveryLog {
    supabase: SupabaseClient,
}

impl SupabaseDeliveryLog {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn history_for_user(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<DeliveryRecord>, NotificationError> {
        let path = format!(
            "/rest/v1/notification_delivery_log?user_id=eq.{}&order=created_at.desc",
            user_id
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))
    }
}

#[async_trait]
impl DeliveryLog for SupabaseDeliveryLog {
    async fn record(
        &self,
        record: &DeliveryRecord,
        auth_token: &str,
    ) -> Result<(), NotificationError> {
        debug!(
            "Persisting delivery record {} ({} attempts)",
            record.dedupe_key,
            record.attempts.len()
        );

        let path = "/rest/v1/notification_delivery_log?on_conflict=dedupe_key";

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=ignore-duplicates"),
        );

        let _: Value = self
            .supabase
            .request_with_headers(
                Method::POST,
                path,
                Some(auth_token),
                Some(json!(record)),
                Some(headers),
            )
            .await
            .map_err(|e| NotificationError::Persistence(e.to_string()))?;

        Ok(())
    }
}
