use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::error::NotificationError;
use crate::models::{CreateChannelRequest, SendNotificationRequest, SendNotificationResponse};
use crate::services::{ChannelService, ChannelStore, DeliveryOrchestrator, SupabaseDeliveryLog};

fn parse_user_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid user id in token".to_string()))
}

// ==============================================================================
// HEALTH
// ==============================================================================

pub async fn notification_health_check(State(state): State<Arc<AppConfig>>) -> Json<Value> {
    let status = if state.is_configured() {
        "healthy"
    } else {
        "not_configured"
    };

    Json(json!({
        "status": status,
        "email_configured": state.is_email_configured(),
        "sms_configured": state.is_sms_configured(),
    }))
}

// ==============================================================================
// DELIVERY
// ==============================================================================

/// Send a notification to the authenticated user across their verified
/// channels, primary first, stopping at the first success.
#[axum::debug_handler]
pub async fn send_notification(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SendNotificationRequest>,
) -> Result<Response, AppError> {
    let token = auth.token();
    let user_id = parse_user_id(&user)?;

    let orchestrator = DeliveryOrchestrator::from_config(&state);

    match orchestrator.deliver(user_id, &request, token).await {
        Ok(outcome) => {
            let response = SendNotificationResponse {
                success: true,
                delivered_via: Some(outcome.delivered_via),
                delivery_log: outcome.attempts,
            };
            Ok(Json(json!(response)).into_response())
        }
        Err(NotificationError::AllChannelsExhausted { attempts }) => {
            // Distinct from the no-channels case: every transport was tried
            // and the full attempt log goes back for diagnosis.
            let body = json!({
                "error": "All notification channels failed",
                "success": false,
                "delivery_log": attempts,
            });
            Ok((StatusCode::BAD_GATEWAY, Json(body)).into_response())
        }
        Err(NotificationError::NoChannelsConfigured) => Err(AppError::BadRequest(
            "No notification channels configured".to_string(),
        )),
        Err(NotificationError::Validation(msg)) => Err(AppError::ValidationError(msg)),
        Err(NotificationError::Database(msg)) => Err(AppError::Database(msg)),
        Err(e) => Err(AppError::Internal(e.to_string())),
    }
}

/// Delivery history for the authenticated user, newest first.
#[axum::debug_handler]
pub async fn get_delivery_history(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let user_id = parse_user_id(&user)?;

    let log = SupabaseDeliveryLog::new(&state);
    let records = log
        .history_for_user(user_id, token)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({ "records": records })))
}

// ==============================================================================
// CHANNEL MANAGEMENT
// ==============================================================================

/// The caller's verified channels in delivery-attempt order.
#[axum::debug_handler]
pub async fn list_channels(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let user_id = parse_user_id(&user)?;

    let service = ChannelService::new(&state);
    let channels = service
        .channels_for_user(user_id, token)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({ "channels": channels })))
}

#[axum::debug_handler]
pub async fn create_channel(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateChannelRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let token = auth.token();
    let user_id = parse_user_id(&user)?;

    if request.destination.trim().is_empty() {
        return Err(AppError::ValidationError(
            "destination must not be empty".to_string(),
        ));
    }

    let service = ChannelService::new(&state);
    let channel = service
        .create_channel(user_id, request, token)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(json!({ "channel": channel }))))
}

#[axum::debug_handler]
pub async fn verify_channel(
    State(state): State<Arc<AppConfig>>,
    Path(channel_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let user_id = parse_user_id(&user)?;

    let service = ChannelService::new(&state);
    let channel = service
        .verify_channel(user_id, channel_id, token)
        .await
        .map_err(map_channel_error)?;

    Ok(Json(json!({ "channel": channel })))
}

#[axum::debug_handler]
pub async fn make_channel_primary(
    State(state): State<Arc<AppConfig>>,
    Path(channel_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let user_id = parse_user_id(&user)?;

    let service = ChannelService::new(&state);
    let channel = service
        .make_primary(user_id, channel_id, token)
        .await
        .map_err(map_channel_error)?;

    Ok(Json(json!({ "channel": channel })))
}

/// Channels are deactivated rather than deleted so delivery history keeps
/// its audit trail.
#[axum::debug_handler]
pub async fn deactivate_channel(
    State(state): State<Arc<AppConfig>>,
    Path(channel_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let user_id = parse_user_id(&user)?;

    let service = ChannelService::new(&state);
    let channel = service
        .deactivate_channel(user_id, channel_id, token)
        .await
        .map_err(map_channel_error)?;

    Ok(Json(json!({ "channel": channel, "deactivated": true })))
}

fn map_channel_error(e: NotificationError) -> AppError {
    match e {
        NotificationError::ChannelNotFound(id) => {
            AppError::NotFound(format!("Channel not found: {}", id))
        }
        NotificationError::Validation(msg) => AppError::ValidationError(msg),
        NotificationError::Database(msg) => AppError::Database(msg),
        other => AppError::Internal(other.to_string()),
    }
}
