use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

/// Creates the notification routes
/// Follows the RESTful API design pattern used by other cells
pub fn notification_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(notification_health_check));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        // Delivery
        .route("/send", post(send_notification))
        .route("/history", get(get_delivery_history))

        // Channel management
        .route("/channels", get(list_channels).post(create_channel))
        .route("/channels/{channel_id}/verify", post(verify_channel))
        .route("/channels/{channel_id}/primary", post(make_channel_primary))
        .route("/channels/{channel_id}", delete(deactivate_channel))

        // Apply authentication middleware to all protected routes
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine public and protected routes
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
