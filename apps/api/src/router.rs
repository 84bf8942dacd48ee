use std::sync::Arc;

use axum::{routing::get, Router};

use notification_cell::router::notification_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic notifications API is running!" }))
        .nest("/notifications", notification_routes(state.clone()))
}
