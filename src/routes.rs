use axum::{
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::Utc;

use crate::{auth, chat, subscriptions};

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub fn api_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/register", post(auth::register_user))
        .route("/api/login", post(auth::login_user))
        .route("/api/logout", post(auth::logout_user))
        .route("/api/me", get(auth::current_user))
        .route("/api/chat/ask", post(chat::api::ask))
        .route("/api/chat/history", get(chat::api::history))
        .route(
            "/api/subscriptions",
            get(subscriptions::api::list).post(subscriptions::api::create),
        )
        .route(
            "/api/subscriptions/:id/auto-renew",
            patch(subscriptions::api::toggle_auto_renew),
        )
        .route("/api/subscriptions/:id", delete(subscriptions::api::cancel))
}
