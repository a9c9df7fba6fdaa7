use axum::{Json, debug_handler};
use serde_json::{Value, json};

#[debug_handler]
pub async fn index() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "websocket": "/ws",
            "chat": "/api/chat",
            "notifications": "/api/notifications",
        },
    }))
}
