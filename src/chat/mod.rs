mod msg;
mod new;
pub mod protocol;
mod room;
mod typing;
mod ws;

use axum::{Router, routing::get};

use crate::AppState;

/// REST routes, nested under `/api/chat`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conversations", get(room::conversations).post(new::new_conversation))
        .route(
            "/conversations/{id}/messages",
            get(room::messages).post(room::post_message),
        )
        .route("/unread-count", get(room::unread_count))
}

/// The socket endpoint, mounted at `/ws`.
pub fn ws_router() -> Router<AppState> {
    Router::new().route("/ws", get(ws::chat_ws))
}
