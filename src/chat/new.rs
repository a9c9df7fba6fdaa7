use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppError, AppResult, AppState, auth::Claims, db::UserId};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewConversation {
    user_id: Option<UserId>,
}

/// Open (or reopen) the conversation with another user. When it is new, both
/// members' live connections join its room right away.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_conversation(
    State(state): State<AppState>,
    claims: Claims,
    Json(NewConversation { user_id }): Json<NewConversation>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let other = user_id.ok_or(AppError::InvalidInput("userId is required"))?;
    if other == claims.user_id {
        return Err(AppError::InvalidInput("cannot start a conversation with yourself"));
    }
    state
        .store
        .find_identity(other)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    let (conversation, created) = state.store.get_or_create_conversation(claims.user_id, other).await?;
    if created {
        for member in [conversation.user1_id, conversation.user2_id] {
            for conn in state.registry.connections_of(member) {
                state.registry.join_room(conversation.id, &conn);
            }
        }
        tracing::info!(conversation_id = conversation.id, "conversation created");
    }

    Ok((StatusCode::CREATED, Json(json!({ "conversation": conversation }))))
}
