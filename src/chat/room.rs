use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppResult, AppState,
    auth::Claims,
    db::ConversationId,
    store::DEFAULT_MESSAGE_LIMIT,
};

use super::msg;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn conversations(State(state): State<AppState>, claims: Claims) -> AppResult<Json<Value>> {
    let conversations = state.store.conversation_summaries(claims.user_id).await?;
    Ok(Json(json!({ "conversations": conversations })))
}

/// Recent history of a conversation. Fetching it counts as reading it.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn messages(
    State(state): State<AppState>,
    claims: Claims,
    Path(conversation_id): Path<ConversationId>,
) -> AppResult<Json<Value>> {
    let conversation = msg::member_conversation(&state.store, claims.user_id, conversation_id).await?;
    let messages = state.store.list_messages(conversation.id, DEFAULT_MESSAGE_LIMIT).await?;
    msg::mark_read(&state.store, &state.registry, claims.user_id, conversation.id).await?;

    Ok(Json(json!({ "messages": messages })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostMessage {
    #[serde(default)]
    content: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn post_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(conversation_id): Path<ConversationId>,
    Json(PostMessage { content }): Json<PostMessage>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let message = msg::send_message(&state.store, &state.registry, claims.user_id, conversation_id, &content).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": message }))))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn unread_count(State(state): State<AppState>, claims: Claims) -> AppResult<Json<Value>> {
    let count = state.store.unread_message_count(claims.user_id).await?;
    Ok(Json(json!({ "count": count })))
}
