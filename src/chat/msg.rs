use crate::{
    AppError, AppResult,
    db::{Conversation, ConversationId, MessageRecord, NotificationKind, UserId},
    registry::{Connection, Registry},
    store::Store,
};

use super::protocol::ServerEvent;

/// Load a conversation `user_id` is allowed to act in.
pub(crate) async fn member_conversation(
    store: &Store,
    user_id: UserId,
    conversation_id: ConversationId,
) -> AppResult<Conversation> {
    let conversation = store
        .find_conversation(conversation_id)
        .await?
        .ok_or(AppError::NotFound("conversation"))?;

    if !conversation.has_member(user_id) {
        return Err(AppError::Forbidden);
    }
    Ok(conversation)
}

/// Validate, persist, then fan out a chat message.
///
/// The room gets `new_message`; the counterpart's directory entry also gets a
/// separate `notification`, since it may not be subscribed to the room yet.
pub(crate) async fn send_message(
    store: &Store,
    registry: &Registry,
    sender_id: UserId,
    conversation_id: ConversationId,
    content: &str,
) -> AppResult<MessageRecord> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::InvalidInput("message cannot be empty"));
    }

    let conversation = member_conversation(store, sender_id, conversation_id).await?;
    let message = store.insert_message(conversation.id, sender_id, content).await?;

    let delivered = registry.broadcast(conversation.id, &ServerEvent::NewMessage(message.clone()), None);

    let notified = match conversation.counterpart(sender_id) {
        Some(counterpart) => registry.send_to_user(
            counterpart,
            &ServerEvent::Notification {
                kind: NotificationKind::NewMessage,
                conversation_id: conversation.id,
                message: message.clone(),
            },
        ),
        None => 0,
    };

    tracing::debug!(
        conversation_id = conversation.id,
        message_id = message.id,
        sender_id,
        delivered,
        notified,
        "message sent"
    );
    Ok(message)
}

/// Flag everything the other member sent as read, then tell the rest of the
/// room. None of the reader's own connections get the receipt.
pub(crate) async fn mark_read(
    store: &Store,
    registry: &Registry,
    reader_id: UserId,
    conversation_id: ConversationId,
) -> AppResult<u64> {
    let conversation = member_conversation(store, reader_id, conversation_id).await?;
    let flipped = store.mark_messages_read(conversation.id, reader_id).await?;

    registry.broadcast(
        conversation.id,
        &ServerEvent::MessagesRead {
            conversation_id: conversation.id,
            user_id: reader_id,
        },
        Some(reader_id),
    );

    tracing::debug!(conversation_id = conversation.id, reader_id, flipped, "messages marked read");
    Ok(flipped)
}

/// Subscribe a connection to a conversation it belongs to but didn't know
/// about at admission.
pub(crate) async fn join_conversation(
    store: &Store,
    registry: &Registry,
    conn: &Connection,
    conversation_id: ConversationId,
) -> AppResult<bool> {
    let conversation = member_conversation(store, conn.user_id(), conversation_id).await?;
    Ok(registry.join_room(conversation.id, conn))
}
