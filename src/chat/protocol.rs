//! JSON events exchanged over the chat socket.
//!
//! Every frame is a text frame of the form `{"event": "<name>", "data": {...}}`.

use serde::{Deserialize, Serialize};

use crate::db::{ConversationId, Identity, MessageRecord, NotificationKind, NotificationRecord, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    SendMessage { conversation_id: ConversationId, content: String },
    Typing { conversation_id: ConversationId },
    StopTyping { conversation_id: ConversationId },
    MarkAsRead { conversation_id: ConversationId },
    JoinConversation { conversation_id: ConversationId },
}

/// Who is typing, with enough display fields to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl TypingPayload {
    pub fn new(identity: &Identity, conversation_id: ConversationId) -> Self {
        Self {
            user_id: identity.id,
            conversation_id,
            username: identity.username.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    NewMessage(MessageRecord),
    UserTyping(TypingPayload),
    UserStopTyping(TypingPayload),
    MessagesRead {
        conversation_id: ConversationId,
        user_id: UserId,
    },
    /// Out-of-band nudge to the counterpart of a chat message.
    Notification {
        #[serde(rename = "type")]
        kind: NotificationKind,
        conversation_id: ConversationId,
        message: MessageRecord,
    },
    NewNotification(NotificationRecord),
    UnreadNotifications {
        count: usize,
        notifications: Vec<NotificationRecord>,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::NewMessage(_) => "new_message",
            ServerEvent::UserTyping(_) => "user_typing",
            ServerEvent::UserStopTyping(_) => "user_stop_typing",
            ServerEvent::MessagesRead { .. } => "messages_read",
            ServerEvent::Notification { .. } => "notification",
            ServerEvent::NewNotification(_) => "new_notification",
            ServerEvent::UnreadNotifications { .. } => "unread_notifications",
            ServerEvent::Error { .. } => "error",
        }
    }
}

impl From<crate::AppError> for ServerEvent {
    fn from(err: crate::AppError) -> Self {
        ServerEvent::Error {
            code: err.code(),
            message: err.client_message(),
        }
    }
}
