use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type ConversationId = i64;
pub type MessageId = i64;
pub type NotificationId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
}

/// A two-party chat channel. `user1_id < user2_id` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: ConversationId,
    pub user1_id: UserId,
    pub user2_id: UserId,
    pub created_at: String,
}

impl Conversation {
    pub fn has_member(&self, user_id: UserId) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The other member, or `None` when `user_id` isn't part of this conversation.
    pub fn counterpart(&self, user_id: UserId) -> Option<UserId> {
        if self.user1_id == user_id {
            Some(self.user2_id)
        } else if self.user2_id == user_id {
            Some(self.user1_id)
        } else {
            None
        }
    }
}

/// Row of the conversation list: the conversation seen from one member.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub user1_id: UserId,
    pub user2_id: UserId,
    pub created_at: String,
    pub other_user_id: UserId,
    pub other_username: String,
    pub other_first_name: String,
    pub other_last_name: String,
    pub other_role: Role,
    pub last_message: Option<String>,
    pub last_message_time: Option<String>,
    pub unread_count: i64,
}

/// A persisted chat message joined with its sender's display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MessageRecord {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    pub read_status: bool,
    pub created_at: String,
    pub sender_username: String,
    pub sender_first_name: String,
    pub sender_last_name: String,
    pub sender_role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NotificationKind {
    NewAssignment,
    NewSubmission,
    NewComment,
    NewMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub read_status: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    role TEXT NOT NULL CHECK(role IN ('student', 'teacher')),
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS conversations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user1_id INTEGER NOT NULL REFERENCES users(id),
    user2_id INTEGER NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    CHECK(user1_id < user2_id),
    UNIQUE(user1_id, user2_id)
);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id INTEGER NOT NULL REFERENCES conversations(id),
    sender_id INTEGER NOT NULL REFERENCES users(id),
    content TEXT NOT NULL,
    read_status INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);
CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id);
CREATE INDEX IF NOT EXISTS idx_conversations_users ON conversations(user1_id, user2_id);

CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    type TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    link TEXT,
    read_status INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
"#;
