use crate::db::{ConversationId, MessageRecord, UserId};

use super::Store;

const MESSAGE_SELECT: &str = r#"
    SELECT
        m.id, m.conversation_id, m.sender_id, m.content, m.read_status, m.created_at,
        u.username AS sender_username,
        u.first_name AS sender_first_name,
        u.last_name AS sender_last_name,
        u.role AS sender_role
    FROM messages m
    JOIN users u ON m.sender_id = u.id
"#;

impl Store {
    /// Append a message and read it back with the sender's display fields.
    pub async fn insert_message(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: &str,
    ) -> Result<MessageRecord, sqlx::Error> {
        let id = sqlx::query("INSERT INTO messages (conversation_id,sender_id,content) VALUES (?,?,?)")
            .bind(conversation_id)
            .bind(sender_id)
            .bind(content)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        sqlx::query_as(&format!("{MESSAGE_SELECT} WHERE m.id=?"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    #[cfg(test)]
    pub(crate) async fn find_message(&self, id: crate::db::MessageId) -> Result<Option<MessageRecord>, sqlx::Error> {
        sqlx::query_as(&format!("{MESSAGE_SELECT} WHERE m.id=?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// The latest `limit` messages of a conversation, oldest first.
    pub async fn list_messages(
        &self,
        conversation_id: ConversationId,
        limit: i64,
    ) -> Result<Vec<MessageRecord>, sqlx::Error> {
        let mut messages: Vec<MessageRecord> = sqlx::query_as(&format!(
            "{MESSAGE_SELECT} WHERE m.conversation_id=? ORDER BY m.created_at DESC, m.id DESC LIMIT ?"
        ))
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    /// Flag every unread message of the conversation that `reader` didn't send.
    /// Returns how many rows flipped.
    pub async fn mark_messages_read(
        &self,
        conversation_id: ConversationId,
        reader: UserId,
    ) -> Result<u64, sqlx::Error> {
        Ok(
            sqlx::query("UPDATE messages SET read_status=1 WHERE conversation_id=? AND sender_id!=? AND read_status=0")
                .bind(conversation_id)
                .bind(reader)
                .execute(&self.pool)
                .await?
                .rows_affected(),
        )
    }

    /// Unread chat messages addressed to `user_id` across all conversations.
    pub async fn unread_message_count(&self, user_id: UserId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM messages m
            JOIN conversations c ON m.conversation_id = c.id
            WHERE (c.user1_id = ? OR c.user2_id = ?) AND m.sender_id != ? AND m.read_status = 0
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
