use crate::db::{Conversation, ConversationId, ConversationSummary, UserId};

use super::Store;

/// Order a pair so the smaller id comes first.
pub(crate) fn canonical_pair(a: UserId, b: UserId) -> (UserId, UserId) {
    if a < b { (a, b) } else { (b, a) }
}

impl Store {
    /// Find the conversation between `a` and `b`, creating it if absent.
    /// Argument order doesn't matter.
    pub async fn get_or_create_conversation(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<(Conversation, bool), sqlx::Error> {
        let (user1_id, user2_id) = canonical_pair(a, b);
        let created = sqlx::query("INSERT OR IGNORE INTO conversations (user1_id,user2_id) VALUES (?,?)")
            .bind(user1_id)
            .bind(user2_id)
            .execute(&self.pool)
            .await?
            .rows_affected()
            > 0;

        let conversation = sqlx::query_as(
            "SELECT id,user1_id,user2_id,created_at FROM conversations WHERE user1_id=? AND user2_id=?",
        )
        .bind(user1_id)
        .bind(user2_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((conversation, created))
    }

    #[cfg(test)]
    pub(crate) async fn find_conversation_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        let (user1_id, user2_id) = canonical_pair(a, b);
        sqlx::query_as(
            "SELECT id,user1_id,user2_id,created_at FROM conversations WHERE user1_id=? AND user2_id=?",
        )
        .bind(user1_id)
        .bind(user2_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_conversation(&self, id: ConversationId) -> Result<Option<Conversation>, sqlx::Error> {
        sqlx::query_as("SELECT id,user1_id,user2_id,created_at FROM conversations WHERE id=?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Ids of every conversation `user_id` belongs to. Used to fill rooms at admission.
    pub async fn conversation_ids_for(&self, user_id: UserId) -> Result<Vec<ConversationId>, sqlx::Error> {
        let rows: Vec<(ConversationId,)> =
            sqlx::query_as("SELECT id FROM conversations WHERE user1_id=? OR user2_id=? ORDER BY id")
                .bind(user_id)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// The conversation list as `user_id` sees it, most recently active first.
    pub async fn conversation_summaries(&self, user_id: UserId) -> Result<Vec<ConversationSummary>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT
                c.id, c.user1_id, c.user2_id, c.created_at,
                u.id AS other_user_id,
                u.username AS other_username,
                u.first_name AS other_first_name,
                u.last_name AS other_last_name,
                u.role AS other_role,
                (SELECT content FROM messages WHERE conversation_id = c.id ORDER BY created_at DESC, id DESC LIMIT 1) AS last_message,
                (SELECT created_at FROM messages WHERE conversation_id = c.id ORDER BY created_at DESC, id DESC LIMIT 1) AS last_message_time,
                (SELECT COUNT(*) FROM messages WHERE conversation_id = c.id AND sender_id != ? AND read_status = 0) AS unread_count
            FROM conversations c
            JOIN users u ON u.id = CASE WHEN c.user1_id = ? THEN c.user2_id ELSE c.user1_id END
            WHERE c.user1_id = ? OR c.user2_id = ?
            ORDER BY last_message_time IS NULL, last_message_time DESC, c.id DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{NewIdentity, Role};

    use super::*;

    async fn user(store: &Store, name: &str, role: Role) -> UserId {
        store
            .create_identity(NewIdentity {
                username: name.to_owned(),
                role,
                first_name: name.to_owned(),
                last_name: "Test".to_owned(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn conversation_is_symmetric_and_unique() {
        let store = Store::in_memory().await.unwrap();
        let a = user(&store, "awa", Role::Student).await;
        let b = user(&store, "bakary", Role::Teacher).await;

        let (first, created) = store.get_or_create_conversation(b, a).await.unwrap();
        assert!(created);
        assert_eq!((first.user1_id, first.user2_id), (a, b));

        let (second, created) = store.get_or_create_conversation(a, b).await.unwrap();
        assert!(!created);
        assert_eq!(first, second);

        let found = store.find_conversation_between(b, a).await.unwrap();
        assert_eq!(found, Some(first));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversations")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn summaries_show_the_other_member() {
        let store = Store::in_memory().await.unwrap();
        let a = user(&store, "awa", Role::Student).await;
        let b = user(&store, "bakary", Role::Teacher).await;
        let c = user(&store, "chantal", Role::Student).await;

        let (ab, _) = store.get_or_create_conversation(a, b).await.unwrap();
        store.get_or_create_conversation(b, c).await.unwrap();
        store.insert_message(ab.id, b, "Salut").await.unwrap();

        let list = store.conversation_summaries(a).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].other_user_id, b);
        assert_eq!(list[0].other_role, Role::Teacher);
        assert_eq!(list[0].last_message.as_deref(), Some("Salut"));
        assert_eq!(list[0].unread_count, 1);

        assert_eq!(store.conversation_ids_for(b).await.unwrap().len(), 2);
        assert!(store.conversation_ids_for(c).await.unwrap().len() == 1);
    }
}
