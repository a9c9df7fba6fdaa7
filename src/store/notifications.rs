use crate::db::{NewNotification, NotificationId, NotificationRecord, UserId};

use super::Store;

const NOTIFICATION_SELECT: &str =
    "SELECT id,user_id,type,title,message,link,read_status,created_at FROM notifications";

impl Store {
    pub async fn insert_notification(&self, new: NewNotification) -> Result<NotificationRecord, sqlx::Error> {
        let id = sqlx::query("INSERT INTO notifications (user_id,type,title,message,link) VALUES (?,?,?,?,?)")
            .bind(new.user_id)
            .bind(new.kind)
            .bind(&new.title)
            .bind(&new.message)
            .bind(&new.link)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        sqlx::query_as(&format!("{NOTIFICATION_SELECT} WHERE id=?"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn find_notification(&self, id: NotificationId) -> Result<Option<NotificationRecord>, sqlx::Error> {
        sqlx::query_as(&format!("{NOTIFICATION_SELECT} WHERE id=?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Newest first.
    pub async fn list_notifications(&self, user_id: UserId, limit: i64) -> Result<Vec<NotificationRecord>, sqlx::Error> {
        sqlx::query_as(&format!(
            "{NOTIFICATION_SELECT} WHERE user_id=? ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn unread_notifications(&self, user_id: UserId) -> Result<Vec<NotificationRecord>, sqlx::Error> {
        sqlx::query_as(&format!(
            "{NOTIFICATION_SELECT} WHERE user_id=? AND read_status=0 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn unread_notification_count(&self, user_id: UserId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id=? AND read_status=0")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn mark_notification_read(&self, id: NotificationId) -> Result<u64, sqlx::Error> {
        Ok(sqlx::query("UPDATE notifications SET read_status=1 WHERE id=? AND read_status=0")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected())
    }

    pub async fn mark_all_notifications_read(&self, user_id: UserId) -> Result<u64, sqlx::Error> {
        Ok(sqlx::query("UPDATE notifications SET read_status=1 WHERE user_id=? AND read_status=0")
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected())
    }

    pub async fn delete_notification(&self, id: NotificationId) -> Result<u64, sqlx::Error> {
        Ok(sqlx::query("DELETE FROM notifications WHERE id=?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected())
    }

    pub async fn delete_all_notifications(&self, user_id: UserId) -> Result<u64, sqlx::Error> {
        Ok(sqlx::query("DELETE FROM notifications WHERE user_id=?")
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected())
    }
}
