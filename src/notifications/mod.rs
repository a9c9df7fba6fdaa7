//! Notification dispatcher: durable write first, live push second.

pub mod announce;
mod routes;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, put},
};

use crate::{
    AppError, AppResult, AppState,
    chat::protocol::ServerEvent,
    db::{NewNotification, NotificationId, NotificationRecord, UserId},
    registry::Registry,
    store::Store,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(routes::list).delete(routes::delete_all))
        .route("/unread", get(routes::unread))
        .route("/unread-count", get(routes::unread_count))
        .route("/mark-all-read", put(routes::mark_all_read))
        .route("/{id}/read", put(routes::mark_read))
        .route("/{id}", delete(routes::delete_one))
}

#[derive(Clone)]
pub struct Notifier {
    store: Store,
    registry: Arc<Registry>,
}

impl Notifier {
    pub fn new(store: Store, registry: Arc<Registry>) -> Self {
        Self { store, registry }
    }

    /// Store a notification and push it to the recipient if they're online.
    /// Being offline is not an error; the record is there on the next fetch.
    pub async fn notify(&self, new: NewNotification) -> AppResult<NotificationRecord> {
        let record = self.store.insert_notification(new).await?;
        let pushed = self
            .registry
            .send_to_user(record.user_id, &ServerEvent::NewNotification(record.clone()));

        tracing::debug!(
            notification_id = record.id,
            user_id = record.user_id,
            kind = ?record.kind,
            pushed,
            "notification dispatched"
        );
        Ok(record)
    }

    /// The `unread_notifications` event sent right after admission.
    pub async fn unread_snapshot(&self, user_id: UserId) -> AppResult<ServerEvent> {
        let notifications = self.store.unread_notifications(user_id).await?;
        Ok(ServerEvent::UnreadNotifications {
            count: notifications.len(),
            notifications,
        })
    }

    async fn owned(&self, caller: UserId, id: NotificationId) -> AppResult<NotificationRecord> {
        let record = self
            .store
            .find_notification(id)
            .await?
            .ok_or(AppError::NotFound("notification"))?;
        if record.user_id != caller {
            return Err(AppError::Forbidden);
        }
        Ok(record)
    }

    pub async fn mark_as_read(&self, caller: UserId, id: NotificationId) -> AppResult<()> {
        let record = self.owned(caller, id).await?;
        self.store.mark_notification_read(record.id).await?;
        Ok(())
    }

    pub async fn mark_all_as_read(&self, caller: UserId) -> AppResult<u64> {
        Ok(self.store.mark_all_notifications_read(caller).await?)
    }

    pub async fn delete(&self, caller: UserId, id: NotificationId) -> AppResult<()> {
        let record = self.owned(caller, id).await?;
        self.store.delete_notification(record.id).await?;
        Ok(())
    }

    pub async fn delete_all(&self, caller: UserId) -> AppResult<u64> {
        Ok(self.store.delete_all_notifications(caller).await?)
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }
}
