use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::{AppResult, auth::Claims, db::NotificationId, store::DEFAULT_NOTIFICATION_LIMIT};

use super::Notifier;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list(State(notifier): State<Notifier>, claims: Claims) -> AppResult<Json<Value>> {
    let notifications = notifier
        .store()
        .list_notifications(claims.user_id, DEFAULT_NOTIFICATION_LIMIT)
        .await?;
    Ok(Json(json!({ "notifications": notifications })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn unread(State(notifier): State<Notifier>, claims: Claims) -> AppResult<Json<Value>> {
    let notifications = notifier.store().unread_notifications(claims.user_id).await?;
    Ok(Json(json!({ "notifications": notifications })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn unread_count(State(notifier): State<Notifier>, claims: Claims) -> AppResult<Json<Value>> {
    let count = notifier.store().unread_notification_count(claims.user_id).await?;
    Ok(Json(json!({ "count": count })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn mark_read(
    State(notifier): State<Notifier>,
    claims: Claims,
    Path(id): Path<NotificationId>,
) -> AppResult<Json<Value>> {
    notifier.mark_as_read(claims.user_id, id).await?;
    Ok(Json(json!({ "message": "notification marked as read" })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn mark_all_read(State(notifier): State<Notifier>, claims: Claims) -> AppResult<Json<Value>> {
    let updated = notifier.mark_all_as_read(claims.user_id).await?;
    Ok(Json(json!({ "message": "all notifications marked as read", "updated": updated })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_one(
    State(notifier): State<Notifier>,
    claims: Claims,
    Path(id): Path<NotificationId>,
) -> AppResult<Json<Value>> {
    notifier.delete(claims.user_id, id).await?;
    Ok(Json(json!({ "message": "notification deleted" })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_all(State(notifier): State<Notifier>, claims: Claims) -> AppResult<Json<Value>> {
    let deleted = notifier.delete_all(claims.user_id).await?;
    Ok(Json(json!({ "message": "all notifications deleted", "deleted": deleted })))
}
