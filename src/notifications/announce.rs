//! Notifications raised by the coursework workflows.

use crate::{
    AppResult,
    db::{NewNotification, NotificationKind, NotificationRecord, Role, UserId},
};

use super::Notifier;

/// Tell every student about a newly published assignment.
pub async fn assignment_published(
    notifier: &Notifier,
    assignment_id: i64,
    title: &str,
) -> AppResult<Vec<NotificationRecord>> {
    let students = notifier.store().identity_ids_by_role(Role::Student).await?;
    let mut sent = Vec::with_capacity(students.len());
    for student_id in students {
        sent.push(
            notifier
                .notify(NewNotification {
                    user_id: student_id,
                    kind: NotificationKind::NewAssignment,
                    title: "New assignment available".to_owned(),
                    message: format!("Your teacher published a new assignment: {title}"),
                    link: Some(format!("/assignments/{assignment_id}")),
                })
                .await?,
        );
    }
    tracing::info!(assignment_id, recipients = sent.len(), "assignment announced");
    Ok(sent)
}

pub async fn submission_received(
    notifier: &Notifier,
    teacher_id: UserId,
    submission_id: i64,
    assignment_title: &str,
) -> AppResult<NotificationRecord> {
    notifier
        .notify(NewNotification {
            user_id: teacher_id,
            kind: NotificationKind::NewSubmission,
            title: "New submission received".to_owned(),
            message: format!("A student submitted the assignment: {assignment_title}"),
            link: Some(format!("/submissions/{submission_id}")),
        })
        .await
}

pub async fn comment_posted(
    notifier: &Notifier,
    student_id: UserId,
    submission_id: i64,
    assignment_title: &str,
) -> AppResult<NotificationRecord> {
    notifier
        .notify(NewNotification {
            user_id: student_id,
            kind: NotificationKind::NewComment,
            title: "New comment on your submission".to_owned(),
            message: format!("Your teacher commented on your assignment: {assignment_title}"),
            link: Some(format!("/submissions/{submission_id}")),
        })
        .await
}
