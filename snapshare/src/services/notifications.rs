use log::{debug, error};

use crate::{
    client::SnapshareClient,
    errors::AppError,
    id::generate_document_id,
    live::LiveView,
    models::{Notification, NotificationKind, UserProfile},
    store::{FieldUpdate, Query},
};

use super::now;

#[derive(Clone)]
pub struct NotificationService {
    client: SnapshareClient,
}

impl NotificationService {
    pub fn new(client: SnapshareClient) -> Self {
        Self { client }
    }

    fn for_recipient(&self, recipient_id: &str) -> Query {
        self.client
            .notifications()
            .query()
            .where_eq("recipientId", recipient_id)
    }

    /// Records a notification from `sender` to `recipient_id`, with the sender's
    /// display fields copied in.
    pub async fn create(
        &self,
        recipient_id: &str,
        sender: &UserProfile,
        kind: NotificationKind,
        message: impl Into<String>,
        post_id: Option<&str>,
    ) -> Result<Notification, AppError> {
        let notification = Notification {
            id: generate_document_id(),
            recipient_id: recipient_id.to_string(),
            sender_id: sender.id.clone(),
            kind,
            message: message.into(),
            post_id: post_id.map(str::to_string),
            read: false,
            created_at: now(),
            sender: sender.snapshot(),
        };
        self.client
            .notifications()
            .set(&notification)
            .await
            .inspect_err(|err| error!("failed to create {} notification: {err}", kind.as_str()))?;
        debug!("notified {recipient_id} ({})", kind.as_str());
        Ok(notification)
    }

    /// Notifications for `viewer`, newest first.
    pub async fn list(&self, viewer: &str) -> Result<Vec<Notification>, AppError> {
        let mut notifications = self
            .client
            .notifications()
            .find_many(&self.for_recipient(viewer))
            .await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    pub async fn watch(&self, viewer: &str) -> Result<LiveView<Notification>, AppError> {
        let subscription = self
            .client
            .notifications()
            .subscribe(self.for_recipient(viewer))
            .await?;
        Ok(LiveView::new(subscription).sorted_by(|a: &Notification, b: &Notification| {
            b.created_at.cmp(&a.created_at)
        }))
    }

    pub async fn unread_count(&self, viewer: &str) -> Result<usize, AppError> {
        let unread = self
            .client
            .notifications()
            .find_many(&self.for_recipient(viewer).where_eq("read", false))
            .await?;
        Ok(unread.len())
    }

    /// Marks every unread notification of `viewer` as read, one write each.
    /// Returns how many were updated.
    pub async fn mark_all_read(&self, viewer: &str) -> Result<usize, AppError> {
        let notifications = self.client.notifications();
        let unread = notifications
            .find_many(&self.for_recipient(viewer).where_eq("read", false))
            .await?;
        for notification in &unread {
            notifications
                .update(&notification.id, &[FieldUpdate::set("read", true)])
                .await
                .inspect_err(|err| error!("failed to mark notification {} read: {err}", notification.id))?;
        }
        Ok(unread.len())
    }
}
