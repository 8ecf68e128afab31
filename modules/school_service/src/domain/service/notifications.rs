//! Per-user notifications

use super::{internal, Service};
use crate::contract::{
    ListQuery, NewNotification, Notification, NotificationPatch, Page, SchoolError, User,
};
use crate::domain::repository::NotificationFilter;
use crate::domain::validation::validate_text;

const MESSAGE_MAX_LEN: usize = 2_000;

impl Service {
    pub async fn list_notifications(
        &self,
        actor: &User,
        query: &ListQuery,
    ) -> Result<Page<Notification>, SchoolError> {
        let filter = NotificationFilter {
            user_id: (!actor.is_staff).then_some(actor.id),
        };
        let notifications = self
            .repos
            .notifications
            .list(&filter)
            .await
            .map_err(internal)?;
        self.page(notifications, query)
    }

    pub async fn get_notification(
        &self,
        actor: &User,
        id: i64,
    ) -> Result<Notification, SchoolError> {
        self.repos
            .notifications
            .find_by_id(id)
            .await
            .map_err(internal)?
            .filter(|n| actor.is_staff || n.user_id == actor.id)
            .ok_or_else(|| SchoolError::not_found("notification", id))
    }

    /// Notifications are always addressed to the caller
    pub async fn create_notification(
        &self,
        actor: &User,
        input: NewNotification,
    ) -> Result<Notification, SchoolError> {
        validate_text("message", &input.message, MESSAGE_MAX_LEN)?;
        let notification = Notification {
            id: 0,
            user_id: actor.id,
            message: input.message,
            created_at: self.now(),
            is_read: false,
        };
        self.repos
            .notifications
            .create(&notification)
            .await
            .map_err(internal)
    }

    pub async fn update_notification(
        &self,
        actor: &User,
        id: i64,
        patch: NotificationPatch,
    ) -> Result<Notification, SchoolError> {
        let mut notification = self.get_notification(actor, id).await?;
        if let Some(message) = patch.message {
            validate_text("message", &message, MESSAGE_MAX_LEN)?;
            notification.message = message;
        }
        if let Some(is_read) = patch.is_read {
            notification.is_read = is_read;
        }
        self.repos
            .notifications
            .update(&notification)
            .await
            .map_err(internal)
    }

    pub async fn delete_notification(&self, actor: &User, id: i64) -> Result<(), SchoolError> {
        let notification = self.get_notification(actor, id).await?;
        self.repos
            .notifications
            .delete(notification.id)
            .await
            .map_err(internal)?;
        Ok(())
    }
}
