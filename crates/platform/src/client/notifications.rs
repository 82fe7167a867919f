use model::{
    notification::{Notification, NotificationPreferences},
    WithId,
};
use utility::id::Id;

use super::{Actor, Client};
use crate::{
    database::{Database, NotificationRepo, Repo},
    RequestError, RequestResult,
};

impl<D> Client<D>
where
    D: Database,
{
    /// Most recent first.
    pub async fn notifications(
        &self,
        actor: &Actor,
        unread_only: bool,
    ) -> RequestResult<Vec<WithId<Notification>>> {
        Ok(self
            .database
            .auto()
            .await?
            .notifications_by_user(&actor.id(), unread_only)
            .await?)
    }

    pub async fn mark_read(
        &self,
        actor: &Actor,
        id: &Id<Notification>,
    ) -> RequestResult<WithId<Notification>> {
        let mut auto = self.database.auto().await?;
        let notification: WithId<Notification> = auto.get(id).await?;
        if notification.content.user_id != actor.id() {
            return Err(RequestError::NotFound);
        }
        if notification.content.read {
            return Ok(notification);
        }
        Ok(auto
            .update(notification.map(|notification| Notification {
                read: true,
                ..notification
            }))
            .await?)
    }

    /// Returns how many notifications were unread.
    pub async fn mark_all_read(&self, actor: &Actor) -> RequestResult<u64> {
        Ok(self.database.auto().await?.mark_all_read(&actor.id()).await?)
    }

    pub async fn preferences(&self, actor: &Actor) -> RequestResult<NotificationPreferences> {
        Ok(self
            .database
            .auto()
            .await?
            .preferences(&actor.id())
            .await?
            .unwrap_or_default())
    }

    pub async fn update_preferences(
        &self,
        actor: &Actor,
        preferences: NotificationPreferences,
    ) -> RequestResult<NotificationPreferences> {
        Ok(self
            .database
            .auto()
            .await?
            .put_preferences(&actor.id(), preferences)
            .await?)
    }
}
