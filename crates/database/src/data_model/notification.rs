use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    notification::{Notification, NotificationKind, NotificationPreferences},
    user::User,
    WithId,
};
use platform::database::{NotificationRepo, Repo, Result};
use sqlx::{prelude::FromRow, PgConnection};
use utility::id::Id;
use uuid::Uuid;

use crate::queries::notification::{
    get, get_by_user, get_preferences, insert, put_preferences, set_all_read, update,
};
use crate::PgOperations;

use super::DatabaseRow;

pg_enum!(PgNotificationKind, "notification_kind", NotificationKind {
    CompanyRegistered,
    CompanyApproved,
    CompanyRejected,
    CompanySuspended,
    CompanyReactivated,
    BookingConfirmed,
    BookingCancelled,
    TripUpdate,
    RewardRedeemed,
    System,
});

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: PgNotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl DatabaseRow for NotificationRow {
    type Model = Notification;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Notification {
            user_id: Id::new(self.user_id),
            kind: self.kind.into(),
            title: self.title,
            message: self.message,
            read: self.read,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct PreferencesRow {
    pub email: bool,
    pub sms: bool,
    pub push: bool,
    pub booking_updates: bool,
    pub trip_updates: bool,
    pub promotions: bool,
}

impl From<PreferencesRow> for NotificationPreferences {
    fn from(row: PreferencesRow) -> Self {
        NotificationPreferences {
            email: row.email,
            sms: row.sms,
            push: row.push,
            booking_updates: row.booking_updates,
            trip_updates: row.trip_updates,
            promotions: row.promotions,
        }
    }
}

#[async_trait]
impl<C> Repo<Notification> for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn get(&mut self, id: &Id<Notification>) -> Result<WithId<Notification>> {
        get(&mut *self.conn, id).await
    }

    async fn insert(&mut self, element: Notification) -> Result<WithId<Notification>> {
        insert(&mut *self.conn, WithId::new(Id::generate(), element)).await
    }

    async fn update(&mut self, element: WithId<Notification>) -> Result<WithId<Notification>> {
        update(&mut *self.conn, element).await
    }
}

#[async_trait]
impl<C> NotificationRepo for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn notifications_by_user(
        &mut self,
        user: &Id<User>,
        unread_only: bool,
    ) -> Result<Vec<WithId<Notification>>> {
        get_by_user(&mut *self.conn, user, unread_only).await
    }

    async fn mark_all_read(&mut self, user: &Id<User>) -> Result<u64> {
        set_all_read(&mut *self.conn, user).await
    }

    async fn preferences(&mut self, user: &Id<User>) -> Result<Option<NotificationPreferences>> {
        get_preferences(&mut *self.conn, user).await
    }

    async fn put_preferences(
        &mut self,
        user: &Id<User>,
        preferences: NotificationPreferences,
    ) -> Result<NotificationPreferences> {
        put_preferences(&mut *self.conn, user, preferences).await
    }
}
