use model::{
    notification::{Notification, NotificationPreferences},
    user::User,
    WithId,
};
use platform::database::Result;
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{
    notification::{NotificationRow, PgNotificationKind, PreferencesRow},
    with_id, with_ids,
};

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: &Id<Notification>) -> Result<WithId<Notification>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, user_id, kind, title, message, read, created_at
        FROM notifications
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(|row: NotificationRow| with_id(row))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(
    executor: E,
    notification: WithId<Notification>,
) -> Result<WithId<Notification>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO notifications(id, user_id, kind, title, message, read, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, user_id, kind, title, message, read, created_at;
        ",
    )
    .bind(notification.id.raw())
    .bind(notification.content.user_id.raw())
    .bind(PgNotificationKind::from(notification.content.kind))
    .bind(&notification.content.title)
    .bind(&notification.content.message)
    .bind(notification.content.read)
    .bind(notification.content.created_at)
    .fetch_one(executor)
    .await
    .map(|row: NotificationRow| with_id(row))
    .map_err(convert_error)
}

pub async fn update<'c, E>(
    executor: E,
    notification: WithId<Notification>,
) -> Result<WithId<Notification>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE notifications
        SET read = $1
        WHERE id = $2
        RETURNING id, user_id, kind, title, message, read, created_at;
        ",
    )
    .bind(notification.content.read)
    .bind(notification.id.raw())
    .fetch_one(executor)
    .await
    .map(|row: NotificationRow| with_id(row))
    .map_err(convert_error)
}

pub async fn get_by_user<'c, E>(
    executor: E,
    user: &Id<User>,
    unread_only: bool,
) -> Result<Vec<WithId<Notification>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, user_id, kind, title, message, read, created_at
        FROM notifications
        WHERE user_id = $1 AND (NOT $2 OR NOT read)
        ORDER BY created_at DESC;
        ",
    )
    .bind(user.raw())
    .bind(unread_only)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|notifications: Vec<NotificationRow>| Ok(with_ids(notifications)))
}

pub async fn set_all_read<'c, E>(executor: E, user: &Id<User>) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read;")
        .bind(user.raw())
        .execute(executor)
        .await
        .map(|result| result.rows_affected())
        .map_err(convert_error)
}

pub async fn get_preferences<'c, E>(
    executor: E,
    user: &Id<User>,
) -> Result<Option<NotificationPreferences>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT email, sms, push, booking_updates, trip_updates, promotions
        FROM notification_preferences
        WHERE user_id = $1;
        ",
    )
    .bind(user.raw())
    .fetch_optional(executor)
    .await
    .map(|row: Option<PreferencesRow>| row.map(Into::into))
    .map_err(convert_error)
}

pub async fn put_preferences<'c, E>(
    executor: E,
    user: &Id<User>,
    preferences: NotificationPreferences,
) -> Result<NotificationPreferences>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO notification_preferences(
            user_id,
            email,
            sms,
            push,
            booking_updates,
            trip_updates,
            promotions
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id) DO UPDATE
        SET email = EXCLUDED.email,
            sms = EXCLUDED.sms,
            push = EXCLUDED.push,
            booking_updates = EXCLUDED.booking_updates,
            trip_updates = EXCLUDED.trip_updates,
            promotions = EXCLUDED.promotions
        RETURNING email, sms, push, booking_updates, trip_updates, promotions;
        ",
    )
    .bind(user.raw())
    .bind(preferences.email)
    .bind(preferences.sms)
    .bind(preferences.push)
    .bind(preferences.booking_updates)
    .bind(preferences.trip_updates)
    .bind(preferences.promotions)
    .fetch_one(executor)
    .await
    .map(|row: PreferencesRow| row.into())
    .map_err(convert_error)
}
