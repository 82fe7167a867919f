use model::{alert::SystemAlert, WithId};
use platform::database::Result;
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{
    alert::{AlertRow, PgAlertSeverity},
    with_id, with_ids,
};

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: &Id<SystemAlert>) -> Result<WithId<SystemAlert>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, severity, title, message, resolved, created_at, resolved_at
        FROM system_alerts
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(|row: AlertRow| with_id(row))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(executor: E, alert: WithId<SystemAlert>) -> Result<WithId<SystemAlert>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO system_alerts(id, severity, title, message, resolved, created_at, resolved_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, severity, title, message, resolved, created_at, resolved_at;
        ",
    )
    .bind(alert.id.raw())
    .bind(PgAlertSeverity::from(alert.content.severity))
    .bind(&alert.content.title)
    .bind(&alert.content.message)
    .bind(alert.content.resolved)
    .bind(alert.content.created_at)
    .bind(alert.content.resolved_at)
    .fetch_one(executor)
    .await
    .map(|row: AlertRow| with_id(row))
    .map_err(convert_error)
}

pub async fn update<'c, E>(executor: E, alert: WithId<SystemAlert>) -> Result<WithId<SystemAlert>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE system_alerts
        SET severity = $1,
            title = $2,
            message = $3,
            resolved = $4,
            resolved_at = $5
        WHERE id = $6
        RETURNING id, severity, title, message, resolved, created_at, resolved_at;
        ",
    )
    .bind(PgAlertSeverity::from(alert.content.severity))
    .bind(&alert.content.title)
    .bind(&alert.content.message)
    .bind(alert.content.resolved)
    .bind(alert.content.resolved_at)
    .bind(alert.id.raw())
    .fetch_one(executor)
    .await
    .map(|row: AlertRow| with_id(row))
    .map_err(convert_error)
}

pub async fn get_all<'c, E>(executor: E, include_resolved: bool) -> Result<Vec<WithId<SystemAlert>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, severity, title, message, resolved, created_at, resolved_at
        FROM system_alerts
        WHERE $1 OR NOT resolved
        ORDER BY created_at DESC;
        ",
    )
    .bind(include_resolved)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|alerts: Vec<AlertRow>| Ok(with_ids(alerts)))
}
