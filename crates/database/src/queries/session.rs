use model::user::{Session, User};
use platform::database::Result;
use sqlx::{Executor, Postgres};
use utility::id::Id;

use crate::data_model::session::SessionRow;

use super::convert_error;

pub async fn put<'c, E>(executor: E, session: Session) -> Result<Session>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO sessions(token, user_id, created_at, expires_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (token) DO UPDATE
        SET expires_at = EXCLUDED.expires_at
        RETURNING token, user_id, created_at, expires_at;
        ",
    )
    .bind(&session.token)
    .bind(session.user_id.raw())
    .bind(session.created_at)
    .bind(session.expires_at)
    .fetch_one(executor)
    .await
    .map(|row: SessionRow| row.into())
    .map_err(convert_error)
}

pub async fn get<'c, E>(executor: E, token: &str) -> Result<Option<Session>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT token, user_id, created_at, expires_at
        FROM sessions
        WHERE token = $1;
        ",
    )
    .bind(token)
    .fetch_optional(executor)
    .await
    .map(|row: Option<SessionRow>| row.map(Into::into))
    .map_err(convert_error)
}

pub async fn delete<'c, E>(executor: E, token: &str) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM sessions WHERE token = $1;")
        .bind(token)
        .execute(executor)
        .await
        .map(|_| ())
        .map_err(convert_error)
}

pub async fn delete_of_user<'c, E>(executor: E, user: &Id<User>, keep: Option<&str>) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        DELETE FROM sessions
        WHERE user_id = $1 AND ($2::TEXT IS NULL OR token <> $2);
        ",
    )
    .bind(user.raw())
    .bind(keep)
    .execute(executor)
    .await
    .map(|result| result.rows_affected())
    .map_err(convert_error)
}
