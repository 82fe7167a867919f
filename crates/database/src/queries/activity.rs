use model::{activity::Activity, company::Company, WithId};
use platform::database::Result;
use sqlx::{Executor, Postgres};
use utility::{
    id::{Id, IdWrapper},
    let_also::LetAlso,
};

use crate::data_model::{
    activity::{ActivityRow, PgActivityKind},
    with_id, with_ids,
};

use super::convert_error;

pub async fn insert<'c, E>(executor: E, activity: WithId<Activity>) -> Result<WithId<Activity>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO activities(id, company_id, user_id, kind, description, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, company_id, user_id, kind, description, created_at;
        ",
    )
    .bind(activity.id.raw())
    .bind(activity.content.company_id.as_ref().raw())
    .bind(activity.content.user_id.as_ref().raw())
    .bind(PgActivityKind::from(activity.content.kind))
    .bind(&activity.content.description)
    .bind(activity.content.created_at)
    .fetch_one(executor)
    .await
    .map(|row: ActivityRow| with_id(row))
    .map_err(convert_error)
}

pub async fn get_recent<'c, E>(
    executor: E,
    company: Option<&Id<Company>>,
    limit: i64,
) -> Result<Vec<WithId<Activity>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, company_id, user_id, kind, description, created_at
        FROM activities
        WHERE $1::UUID IS NULL OR company_id = $1
        ORDER BY created_at DESC
        LIMIT $2;
        ",
    )
    .bind(company.raw())
    .bind(limit)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|activities: Vec<ActivityRow>| Ok(with_ids(activities)))
}
