use model::{subscription::SubscriptionPlan, WithId};
use platform::database::Result;
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{subscription::PlanRow, with_id, with_ids};

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: &Id<SubscriptionPlan>) -> Result<WithId<SubscriptionPlan>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, monthly_price, max_buses, max_employees, features, active
        FROM subscription_plans
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(|row: PlanRow| with_id(row))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(
    executor: E,
    plan: WithId<SubscriptionPlan>,
) -> Result<WithId<SubscriptionPlan>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO subscription_plans(
            id,
            name,
            monthly_price,
            max_buses,
            max_employees,
            features,
            active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, name, monthly_price, max_buses, max_employees, features, active;
        ",
    )
    .bind(plan.id.raw())
    .bind(&plan.content.name)
    .bind(plan.content.monthly_price)
    .bind(plan.content.max_buses)
    .bind(plan.content.max_employees)
    .bind(&plan.content.features)
    .bind(plan.content.active)
    .fetch_one(executor)
    .await
    .map(|row: PlanRow| with_id(row))
    .map_err(convert_error)
}

pub async fn update<'c, E>(
    executor: E,
    plan: WithId<SubscriptionPlan>,
) -> Result<WithId<SubscriptionPlan>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE subscription_plans
        SET name = $1,
            monthly_price = $2,
            max_buses = $3,
            max_employees = $4,
            features = $5,
            active = $6
        WHERE id = $7
        RETURNING id, name, monthly_price, max_buses, max_employees, features, active;
        ",
    )
    .bind(&plan.content.name)
    .bind(plan.content.monthly_price)
    .bind(plan.content.max_buses)
    .bind(plan.content.max_employees)
    .bind(&plan.content.features)
    .bind(plan.content.active)
    .bind(plan.id.raw())
    .fetch_one(executor)
    .await
    .map(|row: PlanRow| with_id(row))
    .map_err(convert_error)
}

pub async fn get_all<'c, E>(executor: E, active_only: bool) -> Result<Vec<WithId<SubscriptionPlan>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, monthly_price, max_buses, max_employees, features, active
        FROM subscription_plans
        WHERE NOT $1 OR active
        ORDER BY monthly_price;
        ",
    )
    .bind(active_only)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|plans: Vec<PlanRow>| Ok(with_ids(plans)))
}
