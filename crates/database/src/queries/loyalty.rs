use model::{
    loyalty::{LoyaltyReward, Redemption},
    user::User,
    WithId,
};
use platform::database::Result;
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{
    loyalty::{RedemptionRow, RewardRow},
    with_id, with_ids,
};

use super::convert_error;

// Rewards

pub async fn get<'c, E>(executor: E, id: &Id<LoyaltyReward>) -> Result<WithId<LoyaltyReward>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, description, points_cost, active
        FROM loyalty_rewards
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(|row: RewardRow| with_id(row))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(
    executor: E,
    reward: WithId<LoyaltyReward>,
) -> Result<WithId<LoyaltyReward>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO loyalty_rewards(id, name, description, points_cost, active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, description, points_cost, active;
        ",
    )
    .bind(reward.id.raw())
    .bind(&reward.content.name)
    .bind(&reward.content.description)
    .bind(reward.content.points_cost)
    .bind(reward.content.active)
    .fetch_one(executor)
    .await
    .map(|row: RewardRow| with_id(row))
    .map_err(convert_error)
}

pub async fn update<'c, E>(
    executor: E,
    reward: WithId<LoyaltyReward>,
) -> Result<WithId<LoyaltyReward>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE loyalty_rewards
        SET name = $1,
            description = $2,
            points_cost = $3,
            active = $4
        WHERE id = $5
        RETURNING id, name, description, points_cost, active;
        ",
    )
    .bind(&reward.content.name)
    .bind(&reward.content.description)
    .bind(reward.content.points_cost)
    .bind(reward.content.active)
    .bind(reward.id.raw())
    .fetch_one(executor)
    .await
    .map(|row: RewardRow| with_id(row))
    .map_err(convert_error)
}

pub async fn get_rewards<'c, E>(executor: E, active_only: bool) -> Result<Vec<WithId<LoyaltyReward>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, description, points_cost, active
        FROM loyalty_rewards
        WHERE NOT $1 OR active
        ORDER BY points_cost;
        ",
    )
    .bind(active_only)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rewards: Vec<RewardRow>| Ok(with_ids(rewards)))
}

// Points

pub async fn get_points<'c, E>(executor: E, user: &Id<User>) -> Result<i64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT points FROM loyalty_accounts WHERE user_id = $1;")
        .bind(user.raw())
        .fetch_optional(executor)
        .await
        .map(|points: Option<i64>| points.unwrap_or(0))
        .map_err(convert_error)
}

pub async fn add_points<'c, E>(executor: E, user: &Id<User>, delta: i64) -> Result<i64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "
        INSERT INTO loyalty_accounts(user_id, points)
        VALUES ($1, GREATEST($2, 0))
        ON CONFLICT (user_id) DO UPDATE
        SET points = GREATEST(loyalty_accounts.points + $2, 0)
        RETURNING points;
        ",
    )
    .bind(user.raw())
    .bind(delta)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}

/// Row-level locking makes concurrent spends of the same balance wait for
/// each other, the second one sees the reduced balance.
pub async fn spend_points<'c, E>(executor: E, user: &Id<User>, amount: i64) -> Result<Option<i64>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "
        UPDATE loyalty_accounts
        SET points = points - $2
        WHERE user_id = $1 AND points >= $2
        RETURNING points;
        ",
    )
    .bind(user.raw())
    .bind(amount)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
}

// Redemptions

pub async fn insert_redemption<'c, E>(
    executor: E,
    redemption: WithId<Redemption>,
) -> Result<WithId<Redemption>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO redemptions(id, user_id, reward_id, points_spent, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, reward_id, points_spent, created_at;
        ",
    )
    .bind(redemption.id.raw())
    .bind(redemption.content.user_id.raw())
    .bind(redemption.content.reward_id.raw())
    .bind(redemption.content.points_spent)
    .bind(redemption.content.created_at)
    .fetch_one(executor)
    .await
    .map(|row: RedemptionRow| with_id(row))
    .map_err(convert_error)
}

pub async fn get_redemptions<'c, E>(executor: E, user: &Id<User>) -> Result<Vec<WithId<Redemption>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, user_id, reward_id, points_spent, created_at
        FROM redemptions
        WHERE user_id = $1
        ORDER BY created_at DESC;
        ",
    )
    .bind(user.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|redemptions: Vec<RedemptionRow>| Ok(with_ids(redemptions)))
}
