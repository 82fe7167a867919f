use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    loyalty::{LoyaltyReward, Redemption},
    user::User,
    WithId,
};
use platform::database::{LoyaltyRepo, Repo, Result};
use sqlx::{prelude::FromRow, PgConnection};
use utility::id::Id;
use uuid::Uuid;

use crate::queries::loyalty::{
    add_points, get, get_points, get_redemptions, get_rewards, insert, insert_redemption,
    spend_points, update,
};
use crate::PgOperations;

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct RewardRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub points_cost: i64,
    pub active: bool,
}

impl DatabaseRow for RewardRow {
    type Model = LoyaltyReward;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        LoyaltyReward {
            name: self.name,
            description: self.description,
            points_cost: self.points_cost,
            active: self.active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RedemptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reward_id: Uuid,
    pub points_spent: i64,
    pub created_at: DateTime<Utc>,
}

impl DatabaseRow for RedemptionRow {
    type Model = Redemption;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Redemption {
            user_id: Id::new(self.user_id),
            reward_id: Id::new(self.reward_id),
            points_spent: self.points_spent,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl<C> Repo<LoyaltyReward> for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn get(&mut self, id: &Id<LoyaltyReward>) -> Result<WithId<LoyaltyReward>> {
        get(&mut *self.conn, id).await
    }

    async fn insert(&mut self, element: LoyaltyReward) -> Result<WithId<LoyaltyReward>> {
        insert(&mut *self.conn, WithId::new(Id::generate(), element)).await
    }

    async fn update(&mut self, element: WithId<LoyaltyReward>) -> Result<WithId<LoyaltyReward>> {
        update(&mut *self.conn, element).await
    }
}

#[async_trait]
impl<C> LoyaltyRepo for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn rewards(&mut self, active_only: bool) -> Result<Vec<WithId<LoyaltyReward>>> {
        get_rewards(&mut *self.conn, active_only).await
    }

    async fn loyalty_points(&mut self, user: &Id<User>) -> Result<i64> {
        get_points(&mut *self.conn, user).await
    }

    async fn add_loyalty_points(&mut self, user: &Id<User>, delta: i64) -> Result<i64> {
        add_points(&mut *self.conn, user, delta).await
    }

    async fn spend_loyalty_points(&mut self, user: &Id<User>, amount: i64) -> Result<Option<i64>> {
        spend_points(&mut *self.conn, user, amount).await
    }

    async fn insert_redemption(&mut self, redemption: Redemption) -> Result<WithId<Redemption>> {
        insert_redemption(&mut *self.conn, WithId::new(Id::generate(), redemption)).await
    }

    async fn redemptions(&mut self, user: &Id<User>) -> Result<Vec<WithId<Redemption>>> {
        get_redemptions(&mut *self.conn, user).await
    }
}
