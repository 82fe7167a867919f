use std::ops::DerefMut;

use async_trait::async_trait;
use model::{subscription::SubscriptionPlan, WithId};
use platform::database::{Repo, Result, SubscriptionRepo};
use sqlx::{prelude::FromRow, PgConnection};
use utility::id::Id;
use uuid::Uuid;

use crate::queries::subscription::{get, get_all, insert, update};
use crate::PgOperations;

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub id: Uuid,
    pub name: String,
    pub monthly_price: i64,
    pub max_buses: Option<i32>,
    pub max_employees: Option<i32>,
    pub features: Vec<String>,
    pub active: bool,
}

impl DatabaseRow for PlanRow {
    type Model = SubscriptionPlan;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        SubscriptionPlan {
            name: self.name,
            monthly_price: self.monthly_price,
            max_buses: self.max_buses,
            max_employees: self.max_employees,
            features: self.features,
            active: self.active,
        }
    }
}

#[async_trait]
impl<C> Repo<SubscriptionPlan> for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn get(&mut self, id: &Id<SubscriptionPlan>) -> Result<WithId<SubscriptionPlan>> {
        get(&mut *self.conn, id).await
    }

    async fn insert(&mut self, element: SubscriptionPlan) -> Result<WithId<SubscriptionPlan>> {
        insert(&mut *self.conn, WithId::new(Id::generate(), element)).await
    }

    async fn update(
        &mut self,
        element: WithId<SubscriptionPlan>,
    ) -> Result<WithId<SubscriptionPlan>> {
        update(&mut *self.conn, element).await
    }
}

#[async_trait]
impl<C> SubscriptionRepo for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn plans(&mut self, active_only: bool) -> Result<Vec<WithId<SubscriptionPlan>>> {
        get_all(&mut *self.conn, active_only).await
    }
}
