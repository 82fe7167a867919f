use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use model::{
    company::Company,
    route::{Route, RouteStatus},
    WithId,
};
use platform::database::{Repo, Result, RouteRepo};
use sqlx::{prelude::FromRow, PgConnection};
use utility::id::Id;
use uuid::Uuid;

use crate::queries::route::{get, get_by_company, insert, update};
use crate::PgOperations;

use super::DatabaseRow;

pg_enum!(PgRouteStatus, "route_status", RouteStatus { Active, Inactive });

#[derive(Debug, Clone, FromRow)]
pub struct RouteRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub departure_city: String,
    pub arrival_city: String,
    pub distance_km: i32,
    pub estimated_duration_minutes: i64,
    pub base_price: i64,
    pub status: PgRouteStatus,
    pub created_at: DateTime<Utc>,
}

impl DatabaseRow for RouteRow {
    type Model = Route;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Route {
            company_id: Id::new(self.company_id),
            departure_city: self.departure_city,
            arrival_city: self.arrival_city,
            distance_km: self.distance_km,
            estimated_duration: Duration::minutes(self.estimated_duration_minutes),
            base_price: self.base_price,
            status: self.status.into(),
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl<C> Repo<Route> for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn get(&mut self, id: &Id<Route>) -> Result<WithId<Route>> {
        get(&mut *self.conn, id).await
    }

    async fn insert(&mut self, element: Route) -> Result<WithId<Route>> {
        insert(&mut *self.conn, WithId::new(Id::generate(), element)).await
    }

    async fn update(&mut self, element: WithId<Route>) -> Result<WithId<Route>> {
        update(&mut *self.conn, element).await
    }
}

#[async_trait]
impl<C> RouteRepo for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn routes_by_company(&mut self, company: &Id<Company>) -> Result<Vec<WithId<Route>>> {
        get_by_company(&mut *self.conn, company).await
    }
}
