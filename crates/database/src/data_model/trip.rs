use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    company::Company,
    trip::{Trip, TripStatus},
    WithId,
};
use platform::database::{Repo, Result, TripRepo};
use sqlx::{prelude::FromRow, PgConnection};
use utility::id::Id;
use uuid::Uuid;

use crate::queries::trip::{get, get_bookable, get_by_company, get_for_update, insert, update};
use crate::PgOperations;

use super::DatabaseRow;

pg_enum!(PgTripStatus, "trip_status", TripStatus {
    Scheduled,
    Boarding,
    Departed,
    Arrived,
    Delayed,
    Cancelled,
});

#[derive(Debug, Clone, FromRow)]
pub struct TripRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub route_id: Uuid,
    pub bus_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: i64,
    pub status: PgTripStatus,
    pub created_at: DateTime<Utc>,
}

impl DatabaseRow for TripRow {
    type Model = Trip;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Trip {
            company_id: Id::new(self.company_id),
            route_id: Id::new(self.route_id),
            bus_id: Id::new(self.bus_id),
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            price: self.price,
            status: self.status.into(),
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl<C> Repo<Trip> for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn get(&mut self, id: &Id<Trip>) -> Result<WithId<Trip>> {
        get(&mut *self.conn, id).await
    }

    async fn insert(&mut self, element: Trip) -> Result<WithId<Trip>> {
        insert(&mut *self.conn, WithId::new(Id::generate(), element)).await
    }

    async fn update(&mut self, element: WithId<Trip>) -> Result<WithId<Trip>> {
        update(&mut *self.conn, element).await
    }
}

#[async_trait]
impl<C> TripRepo for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn trips_by_company(
        &mut self,
        company: &Id<Company>,
        status: Option<TripStatus>,
    ) -> Result<Vec<WithId<Trip>>> {
        get_by_company(&mut *self.conn, company, status).await
    }

    async fn bookable_trips(&mut self, after: DateTime<Utc>) -> Result<Vec<WithId<Trip>>> {
        get_bookable(&mut *self.conn, after).await
    }

    async fn trip_for_update(&mut self, id: &Id<Trip>) -> Result<WithId<Trip>> {
        get_for_update(&mut *self.conn, id).await
    }
}
