use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    bus::{Bus, BusStatus},
    company::Company,
    WithId,
};
use platform::database::{BusRepo, Repo, Result};
use sqlx::{prelude::FromRow, PgConnection};
use utility::id::Id;
use uuid::Uuid;

use crate::queries::bus::{get, get_by_company, get_by_plate, insert, update};
use crate::PgOperations;

use super::DatabaseRow;

pg_enum!(PgBusStatus, "bus_status", BusStatus {
    Active,
    Maintenance,
    Inactive,
});

#[derive(Debug, Clone, FromRow)]
pub struct BusRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub plate_number: String,
    pub model: String,
    pub capacity: i32,
    pub amenities: Vec<String>,
    pub status: PgBusStatus,
    pub created_at: DateTime<Utc>,
}

impl DatabaseRow for BusRow {
    type Model = Bus;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Bus {
            company_id: Id::new(self.company_id),
            plate_number: self.plate_number,
            model: self.model,
            capacity: self.capacity,
            amenities: self.amenities,
            status: self.status.into(),
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl<C> Repo<Bus> for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn get(&mut self, id: &Id<Bus>) -> Result<WithId<Bus>> {
        get(&mut *self.conn, id).await
    }

    async fn insert(&mut self, element: Bus) -> Result<WithId<Bus>> {
        insert(&mut *self.conn, WithId::new(Id::generate(), element)).await
    }

    async fn update(&mut self, element: WithId<Bus>) -> Result<WithId<Bus>> {
        update(&mut *self.conn, element).await
    }
}

#[async_trait]
impl<C> BusRepo for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn buses_by_company(&mut self, company: &Id<Company>) -> Result<Vec<WithId<Bus>>> {
        get_by_company(&mut *self.conn, company).await
    }

    async fn bus_by_plate(
        &mut self,
        company: &Id<Company>,
        plate: &str,
    ) -> Result<Option<WithId<Bus>>> {
        get_by_plate(&mut *self.conn, company, plate).await
    }
}
