use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    activity::{Activity, ActivityKind},
    company::Company,
    WithId,
};
use platform::database::{ActivityRepo, Result};
use sqlx::{prelude::FromRow, PgConnection};
use utility::id::Id;
use uuid::Uuid;

use crate::queries::activity::{get_recent, insert};
use crate::PgOperations;

use super::DatabaseRow;

pg_enum!(PgActivityKind, "activity_kind", ActivityKind {
    CompanyRegistered,
    CompanyReviewed,
    CompanyUpdated,
    BusCreated,
    BusUpdated,
    RouteCreated,
    RouteUpdated,
    TripCreated,
    TripUpdated,
    TripStatusChanged,
    EmployeeCreated,
    EmployeeUpdated,
    BookingCreated,
    BookingCancelled,
    CounterSale,
    UserStatusChanged,
    SettingsUpdated,
});

#[derive(Debug, Clone, FromRow)]
pub struct ActivityRow {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub kind: PgActivityKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl DatabaseRow for ActivityRow {
    type Model = Activity;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Activity {
            company_id: self.company_id.map(Id::new),
            user_id: self.user_id.map(Id::new),
            kind: self.kind.into(),
            description: self.description,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl<C> ActivityRepo for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn insert_activity(&mut self, activity: Activity) -> Result<WithId<Activity>> {
        insert(&mut *self.conn, WithId::new(Id::generate(), activity)).await
    }

    async fn activities(
        &mut self,
        company: Option<&Id<Company>>,
        limit: i64,
    ) -> Result<Vec<WithId<Activity>>> {
        get_recent(&mut *self.conn, company, limit).await
    }
}
