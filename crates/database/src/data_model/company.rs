use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    company::{Company, CompanyStatus},
    user::User,
    WithId,
};
use platform::database::{CompanyRepo, Repo, Result};
use sqlx::{prelude::FromRow, PgConnection};
use utility::id::Id;
use uuid::Uuid;

use crate::queries::company::{get, get_all, get_by_owner, insert, update};
use crate::PgOperations;

use super::DatabaseRow;

pg_enum!(PgCompanyStatus, "company_status", CompanyStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
});

#[derive(Debug, Clone, FromRow)]
pub struct CompanyRow {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub description: Option<String>,
    pub license_number: Option<String>,
    pub status: PgCompanyStatus,
    pub rejection_reason: Option<String>,
    pub subscription_plan_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl DatabaseRow for CompanyRow {
    type Model = Company;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Company {
            name: self.name,
            owner_id: Id::new(self.owner_id),
            email: self.email,
            phone: self.phone,
            address: self.address,
            city: self.city,
            description: self.description,
            license_number: self.license_number,
            status: self.status.into(),
            rejection_reason: self.rejection_reason,
            subscription_plan_id: self.subscription_plan_id.map(Id::new),
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl<C> Repo<Company> for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn get(&mut self, id: &Id<Company>) -> Result<WithId<Company>> {
        get(&mut *self.conn, id).await
    }

    async fn insert(&mut self, element: Company) -> Result<WithId<Company>> {
        insert(&mut *self.conn, WithId::new(Id::generate(), element)).await
    }

    async fn update(&mut self, element: WithId<Company>) -> Result<WithId<Company>> {
        update(&mut *self.conn, element).await
    }
}

#[async_trait]
impl<C> CompanyRepo for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn company_by_owner(&mut self, owner: &Id<User>) -> Result<Option<WithId<Company>>> {
        get_by_owner(&mut *self.conn, owner).await
    }

    async fn companies(&mut self, status: Option<CompanyStatus>) -> Result<Vec<WithId<Company>>> {
        get_all(&mut *self.conn, status).await
    }
}
