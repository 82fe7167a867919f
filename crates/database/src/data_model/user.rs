use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    company::Company,
    user::{AccountStatus, Role, User},
    WithId,
};
use platform::database::{Repo, Result, UserRepo};
use sqlx::{prelude::FromRow, PgConnection};
use utility::id::Id;
use uuid::Uuid;

use crate::queries::user::{
    get, get_all, get_by_company, get_by_email, get_password_hash, insert, set_password_hash,
    update,
};
use crate::PgOperations;

use super::DatabaseRow;

pg_enum!(PgRole, "user_role", Role {
    Admin,
    Patron,
    Gestionnaire,
    Caissier,
    Client,
});

pg_enum!(PgAccountStatus, "account_status", AccountStatus {
    Active,
    Inactive,
    Suspended,
});

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: PgRole,
    pub company_id: Option<Uuid>,
    pub status: PgAccountStatus,
    pub created_at: DateTime<Utc>,
}

impl DatabaseRow for UserRow {
    type Model = User;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        User {
            email: self.email,
            full_name: self.full_name,
            phone: self.phone,
            role: self.role.into(),
            company_id: self.company_id.map(Id::new),
            status: self.status.into(),
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl<C> Repo<User> for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn get(&mut self, id: &Id<User>) -> Result<WithId<User>> {
        get(&mut *self.conn, id).await
    }

    async fn insert(&mut self, element: User) -> Result<WithId<User>> {
        insert(&mut *self.conn, WithId::new(Id::generate(), element)).await
    }

    async fn update(&mut self, element: WithId<User>) -> Result<WithId<User>> {
        update(&mut *self.conn, element).await
    }
}

#[async_trait]
impl<C> UserRepo for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn user_by_email(&mut self, email: &str) -> Result<Option<WithId<User>>> {
        get_by_email(&mut *self.conn, email).await
    }

    async fn password_hash(&mut self, id: &Id<User>) -> Result<Option<String>> {
        get_password_hash(&mut *self.conn, id).await
    }

    async fn set_password_hash(&mut self, id: &Id<User>, hash: &str) -> Result<()> {
        set_password_hash(&mut *self.conn, id, hash).await
    }

    async fn users_by_company(&mut self, company: &Id<Company>) -> Result<Vec<WithId<User>>> {
        get_by_company(&mut *self.conn, company).await
    }

    async fn users(&mut self, role: Option<Role>) -> Result<Vec<WithId<User>>> {
        get_all(&mut *self.conn, role).await
    }
}
