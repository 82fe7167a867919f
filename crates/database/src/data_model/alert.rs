use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    alert::{AlertSeverity, SystemAlert},
    WithId,
};
use platform::database::{AlertRepo, Repo, Result};
use sqlx::{prelude::FromRow, PgConnection};
use utility::id::Id;
use uuid::Uuid;

use crate::queries::alert::{get, get_all, insert, update};
use crate::PgOperations;

use super::DatabaseRow;

pg_enum!(PgAlertSeverity, "alert_severity", AlertSeverity {
    Info,
    Warning,
    Critical,
});

#[derive(Debug, Clone, FromRow)]
pub struct AlertRow {
    pub id: Uuid,
    pub severity: PgAlertSeverity,
    pub title: String,
    pub message: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl DatabaseRow for AlertRow {
    type Model = SystemAlert;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        SystemAlert {
            severity: self.severity.into(),
            title: self.title,
            message: self.message,
            resolved: self.resolved,
            created_at: self.created_at,
            resolved_at: self.resolved_at,
        }
    }
}

#[async_trait]
impl<C> Repo<SystemAlert> for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn get(&mut self, id: &Id<SystemAlert>) -> Result<WithId<SystemAlert>> {
        get(&mut *self.conn, id).await
    }

    async fn insert(&mut self, element: SystemAlert) -> Result<WithId<SystemAlert>> {
        insert(&mut *self.conn, WithId::new(Id::generate(), element)).await
    }

    async fn update(&mut self, element: WithId<SystemAlert>) -> Result<WithId<SystemAlert>> {
        update(&mut *self.conn, element).await
    }
}

#[async_trait]
impl<C> AlertRepo for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn alerts(&mut self, include_resolved: bool) -> Result<Vec<WithId<SystemAlert>>> {
        get_all(&mut *self.conn, include_resolved).await
    }
}
