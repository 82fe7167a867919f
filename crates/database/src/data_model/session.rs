use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::user::{Session, User};
use platform::database::{Result, SessionRepo};
use sqlx::{prelude::FromRow, PgConnection};
use utility::id::Id;
use uuid::Uuid;

use crate::queries::session::{delete, delete_of_user, get, put};
use crate::PgOperations;

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            token: row.token,
            user_id: Id::new(row.user_id),
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

#[async_trait]
impl<C> SessionRepo for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn put_session(&mut self, session: Session) -> Result<Session> {
        put(&mut *self.conn, session).await
    }

    async fn session(&mut self, token: &str) -> Result<Option<Session>> {
        get(&mut *self.conn, token).await
    }

    async fn delete_session(&mut self, token: &str) -> Result<()> {
        delete(&mut *self.conn, token).await
    }

    async fn delete_sessions_of(&mut self, user: &Id<User>, keep: Option<&str>) -> Result<u64> {
        delete_of_user(&mut *self.conn, user, keep).await
    }
}
