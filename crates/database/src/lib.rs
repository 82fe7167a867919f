use std::{env, error::Error, ops::DerefMut};

use async_trait::async_trait;
use platform::database::{Database, DatabaseAutocommit, DatabaseTransaction, Result};
use queries::convert_error;
use sqlx::{pool::PoolConnection, PgConnection, Postgres, Transaction};

pub mod data_model;
pub mod queries;

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
        })
    }

    pub(self) fn postgres_url(self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

#[derive(Clone)]
pub struct PgDatabase {
    connection: sqlx::PgPool,
}

/// Database operations on one connection, either a pooled connection in
/// autocommit mode or an open transaction.
pub struct PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    conn: C,
}

pub type PgDatabaseAutocommit = PgOperations<PoolConnection<Postgres>>;
pub type PgDatabaseTransaction = PgOperations<Transaction<'static, Postgres>>;

impl DatabaseAutocommit for PgDatabaseAutocommit {}

#[async_trait]
impl DatabaseTransaction for PgDatabaseTransaction {
    async fn commit(self) -> Result<()> {
        self.conn.commit().await.map_err(convert_error)
    }
}

impl PgDatabase {
    pub async fn connect(
        database_connection_info: DatabaseConnectionInfo,
    ) -> core::result::Result<Self, Box<dyn Error>> {
        let url = database_connection_info.postgres_url();
        let pool = sqlx::postgres::PgPool::connect(&url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("database migrations are up to date");

        Ok(Self { connection: pool })
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Transaction = PgDatabaseTransaction;
    type Autocommit = PgDatabaseAutocommit;

    async fn transaction(&self) -> Result<Self::Transaction> {
        let tx = self.connection.begin().await.map_err(convert_error)?;
        Ok(PgOperations { conn: tx })
    }

    async fn auto(&self) -> Result<Self::Autocommit> {
        let conn = self.connection.acquire().await.map_err(convert_error)?;
        Ok(PgOperations { conn })
    }
}
