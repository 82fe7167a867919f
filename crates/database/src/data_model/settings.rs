use std::ops::DerefMut;

use async_trait::async_trait;
use model::settings::SystemSettings;
use platform::database::{Result, SettingsRepo};
use sqlx::{prelude::FromRow, PgConnection};

use crate::queries::settings::{get, put};
use crate::PgOperations;

#[derive(Debug, Clone, FromRow)]
pub struct SettingsRow {
    pub platform_name: String,
    pub support_email: String,
    pub currency: String,
    pub commission_percent: i32,
    pub cancellation_deadline_hours: i32,
    pub max_seats_per_booking: i32,
    pub allow_registrations: bool,
    pub maintenance_mode: bool,
}

impl From<SettingsRow> for SystemSettings {
    fn from(row: SettingsRow) -> Self {
        SystemSettings {
            platform_name: row.platform_name,
            support_email: row.support_email,
            currency: row.currency,
            commission_percent: row.commission_percent,
            cancellation_deadline_hours: row.cancellation_deadline_hours,
            max_seats_per_booking: row.max_seats_per_booking,
            allow_registrations: row.allow_registrations,
            maintenance_mode: row.maintenance_mode,
        }
    }
}

#[async_trait]
impl<C> SettingsRepo for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn settings(&mut self) -> Result<Option<SystemSettings>> {
        get(&mut *self.conn).await
    }

    async fn put_settings(&mut self, settings: SystemSettings) -> Result<SystemSettings> {
        put(&mut *self.conn, settings).await
    }
}
