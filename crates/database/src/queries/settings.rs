use model::settings::SystemSettings;
use platform::database::Result;
use sqlx::{Executor, Postgres};

use crate::data_model::settings::SettingsRow;

use super::convert_error;

pub async fn get<'c, E>(executor: E) -> Result<Option<SystemSettings>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT platform_name, support_email, currency, commission_percent,
            cancellation_deadline_hours, max_seats_per_booking, allow_registrations,
            maintenance_mode
        FROM system_settings;
        ",
    )
    .fetch_optional(executor)
    .await
    .map(|row: Option<SettingsRow>| row.map(Into::into))
    .map_err(convert_error)
}

pub async fn put<'c, E>(executor: E, settings: SystemSettings) -> Result<SystemSettings>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO system_settings(
            id,
            platform_name,
            support_email,
            currency,
            commission_percent,
            cancellation_deadline_hours,
            max_seats_per_booking,
            allow_registrations,
            maintenance_mode
        )
        VALUES (TRUE, $1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE
        SET platform_name = EXCLUDED.platform_name,
            support_email = EXCLUDED.support_email,
            currency = EXCLUDED.currency,
            commission_percent = EXCLUDED.commission_percent,
            cancellation_deadline_hours = EXCLUDED.cancellation_deadline_hours,
            max_seats_per_booking = EXCLUDED.max_seats_per_booking,
            allow_registrations = EXCLUDED.allow_registrations,
            maintenance_mode = EXCLUDED.maintenance_mode
        RETURNING platform_name, support_email, currency, commission_percent,
            cancellation_deadline_hours, max_seats_per_booking, allow_registrations,
            maintenance_mode;
        ",
    )
    .bind(&settings.platform_name)
    .bind(&settings.support_email)
    .bind(&settings.currency)
    .bind(settings.commission_percent)
    .bind(settings.cancellation_deadline_hours)
    .bind(settings.max_seats_per_booking)
    .bind(settings.allow_registrations)
    .bind(settings.maintenance_mode)
    .fetch_one(executor)
    .await
    .map(|row: SettingsRow| row.into())
    .map_err(convert_error)
}
