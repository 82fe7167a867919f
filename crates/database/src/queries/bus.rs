use model::{bus::Bus, company::Company, WithId};
use platform::database::Result;
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{
    bus::{BusRow, PgBusStatus},
    with_id, with_ids,
};

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: &Id<Bus>) -> Result<WithId<Bus>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, company_id, plate_number, model, capacity, amenities, status, created_at
        FROM buses
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(|row: BusRow| with_id(row))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(executor: E, bus: WithId<Bus>) -> Result<WithId<Bus>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO buses(
            id,
            company_id,
            plate_number,
            model,
            capacity,
            amenities,
            status,
            created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, company_id, plate_number, model, capacity, amenities, status, created_at;
        ",
    )
    .bind(bus.id.raw())
    .bind(bus.content.company_id.raw())
    .bind(&bus.content.plate_number)
    .bind(&bus.content.model)
    .bind(bus.content.capacity)
    .bind(&bus.content.amenities)
    .bind(PgBusStatus::from(bus.content.status))
    .bind(bus.content.created_at)
    .fetch_one(executor)
    .await
    .map(|row: BusRow| with_id(row))
    .map_err(convert_error)
}

pub async fn update<'c, E>(executor: E, bus: WithId<Bus>) -> Result<WithId<Bus>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE buses
        SET plate_number = $1,
            model = $2,
            capacity = $3,
            amenities = $4,
            status = $5
        WHERE id = $6
        RETURNING id, company_id, plate_number, model, capacity, amenities, status, created_at;
        ",
    )
    .bind(&bus.content.plate_number)
    .bind(&bus.content.model)
    .bind(bus.content.capacity)
    .bind(&bus.content.amenities)
    .bind(PgBusStatus::from(bus.content.status))
    .bind(bus.id.raw())
    .fetch_one(executor)
    .await
    .map(|row: BusRow| with_id(row))
    .map_err(convert_error)
}

pub async fn get_by_company<'c, E>(executor: E, company: &Id<Company>) -> Result<Vec<WithId<Bus>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, company_id, plate_number, model, capacity, amenities, status, created_at
        FROM buses
        WHERE company_id = $1
        ORDER BY plate_number;
        ",
    )
    .bind(company.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|buses: Vec<BusRow>| Ok(with_ids(buses)))
}

pub async fn get_by_plate<'c, E>(
    executor: E,
    company: &Id<Company>,
    plate: &str,
) -> Result<Option<WithId<Bus>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, company_id, plate_number, model, capacity, amenities, status, created_at
        FROM buses
        WHERE company_id = $1 AND plate_number = $2;
        ",
    )
    .bind(company.raw())
    .bind(plate)
    .fetch_optional(executor)
    .await
    .map(|row: Option<BusRow>| row.map(with_id))
    .map_err(convert_error)
}
