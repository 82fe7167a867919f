use chrono::{DateTime, Utc};
use model::{
    company::Company,
    trip::{Trip, TripStatus},
    WithId,
};
use platform::database::Result;
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{
    trip::{PgTripStatus, TripRow},
    with_id, with_ids,
};

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: &Id<Trip>) -> Result<WithId<Trip>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, company_id, route_id, bus_id, departure_time, arrival_time,
            price, status, created_at
        FROM trips
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(|row: TripRow| with_id(row))
    .map_err(convert_error)
}

pub async fn get_for_update<'c, E>(executor: E, id: &Id<Trip>) -> Result<WithId<Trip>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, company_id, route_id, bus_id, departure_time, arrival_time,
            price, status, created_at
        FROM trips
        WHERE id = $1
        FOR UPDATE;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(|row: TripRow| with_id(row))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(executor: E, trip: WithId<Trip>) -> Result<WithId<Trip>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO trips(
            id,
            company_id,
            route_id,
            bus_id,
            departure_time,
            arrival_time,
            price,
            status,
            created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, company_id, route_id, bus_id, departure_time, arrival_time,
            price, status, created_at;
        ",
    )
    .bind(trip.id.raw())
    .bind(trip.content.company_id.raw())
    .bind(trip.content.route_id.raw())
    .bind(trip.content.bus_id.raw())
    .bind(trip.content.departure_time)
    .bind(trip.content.arrival_time)
    .bind(trip.content.price)
    .bind(PgTripStatus::from(trip.content.status))
    .bind(trip.content.created_at)
    .fetch_one(executor)
    .await
    .map(|row: TripRow| with_id(row))
    .map_err(convert_error)
}

pub async fn update<'c, E>(executor: E, trip: WithId<Trip>) -> Result<WithId<Trip>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE trips
        SET route_id = $1,
            bus_id = $2,
            departure_time = $3,
            arrival_time = $4,
            price = $5,
            status = $6
        WHERE id = $7
        RETURNING id, company_id, route_id, bus_id, departure_time, arrival_time,
            price, status, created_at;
        ",
    )
    .bind(trip.content.route_id.raw())
    .bind(trip.content.bus_id.raw())
    .bind(trip.content.departure_time)
    .bind(trip.content.arrival_time)
    .bind(trip.content.price)
    .bind(PgTripStatus::from(trip.content.status))
    .bind(trip.id.raw())
    .fetch_one(executor)
    .await
    .map(|row: TripRow| with_id(row))
    .map_err(convert_error)
}

pub async fn get_by_company<'c, E>(
    executor: E,
    company: &Id<Company>,
    status: Option<TripStatus>,
) -> Result<Vec<WithId<Trip>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, company_id, route_id, bus_id, departure_time, arrival_time,
            price, status, created_at
        FROM trips
        WHERE company_id = $1 AND ($2::trip_status IS NULL OR status = $2)
        ORDER BY departure_time;
        ",
    )
    .bind(company.raw())
    .bind(status.map(PgTripStatus::from))
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|trips: Vec<TripRow>| Ok(with_ids(trips)))
}

pub async fn get_bookable<'c, E>(executor: E, after: DateTime<Utc>) -> Result<Vec<WithId<Trip>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, company_id, route_id, bus_id, departure_time, arrival_time,
            price, status, created_at
        FROM trips
        WHERE status IN ('SCHEDULED', 'DELAYED') AND departure_time > $1
        ORDER BY departure_time;
        ",
    )
    .bind(after)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|trips: Vec<TripRow>| Ok(with_ids(trips)))
}
