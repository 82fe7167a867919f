use model::{company::Company, route::Route, WithId};
use platform::database::Result;
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{
    route::{PgRouteStatus, RouteRow},
    with_id, with_ids,
};

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: &Id<Route>) -> Result<WithId<Route>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, company_id, departure_city, arrival_city, distance_km,
            estimated_duration_minutes, base_price, status, created_at
        FROM routes
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(|row: RouteRow| with_id(row))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(executor: E, route: WithId<Route>) -> Result<WithId<Route>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO routes(
            id,
            company_id,
            departure_city,
            arrival_city,
            distance_km,
            estimated_duration_minutes,
            base_price,
            status,
            created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, company_id, departure_city, arrival_city, distance_km,
            estimated_duration_minutes, base_price, status, created_at;
        ",
    )
    .bind(route.id.raw())
    .bind(route.content.company_id.raw())
    .bind(&route.content.departure_city)
    .bind(&route.content.arrival_city)
    .bind(route.content.distance_km)
    .bind(route.content.estimated_duration.num_minutes())
    .bind(route.content.base_price)
    .bind(PgRouteStatus::from(route.content.status))
    .bind(route.content.created_at)
    .fetch_one(executor)
    .await
    .map(|row: RouteRow| with_id(row))
    .map_err(convert_error)
}

pub async fn update<'c, E>(executor: E, route: WithId<Route>) -> Result<WithId<Route>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE routes
        SET departure_city = $1,
            arrival_city = $2,
            distance_km = $3,
            estimated_duration_minutes = $4,
            base_price = $5,
            status = $6
        WHERE id = $7
        RETURNING id, company_id, departure_city, arrival_city, distance_km,
            estimated_duration_minutes, base_price, status, created_at;
        ",
    )
    .bind(&route.content.departure_city)
    .bind(&route.content.arrival_city)
    .bind(route.content.distance_km)
    .bind(route.content.estimated_duration.num_minutes())
    .bind(route.content.base_price)
    .bind(PgRouteStatus::from(route.content.status))
    .bind(route.id.raw())
    .fetch_one(executor)
    .await
    .map(|row: RouteRow| with_id(row))
    .map_err(convert_error)
}

pub async fn get_by_company<'c, E>(executor: E, company: &Id<Company>) -> Result<Vec<WithId<Route>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, company_id, departure_city, arrival_city, distance_km,
            estimated_duration_minutes, base_price, status, created_at
        FROM routes
        WHERE company_id = $1
        ORDER BY departure_city, arrival_city;
        ",
    )
    .bind(company.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|routes: Vec<RouteRow>| Ok(with_ids(routes)))
}
