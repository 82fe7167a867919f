use model::{
    booking::{Booking, BookingTotals},
    company::Company,
    trip::Trip,
    user::User,
    WithId,
};
use platform::database::Result;
use sqlx::{Executor, Postgres};
use utility::{
    id::{Id, IdWrapper},
    let_also::LetAlso,
};

use crate::data_model::{
    booking::{BookingRow, BookingTotalsRow, PgBookingStatus},
    with_id, with_ids,
};

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: &Id<Booking>) -> Result<WithId<Booking>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, reference, trip_id, user_id, sold_by, passenger_name, passenger_phone,
            seats, total_price, status, created_at
        FROM bookings
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(|row: BookingRow| with_id(row))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(executor: E, booking: WithId<Booking>) -> Result<WithId<Booking>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO bookings(
            id,
            reference,
            trip_id,
            user_id,
            sold_by,
            passenger_name,
            passenger_phone,
            seats,
            total_price,
            status,
            created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id, reference, trip_id, user_id, sold_by, passenger_name, passenger_phone,
            seats, total_price, status, created_at;
        ",
    )
    .bind(booking.id.raw())
    .bind(&booking.content.reference)
    .bind(booking.content.trip_id.raw())
    .bind(booking.content.user_id.as_ref().raw())
    .bind(booking.content.sold_by.as_ref().raw())
    .bind(&booking.content.passenger_name)
    .bind(&booking.content.passenger_phone)
    .bind(booking.content.seats)
    .bind(booking.content.total_price)
    .bind(PgBookingStatus::from(booking.content.status))
    .bind(booking.content.created_at)
    .fetch_one(executor)
    .await
    .map(|row: BookingRow| with_id(row))
    .map_err(convert_error)
}

/// Only the passenger details and the status of a booking can change.
pub async fn update<'c, E>(executor: E, booking: WithId<Booking>) -> Result<WithId<Booking>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE bookings
        SET passenger_name = $1,
            passenger_phone = $2,
            status = $3
        WHERE id = $4
        RETURNING id, reference, trip_id, user_id, sold_by, passenger_name, passenger_phone,
            seats, total_price, status, created_at;
        ",
    )
    .bind(&booking.content.passenger_name)
    .bind(&booking.content.passenger_phone)
    .bind(PgBookingStatus::from(booking.content.status))
    .bind(booking.id.raw())
    .fetch_one(executor)
    .await
    .map(|row: BookingRow| with_id(row))
    .map_err(convert_error)
}

pub async fn get_by_user<'c, E>(executor: E, user: &Id<User>) -> Result<Vec<WithId<Booking>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, reference, trip_id, user_id, sold_by, passenger_name, passenger_phone,
            seats, total_price, status, created_at
        FROM bookings
        WHERE user_id = $1
        ORDER BY created_at DESC;
        ",
    )
    .bind(user.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|bookings: Vec<BookingRow>| Ok(with_ids(bookings)))
}

pub async fn get_by_trip<'c, E>(executor: E, trip: &Id<Trip>) -> Result<Vec<WithId<Booking>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, reference, trip_id, user_id, sold_by, passenger_name, passenger_phone,
            seats, total_price, status, created_at
        FROM bookings
        WHERE trip_id = $1
        ORDER BY created_at;
        ",
    )
    .bind(trip.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|bookings: Vec<BookingRow>| Ok(with_ids(bookings)))
}

pub async fn get_booked_seats<'c, E>(executor: E, trip: &Id<Trip>) -> Result<i64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "
        SELECT COALESCE(SUM(seats), 0)::BIGINT
        FROM bookings
        WHERE trip_id = $1 AND status = 'CONFIRMED';
        ",
    )
    .bind(trip.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}

pub async fn get_totals<'c, E>(executor: E, company: Option<&Id<Company>>) -> Result<BookingTotals>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT COUNT(*)::BIGINT AS bookings,
            COALESCE(SUM(b.seats), 0)::BIGINT AS seats,
            COALESCE(SUM(b.total_price), 0)::BIGINT AS revenue
        FROM bookings b
        JOIN trips t ON t.id = b.trip_id
        WHERE b.status IN ('CONFIRMED', 'COMPLETED')
            AND ($1::UUID IS NULL OR t.company_id = $1);
        ",
    )
    .bind(company.raw())
    .fetch_one(executor)
    .await
    .map(|row: BookingTotalsRow| row.into())
    .map_err(convert_error)
}
