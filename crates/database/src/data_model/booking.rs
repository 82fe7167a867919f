use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    booking::{Booking, BookingStatus, BookingTotals},
    company::Company,
    trip::Trip,
    user::User,
    WithId,
};
use platform::database::{BookingRepo, Repo, Result};
use sqlx::{prelude::FromRow, PgConnection};
use utility::id::Id;
use uuid::Uuid;

use crate::queries::booking::{
    get, get_booked_seats, get_by_trip, get_by_user, get_totals, insert, update,
};
use crate::PgOperations;

use super::DatabaseRow;

pg_enum!(PgBookingStatus, "booking_status", BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
});

#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub reference: String,
    pub trip_id: Uuid,
    pub user_id: Option<Uuid>,
    pub sold_by: Option<Uuid>,
    pub passenger_name: String,
    pub passenger_phone: Option<String>,
    pub seats: i32,
    pub total_price: i64,
    pub status: PgBookingStatus,
    pub created_at: DateTime<Utc>,
}

impl DatabaseRow for BookingRow {
    type Model = Booking;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Booking {
            reference: self.reference,
            trip_id: Id::new(self.trip_id),
            user_id: self.user_id.map(Id::new),
            sold_by: self.sold_by.map(Id::new),
            passenger_name: self.passenger_name,
            passenger_phone: self.passenger_phone,
            seats: self.seats,
            total_price: self.total_price,
            status: self.status.into(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct BookingTotalsRow {
    pub bookings: i64,
    pub seats: i64,
    pub revenue: i64,
}

impl From<BookingTotalsRow> for BookingTotals {
    fn from(row: BookingTotalsRow) -> Self {
        BookingTotals {
            bookings: row.bookings,
            seats: row.seats,
            revenue: row.revenue,
        }
    }
}

#[async_trait]
impl<C> Repo<Booking> for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn get(&mut self, id: &Id<Booking>) -> Result<WithId<Booking>> {
        get(&mut *self.conn, id).await
    }

    async fn insert(&mut self, element: Booking) -> Result<WithId<Booking>> {
        insert(&mut *self.conn, WithId::new(Id::generate(), element)).await
    }

    async fn update(&mut self, element: WithId<Booking>) -> Result<WithId<Booking>> {
        update(&mut *self.conn, element).await
    }
}

#[async_trait]
impl<C> BookingRepo for PgOperations<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn bookings_by_user(&mut self, user: &Id<User>) -> Result<Vec<WithId<Booking>>> {
        get_by_user(&mut *self.conn, user).await
    }

    async fn bookings_by_trip(&mut self, trip: &Id<Trip>) -> Result<Vec<WithId<Booking>>> {
        get_by_trip(&mut *self.conn, trip).await
    }

    async fn booked_seats(&mut self, trip: &Id<Trip>) -> Result<i64> {
        get_booked_seats(&mut *self.conn, trip).await
    }

    async fn booking_totals(&mut self, company: Option<&Id<Company>>) -> Result<BookingTotals> {
        get_totals(&mut *self.conn, company).await
    }
}
