use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};
use uuid::Uuid;

use crate::{
    trip::Trip,
    user::User,
    validation::{Validate, ValidationErrors},
    ExampleData,
};

pub const REFERENCE_PREFIX: &str = "BK-";
pub const REFERENCE_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Bookings which occupy seats and count as revenue.
    pub fn is_paid(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Completed)
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub reference: String,
    pub trip_id: Id<Trip>,
    /// the client account, if booked online.
    pub user_id: Option<Id<User>>,
    /// the staff member, if sold at the counter.
    pub sold_by: Option<Id<User>>,
    pub passenger_name: String,
    pub passenger_phone: Option<String>,
    pub seats: i32,
    pub total_price: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl HasId for Booking {
    type IdType = Uuid;
}

impl ExampleData for Booking {
    fn example_data() -> Self {
        Self {
            reference: "BK-7Q2M9XKD".to_owned(),
            trip_id: Id::generate(),
            user_id: Some(Id::generate()),
            sold_by: None,
            passenger_name: "Awa Diop".to_owned(),
            passenger_phone: Some("+221 77 123 45 67".to_owned()),
            seats: 2,
            total_price: 15000,
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
        }
    }
}

/// Aggregated figures over bookings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingTotals {
    pub bookings: i64,
    pub seats: i64,
    pub revenue: i64,
}

impl BookingTotals {
    pub fn of<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> Self {
        bookings
            .into_iter()
            .filter(|booking| booking.status.is_paid())
            .fold(Self::default(), |totals, booking| Self {
                bookings: totals.bookings + 1,
                seats: totals.seats.saturating_add(booking.seats as i64),
                revenue: totals.revenue.saturating_add(booking.total_price),
            })
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingForm {
    pub trip_id: Id<Trip>,
    pub seats: i32,
    /// defaults to the account holder's name.
    pub passenger_name: Option<String>,
    pub passenger_phone: Option<String>,
}

impl Validate for BookingForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .positive("seats", self.seats)
            .optional_text("passengerName", self.passenger_name.as_deref(), 100)
            .phone("passengerPhone", self.passenger_phone.as_deref());
        errors.into_result()
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CounterSaleForm {
    pub trip_id: Id<Trip>,
    pub seats: i32,
    pub passenger_name: String,
    pub passenger_phone: Option<String>,
}

impl Validate for CounterSaleForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .positive("seats", self.seats)
            .text("passengerName", &self.passenger_name, 2, 100)
            .phone("passengerPhone", self.passenger_phone.as_deref());
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn booking(seats: i32, total_price: i64, status: BookingStatus) -> Booking {
        Booking {
            seats,
            total_price,
            status,
            ..Booking::example_data()
        }
    }

    #[test]
    fn totals_ignore_cancelled_bookings() {
        let bookings = vec![
            booking(2, 10000, BookingStatus::Confirmed),
            booking(1, 5000, BookingStatus::Cancelled),
            booking(3, 15000, BookingStatus::Completed),
        ];
        assert_eq!(
            BookingTotals::of(&bookings),
            BookingTotals {
                bookings: 2,
                seats: 5,
                revenue: 25000,
            }
        );
    }

    #[test]
    fn zero_seats_are_invalid() {
        let form = BookingForm {
            trip_id: Id::generate(),
            seats: 0,
            passenger_name: None,
            passenger_phone: None,
        };
        assert!(form.validate().unwrap_err().message_for("seats").is_some());
    }
}
