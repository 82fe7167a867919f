use chrono::{DateTime, Duration, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};
use utility::serde::date_time;
use uuid::Uuid;

use crate::{
    bus::Bus,
    company::Company,
    route::{Route, MAX_PRICE},
    validation::{Validate, ValidationErrors},
    ExampleData,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Scheduled,
    Boarding,
    Departed,
    Arrived,
    Delayed,
    Cancelled,
}

impl TripStatus {
    pub const ALL: [TripStatus; 6] = [
        TripStatus::Scheduled,
        TripStatus::Boarding,
        TripStatus::Departed,
        TripStatus::Arrived,
        TripStatus::Delayed,
        TripStatus::Cancelled,
    ];

    /// No transition leaves a final status.
    pub fn is_final(&self) -> bool {
        matches!(self, TripStatus::Arrived | TripStatus::Cancelled)
    }

    /// The bus has not left yet.
    pub fn is_upcoming(&self) -> bool {
        matches!(
            self,
            TripStatus::Scheduled | TripStatus::Delayed | TripStatus::Boarding
        )
    }

    /// Passengers can still buy or change tickets.
    pub fn is_bookable(&self) -> bool {
        matches!(self, TripStatus::Scheduled | TripStatus::Delayed)
    }

    pub fn can_transition_to(&self, next: TripStatus) -> bool {
        use TripStatus::*;
        match self {
            Scheduled | Delayed => {
                matches!(next, Boarding | Delayed | Departed | Cancelled)
                    && next != *self
            }
            Boarding => matches!(next, Departed | Delayed | Cancelled),
            Departed => next == Arrived,
            Arrived | Cancelled => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TripStatus::Scheduled => "programmé",
            TripStatus::Boarding => "en embarquement",
            TripStatus::Departed => "parti",
            TripStatus::Arrived => "arrivé",
            TripStatus::Delayed => "retardé",
            TripStatus::Cancelled => "annulé",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub company_id: Id<Company>,
    pub route_id: Id<Route>,
    pub bus_id: Id<Bus>,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: i64,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
}

impl HasId for Trip {
    type IdType = Uuid;
}

impl Trip {
    pub fn duration(&self) -> Duration {
        self.arrival_time - self.departure_time
    }
}

impl ExampleData for Trip {
    fn example_data() -> Self {
        let departure = Utc::now() + Duration::days(1);
        Self {
            company_id: Id::generate(),
            route_id: Id::generate(),
            bus_id: Id::generate(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(4),
            price: 7500,
            status: TripStatus::Scheduled,
            created_at: Utc::now(),
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripForm {
    pub route_id: Id<Route>,
    pub bus_id: Id<Bus>,
    #[serde(deserialize_with = "date_time::deserialize_utc")]
    pub departure_time: DateTime<Utc>,
    /// derived from the route's estimated duration when missing.
    #[serde(default, deserialize_with = "date_time::deserialize_utc_option")]
    pub arrival_time: Option<DateTime<Utc>>,
    /// the route's base price when missing.
    pub price: Option<i64>,
}

impl Validate for TripForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(arrival_time) = self.arrival_time {
            errors.check(
                arrival_time > self.departure_time,
                "arrivalTime",
                "L'arrivée doit être postérieure au départ",
            );
        }
        if let Some(price) = self.price {
            errors.range("price", price, 1, MAX_PRICE);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TripStatusForm {
    pub status: TripStatus,
}

/// Public trip search. All criteria are optional.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripSearch {
    pub departure_city: Option<String>,
    pub arrival_city: Option<String>,
    pub date: Option<NaiveDate>,
}

impl TripSearch {
    fn matches_city(expected: &Option<String>, actual: &str) -> bool {
        match expected.as_deref().map(str::trim) {
            Some(expected) if !expected.is_empty() => {
                expected.to_lowercase() == actual.trim().to_lowercase()
            }
            _ => true,
        }
    }

    pub fn matches(&self, trip: &Trip, route: &Route) -> bool {
        Self::matches_city(&self.departure_city, &route.departure_city)
            && Self::matches_city(&self.arrival_city, &route.arrival_city)
            && self
                .date
                .map(|date| trip.departure_time.date_naive() == date)
                .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TripStatus::*;

    #[test]
    fn final_states_are_final() {
        for next in TripStatus::ALL {
            assert!(!Arrived.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn regular_lifecycle() {
        assert!(Scheduled.can_transition_to(Boarding));
        assert!(Boarding.can_transition_to(Departed));
        assert!(Departed.can_transition_to(Arrived));
        assert!(Scheduled.can_transition_to(Delayed));
        assert!(Delayed.can_transition_to(Boarding));
        assert!(Boarding.can_transition_to(Cancelled));
    }

    #[test]
    fn no_going_back() {
        assert!(!Departed.can_transition_to(Scheduled));
        assert!(!Departed.can_transition_to(Cancelled));
        assert!(!Boarding.can_transition_to(Scheduled));
        assert!(!Scheduled.can_transition_to(Arrived));
        assert!(!Scheduled.can_transition_to(Scheduled));
        assert!(!Delayed.can_transition_to(Delayed));
    }

    #[test]
    fn status_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&Boarding).unwrap(),
            "\"BOARDING\""
        );
    }

    #[test]
    fn arrival_before_departure_is_rejected() {
        let departure = Utc::now();
        let form = TripForm {
            route_id: Id::generate(),
            bus_id: Id::generate(),
            departure_time: departure,
            arrival_time: Some(departure - Duration::minutes(1)),
            price: Some(0),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.message_for("arrivalTime").is_some());
        assert!(errors.message_for("price").is_some());
    }

    #[test]
    fn price_is_bounded() {
        let form = TripForm {
            route_id: Id::generate(),
            bus_id: Id::generate(),
            departure_time: Utc::now(),
            arrival_time: None,
            price: Some(i64::MAX / 2 + 1),
        };
        assert!(form.validate().unwrap_err().message_for("price").is_some());
    }

    #[test]
    fn trip_form_accepts_datetime_local_values() {
        let form: TripForm = serde_json::from_value(serde_json::json!({
            "routeId": Uuid::new_v4(),
            "busId": Uuid::new_v4(),
            "departureTime": "2030-01-15T07:30"
        }))
        .unwrap();
        assert_eq!(form.departure_time.to_rfc3339(), "2030-01-15T07:30:00+00:00");
        assert!(form.arrival_time.is_none());
    }

    #[test]
    fn search_matches_cities_case_insensitively() {
        let route = Route::example_data();
        let trip = Trip::example_data();
        let search = TripSearch {
            departure_city: Some(" dakar".to_owned()),
            arrival_city: Some("SAINT-LOUIS".to_owned()),
            date: Some(trip.departure_time.date_naive()),
        };
        assert!(search.matches(&trip, &route));
        let search = TripSearch {
            arrival_city: Some("Thiès".to_owned()),
            ..search
        };
        assert!(!search.matches(&trip, &route));
        assert!(TripSearch::default().matches(&trip, &route));
    }
}
