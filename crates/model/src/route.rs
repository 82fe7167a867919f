use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};
use utility::serde::duration;
use uuid::Uuid;

use crate::{
    company::Company,
    validation::{Validate, ValidationErrors},
    ExampleData,
};

/// Highest ticket price accepted for a route or trip, in currency units.
pub const MAX_PRICE: i64 = 10_000_000;
/// Longest estimated travel time of a route.
pub const MAX_DURATION_HOURS: i64 = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub company_id: Id<Company>,
    pub departure_city: String,
    pub arrival_city: String,
    pub distance_km: i32,

    /// expected travel time, serialized as `hh:mm:ss`.
    #[serde(
        serialize_with = "duration::serialize",
        deserialize_with = "duration::deserialize"
    )]
    #[schemars(schema_with = "duration::schema")]
    pub estimated_duration: Duration,

    pub base_price: i64,
    pub status: RouteStatus,
    pub created_at: DateTime<Utc>,
}

impl HasId for Route {
    type IdType = Uuid;
}

impl Route {
    pub fn from_form(company_id: Id<Company>, form: RouteForm) -> Self {
        Self {
            company_id,
            departure_city: form.departure_city.trim().to_owned(),
            arrival_city: form.arrival_city.trim().to_owned(),
            distance_km: form.distance_km,
            estimated_duration: form.estimated_duration,
            base_price: form.base_price,
            status: form.status.unwrap_or(RouteStatus::Active),
            created_at: Utc::now(),
        }
    }

    pub fn with_form(self, form: RouteForm) -> Self {
        Self {
            departure_city: form.departure_city.trim().to_owned(),
            arrival_city: form.arrival_city.trim().to_owned(),
            distance_km: form.distance_km,
            estimated_duration: form.estimated_duration,
            base_price: form.base_price,
            status: form.status.unwrap_or(self.status),
            ..self
        }
    }

    pub fn label(&self) -> String {
        format!("{} → {}", self.departure_city, self.arrival_city)
    }
}

impl ExampleData for Route {
    fn example_data() -> Self {
        Self {
            company_id: Id::generate(),
            departure_city: "Dakar".to_owned(),
            arrival_city: "Saint-Louis".to_owned(),
            distance_km: 264,
            estimated_duration: Duration::hours(4) + Duration::minutes(30),
            base_price: 7500,
            status: RouteStatus::Active,
            created_at: Utc::now(),
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteForm {
    pub departure_city: String,
    pub arrival_city: String,
    pub distance_km: i32,
    #[serde(
        serialize_with = "duration::serialize",
        deserialize_with = "duration::deserialize"
    )]
    #[schemars(schema_with = "duration::schema")]
    pub estimated_duration: Duration,
    pub base_price: i64,
    pub status: Option<RouteStatus>,
}

impl Validate for RouteForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .text("departureCity", &self.departure_city, 2, 100)
            .text("arrivalCity", &self.arrival_city, 2, 100)
            .check(
                !self
                    .departure_city
                    .trim()
                    .eq_ignore_ascii_case(self.arrival_city.trim()),
                "arrivalCity",
                "La ville d'arrivée doit être différente de la ville de départ",
            )
            .range("distanceKm", self.distance_km, 1, 5000)
            .check(
                self.estimated_duration > Duration::zero(),
                "estimatedDuration",
                "La durée estimée doit être positive",
            )
            .check(
                self.estimated_duration <= Duration::hours(MAX_DURATION_HOURS),
                "estimatedDuration",
                &format!(
                    "La durée estimée ne doit pas dépasser {} heures",
                    MAX_DURATION_HOURS
                ),
            )
            .range("basePrice", self.base_price, 1, MAX_PRICE);
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RouteForm {
        RouteForm {
            departure_city: "Dakar".to_owned(),
            arrival_city: "Thiès".to_owned(),
            distance_km: 70,
            estimated_duration: Duration::hours(1),
            base_price: 2000,
            status: None,
        }
    }

    #[test]
    fn valid_route() {
        assert!(form().validate().is_ok());
    }

    #[test]
    fn same_cities_are_rejected() {
        let form = RouteForm {
            arrival_city: " dakar ".to_owned(),
            ..form()
        };
        assert!(form.validate().unwrap_err().message_for("arrivalCity").is_some());
    }

    #[test]
    fn duration_and_price_must_be_positive() {
        let form = RouteForm {
            estimated_duration: Duration::zero(),
            base_price: 0,
            ..form()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.message_for("estimatedDuration").is_some());
        assert!(errors.message_for("basePrice").is_some());
    }

    #[test]
    fn duration_and_price_are_bounded() {
        let form = RouteForm {
            estimated_duration: Duration::hours(MAX_DURATION_HOURS + 1),
            base_price: MAX_PRICE + 1,
            ..self::form()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.message_for("estimatedDuration").is_some());
        assert!(errors.message_for("basePrice").is_some());

        let longest = RouteForm {
            estimated_duration: Duration::hours(MAX_DURATION_HOURS),
            base_price: MAX_PRICE,
            ..self::form()
        };
        assert!(longest.validate().is_ok());
    }

    #[test]
    fn duration_deserializes_from_text() {
        let form: RouteForm = serde_json::from_value(serde_json::json!({
            "departureCity": "Dakar",
            "arrivalCity": "Touba",
            "distanceKm": 194,
            "estimatedDuration": "03:15",
            "basePrice": 5000
        }))
        .unwrap();
        assert_eq!(form.estimated_duration, Duration::minutes(195));
    }
}
