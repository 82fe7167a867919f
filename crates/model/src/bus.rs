use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};
use uuid::Uuid;

use crate::{
    company::Company,
    validation::{Validate, ValidationErrors},
    ExampleData,
};

pub const MIN_CAPACITY: i32 = 10;
pub const MAX_CAPACITY: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusStatus {
    Active,
    Maintenance,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub company_id: Id<Company>,
    pub plate_number: String,
    pub model: String,
    pub capacity: i32,
    pub amenities: Vec<String>,
    pub status: BusStatus,
    pub created_at: DateTime<Utc>,
}

impl HasId for Bus {
    type IdType = Uuid;
}

impl Bus {
    pub fn from_form(company_id: Id<Company>, form: BusForm) -> Self {
        Self {
            company_id,
            plate_number: normalize_plate(&form.plate_number),
            model: form.model.trim().to_owned(),
            capacity: form.capacity,
            amenities: clean_amenities(form.amenities),
            status: form.status.unwrap_or(BusStatus::Active),
            created_at: Utc::now(),
        }
    }

    pub fn with_form(self, form: BusForm) -> Self {
        Self {
            plate_number: normalize_plate(&form.plate_number),
            model: form.model.trim().to_owned(),
            capacity: form.capacity,
            amenities: clean_amenities(form.amenities),
            status: form.status.unwrap_or(self.status),
            ..self
        }
    }
}

impl ExampleData for Bus {
    fn example_data() -> Self {
        Self {
            company_id: Id::generate(),
            plate_number: "DK-1234-AB".to_owned(),
            model: "Mercedes Tourismo".to_owned(),
            capacity: 55,
            amenities: vec!["Climatisation".to_owned(), "Wi-Fi".to_owned()],
            status: BusStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// Plates are compared case and whitespace insensitive.
pub fn normalize_plate(plate: &str) -> String {
    plate
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("")
        .to_uppercase()
}

fn clean_amenities(amenities: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(amenities.len());
    for amenity in amenities {
        let amenity = amenity.trim().to_owned();
        if !amenity.is_empty() && !cleaned.contains(&amenity) {
            cleaned.push(amenity);
        }
    }
    cleaned
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusForm {
    pub plate_number: String,
    pub model: String,
    pub capacity: i32,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub status: Option<BusStatus>,
}

impl Validate for BusForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .text("plateNumber", &self.plate_number, 4, 20)
            .text("model", &self.model, 2, 100)
            .range("capacity", self.capacity, MIN_CAPACITY, MAX_CAPACITY)
            .check(
                self.amenities.len() <= 20,
                "amenities",
                "Vingt équipements au maximum",
            );
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plates_are_normalized() {
        assert_eq!(normalize_plate(" dk 1234 ab "), "DK1234AB");
        assert_eq!(normalize_plate("DK-1234-AB"), "DK-1234-AB");
    }

    #[test]
    fn amenities_are_trimmed_and_deduplicated() {
        let bus = Bus::from_form(
            Id::generate(),
            BusForm {
                plate_number: "DK-1".to_owned(),
                model: "Sprinter".to_owned(),
                capacity: 20,
                amenities: vec![" Wi-Fi ".to_owned(), "Wi-Fi".to_owned(), "".to_owned()],
                status: None,
            },
        );
        assert_eq!(bus.amenities, vec!["Wi-Fi".to_owned()]);
        assert_eq!(bus.status, BusStatus::Active);
    }

    #[test]
    fn capacity_bounds() {
        let form = BusForm {
            plate_number: "DK-1234".to_owned(),
            model: "Sprinter".to_owned(),
            capacity: 9,
            amenities: vec![],
            status: None,
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.message_for("capacity").is_some());
    }
}
