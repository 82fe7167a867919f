use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    validation::{Validate, ValidationErrors},
    ExampleData,
};

/// Platform wide settings, a single record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    pub platform_name: String,
    pub support_email: String,
    pub currency: String,
    pub commission_percent: i32,
    pub cancellation_deadline_hours: i32,
    pub max_seats_per_booking: i32,
    pub allow_registrations: bool,
    pub maintenance_mode: bool,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            platform_name: "Busline".to_owned(),
            support_email: "support@busline.sn".to_owned(),
            currency: "XOF".to_owned(),
            commission_percent: 5,
            cancellation_deadline_hours: 2,
            max_seats_per_booking: 10,
            allow_registrations: true,
            maintenance_mode: false,
        }
    }
}

impl ExampleData for SystemSettings {
    fn example_data() -> Self {
        Self::default()
    }
}

impl Validate for SystemSettings {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .text("platformName", &self.platform_name, 2, 100)
            .email("supportEmail", &self.support_email)
            .check(
                self.currency.len() == 3 && self.currency.chars().all(|c| c.is_ascii_uppercase()),
                "currency",
                "La devise doit être un code ISO à trois lettres",
            )
            .range("commissionPercent", self.commission_percent, 0, 100)
            .range(
                "cancellationDeadlineHours",
                self.cancellation_deadline_hours,
                0,
                168,
            )
            .range("maxSeatsPerBooking", self.max_seats_per_booking, 1, 20);
        errors.into_result()
    }
}
