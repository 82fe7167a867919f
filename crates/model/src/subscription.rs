use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;
use uuid::Uuid;

use crate::{
    validation::{Validate, ValidationErrors},
    ExampleData,
};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    pub name: String,
    pub monthly_price: i64,
    /// unlimited when missing.
    pub max_buses: Option<i32>,
    /// unlimited when missing.
    pub max_employees: Option<i32>,
    #[serde(default)]
    pub features: Vec<String>,
    pub active: bool,
}

impl HasId for SubscriptionPlan {
    type IdType = Uuid;
}

impl SubscriptionPlan {
    pub fn allows_buses(&self, count: usize) -> bool {
        self.max_buses
            .map(|max| count < max.max(0) as usize)
            .unwrap_or(true)
    }

    pub fn allows_employees(&self, count: usize) -> bool {
        self.max_employees
            .map(|max| count < max.max(0) as usize)
            .unwrap_or(true)
    }
}

impl ExampleData for SubscriptionPlan {
    fn example_data() -> Self {
        Self {
            name: "Standard".to_owned(),
            monthly_price: 25000,
            max_buses: Some(10),
            max_employees: Some(15),
            features: vec!["Billetterie en ligne".to_owned(), "Tableau de bord".to_owned()],
            active: true,
        }
    }
}

impl Validate for SubscriptionPlan {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .text("name", &self.name, 2, 100)
            .check(
                self.monthly_price >= 0,
                "monthlyPrice",
                "Le prix ne peut pas être négatif",
            );
        if let Some(max_buses) = self.max_buses {
            errors.positive("maxBuses", max_buses);
        }
        if let Some(max_employees) = self.max_employees {
            errors.positive("maxEmployees", max_employees);
        }
        errors.into_result()
    }
}
