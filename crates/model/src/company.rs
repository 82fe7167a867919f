use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};
use uuid::Uuid;

use crate::{
    subscription::SubscriptionPlan,
    user::User,
    validation::{normalize_email, Validate, ValidationErrors},
    ExampleData,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompanyStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl CompanyStatus {
    pub const ALL: [CompanyStatus; 4] = [
        CompanyStatus::Pending,
        CompanyStatus::Approved,
        CompanyStatus::Rejected,
        CompanyStatus::Suspended,
    ];

    /// Which review decisions are possible from this status.
    pub fn can_become(&self, next: CompanyStatus) -> bool {
        use CompanyStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Rejected, Approved)
                | (Pending, Rejected)
                | (Approved, Suspended)
                | (Suspended, Approved)
        )
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub name: String,
    pub owner_id: Id<User>,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub description: Option<String>,
    pub license_number: Option<String>,
    pub status: CompanyStatus,
    pub rejection_reason: Option<String>,
    pub subscription_plan_id: Option<Id<SubscriptionPlan>>,
    pub created_at: DateTime<Utc>,
}

impl HasId for Company {
    type IdType = Uuid;
}

impl Company {
    /// A freshly registered company, waiting for review.
    pub fn pending(owner_id: Id<User>, form: CompanyForm) -> Self {
        Self {
            name: form.name.trim().to_owned(),
            owner_id,
            email: normalize_email(&form.email),
            phone: form.phone.trim().to_owned(),
            address: form.address.trim().to_owned(),
            city: form.city.trim().to_owned(),
            description: form.description,
            license_number: form.license_number,
            status: CompanyStatus::Pending,
            rejection_reason: None,
            subscription_plan_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_profile(self, form: CompanyForm) -> Self {
        Self {
            name: form.name.trim().to_owned(),
            email: normalize_email(&form.email),
            phone: form.phone.trim().to_owned(),
            address: form.address.trim().to_owned(),
            city: form.city.trim().to_owned(),
            description: form.description,
            license_number: form.license_number,
            ..self
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == CompanyStatus::Approved
    }
}

impl ExampleData for Company {
    fn example_data() -> Self {
        Self {
            name: "Dakar Dem Dikk Express".to_owned(),
            owner_id: Id::generate(),
            email: "contact@ddd-express.sn".to_owned(),
            phone: "+221 33 800 00 00".to_owned(),
            address: "Route de Ouakam".to_owned(),
            city: "Dakar".to_owned(),
            description: Some("Liaisons interurbaines quotidiennes".to_owned()),
            license_number: Some("SN-TR-2024-0042".to_owned()),
            status: CompanyStatus::Approved,
            rejection_reason: None,
            subscription_plan_id: None,
            created_at: Utc::now(),
        }
    }
}

/// Company details as entered at registration or on the profile page.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub description: Option<String>,
    pub license_number: Option<String>,
}

impl Validate for CompanyForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .text("name", &self.name, 2, 100)
            .email("email", &self.email)
            .phone("phone", Some(&self.phone))
            .text("address", &self.address, 3, 200)
            .text("city", &self.city, 2, 100)
            .optional_text("description", self.description.as_deref(), 1000)
            .optional_text("licenseNumber", self.license_number.as_deref(), 50);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RejectionForm {
    pub reason: String,
}

impl Validate for RejectionForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.text("reason", &self.reason, 3, 500);
        errors.into_result()
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SuspensionForm {
    pub reason: Option<String>,
}

impl Validate for SuspensionForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.optional_text("reason", self.reason.as_deref(), 500);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanChoiceForm {
    pub plan_id: Id<SubscriptionPlan>,
}
