use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};
use uuid::Uuid;

use crate::{company::Company, user::User, ExampleData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    CompanyRegistered,
    CompanyReviewed,
    CompanyUpdated,
    BusCreated,
    BusUpdated,
    RouteCreated,
    RouteUpdated,
    TripCreated,
    TripUpdated,
    TripStatusChanged,
    EmployeeCreated,
    EmployeeUpdated,
    BookingCreated,
    BookingCancelled,
    CounterSale,
    UserStatusChanged,
    SettingsUpdated,
}

/// An entry of the audit trail shown on dashboards.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub company_id: Option<Id<Company>>,
    pub user_id: Option<Id<User>>,
    pub kind: ActivityKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl HasId for Activity {
    type IdType = Uuid;
}

impl Activity {
    pub fn new(
        company_id: Option<Id<Company>>,
        user_id: Option<Id<User>>,
        kind: ActivityKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            company_id,
            user_id,
            kind,
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

impl ExampleData for Activity {
    fn example_data() -> Self {
        Self::new(
            Some(Id::generate()),
            Some(Id::generate()),
            ActivityKind::BusCreated,
            "Bus DK-1234-AB ajouté",
        )
    }
}
