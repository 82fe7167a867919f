use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;
use uuid::Uuid;

use crate::{
    validation::{Validate, ValidationErrors},
    ExampleData,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemAlert {
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl HasId for SystemAlert {
    type IdType = Uuid;
}

impl SystemAlert {
    pub fn from_form(form: AlertForm) -> Self {
        Self {
            severity: form.severity,
            title: form.title.trim().to_owned(),
            message: form.message.trim().to_owned(),
            resolved: false,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Resolving twice keeps the first resolution time.
    pub fn resolve(self, now: DateTime<Utc>) -> Self {
        Self {
            resolved: true,
            resolved_at: self.resolved_at.or(Some(now)),
            ..self
        }
    }
}

impl ExampleData for SystemAlert {
    fn example_data() -> Self {
        Self {
            severity: AlertSeverity::Warning,
            title: "Maintenance planifiée".to_owned(),
            message: "La base de données sera mise à jour dimanche à 3h.".to_owned(),
            resolved: false,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AlertForm {
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
}

impl Validate for AlertForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .text("title", &self.title, 3, 200)
            .text("message", &self.message, 3, 2000);
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn resolving_is_idempotent() {
        let first = Utc::now();
        let alert = SystemAlert::example_data().resolve(first);
        let alert = alert.resolve(first + Duration::hours(1));
        assert!(alert.resolved);
        assert_eq!(alert.resolved_at, Some(first));
    }
}
