use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};
use uuid::Uuid;

use crate::{user::User, ExampleData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    CompanyRegistered,
    CompanyApproved,
    CompanyRejected,
    CompanySuspended,
    CompanyReactivated,
    BookingConfirmed,
    BookingCancelled,
    TripUpdate,
    RewardRedeemed,
    System,
}

impl NotificationKind {
    /// Whether the recipient's preferences allow this kind of notification.
    /// Account and company notifications are always delivered.
    pub fn allowed_by(&self, preferences: &NotificationPreferences) -> bool {
        match self {
            NotificationKind::BookingConfirmed | NotificationKind::BookingCancelled => {
                preferences.booking_updates
            }
            NotificationKind::TripUpdate => preferences.trip_updates,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub user_id: Id<User>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl HasId for Notification {
    type IdType = Uuid;
}

impl Notification {
    pub fn new(
        user_id: Id<User>,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            read: false,
            created_at: Utc::now(),
        }
    }
}

impl ExampleData for Notification {
    fn example_data() -> Self {
        Self::new(
            Id::generate(),
            NotificationKind::BookingConfirmed,
            "Réservation confirmée",
            "Votre réservation BK-7Q2M9XKD pour Dakar → Saint-Louis est confirmée.",
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub email: bool,
    pub sms: bool,
    pub push: bool,
    pub booking_updates: bool,
    pub trip_updates: bool,
    pub promotions: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            sms: false,
            push: true,
            booking_updates: true,
            trip_updates: true,
            promotions: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_filter_booking_and_trip_updates() {
        let preferences = NotificationPreferences {
            booking_updates: false,
            trip_updates: false,
            ..Default::default()
        };
        assert!(!NotificationKind::BookingConfirmed.allowed_by(&preferences));
        assert!(!NotificationKind::TripUpdate.allowed_by(&preferences));
        assert!(NotificationKind::CompanyRejected.allowed_by(&preferences));
        assert!(NotificationKind::TripUpdate.allowed_by(&NotificationPreferences::default()));
    }
}
