use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};
use uuid::Uuid;

use crate::{
    user::User,
    validation::{Validate, ValidationErrors},
    ExampleData, WithId,
};

/// Currency units per loyalty point.
pub const UNITS_PER_POINT: i64 = 100;
pub const SILVER_THRESHOLD: i64 = 500;
pub const GOLD_THRESHOLD: i64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoyaltyTier {
    Bronze,
    Silver,
    Gold,
}

impl LoyaltyTier {
    pub fn for_points(points: i64) -> Self {
        if points < SILVER_THRESHOLD {
            LoyaltyTier::Bronze
        } else if points < GOLD_THRESHOLD {
            LoyaltyTier::Silver
        } else {
            LoyaltyTier::Gold
        }
    }

    /// Points still missing to reach the next tier, none at the top.
    pub fn points_to_next(points: i64) -> Option<i64> {
        match Self::for_points(points) {
            LoyaltyTier::Bronze => Some(SILVER_THRESHOLD - points),
            LoyaltyTier::Silver => Some(GOLD_THRESHOLD - points),
            LoyaltyTier::Gold => None,
        }
    }
}

pub fn points_for(amount: i64) -> i64 {
    amount.max(0) / UNITS_PER_POINT
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyReward {
    pub name: String,
    pub description: String,
    pub points_cost: i64,
    pub active: bool,
}

impl HasId for LoyaltyReward {
    type IdType = Uuid;
}

impl Validate for LoyaltyReward {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .text("name", &self.name, 2, 100)
            .text("description", &self.description, 0, 1000)
            .positive("pointsCost", self.points_cost);
        errors.into_result()
    }
}

impl ExampleData for LoyaltyReward {
    fn example_data() -> Self {
        Self {
            name: "Trajet Dakar - Thiès offert".to_owned(),
            description: "Un aller simple sur la ligne Dakar - Thiès".to_owned(),
            points_cost: 300,
            active: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub user_id: Id<User>,
    pub reward_id: Id<LoyaltyReward>,
    pub points_spent: i64,
    pub created_at: DateTime<Utc>,
}

impl HasId for Redemption {
    type IdType = Uuid;
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAccount {
    pub points: i64,
    pub tier: LoyaltyTier,
    pub points_to_next_tier: Option<i64>,
    pub redemptions: Vec<WithId<Redemption>>,
}

impl LoyaltyAccount {
    pub fn new(points: i64, redemptions: Vec<WithId<Redemption>>) -> Self {
        Self {
            points,
            tier: LoyaltyTier::for_points(points),
            points_to_next_tier: LoyaltyTier::points_to_next(points),
            redemptions,
        }
    }
}
