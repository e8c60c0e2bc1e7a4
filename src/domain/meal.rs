//! Meal roles and their placement precedence

use serde::{Deserialize, Serialize};

/// A meal slot in the day's plan
///
/// Variant order is placement precedence: breakfast is placed before lunch,
/// lunch before dinner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealRole {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealRole {
    /// All roles in placement precedence order
    pub const ALL: [MealRole; 3] = [MealRole::Breakfast, MealRole::Lunch, MealRole::Dinner];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
        }
    }
}

impl std::fmt::Display for MealRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MealRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            _ => Err(format!("Unknown meal role: '{}'. Use: breakfast, lunch, or dinner", s)),
        }
    }
}
