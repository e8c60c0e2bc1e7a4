//! Chosen candidates with meal role and rank

use serde::{Deserialize, Serialize};

use super::meal::MealRole;

/// One candidate chosen for a meal role
///
/// Produced once by the selection stage after validation; immutable
/// thereafter. `rank` orders alternatives within a role (0 is best).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub candidate_id: String,
    pub role: MealRole,
    pub rank: u32,
    /// Short justification from the decision capability, when it gives one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_deserialize() {
        let json = r#"{"candidate_id": "osm-42", "role": "lunch", "rank": 0}"#;
        let s: Selection = serde_json::from_str(json).unwrap();
        assert_eq!(s.candidate_id, "osm-42");
        assert_eq!(s.role, MealRole::Lunch);
        assert_eq!(s.rank, 0);
        assert!(s.reason.is_none());
    }
}
