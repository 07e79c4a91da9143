use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::core::engine::RankError;
use crate::models::domain::{PreferenceSet, RequesterProfile};
use crate::models::grade::Grade;

/// Request to rank courses for a requester
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RankRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "requester_id", rename = "requesterId")]
    pub requester_id: String,
    #[validate(length(min = 1))]
    pub subjects: Vec<String>,
    #[serde(alias = "predicted_grades", rename = "predictedGrades", default)]
    pub predicted_grades: HashMap<String, String>,
    #[serde(default)]
    pub preferences: PreferenceSet,
    /// Falls back to the configured default when absent
    #[validate(range(min = 1))]
    #[serde(default)]
    pub limit: Option<u16>,
}

impl RankRequest {
    /// Parse grades and build the request-scoped profile.
    ///
    /// Grade strings are the only part of the request that needs parsing;
    /// the remaining checks happen in the engine so non-HTTP callers get them too.
    pub fn into_profile(self) -> Result<RequesterProfile, RankError> {
        let mut predicted_grades = HashMap::with_capacity(self.predicted_grades.len());
        for (subject, raw) in self.predicted_grades {
            let grade: Grade = raw.parse().map_err(|e| {
                RankError::InvalidInput(format!("predicted grade for '{}': {}", subject, e))
            })?;
            predicted_grades.insert(subject, grade);
        }

        Ok(RequesterProfile {
            requester_id: self.requester_id,
            subjects: self.subjects,
            predicted_grades,
            preferences: self.preferences,
        })
    }
}
