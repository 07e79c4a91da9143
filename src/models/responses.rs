use serde::{Deserialize, Serialize};
use crate::models::domain::{CriterionWeights, RankedResult};

/// Response for the rankings endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankResponse {
    #[serde(rename = "rankingId")]
    pub ranking_id: String,
    pub results: Vec<RankedResult>,
    #[serde(rename = "totalCandidates")]
    pub total_candidates: usize,
    pub survivors: usize,
}

/// Response after reloading ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub weights: CriterionWeights,
    #[serde(rename = "interestCategories")]
    pub interest_categories: usize,
    #[serde(rename = "reloadedAt")]
    pub reloaded_at: chrono::DateTime<chrono::Utc>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
