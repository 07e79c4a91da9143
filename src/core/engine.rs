use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::core::enrichment::Enricher;
use crate::core::feedback::FeedbackAdjuster;
use crate::core::matcher::{Matcher, RankingOutcome};
use crate::models::RequesterProfile;
use crate::services::{CatalogProvider, ConfigHandle, ContextFilter, FeedbackStore, StoreError};

/// Default number of catalog rows fetched per request
pub const DEFAULT_CATALOG_FETCH_LIMIT: usize = 50_000;

/// Default cap on the number of results a caller may ask for
pub const DEFAULT_MAX_LIMIT: usize = 100;

/// Errors surfaced to callers of the ranking engine
#[derive(Debug, Error)]
pub enum RankError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(#[source] StoreError),
}

/// Request-independent engine limits
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub catalog_fetch_limit: usize,
    pub max_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            catalog_fetch_limit: DEFAULT_CATALOG_FETCH_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

/// Reject a request before any scoring work starts
pub fn validate_profile(profile: &RequesterProfile, limit: usize) -> Result<(), RankError> {
    if profile.requester_id.trim().is_empty() {
        return Err(RankError::InvalidInput("requester id must not be empty".to_string()));
    }
    if profile.subjects.iter().all(|s| s.trim().is_empty()) {
        return Err(RankError::InvalidInput("at least one subject is required".to_string()));
    }
    if let Some(budget) = profile.preferences.max_budget {
        if !budget.is_finite() || budget < 0.0 {
            return Err(RankError::InvalidInput(format!(
                "budget must be a non-negative number (got {})",
                budget
            )));
        }
    }
    if limit == 0 {
        return Err(RankError::InvalidInput("limit must be at least 1".to_string()));
    }
    Ok(())
}

/// Orchestrates one ranking request over the data collaborators
pub struct RankingEngine {
    matcher: Matcher,
    catalog: Arc<dyn CatalogProvider>,
    enricher: Enricher,
    feedback: Arc<dyn FeedbackStore>,
    config: Arc<ConfigHandle>,
    settings: EngineSettings,
}

impl RankingEngine {
    pub fn new(
        matcher: Matcher,
        catalog: Arc<dyn CatalogProvider>,
        enricher: Enricher,
        feedback: Arc<dyn FeedbackStore>,
        config: Arc<ConfigHandle>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            matcher,
            catalog,
            enricher,
            feedback,
            config,
            settings,
        }
    }

    pub fn config(&self) -> &Arc<ConfigHandle> {
        &self.config
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Rank the catalog for one requester.
    ///
    /// Only a catalog failure is fatal; enrichment and feedback failures
    /// leave results unenriched or unadjusted.
    pub async fn rank(&self, profile: RequesterProfile, limit: usize) -> Result<RankingOutcome, RankError> {
        validate_profile(&profile, limit)?;
        let limit = limit.min(self.settings.max_limit);
        let start = Instant::now();

        let config = self.config.snapshot().await;

        let candidates = self
            .catalog
            .fetch_candidates(self.settings.catalog_fetch_limit)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Catalog fetch failed");
                RankError::CatalogUnavailable(e)
            })?;

        let shortlist = self.matcher.shortlist(&profile, &candidates, &config);
        let course_ids = shortlist.course_ids();

        let adjuster = FeedbackAdjuster::new(config.feedback);
        let (auxiliary, deltas) = futures::join!(
            self.enricher.resolve(&course_ids),
            self.feedback_deltas(&profile, &course_ids, &adjuster),
        );

        let outcome = self.matcher.finalize(shortlist, auxiliary, &deltas, &adjuster, limit);

        tracing::info!(
            requester_id = %profile.requester_id,
            total_candidates = outcome.total_candidates,
            survivors = outcome.survivors,
            results = outcome.results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Ranking complete"
        );

        Ok(outcome)
    }

    /// One own and at most one similar aggregate call for all survivors
    async fn feedback_deltas(
        &self,
        profile: &RequesterProfile,
        course_ids: &[String],
        adjuster: &FeedbackAdjuster,
    ) -> HashMap<String, f64> {
        if course_ids.is_empty() {
            return HashMap::new();
        }

        let own_lookup = self.feedback.aggregate_own(&profile.requester_id, course_ids);
        let similar_lookup = async {
            if !profile.has_interests() {
                return Ok(HashMap::new());
            }
            let filter = ContextFilter {
                career_interests: profile.preferences.career_interests.clone(),
            };
            self.feedback
                .aggregate_similar(course_ids, &profile.requester_id, &filter)
                .await
        };

        let (own, similar) = match futures::join!(own_lookup, similar_lookup) {
            (Ok(own), Ok(similar)) => (own, similar),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Feedback lookup failed, ranking without adjustment");
                return HashMap::new();
            }
        };

        course_ids
            .iter()
            .filter_map(|id| {
                let own_counts = own.get(id).copied().unwrap_or_default();
                let similar_counts = similar.get(id).copied().unwrap_or_default();
                let delta = adjuster.delta(own_counts, similar_counts);
                (delta != 0.0).then(|| (id.clone(), delta))
            })
            .collect()
    }
}

impl std::fmt::Debug for RankingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankingEngine")
            .field("matcher", &self.matcher)
            .field("enricher", &self.enricher)
            .field("settings", &self.settings)
            .finish()
    }
}
