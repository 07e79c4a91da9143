// Collaborator interfaces and their implementations
pub mod cache;
pub mod config_store;
pub mod postgres;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::models::{AuxiliaryAttributes, CandidateBatch, FeedbackCounts};

pub use cache::{CacheKey, CachedCatalog};
pub use config_store::{ConfigHandle, ConfigStore, ConfigStoreError, FileConfigStore, RankingConfig};
pub use postgres::{PostgresAuxiliaryStore, PostgresCatalog, PostgresClient, PostgresFeedbackStore};

/// Errors raised by data collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Source of candidate courses, pre-joined with their institution
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Bulk fetch; ordering is not guaranteed
    async fn fetch_candidates(&self, limit: usize) -> Result<CandidateBatch, StoreError>;
}

/// Statistical datasets that can be resolved for a batch of courses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxiliarySource {
    Employment,
    Salary,
    Earnings,
    JobDestinations,
}

impl AuxiliarySource {
    pub fn name(self) -> &'static str {
        match self {
            AuxiliarySource::Employment => "employment",
            AuxiliarySource::Salary => "salary",
            AuxiliarySource::Earnings => "earnings",
            AuxiliarySource::JobDestinations => "job_destinations",
        }
    }
}

impl fmt::Display for AuxiliarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One auxiliary dataset; resolved in a single round trip per batch
#[async_trait]
pub trait AuxiliaryDataStore: Send + Sync {
    fn source(&self) -> AuxiliarySource;

    /// Attributes for the given courses; courses without data are simply absent
    async fn batch_resolve(
        &self,
        course_ids: &[String],
    ) -> Result<HashMap<String, AuxiliaryAttributes>, StoreError>;
}

/// Selects "similar requesters" by their stored request context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextFilter {
    pub career_interests: Vec<String>,
}

/// Read side of the approve/reject feedback log
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn aggregate_own(
        &self,
        requester_id: &str,
        course_ids: &[String],
    ) -> Result<HashMap<String, FeedbackCounts>, StoreError>;

    async fn aggregate_similar(
        &self,
        course_ids: &[String],
        requester_id: &str,
        filter: &ContextFilter,
    ) -> Result<HashMap<String, FeedbackCounts>, StoreError>;
}
