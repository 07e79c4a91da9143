use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{CareerInterestTaxonomy, CriterionWeights, FeedbackSettings};

/// Errors that can occur when loading ranking configuration
#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Config source unreachable: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing config section: {0}")]
    Missing(&'static str),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Backing store for weights, taxonomy and feedback settings
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load_weights(&self) -> Result<CriterionWeights, ConfigStoreError>;

    async fn load_taxonomy(&self) -> Result<CareerInterestTaxonomy, ConfigStoreError>;

    async fn load_feedback_settings(&self) -> Result<FeedbackSettings, ConfigStoreError>;
}

/// Layout of the ranking config file
#[derive(Debug, Deserialize)]
struct RankingFile {
    weights: Option<CriterionWeights>,
    taxonomy: Option<CareerInterestTaxonomy>,
    feedback: Option<FeedbackSettings>,
}

/// Reads ranking configuration from a TOML file on every load, so edits are
/// picked up by the next reload.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn read(&self) -> Result<RankingFile, ConfigStoreError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        Ok(toml::from_str(&raw)?)
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load_weights(&self) -> Result<CriterionWeights, ConfigStoreError> {
        let weights = self.read().await?.weights.ok_or(ConfigStoreError::Missing("weights"))?;
        if !weights.is_valid() {
            return Err(ConfigStoreError::Invalid(format!(
                "weights must be non-negative and sum to 1.0 (got {:.4})",
                weights.sum()
            )));
        }
        Ok(weights)
    }

    async fn load_taxonomy(&self) -> Result<CareerInterestTaxonomy, ConfigStoreError> {
        let taxonomy = self.read().await?.taxonomy.ok_or(ConfigStoreError::Missing("taxonomy"))?;
        if !taxonomy.is_valid() {
            return Err(ConfigStoreError::Invalid(
                "taxonomy categories need a name and positive keyword weights".to_string(),
            ));
        }
        Ok(taxonomy)
    }

    async fn load_feedback_settings(&self) -> Result<FeedbackSettings, ConfigStoreError> {
        let settings = self.read().await?.feedback.ok_or(ConfigStoreError::Missing("feedback"))?;
        if !settings.is_valid() {
            return Err(ConfigStoreError::Invalid(
                "feedback boosts must be in [0, 1] and own_weight in [0.5, 1]".to_string(),
            ));
        }
        Ok(settings)
    }
}

/// Immutable configuration snapshot used by a ranking request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingConfig {
    pub weights: CriterionWeights,
    pub taxonomy: CareerInterestTaxonomy,
    pub feedback: FeedbackSettings,
}

impl RankingConfig {
    /// Load every part from the store, substituting built-in defaults for
    /// anything unreachable or invalid
    pub async fn load(store: &dyn ConfigStore) -> Self {
        let weights = match store.load_weights().await {
            Ok(weights) if weights.is_valid() => weights,
            Ok(weights) => {
                tracing::warn!(sum = weights.sum(), "Invalid criterion weights, using defaults");
                CriterionWeights::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Criterion weights unavailable, using defaults");
                CriterionWeights::default()
            }
        };

        let taxonomy = match store.load_taxonomy().await {
            Ok(taxonomy) if taxonomy.is_valid() => taxonomy,
            Ok(_) => {
                tracing::warn!("Invalid career-interest taxonomy, using built-in");
                CareerInterestTaxonomy::builtin()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Career-interest taxonomy unavailable, using built-in");
                CareerInterestTaxonomy::builtin()
            }
        };

        let feedback = match store.load_feedback_settings().await {
            Ok(settings) if settings.is_valid() => settings,
            Ok(_) => {
                tracing::warn!("Invalid feedback settings, using defaults");
                FeedbackSettings::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Feedback settings unavailable, using defaults");
                FeedbackSettings::default()
            }
        };

        Self {
            weights,
            taxonomy,
            feedback,
        }
    }
}

/// Process-wide handle to the current configuration snapshot.
///
/// Readers clone the `Arc`; a reload builds a complete snapshot first and then
/// swaps it in with a single write.
pub struct ConfigHandle {
    store: Option<Arc<dyn ConfigStore>>,
    current: RwLock<Arc<RankingConfig>>,
}

impl ConfigHandle {
    pub async fn load(store: Arc<dyn ConfigStore>) -> Self {
        let config = RankingConfig::load(store.as_ref()).await;
        Self {
            store: Some(store),
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Handle over a fixed snapshot with no backing store
    pub fn fixed(config: RankingConfig) -> Self {
        Self {
            store: None,
            current: RwLock::new(Arc::new(config)),
        }
    }

    pub async fn snapshot(&self) -> Arc<RankingConfig> {
        self.current.read().await.clone()
    }

    /// Re-read the store and atomically replace the snapshot
    pub async fn reload(&self) -> Arc<RankingConfig> {
        let Some(store) = &self.store else {
            return self.snapshot().await;
        };

        let fresh = Arc::new(RankingConfig::load(store.as_ref()).await);
        *self.current.write().await = fresh.clone();

        tracing::info!(
            categories = fresh.taxonomy.categories.len(),
            "Ranking configuration reloaded"
        );
        fresh
    }
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("has_store", &self.store.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"
[weights]
subject = 0.4
grade = 0.2
preference = 0.2
ranking = 0.1
employability = 0.1

[feedback]
min_observations = 5
positive_boost = 0.05
negative_penalty = 0.2
own_weight = 0.8

[[taxonomy.categories]]
name = "Law"
conflicts = []
keywords = [{ term = "law", weight = 1.0 }]
"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_loads_valid_file() {
        let file = write_config(VALID);
        let store = FileConfigStore::new(file.path());
        let config = RankingConfig::load(&store).await;

        assert_eq!(config.weights.subject, 0.4);
        assert_eq!(config.feedback.min_observations, 5);
        assert_eq!(config.taxonomy.categories.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_falls_back() {
        let store = FileConfigStore::new("/nonexistent/ranking.toml");
        let config = RankingConfig::load(&store).await;

        assert_eq!(config, RankingConfig::default());
    }

    #[tokio::test]
    async fn test_bad_weights_fall_back_independently() {
        let file = write_config(&VALID.replace("subject = 0.4", "subject = 0.9"));
        let store = FileConfigStore::new(file.path());

        assert!(matches!(store.load_weights().await, Err(ConfigStoreError::Invalid(_))));

        let config = RankingConfig::load(&store).await;
        assert_eq!(config.weights, CriterionWeights::default());
        assert_eq!(config.feedback.min_observations, 5);
    }

    #[tokio::test]
    async fn test_reload_swaps_snapshot() {
        let file = write_config(VALID);
        let handle = ConfigHandle::load(Arc::new(FileConfigStore::new(file.path()))).await;
        let before = handle.snapshot().await;

        std::fs::write(file.path(), VALID.replace("subject = 0.4", "subject = 0.3").replace("grade = 0.2", "grade = 0.3")).unwrap();
        let after = handle.reload().await;

        assert_eq!(before.weights.subject, 0.4);
        assert_eq!(after.weights.subject, 0.3);
        assert_eq!(handle.snapshot().await.weights.grade, 0.3);
    }
}
