use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::AuxiliaryAttributes;
use crate::services::AuxiliaryDataStore;

/// Resolves auxiliary outcome data for surviving candidates.
///
/// Issues exactly one `batch_resolve` per configured source, whatever the
/// number of candidates, and runs the sources concurrently.
#[derive(Clone, Default)]
pub struct Enricher {
    sources: Vec<Arc<dyn AuxiliaryDataStore>>,
}

impl Enricher {
    pub fn new(sources: Vec<Arc<dyn AuxiliaryDataStore>>) -> Self {
        Self { sources }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Merge every source's attributes per course id.
    ///
    /// A failing source is logged and skipped; courses without any data are
    /// left out of the map.
    pub async fn resolve(&self, course_ids: &[String]) -> HashMap<String, AuxiliaryAttributes> {
        let mut merged: HashMap<String, AuxiliaryAttributes> = HashMap::new();
        if course_ids.is_empty() || self.sources.is_empty() {
            return merged;
        }

        let lookups = self.sources.iter().map(|source| async move {
            (source.source(), source.batch_resolve(course_ids).await)
        });

        for (source, result) in join_all(lookups).await {
            match result {
                Ok(attributes) => {
                    tracing::debug!(source = %source, resolved = attributes.len(), "Auxiliary data resolved");
                    for (id, attrs) in attributes {
                        if attrs.is_empty() {
                            continue;
                        }
                        merged.entry(id).or_default().merge(attrs);
                    }
                }
                Err(e) => {
                    tracing::warn!(source = %source, error = %e, "Auxiliary lookup failed, continuing without it");
                }
            }
        }

        merged
    }
}

impl std::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<_> = self.sources.iter().map(|s| s.source()).collect();
        f.debug_struct("Enricher").field("sources", &sources).finish()
    }
}
