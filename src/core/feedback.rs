use crate::core::scoring::clamp_unit;
use crate::models::{FeedbackCounts, FeedbackSettings};

/// Converts approve/reject aggregates into a bounded score adjustment
#[derive(Debug, Clone, Copy)]
pub struct FeedbackAdjuster {
    settings: FeedbackSettings,
}

impl FeedbackAdjuster {
    pub fn new(settings: FeedbackSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FeedbackSettings {
        &self.settings
    }

    /// Signed delta in [-1, 1] from the requester's own history and that of
    /// similar requesters. Sparse feedback yields 0.
    pub fn delta(&self, own: FeedbackCounts, similar: FeedbackCounts) -> f64 {
        let observations = own.total().saturating_add(similar.total());
        if observations == 0 || observations < self.settings.min_observations {
            return 0.0;
        }

        let own_weight = self.settings.own_weight;
        let combined = own_weight * own.net_ratio() + (1.0 - own_weight) * similar.net_ratio();
        combined.clamp(-1.0, 1.0)
    }

    /// Score change produced by a delta
    pub fn adjustment(&self, delta: f64) -> f64 {
        if delta > 0.0 {
            delta * self.settings.positive_boost
        } else {
            delta * self.settings.negative_penalty
        }
    }

    /// Apply a delta to a composite score, staying within [0, 1]
    pub fn apply(&self, score: f64, delta: f64) -> f64 {
        clamp_unit(score + self.adjustment(delta))
    }
}

impl Default for FeedbackAdjuster {
    fn default() -> Self {
        Self::new(FeedbackSettings::default())
    }
}
