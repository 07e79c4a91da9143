use crate::core::subjects::{contains_term, normalize_text};
use crate::models::{CareerInterestTaxonomy, InterestCategory};

/// A keyword at least this strong decides a category match on its own
pub const STRONG_KEYWORD_WEIGHT: f64 = 0.5;

/// Weak keywords match a category once their weights add up to this
pub const CUMULATIVE_MATCH_WEIGHT: f64 = 1.0;

/// Slack for float error when summing weak keyword weights
const WEIGHT_EPSILON: f64 = 1e-9;

/// Relationship between a course and the requester's declared interests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterestClassification {
    pub aligned: bool,
    pub conflicting: bool,
    /// Declared interest the course aligned with first
    pub aligned_with: Option<String>,
}

#[derive(Debug, Clone)]
struct ResolvedCategory {
    name: String,
    keywords: Vec<(String, f64)>,
}

impl ResolvedCategory {
    fn from_category(category: &InterestCategory) -> Self {
        Self {
            name: category.name.clone(),
            keywords: category
                .keywords
                .iter()
                .map(|k| (normalize_text(&k.term), k.weight))
                .filter(|(term, _)| !term.is_empty())
                .collect(),
        }
    }

    /// Keywords are walked in priority order; first strong hit wins
    fn matches(&self, text: &str) -> bool {
        let mut accumulated = 0.0;
        for (term, weight) in &self.keywords {
            if !contains_term(text, term) {
                continue;
            }
            if *weight >= STRONG_KEYWORD_WEIGHT {
                return true;
            }
            accumulated += weight;
            if accumulated >= CUMULATIVE_MATCH_WEIGHT - WEIGHT_EPSILON {
                return true;
            }
        }
        false
    }
}

/// Declared interests resolved against the taxonomy, built once per request
#[derive(Debug, Clone, Default)]
pub struct InterestFilter {
    declared: Vec<ResolvedCategory>,
    conflicts: Vec<ResolvedCategory>,
}

impl InterestFilter {
    pub fn new(declared: &[String], taxonomy: &CareerInterestTaxonomy) -> Self {
        let mut resolved = Vec::new();
        let mut known: Vec<&InterestCategory> = Vec::new();

        for interest in declared {
            if interest.trim().is_empty() {
                continue;
            }
            match taxonomy.find(interest) {
                Some(category) => {
                    known.push(category);
                    resolved.push(ResolvedCategory::from_category(category));
                }
                None => {
                    tracing::debug!(interest = %interest, "Interest not in taxonomy, matching on its text");
                    resolved.push(ResolvedCategory::from_category(&InterestCategory::ad_hoc(interest)));
                }
            }
        }

        let conflicts = taxonomy
            .categories
            .iter()
            .filter(|c| known.iter().any(|d| d.conflicts_with(&c.name)))
            .filter(|c| !resolved.iter().any(|d| d.name.eq_ignore_ascii_case(&c.name)))
            .map(ResolvedCategory::from_category)
            .collect();

        Self {
            declared: resolved,
            conflicts,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.declared.is_empty()
    }

    /// Classify course text against the declared interests
    pub fn classify(&self, text: &str) -> InterestClassification {
        if !self.is_active() {
            return InterestClassification::default();
        }

        let text = normalize_text(text);

        if let Some(category) = self.declared.iter().find(|c| c.matches(&text)) {
            return InterestClassification {
                aligned: true,
                conflicting: false,
                aligned_with: Some(category.name.clone()),
            };
        }

        InterestClassification {
            aligned: false,
            conflicting: self.conflicts.iter().any(|c| c.matches(&text)),
            aligned_with: None,
        }
    }

    /// Strict gate: with declared interests only aligned courses pass
    pub fn admits(&self, classification: &InterestClassification) -> bool {
        !self.is_active() || classification.aligned
    }
}

/// One-shot classification of a course text
pub fn classify(
    text: &str,
    declared: &[String],
    taxonomy: &CareerInterestTaxonomy,
) -> InterestClassification {
    InterestFilter::new(declared, taxonomy).classify(text)
}
