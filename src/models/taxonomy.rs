use serde::{Deserialize, Serialize};

/// A keyword and how strongly it signals its category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedKeyword {
    pub term: String,
    pub weight: f64,
}

impl WeightedKeyword {
    pub fn new(term: &str, weight: f64) -> Self {
        Self {
            term: term.to_lowercase(),
            weight,
        }
    }
}

/// Named career-interest category.
///
/// Keywords are priority ordered: the first strong keyword found in a
/// course's text decides the match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestCategory {
    pub name: String,
    pub keywords: Vec<WeightedKeyword>,
    #[serde(default)]
    pub conflicts: Vec<String>,
}

impl InterestCategory {
    /// Category built from a free-text interest the taxonomy doesn't know
    pub fn ad_hoc(interest: &str) -> Self {
        Self {
            name: interest.trim().to_string(),
            keywords: vec![WeightedKeyword::new(interest.trim(), 1.0)],
            conflicts: vec![],
        }
    }

    pub fn conflicts_with(&self, other: &str) -> bool {
        self.conflicts.iter().any(|c| c.eq_ignore_ascii_case(other))
    }
}

/// Category → keyword/conflict configuration used for classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerInterestTaxonomy {
    pub categories: Vec<InterestCategory>,
}

impl CareerInterestTaxonomy {
    /// Case-insensitive lookup by category name
    pub fn find(&self, name: &str) -> Option<&InterestCategory> {
        let name = name.trim();
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn is_valid(&self) -> bool {
        !self.categories.is_empty()
            && self.categories.iter().all(|c| {
                !c.name.trim().is_empty()
                    && !c.keywords.is_empty()
                    && c.keywords
                        .iter()
                        .all(|k| !k.term.trim().is_empty() && k.weight.is_finite() && k.weight > 0.0)
            })
    }

    /// Built-in taxonomy used when the config store can't provide one
    pub fn builtin() -> Self {
        fn category(name: &str, keywords: &[(&str, f64)], conflicts: &[&str]) -> InterestCategory {
            InterestCategory {
                name: name.to_string(),
                keywords: keywords
                    .iter()
                    .map(|(term, weight)| WeightedKeyword::new(term, *weight))
                    .collect(),
                conflicts: conflicts.iter().map(|c| c.to_string()).collect(),
            }
        }

        Self {
            categories: vec![
                category(
                    "Business & Finance",
                    &[
                        ("business", 1.0),
                        ("finance", 1.0),
                        ("accounting", 1.0),
                        ("economics", 0.8),
                        ("management", 0.6),
                        ("marketing", 0.6),
                        ("banking", 0.8),
                        ("actuarial", 0.8),
                        ("commerce", 0.5),
                        ("enterprise", 0.4),
                    ],
                    &[
                        "Engineering & Technology",
                        "Medicine & Healthcare",
                        "Creative Arts & Design",
                        "Natural Sciences",
                    ],
                ),
                category(
                    "Engineering & Technology",
                    &[
                        ("engineering", 1.0),
                        ("mechanical", 0.8),
                        ("electrical", 0.8),
                        ("civil", 0.6),
                        ("aerospace", 0.8),
                        ("robotics", 0.8),
                        ("manufacturing", 0.5),
                        ("technology", 0.4),
                    ],
                    &["Business & Finance", "Humanities", "Creative Arts & Design"],
                ),
                category(
                    "Computer Science & IT",
                    &[
                        ("computer science", 1.0),
                        ("computing", 1.0),
                        ("software", 1.0),
                        ("artificial intelligence", 1.0),
                        ("data science", 0.8),
                        ("cyber security", 0.8),
                        ("information technology", 0.8),
                        ("programming", 0.6),
                    ],
                    &["Humanities", "Creative Arts & Design"],
                ),
                category(
                    "Medicine & Healthcare",
                    &[
                        ("medicine", 1.0),
                        ("nursing", 1.0),
                        ("dentistry", 1.0),
                        ("pharmacy", 1.0),
                        ("midwifery", 1.0),
                        ("physiotherapy", 1.0),
                        ("biomedical", 0.8),
                        ("health", 0.5),
                        ("clinical", 0.5),
                    ],
                    &["Business & Finance", "Law", "Creative Arts & Design"],
                ),
                category(
                    "Law",
                    &[
                        ("law", 1.0),
                        ("legal", 0.8),
                        ("criminology", 0.6),
                        ("jurisprudence", 1.0),
                    ],
                    &["Engineering & Technology", "Medicine & Healthcare"],
                ),
                category(
                    "Creative Arts & Design",
                    &[
                        ("fine art", 1.0),
                        ("graphic design", 1.0),
                        ("illustration", 1.0),
                        ("animation", 1.0),
                        ("fashion", 0.8),
                        ("music", 0.8),
                        ("drama", 0.8),
                        ("film", 0.6),
                        ("photography", 0.8),
                        ("design", 0.4),
                        ("art", 0.4),
                    ],
                    &["Business & Finance", "Engineering & Technology", "Medicine & Healthcare"],
                ),
                category(
                    "Education & Teaching",
                    &[
                        ("education", 1.0),
                        ("teaching", 1.0),
                        ("primary", 0.4),
                        ("early years", 0.8),
                        ("childhood", 0.6),
                    ],
                    &["Engineering & Technology"],
                ),
                category(
                    "Natural Sciences",
                    &[
                        ("physics", 1.0),
                        ("chemistry", 1.0),
                        ("biology", 1.0),
                        ("natural sciences", 1.0),
                        ("geology", 0.8),
                        ("zoology", 0.8),
                        ("biochemistry", 1.0),
                        ("environmental science", 0.8),
                        ("mathematics", 0.6),
                    ],
                    &["Business & Finance", "Creative Arts & Design"],
                ),
                category(
                    "Social Sciences",
                    &[
                        ("psychology", 1.0),
                        ("sociology", 1.0),
                        ("politics", 1.0),
                        ("international relations", 1.0),
                        ("anthropology", 1.0),
                        ("social work", 0.8),
                        ("geography", 0.6),
                    ],
                    &["Engineering & Technology"],
                ),
                category(
                    "Humanities",
                    &[
                        ("history", 1.0),
                        ("philosophy", 1.0),
                        ("english literature", 1.0),
                        ("classics", 1.0),
                        ("theology", 1.0),
                        ("languages", 0.6),
                        ("linguistics", 0.8),
                        ("literature", 0.6),
                    ],
                    &["Engineering & Technology", "Computer Science & IT"],
                ),
            ],
        }
    }
}

impl Default for CareerInterestTaxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}
