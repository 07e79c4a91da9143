use std::collections::{HashMap, HashSet};

use crate::models::{Grade, Requirement};

/// Score reported for `required_ratio` when a course lists no requirements
pub const NEUTRAL_REQUIRED_RATIO: f64 = 0.5;

/// How a generic (weak) related term proves it is a legitimate match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// One of the qualifying phrases must also appear in the title
    TitleContains(&'static [&'static str]),
    /// Only counts for the listed (canonical) requester subjects
    AllowedSubjects(&'static [&'static str]),
    /// Reviewed and always accepted
    Always,
}

impl MatchStrategy {
    fn is_legitimate(&self, title: &str, requester_subject: &str) -> bool {
        match self {
            MatchStrategy::TitleContains(phrases) => {
                phrases.iter().any(|phrase| contains_term(title, phrase))
            }
            MatchStrategy::AllowedSubjects(subjects) => subjects.contains(&requester_subject),
            MatchStrategy::Always => true,
        }
    }
}

/// Outcome of matching a requester's subjects against one course
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    /// Share of the course's required subjects the requester takes
    pub required_ratio: f64,
    /// Share of the requester's subjects relevant to the course title
    pub relevance_ratio: f64,
    /// Requester subjects (as given) that matched a requirement or the title
    pub matched_subjects: Vec<String>,
    pub matched_requirements: usize,
    pub has_requirements: bool,
}

#[derive(Debug, Clone)]
struct SubjectEntry {
    original: String,
    canonical: String,
    related: Vec<String>,
}

/// Requester subjects and grades resolved to canonical names, built once per request
#[derive(Debug, Clone, Default)]
pub struct SubjectProfile {
    entries: Vec<SubjectEntry>,
    canonical: HashSet<String>,
    grades: HashMap<String, Grade>,
}

impl SubjectProfile {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn takes(&self, canonical_subject: &str) -> bool {
        self.canonical.contains(canonical_subject)
    }

    /// Predicted grade for a canonical subject name
    pub fn grade(&self, canonical_subject: &str) -> Option<Grade> {
        self.grades.get(canonical_subject).copied()
    }
}

/// Rule-based subject matcher with synonym tables and a false-positive guard
#[derive(Debug, Clone)]
pub struct SubjectMatcher {
    aliases: HashMap<&'static str, &'static str>,
    related: HashMap<&'static str, &'static [&'static str]>,
    generic: HashMap<&'static str, MatchStrategy>,
}

impl SubjectMatcher {
    pub fn new() -> Self {
        Self {
            aliases: ALIASES.iter().copied().collect(),
            related: RELATED_TERMS.iter().copied().collect(),
            generic: GENERIC_TERMS.iter().copied().collect(),
        }
    }

    /// Canonical name for a subject, after normalization and alias lookup
    pub fn canonical(&self, subject: &str) -> String {
        let normalized = normalize_text(subject);
        match self.aliases.get(normalized.as_str()) {
            Some(canonical) => canonical.to_string(),
            None => normalized,
        }
    }

    pub fn profile(&self, subjects: &[String], grades: &HashMap<String, Grade>) -> SubjectProfile {
        let mut entries = Vec::with_capacity(subjects.len());
        let mut canonical = HashSet::with_capacity(subjects.len());

        for subject in subjects {
            let name = self.canonical(subject);
            if name.is_empty() || !canonical.insert(name.clone()) {
                continue;
            }
            let related = match self.related.get(name.as_str()) {
                Some(terms) => terms.iter().map(|t| t.to_string()).collect(),
                None => vec![name.clone()],
            };
            entries.push(SubjectEntry {
                original: subject.trim().to_string(),
                canonical: name,
                related,
            });
        }

        let grades = grades
            .iter()
            .map(|(subject, grade)| (self.canonical(subject), *grade))
            .collect();

        SubjectProfile {
            entries,
            canonical,
            grades,
        }
    }

    /// Match requester subjects against a course's requirements and title
    pub fn match_subjects(
        &self,
        profile: &SubjectProfile,
        requirements: &[Requirement],
        title: &str,
    ) -> MatchResult {
        let title = normalize_text(title);
        let mut matched: HashSet<&str> = HashSet::new();

        let mut matched_requirements = 0;
        for requirement in requirements {
            let required = self.canonical(&requirement.subject);
            if profile.takes(&required) {
                matched_requirements += 1;
                matched.insert(profile_original(profile, &required));
            }
        }

        let required_ratio = if requirements.is_empty() {
            NEUTRAL_REQUIRED_RATIO
        } else {
            matched_requirements as f64 / requirements.len() as f64
        };

        let mut relevant = 0;
        for entry in &profile.entries {
            let hit = entry
                .related
                .iter()
                .any(|term| contains_term(&title, term) && self.is_legitimate(term, &title, &entry.canonical));
            if hit {
                relevant += 1;
                matched.insert(entry.original.as_str());
            }
        }

        let relevance_ratio = if profile.is_empty() {
            0.0
        } else {
            relevant as f64 / profile.len() as f64
        };

        // Keep requester order in the output
        let matched_subjects = profile
            .entries
            .iter()
            .filter(|e| matched.contains(e.original.as_str()))
            .map(|e| e.original.clone())
            .collect();

        MatchResult {
            required_ratio,
            relevance_ratio,
            matched_subjects,
            matched_requirements,
            has_requirements: !requirements.is_empty(),
        }
    }

    fn is_legitimate(&self, term: &str, title: &str, requester_subject: &str) -> bool {
        match self.generic.get(term) {
            Some(strategy) => strategy.is_legitimate(title, requester_subject),
            None => true,
        }
    }
}

impl Default for SubjectMatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn profile_original<'a>(profile: &'a SubjectProfile, canonical: &str) -> &'a str {
    profile
        .entries
        .iter()
        .find(|e| e.canonical == canonical)
        .map(|e| e.original.as_str())
        .unwrap_or_default()
}

/// Lowercase, turn punctuation into spaces, `&` into "and", collapse whitespace
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '&' {
            out.push_str(" and ");
        } else if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whole-word (or whole-phrase) search in normalized text; a trailing plural
/// "s" on the haystack word is tolerated.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let bytes = haystack.as_bytes();
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(term) {
        let begin = start + pos;
        let mut end = begin + term.len();
        let boundary_before = begin == 0 || !bytes[begin - 1].is_ascii_alphanumeric();
        if end < bytes.len() && bytes[end] == b's' {
            let after_plural = end + 1;
            if after_plural == bytes.len() || !bytes[after_plural].is_ascii_alphanumeric() {
                end = after_plural;
            }
        }
        let boundary_after = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if boundary_before && boundary_after {
            return true;
        }
        start = begin + 1;
        while start < haystack.len() && !haystack.is_char_boundary(start) {
            start += 1;
        }
    }
    false
}

const ALIASES: &[(&str, &str)] = &[
    ("maths", "mathematics"),
    ("math", "mathematics"),
    ("further maths", "further mathematics"),
    ("computing", "computer science"),
    ("ict", "computer science"),
    ("information technology", "computer science"),
    ("english lit", "english literature"),
    ("english lang", "english language"),
    ("business", "business studies"),
    ("art", "art and design"),
    ("fine art", "art and design"),
    ("dt", "design and technology"),
    ("d and t", "design and technology"),
    ("pe", "physical education"),
    ("re", "religious studies"),
    ("religious education", "religious studies"),
    ("drama and theatre", "drama"),
    ("drama and theatre studies", "drama"),
    ("government and politics", "politics"),
    ("econ", "economics"),
];

const RELATED_TERMS: &[(&str, &[&str])] = &[
    (
        "mathematics",
        &[
            "mathematics", "maths", "mathematical", "statistics", "actuarial", "economics",
            "finance", "accounting", "engineering", "physics", "computer science", "data science",
            "science",
        ],
    ),
    (
        "further mathematics",
        &[
            "mathematics", "mathematical", "statistics", "physics", "engineering",
            "computer science", "actuarial",
        ],
    ),
    (
        "physics",
        &[
            "physics", "astrophysics", "astronomy", "engineering", "aerospace", "mechanical",
            "electrical", "natural science", "science",
        ],
    ),
    (
        "chemistry",
        &[
            "chemistry", "chemical", "biochemistry", "pharmacy", "pharmacology", "medicine",
            "biomedical", "natural science", "science",
        ],
    ),
    (
        "biology",
        &[
            "biology", "biological", "biomedical", "biochemistry", "medicine", "zoology", "ecology",
            "genetics", "nursing", "natural science", "science", "health",
        ],
    ),
    (
        "computer science",
        &[
            "computer science", "computing", "software", "artificial intelligence", "data science",
            "cyber security", "information technology", "games development", "technology",
        ],
    ),
    (
        "economics",
        &["economics", "finance", "business", "accounting", "banking", "management", "politics"],
    ),
    (
        "business studies",
        &["business", "management", "marketing", "accounting", "finance", "enterprise", "commerce"],
    ),
    (
        "english literature",
        &["english", "literature", "creative writing", "journalism", "media", "film studies"],
    ),
    ("english language", &["english", "linguistics", "journalism", "media"]),
    ("history", &["history", "archaeology", "classics", "politics", "heritage", "law"]),
    (
        "geography",
        &["geography", "environmental", "earth science", "geology", "planning", "science"],
    ),
    (
        "psychology",
        &["psychology", "neuroscience", "criminology", "education", "social", "health"],
    ),
    (
        "sociology",
        &["sociology", "criminology", "anthropology", "social work", "politics", "social"],
    ),
    (
        "art and design",
        &["art", "design", "illustration", "animation", "fashion", "photography", "graphic", "architecture"],
    ),
    (
        "design and technology",
        &["design", "product design", "engineering", "architecture", "manufacturing", "technology"],
    ),
    ("music", &["music", "audio", "sound", "performance"]),
    ("drama", &["drama", "theatre", "acting", "film", "performance"]),
    (
        "physical education",
        &["sport", "exercise", "coaching", "physiotherapy", "health"],
    ),
    ("religious studies", &["theology", "religion", "philosophy", "ethics"]),
    ("philosophy", &["philosophy", "ethics", "politics"]),
    ("politics", &["politics", "international relations", "government", "law"]),
    ("law", &["law", "legal", "criminology"]),
    ("media studies", &["media", "film", "journalism", "communication"]),
    ("french", &["french", "languages", "translation", "european"]),
    ("spanish", &["spanish", "languages", "translation", "hispanic"]),
    ("german", &["german", "languages", "translation", "european"]),
];

const GENERIC_TERMS: &[(&str, MatchStrategy)] = &[
    (
        "science",
        MatchStrategy::TitleContains(&[
            "natural science", "biomedical science", "biological science", "physical science",
            "chemical science", "environmental science", "forensic science", "earth science",
            "medical science", "sport science", "data science", "computer science",
        ]),
    ),
    (
        "social",
        MatchStrategy::TitleContains(&["social science", "social work", "social policy", "social care"]),
    ),
    (
        "health",
        MatchStrategy::TitleContains(&[
            "health science", "public health", "health and social care", "mental health",
            "health sciences",
        ]),
    ),
    (
        "technology",
        MatchStrategy::AllowedSubjects(&["computer science", "design and technology"]),
    ),
    (
        "design",
        MatchStrategy::AllowedSubjects(&["art and design", "design and technology"]),
    ),
    (
        "management",
        MatchStrategy::AllowedSubjects(&["business studies", "economics"]),
    ),
    ("performance", MatchStrategy::AllowedSubjects(&["music", "drama"])),
    ("engineering", MatchStrategy::Always),
    ("law", MatchStrategy::Always),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(matcher: &SubjectMatcher, subjects: &[&str]) -> SubjectProfile {
        let subjects: Vec<String> = subjects.iter().map(|s| s.to_string()).collect();
        matcher.profile(&subjects, &HashMap::new())
    }

    fn req(subject: &str, grade: Grade) -> Requirement {
        Requirement {
            subject: subject.to_string(),
            min_grade: grade,
        }
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Business &  Finance "), "business and finance");
        assert_eq!(normalize_text("BSc (Hons) Law"), "bsc hons law");
    }

    #[test]
    fn test_contains_term_respects_word_boundaries() {
        assert!(contains_term("mechanical engineering", "engineering"));
        assert!(contains_term("natural sciences", "natural science"));
        assert!(!contains_term("martial", "art"));
        assert!(contains_term("liberal arts", "art"));
        assert!(!contains_term("lawn management", "law"));
        assert!(contains_term("law", "law"));
    }

    #[test]
    fn test_aliases_resolve_requirements() {
        let matcher = SubjectMatcher::new();
        let profile = profile(&matcher, &["Maths", "Physics"]);
        let result = matcher.match_subjects(
            &profile,
            &[req("Mathematics", Grade::A), req("Chemistry", Grade::B)],
            "Physics",
        );
        assert_eq!(result.required_ratio, 0.5);
        assert_eq!(result.matched_requirements, 1);
        assert_eq!(result.matched_subjects, vec!["Maths", "Physics"]);
    }

    #[test]
    fn test_no_requirements_is_neutral() {
        let matcher = SubjectMatcher::new();
        let profile = profile(&matcher, &["History"]);
        let result = matcher.match_subjects(&profile, &[], "Ancient History");
        assert_eq!(result.required_ratio, NEUTRAL_REQUIRED_RATIO);
        assert!(!result.has_requirements);
        assert_eq!(result.relevance_ratio, 1.0);
    }

    #[test]
    fn test_generic_science_needs_qualifying_phrase() {
        let matcher = SubjectMatcher::new();
        let profile = profile(&matcher, &["Chemistry"]);

        let political = matcher.match_subjects(&profile, &[], "Political Science");
        assert_eq!(political.relevance_ratio, 0.0);
        assert!(political.matched_subjects.is_empty());

        let natural = matcher.match_subjects(&profile, &[], "Natural Science");
        assert_eq!(natural.relevance_ratio, 1.0);
    }

    #[test]
    fn test_generic_term_allow_list() {
        let matcher = SubjectMatcher::new();
        let economics = profile(&matcher, &["Economics"]);
        let result = matcher.match_subjects(&economics, &[], "Hospitality Management");
        assert_eq!(result.relevance_ratio, 1.0);

        let psychology = profile(&matcher, &["Psychology"]);
        let result = matcher.match_subjects(&psychology, &[], "Hospitality Management");
        assert_eq!(result.relevance_ratio, 0.0);
    }

    #[test]
    fn test_unknown_subject_matches_itself() {
        let matcher = SubjectMatcher::new();
        let profile = profile(&matcher, &["Astronomy Club"]);
        let result = matcher.match_subjects(&profile, &[], "Astronomy Club Leadership");
        assert_eq!(result.relevance_ratio, 1.0);
    }

    #[test]
    fn test_profile_canonicalizes_grades_and_dedupes() {
        let matcher = SubjectMatcher::new();
        let grades = HashMap::from([("Maths".to_string(), Grade::A)]);
        let subjects = vec!["Maths".to_string(), "Mathematics".to_string()];
        let profile = matcher.profile(&subjects, &grades);
        assert_eq!(profile.len(), 1);
        assert_eq!(profile.grade("mathematics"), Some(Grade::A));
    }
}
