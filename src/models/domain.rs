use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use super::grade::Grade;

/// Institution that owns a course, pre-joined by the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    /// League-table position, 1 = best
    #[serde(default)]
    pub rank: Option<u32>,
    /// Aggregate graduate employability percentage (0-100)
    #[serde(default)]
    pub employability: Option<f64>,
    #[serde(rename = "studentCount", default)]
    pub student_count: Option<u32>,
}

/// A subject the course requires, with the minimum accepted grade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub subject: String,
    #[serde(rename = "minGrade")]
    pub min_grade: Grade,
}

/// A course offered by an institution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "subjectArea", default)]
    pub subject_area: Option<String>,
    /// Award name, e.g. "BSc (Hons)" or "Degree Apprenticeship"
    #[serde(default)]
    pub qualification: Option<String>,
    pub institution: Institution,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(rename = "annualCost", default)]
    pub annual_cost: Option<f64>,
    /// Course-level employability percentage (0-100)
    #[serde(default)]
    pub employability: Option<f64>,
    #[serde(rename = "subjectRank", default)]
    pub subject_rank: Option<u32>,
    #[serde(rename = "medianSalary", default)]
    pub median_salary: Option<f64>,
    #[serde(default)]
    pub auxiliary: Option<AuxiliaryAttributes>,
}

impl CandidateRecord {
    /// Text used for career-interest classification
    pub fn classification_text(&self) -> String {
        match &self.subject_area {
            Some(area) => format!("{} {}", self.title, area),
            None => self.title.clone(),
        }
    }

    /// Rank used for the ranking criterion: subject table first, then institution
    pub fn effective_rank(&self) -> Option<u32> {
        self.subject_rank
            .or(self.institution.rank)
            .filter(|rank| *rank > 0)
    }
}

/// Candidate batch shared between the catalog cache and a ranking request
pub type CandidateBatch = Arc<[CandidateRecord]>;

/// Salary quartiles for graduates of a course
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryQuartiles {
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub median: Option<f64>,
    #[serde(default)]
    pub upper: Option<f64>,
}

/// Median earnings a number of years after graduation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyEarnings {
    #[serde(rename = "yearsAfterGraduation")]
    pub years_after_graduation: u8,
    pub median: f64,
}

/// Statistical outcome data resolved for surviving candidates only.
///
/// Every field is optional; absent data is left out of responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryAttributes {
    #[serde(rename = "employmentRate", skip_serializing_if = "Option::is_none", default)]
    pub employment_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub salary: Option<SalaryQuartiles>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub earnings: Vec<YearlyEarnings>,
    #[serde(rename = "jobDestinations", skip_serializing_if = "Vec::is_empty", default)]
    pub job_destinations: Vec<String>,
}

impl AuxiliaryAttributes {
    pub fn is_empty(&self) -> bool {
        self.employment_rate.is_none()
            && self.salary.is_none()
            && self.earnings.is_empty()
            && self.job_destinations.is_empty()
    }

    /// Fill fields that are still absent from `other`
    pub fn merge(&mut self, other: AuxiliaryAttributes) {
        if self.employment_rate.is_none() {
            self.employment_rate = other.employment_rate;
        }
        if self.salary.is_none() {
            self.salary = other.salary;
        }
        if self.earnings.is_empty() {
            self.earnings = other.earnings;
        }
        if self.job_destinations.is_empty() {
            self.job_destinations = other.job_destinations;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstitutionSize {
    Small,
    Medium,
    Large,
}

impl InstitutionSize {
    pub fn from_student_count(count: u32) -> Self {
        match count {
            0..=9_999 => InstitutionSize::Small,
            10_000..=24_999 => InstitutionSize::Medium,
            _ => InstitutionSize::Large,
        }
    }
}

/// Declared preferences of a requester
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceSet {
    #[serde(rename = "careerInterests", default)]
    pub career_interests: Vec<String>,
    #[serde(rename = "preferredRegion", default)]
    pub preferred_region: Option<String>,
    #[serde(rename = "maxBudget", default)]
    pub max_budget: Option<f64>,
    #[serde(rename = "preferredQualificationRoutes", default)]
    pub preferred_qualification_routes: Vec<String>,
    #[serde(rename = "preferredInstitutionSize", default)]
    pub preferred_institution_size: Option<InstitutionSize>,
}

/// Request-scoped profile of the person asking for recommendations
#[derive(Debug, Clone, Default)]
pub struct RequesterProfile {
    pub requester_id: String,
    pub subjects: Vec<String>,
    pub predicted_grades: HashMap<String, Grade>,
    pub preferences: PreferenceSet,
}

impl RequesterProfile {
    pub fn has_interests(&self) -> bool {
        !self.preferences.career_interests.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackPolarity {
    Approve,
    Reject,
}

impl FeedbackPolarity {
    /// Value stored in the feedback log's `polarity` column
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackPolarity::Approve => "approve",
            FeedbackPolarity::Reject => "reject",
        }
    }
}

/// A single approve/reject signal, as written by the feedback store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSignal {
    pub requester_id: String,
    pub course_id: String,
    pub polarity: FeedbackPolarity,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub score_at_time: Option<f64>,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

/// Approve/reject counts for one course
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackCounts {
    pub approvals: u32,
    pub rejections: u32,
}

impl FeedbackCounts {
    pub fn new(approvals: u32, rejections: u32) -> Self {
        Self { approvals, rejections }
    }

    pub fn record(&mut self, polarity: FeedbackPolarity) {
        match polarity {
            FeedbackPolarity::Approve => self.approvals = self.approvals.saturating_add(1),
            FeedbackPolarity::Reject => self.rejections = self.rejections.saturating_add(1),
        }
    }

    /// Per-course counts over a slice of the feedback log
    pub fn tally<'a>(signals: impl IntoIterator<Item = &'a FeedbackSignal>) -> HashMap<String, FeedbackCounts> {
        let mut counts: HashMap<String, FeedbackCounts> = HashMap::new();
        for signal in signals {
            counts.entry(signal.course_id.clone()).or_default().record(signal.polarity);
        }
        counts
    }

    #[inline]
    pub fn total(&self) -> u32 {
        self.approvals.saturating_add(self.rejections)
    }

    /// Net approval ratio in [-1, 1]; 0 when there is no feedback
    #[inline]
    pub fn net_ratio(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.approvals as f64 - self.rejections as f64) / total as f64
    }
}

/// Scoring criteria, in the order the breakdown reports them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Subject,
    Grade,
    Preference,
    Ranking,
    Employability,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Subject,
        Criterion::Grade,
        Criterion::Preference,
        Criterion::Ranking,
        Criterion::Employability,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Criterion::Subject => "subject",
            Criterion::Grade => "grade",
            Criterion::Preference => "preference",
            Criterion::Ranking => "ranking",
            Criterion::Employability => "employability",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Weights applied to each criterion's component score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionWeights {
    pub subject: f64,
    pub grade: f64,
    pub preference: f64,
    pub ranking: f64,
    pub employability: f64,
}

impl CriterionWeights {
    /// Allowed distance of the weight sum from 1.0
    pub const SUM_TOLERANCE: f64 = 1e-3;

    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Subject => self.subject,
            Criterion::Grade => self.grade,
            Criterion::Preference => self.preference,
            Criterion::Ranking => self.ranking,
            Criterion::Employability => self.employability,
        }
    }

    pub fn sum(&self) -> f64 {
        Criterion::ALL.iter().map(|c| self.get(*c)).sum()
    }

    /// Non-negative, finite and summing to 1.0 within tolerance
    pub fn is_valid(&self) -> bool {
        Criterion::ALL
            .iter()
            .map(|c| self.get(*c))
            .all(|w| w.is_finite() && w >= 0.0)
            && (self.sum() - 1.0).abs() <= Self::SUM_TOLERANCE
    }
}

impl Default for CriterionWeights {
    fn default() -> Self {
        Self {
            subject: 0.30,
            grade: 0.25,
            preference: 0.20,
            ranking: 0.15,
            employability: 0.10,
        }
    }
}

/// Tunables for the feedback adjustment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSettings {
    /// Minimum combined observations before any adjustment is applied
    pub min_observations: u32,
    pub positive_boost: f64,
    pub negative_penalty: f64,
    /// Share of the blend given to the requester's own history
    pub own_weight: f64,
}

impl FeedbackSettings {
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.positive_boost)
            && (0.0..=1.0).contains(&self.negative_penalty)
            && (0.5..=1.0).contains(&self.own_weight)
    }
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            min_observations: 3,
            positive_boost: 0.10,
            negative_penalty: 0.15,
            own_weight: 0.7,
        }
    }
}

/// Per-criterion component scores plus the derived composite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub components: BTreeMap<Criterion, f64>,
    pub composite: f64,
}

impl ScoreBreakdown {
    pub fn component(&self, criterion: Criterion) -> f64 {
        self.components.get(&criterion).copied().unwrap_or(0.0)
    }
}

/// Another surviving course from the same institution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    #[serde(rename = "courseId")]
    pub course_id: String,
    pub title: String,
    pub score: f64,
}

/// One entry of the ranking output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    #[serde(rename = "courseId")]
    pub course_id: String,
    pub title: String,
    pub institution: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    #[serde(rename = "meetsHardRequirements")]
    pub meets_hard_requirements: bool,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub auxiliary: Option<AuxiliaryAttributes>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub alternative: Option<Alternative>,
    #[serde(rename = "feedbackAdjustment")]
    pub feedback_adjustment: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_are_valid() {
        let weights = CriterionWeights::default();
        assert!((weights.sum() - 1.0).abs() < 1e-9);
        assert!(weights.is_valid());
    }

    #[test]
    fn test_invalid_weights() {
        let mut weights = CriterionWeights::default();
        weights.subject = 0.9;
        assert!(!weights.is_valid());

        let mut negative = CriterionWeights::default();
        negative.subject = -0.1;
        negative.grade = 0.65;
        assert!(!negative.is_valid());

        let mut nan = CriterionWeights::default();
        nan.ranking = f64::NAN;
        assert!(!nan.is_valid());
    }

    #[test]
    fn test_counts_saturate_instead_of_overflowing() {
        let counts = FeedbackCounts::new(u32::MAX, u32::MAX);
        assert_eq!(counts.total(), u32::MAX);
        assert_eq!(counts.net_ratio(), 0.0);
    }

    #[test]
    fn test_tally_groups_signals_by_course() {
        let signal = |course: &str, polarity| FeedbackSignal {
            requester_id: "s1".to_string(),
            course_id: course.to_string(),
            polarity,
            recorded_at: chrono::Utc::now(),
            score_at_time: None,
            context: None,
        };
        let log = vec![
            signal("c1", FeedbackPolarity::Approve),
            signal("c1", FeedbackPolarity::Approve),
            signal("c1", FeedbackPolarity::Reject),
            signal("c2", FeedbackPolarity::Reject),
        ];

        let counts = FeedbackCounts::tally(&log);

        assert_eq!(counts["c1"], FeedbackCounts::new(2, 1));
        assert_eq!(counts["c2"], FeedbackCounts::new(0, 1));
        assert_eq!(FeedbackPolarity::Approve.as_str(), "approve");
    }

    #[test]
    fn test_net_ratio() {
        assert_eq!(FeedbackCounts::default().net_ratio(), 0.0);
        assert_eq!(FeedbackCounts::new(3, 1).net_ratio(), 0.5);
        assert_eq!(FeedbackCounts::new(0, 2).net_ratio(), -1.0);
    }

    #[test]
    fn test_auxiliary_merge_keeps_present_fields() {
        let mut base = AuxiliaryAttributes {
            employment_rate: Some(91.0),
            ..Default::default()
        };
        base.merge(AuxiliaryAttributes {
            employment_rate: Some(10.0),
            job_destinations: vec!["Accountant".to_string()],
            ..Default::default()
        });

        assert_eq!(base.employment_rate, Some(91.0));
        assert_eq!(base.job_destinations, vec!["Accountant"]);
        assert!(base.salary.is_none());
    }

    #[test]
    fn test_effective_rank_prefers_subject_rank() {
        let record = CandidateRecord {
            id: "c1".to_string(),
            title: "Law".to_string(),
            subject_area: None,
            qualification: None,
            institution: Institution {
                id: "i1".to_string(),
                name: "Uni".to_string(),
                region: None,
                rank: Some(40),
                employability: None,
                student_count: None,
            },
            requirements: vec![],
            annual_cost: None,
            employability: None,
            subject_rank: Some(4),
            median_salary: None,
            auxiliary: None,
        };
        assert_eq!(record.effective_rank(), Some(4));
    }

    #[test]
    fn test_institution_size_bands() {
        assert_eq!(InstitutionSize::from_student_count(4_000), InstitutionSize::Small);
        assert_eq!(InstitutionSize::from_student_count(18_000), InstitutionSize::Medium);
        assert_eq!(InstitutionSize::from_student_count(40_000), InstitutionSize::Large);
    }
}
