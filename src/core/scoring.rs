use crate::core::filters::InterestClassification;
use crate::core::subjects::{contains_term, normalize_text, MatchResult, SubjectMatcher, SubjectProfile};
use crate::models::{
    CandidateRecord, Criterion, CriterionWeights, InstitutionSize, PreferenceSet, Requirement,
    RequesterProfile, ScoreBreakdown,
};

/// Score used when a criterion has nothing to judge
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Credit lost per grade a prediction falls short of a requirement
pub const GRADE_GAP_PENALTY: f64 = 0.3;

/// Salary band used to normalize graduate salaries (GBP)
pub const SALARY_FLOOR: f64 = 15_000.0;
pub const SALARY_CEILING: f64 = 45_000.0;

/// Clamp to [0, 1]; NaN counts as 0
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Per-requirement grade comparison for one course
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradeAssessment {
    pub total_requirements: usize,
    /// Requirements whose subject has a predicted grade
    pub counted: usize,
    /// Counted requirements the prediction meets or exceeds
    pub met: usize,
    pub credit: f64,
}

impl GradeAssessment {
    /// Every requirement has a predicted grade that meets it
    pub fn meets_all(&self) -> bool {
        self.met == self.total_requirements
    }

    /// Grades fall short somewhere, but never by much
    pub fn is_near_miss(&self) -> bool {
        self.counted > 0 && !self.meets_all() && self.score() >= 0.7
    }

    pub fn score(&self) -> f64 {
        if self.counted == 0 {
            NEUTRAL_SCORE
        } else {
            self.credit / self.counted as f64
        }
    }
}

/// Credit for a requirement missed by `shortfall` grades
#[inline]
pub fn grade_credit(shortfall: i32) -> f64 {
    if shortfall <= 0 {
        1.0
    } else {
        (1.0 - GRADE_GAP_PENALTY * shortfall as f64).max(0.0)
    }
}

/// Compare predicted grades with a course's requirements.
///
/// Requirements for subjects the requester has no prediction for are left
/// out of the average rather than penalized.
pub fn assess_grades(
    matcher: &SubjectMatcher,
    profile: &SubjectProfile,
    requirements: &[Requirement],
) -> GradeAssessment {
    let mut assessment = GradeAssessment {
        total_requirements: requirements.len(),
        ..Default::default()
    };

    for requirement in requirements {
        let subject = matcher.canonical(&requirement.subject);
        let Some(predicted) = profile.grade(&subject) else {
            continue;
        };
        let shortfall = predicted.shortfall(requirement.min_grade);
        assessment.counted += 1;
        assessment.credit += grade_credit(shortfall);
        if shortfall == 0 {
            assessment.met += 1;
        }
    }

    assessment
}

/// Which declared preferences a course satisfies; `None` when either side is unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreferenceFacts {
    pub region_match: Option<bool>,
    pub within_budget: Option<bool>,
    pub route_match: Option<bool>,
    pub size_match: Option<bool>,
}

pub fn preference_facts(record: &CandidateRecord, preferences: &PreferenceSet) -> PreferenceFacts {
    let region_match = match (&preferences.preferred_region, &record.institution.region) {
        (Some(wanted), Some(region)) if !wanted.trim().is_empty() => {
            Some(contains_term(&normalize_text(region), &normalize_text(wanted)))
        }
        _ => None,
    };

    let within_budget = match (preferences.max_budget, record.annual_cost) {
        (Some(budget), Some(cost)) => Some(cost <= budget),
        _ => None,
    };

    let route_match = if preferences.preferred_qualification_routes.is_empty() {
        None
    } else {
        let text = normalize_text(&format!(
            "{} {}",
            record.qualification.as_deref().unwrap_or_default(),
            record.title
        ));
        Some(
            preferences
                .preferred_qualification_routes
                .iter()
                .any(|route| contains_term(&text, &normalize_text(route))),
        )
    };

    let size_match = match (preferences.preferred_institution_size, record.institution.student_count) {
        (Some(wanted), Some(count)) => Some(InstitutionSize::from_student_count(count) == wanted),
        _ => None,
    };

    PreferenceFacts {
        region_match,
        within_budget,
        route_match,
        size_match,
    }
}

/// Where a course's effective rank comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RankSource {
    Subject,
    #[default]
    Institution,
}

/// Rank and graduate outcomes exactly as the ranking and employability criteria see them
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutcomeFacts {
    pub rank: Option<u32>,
    pub rank_source: RankSource,
    /// Graduate employment percentage; non-finite values are dropped
    pub employment_pct: Option<f64>,
    pub median_salary: Option<f64>,
}

/// Resolve rank and outcome data from the catalog record alone.
///
/// Enrichment arrives after scoring, so it never feeds these values.
pub fn outcome_facts(record: &CandidateRecord) -> OutcomeFacts {
    let rank_source = match record.subject_rank.filter(|r| *r > 0) {
        Some(_) => RankSource::Subject,
        None => RankSource::Institution,
    };
    let own = record.auxiliary.as_ref();

    OutcomeFacts {
        rank: record.effective_rank(),
        rank_source,
        employment_pct: record
            .employability
            .or(record.institution.employability)
            .or_else(|| own.and_then(|aux| aux.employment_rate))
            .filter(|pct| pct.is_finite()),
        median_salary: record
            .median_salary
            .or_else(|| own.and_then(|aux| aux.salary).and_then(|s| s.median))
            .filter(|salary| salary.is_finite()),
    }
}

/// Intermediate values computed once per candidate and shared by scorers and reasons
#[derive(Debug, Clone, Default)]
pub struct CandidateSignals {
    pub subjects: MatchResult,
    pub grades: GradeAssessment,
    pub preferences: PreferenceFacts,
    pub interest: InterestClassification,
    pub outcomes: OutcomeFacts,
}

/// Everything a scorer may look at
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub candidate: &'a CandidateRecord,
    pub profile: &'a RequesterProfile,
    pub signals: &'a CandidateSignals,
}

/// A single ranking criterion
pub trait Scorer: Send + Sync {
    fn criterion(&self) -> Criterion;

    /// Component score; the caller clamps it to [0, 1]
    fn score(&self, input: &ScoreInput<'_>) -> f64;
}

/// Required-subject coverage plus title relevance, with a small breadth bonus
#[derive(Debug, Default)]
pub struct SubjectScorer;

impl Scorer for SubjectScorer {
    fn criterion(&self) -> Criterion {
        Criterion::Subject
    }

    fn score(&self, input: &ScoreInput<'_>) -> f64 {
        let matched = &input.signals.subjects;
        let bonus = (0.05 * matched.matched_subjects.len().saturating_sub(1) as f64).min(0.15);
        0.6 * matched.required_ratio + 0.4 * matched.relevance_ratio + bonus
    }
}

#[derive(Debug, Default)]
pub struct GradeScorer;

impl Scorer for GradeScorer {
    fn criterion(&self) -> Criterion {
        Criterion::Grade
    }

    fn score(&self, input: &ScoreInput<'_>) -> f64 {
        input.signals.grades.score()
    }
}

/// Region, budget, route, size and a career-interest swing around a neutral baseline
#[derive(Debug, Default)]
pub struct PreferenceScorer;

impl Scorer for PreferenceScorer {
    fn criterion(&self) -> Criterion {
        Criterion::Preference
    }

    fn score(&self, input: &ScoreInput<'_>) -> f64 {
        let facts = &input.signals.preferences;
        let mut score = NEUTRAL_SCORE;

        match facts.region_match {
            Some(true) => score += 0.2,
            Some(false) => score -= 0.1,
            None => {}
        }
        if facts.within_budget == Some(true) {
            score += 0.15;
        }
        if facts.route_match == Some(true) {
            score += 0.1;
        }
        if facts.size_match == Some(true) {
            score += 0.05;
        }

        let interest = &input.signals.interest;
        if interest.aligned {
            score += 0.25;
        } else if interest.conflicting {
            score -= 0.3;
        }

        score
    }
}

#[derive(Debug, Default)]
pub struct RankingScorer;

impl Scorer for RankingScorer {
    fn criterion(&self) -> Criterion {
        Criterion::Ranking
    }

    fn score(&self, input: &ScoreInput<'_>) -> f64 {
        ranking_curve(input.signals.outcomes.rank)
    }
}

/// Piecewise rank curve: shallow through the top 10, steep to 50, then a
/// gentle decline that bottoms out at 0.1
pub fn ranking_curve(rank: Option<u32>) -> f64 {
    let Some(rank) = rank.filter(|r| *r > 0) else {
        return NEUTRAL_SCORE;
    };
    let r = rank as f64;
    if rank <= 10 {
        1.0 - 0.01 * (r - 1.0)
    } else if rank <= 50 {
        0.9 - 0.015 * (r - 10.0)
    } else {
        (0.3 - 0.004 * (r - 50.0)).max(0.1)
    }
}

#[derive(Debug, Default)]
pub struct EmployabilityScorer;

impl Scorer for EmployabilityScorer {
    fn criterion(&self) -> Criterion {
        Criterion::Employability
    }

    fn score(&self, input: &ScoreInput<'_>) -> f64 {
        let outcomes = &input.signals.outcomes;
        employability_score(outcomes.employment_pct, outcomes.median_salary)
    }
}

/// `0.7 * employment + 0.3 * salary`, using whichever side is known
pub fn employability_score(employment_pct: Option<f64>, salary: Option<f64>) -> f64 {
    let employment = employment_pct
        .filter(|p| p.is_finite())
        .map(|p| clamp_unit(p / 100.0));
    let salary = salary
        .filter(|s| s.is_finite())
        .map(|s| clamp_unit((s - SALARY_FLOOR) / (SALARY_CEILING - SALARY_FLOOR)));

    match (employment, salary) {
        (Some(e), Some(s)) => 0.7 * e + 0.3 * s,
        (Some(e), None) => e,
        (None, Some(s)) => s,
        (None, None) => NEUTRAL_SCORE,
    }
}

/// The five built-in criteria, in breakdown order
pub fn default_scorers() -> Vec<Box<dyn Scorer>> {
    vec![
        Box::new(SubjectScorer),
        Box::new(GradeScorer),
        Box::new(PreferenceScorer),
        Box::new(RankingScorer),
        Box::new(EmployabilityScorer),
    ]
}

/// Run every scorer and combine the clamped components with the weights
pub fn score_breakdown(
    scorers: &[Box<dyn Scorer>],
    input: &ScoreInput<'_>,
    weights: &CriterionWeights,
) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown::default();
    let mut composite = 0.0;

    for scorer in scorers {
        let criterion = scorer.criterion();
        let component = clamp_unit(scorer.score(input));
        composite += weights.get(criterion) * component;
        breakdown.components.insert(criterion, component);
    }

    breakdown.composite = clamp_unit(composite);
    breakdown
}
