use std::collections::HashMap;

use crate::core::feedback::FeedbackAdjuster;
use crate::core::filters::InterestFilter;
use crate::core::scoring::{
    assess_grades, default_scorers, outcome_facts, preference_facts, score_breakdown, CandidateSignals, RankSource,
    ScoreInput, Scorer,
};
use crate::core::selector::{Selected, TopKSelector, DEFAULT_MIN_SCORE, DEFAULT_TOP_K};
use crate::core::subjects::{SubjectMatcher, SubjectProfile};
use crate::models::{
    Alternative, AuxiliaryAttributes, CandidateRecord, CriterionWeights, RankedResult, RequesterProfile,
    ScoreBreakdown,
};
use crate::services::RankingConfig;

/// Employment percentage at or above which a course earns a reason line
const EMPLOYABILITY_REASON_PCT: f64 = 80.0;

/// Effective rank at or below which a course earns a reason line
const TOP_RANK_REASON: u32 = 10;

/// A candidate after its single scoring pass
#[derive(Debug, Clone)]
pub struct ScoredCandidate<'a> {
    pub record: &'a CandidateRecord,
    pub signals: CandidateSignals,
    pub breakdown: ScoreBreakdown,
}

/// Top-K survivors of the career-interest gate, best first
#[derive(Debug)]
pub struct Shortlist<'a> {
    pub survivors: Vec<Selected<ScoredCandidate<'a>>>,
    pub total_candidates: usize,
}

impl Shortlist<'_> {
    pub fn course_ids(&self) -> Vec<String> {
        self.survivors.iter().map(|s| s.payload.record.id.clone()).collect()
    }
}

/// Final output of a ranking pass
#[derive(Debug, Clone, Default)]
pub struct RankingOutcome {
    pub results: Vec<RankedResult>,
    pub total_candidates: usize,
    /// Candidates left after Top-K selection and the interest gate
    pub survivors: usize,
}

/// Per-request state resolved once before the candidate loop
struct RequestContext<'p> {
    profile: &'p RequesterProfile,
    subjects: SubjectProfile,
    interests: InterestFilter,
    weights: CriterionWeights,
}

/// Ranking pipeline without any I/O
///
/// # Pipeline Stages
/// 1. Score every candidate once (subjects, grades, preferences, interests)
/// 2. Keep the best `top_k` composites in a bounded heap
/// 3. Career-interest gate
/// 4. Feedback adjustment, final ordering, reasons and alternatives
pub struct Matcher {
    subjects: SubjectMatcher,
    scorers: Vec<Box<dyn Scorer>>,
    top_k: usize,
    min_score: f64,
}

impl Matcher {
    pub fn new(scorers: Vec<Box<dyn Scorer>>) -> Self {
        Self {
            subjects: SubjectMatcher::new(),
            scorers,
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    pub fn with_default_scorers() -> Self {
        Self::new(default_scorers())
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    fn context<'p>(&self, profile: &'p RequesterProfile, config: &RankingConfig) -> RequestContext<'p> {
        RequestContext {
            profile,
            subjects: self.subjects.profile(&profile.subjects, &profile.predicted_grades),
            interests: InterestFilter::new(&profile.preferences.career_interests, &config.taxonomy),
            weights: config.weights,
        }
    }

    fn evaluate<'a>(&self, record: &'a CandidateRecord, ctx: &RequestContext<'_>) -> ScoredCandidate<'a> {
        let signals = CandidateSignals {
            subjects: self
                .subjects
                .match_subjects(&ctx.subjects, &record.requirements, &record.title),
            grades: assess_grades(&self.subjects, &ctx.subjects, &record.requirements),
            preferences: preference_facts(record, &ctx.profile.preferences),
            interest: ctx.interests.classify(&record.classification_text()),
            outcomes: outcome_facts(record),
        };

        let breakdown = score_breakdown(
            &self.scorers,
            &ScoreInput {
                candidate: record,
                profile: ctx.profile,
                signals: &signals,
            },
            &ctx.weights,
        );

        ScoredCandidate {
            record,
            signals,
            breakdown,
        }
    }

    /// Score every candidate exactly once and keep the gated Top-K
    pub fn shortlist<'a>(
        &self,
        profile: &RequesterProfile,
        candidates: &'a [CandidateRecord],
        config: &RankingConfig,
    ) -> Shortlist<'a> {
        let ctx = self.context(profile, config);
        let mut selector = TopKSelector::new(self.top_k, self.min_score);

        for record in candidates {
            let scored = self.evaluate(record, &ctx);
            selector.offer(scored.breakdown.composite, scored);
        }

        let selected = selector.into_sorted_vec();
        let kept = selected.len();
        let survivors: Vec<_> = selected
            .into_iter()
            .filter(|s| ctx.interests.admits(&s.payload.signals.interest))
            .collect();

        tracing::debug!(
            candidates = candidates.len(),
            selected = kept,
            survivors = survivors.len(),
            "Shortlist built"
        );

        Shortlist {
            survivors,
            total_candidates: candidates.len(),
        }
    }

    /// Apply feedback, order, explain and truncate the shortlist
    pub fn finalize(
        &self,
        shortlist: Shortlist<'_>,
        mut auxiliary: HashMap<String, AuxiliaryAttributes>,
        deltas: &HashMap<String, f64>,
        adjuster: &FeedbackAdjuster,
        limit: usize,
    ) -> RankingOutcome {
        let total_candidates = shortlist.total_candidates;
        let survivors = shortlist.survivors.len();

        let mut adjusted: Vec<(f64, Selected<ScoredCandidate<'_>>)> = shortlist
            .survivors
            .into_iter()
            .map(|s| {
                let delta = deltas.get(&s.payload.record.id).copied().unwrap_or(0.0);
                (adjuster.apply(s.payload.breakdown.composite, delta), s)
            })
            .collect();

        // Sort by adjusted score (descending), then by arrival (ascending)
        adjusted.sort_by(|(a_score, a), (b_score, b)| {
            b_score
                .total_cmp(a_score)
                .then_with(|| a.arrival.cmp(&b.arrival))
        });

        let alternatives = best_alternatives(&adjusted);

        let results = adjusted
            .iter()
            .take(limit)
            .zip(alternatives)
            .map(|((score, selected), alternative)| {
                let candidate = &selected.payload;
                let record = candidate.record;
                let aux = match (auxiliary.remove(&record.id), &record.auxiliary) {
                    (Some(mut enriched), Some(own)) => {
                        enriched.merge(own.clone());
                        Some(enriched)
                    }
                    (enriched, own) => enriched.or_else(|| own.clone()),
                };
                let feedback_adjustment = score - candidate.breakdown.composite;

                RankedResult {
                    course_id: record.id.clone(),
                    title: record.title.clone(),
                    institution: record.institution.name.clone(),
                    score: *score,
                    breakdown: candidate.breakdown.clone(),
                    meets_hard_requirements: candidate.signals.grades.meets_all(),
                    reasons: reasons(candidate, feedback_adjustment),
                    auxiliary: aux,
                    alternative,
                    feedback_adjustment,
                }
            })
            .collect();

        RankingOutcome {
            results,
            total_candidates,
            survivors,
        }
    }

    /// Full pipeline with no enrichment and no feedback
    pub fn find_matches(
        &self,
        profile: &RequesterProfile,
        candidates: &[CandidateRecord],
        config: &RankingConfig,
        limit: usize,
    ) -> RankingOutcome {
        let shortlist = self.shortlist(profile, candidates, config);
        self.finalize(
            shortlist,
            HashMap::new(),
            &HashMap::new(),
            &FeedbackAdjuster::new(config.feedback),
            limit,
        )
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_scorers()
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let criteria: Vec<_> = self.scorers.iter().map(|s| s.criterion()).collect();
        f.debug_struct("Matcher")
            .field("criteria", &criteria)
            .field("top_k", &self.top_k)
            .field("min_score", &self.min_score)
            .finish()
    }
}

/// For each entry, the best-scoring other entry from the same institution.
///
/// `ranked` must already be in final order.
fn best_alternatives(ranked: &[(f64, Selected<ScoredCandidate<'_>>)]) -> Vec<Option<Alternative>> {
    let mut leaders: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, (_, selected)) in ranked.iter().enumerate() {
        let slot = leaders.entry(selected.payload.record.institution.id.as_str()).or_default();
        if slot.len() < 2 {
            slot.push(idx);
        }
    }

    ranked
        .iter()
        .enumerate()
        .map(|(idx, (_, selected))| {
            let institution = selected.payload.record.institution.id.as_str();
            leaders
                .get(institution)
                .and_then(|slot| slot.iter().find(|&&other| other != idx))
                .map(|&other| {
                    let (score, alt) = &ranked[other];
                    Alternative {
                        course_id: alt.payload.record.id.clone(),
                        title: alt.payload.record.title.clone(),
                        score: *score,
                    }
                })
        })
        .collect()
}

/// Human-readable reasons, derived from the signals used for scoring
fn reasons(candidate: &ScoredCandidate<'_>, feedback_adjustment: f64) -> Vec<String> {
    let record = candidate.record;
    let signals = &candidate.signals;
    let mut reasons = Vec::new();

    if !signals.subjects.matched_subjects.is_empty() {
        reasons.push(format!(
            "Matches your subjects: {}",
            signals.subjects.matched_subjects.join(", ")
        ));
    }

    let grades = &signals.grades;
    if grades.counted > 0 && grades.meets_all() {
        reasons.push("Your predicted grades meet the entry requirements".to_string());
    } else if grades.is_near_miss() {
        reasons.push("Your predicted grades are close to the entry requirements".to_string());
    }

    let outcomes = &signals.outcomes;
    if let Some(rank) = outcomes.rank.filter(|r| (1..=TOP_RANK_REASON).contains(r)) {
        match outcomes.rank_source {
            RankSource::Subject => reasons.push(format!("Top-ranked for this subject (#{})", rank)),
            RankSource::Institution => reasons.push(format!("Top-ranked institution (#{})", rank)),
        }
    }

    if let Some(pct) = outcomes.employment_pct.filter(|p| *p >= EMPLOYABILITY_REASON_PCT) {
        reasons.push(format!("{:.0}% of graduates in employment", pct));
    }

    if signals.preferences.region_match == Some(true) {
        match &record.institution.region {
            Some(region) => reasons.push(format!("In your preferred region ({})", region)),
            None => reasons.push("In your preferred region".to_string()),
        }
    }

    if signals.preferences.within_budget == Some(true) {
        reasons.push("Within your budget".to_string());
    }

    if let Some(interest) = &signals.interest.aligned_with {
        reasons.push(format!("Aligns with your interest in {}", interest));
    }

    if feedback_adjustment > 0.0 {
        reasons.push("Rated highly by students like you".to_string());
    }

    reasons
}
