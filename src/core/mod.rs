// Core algorithm exports
pub mod engine;
pub mod enrichment;
pub mod feedback;
pub mod filters;
pub mod matcher;
pub mod scoring;
pub mod selector;
pub mod subjects;

pub use engine::{validate_profile, EngineSettings, RankError, RankingEngine};
pub use enrichment::Enricher;
pub use feedback::FeedbackAdjuster;
pub use filters::{classify, InterestClassification, InterestFilter};
pub use matcher::{Matcher, RankingOutcome, ScoredCandidate, Shortlist};
pub use scoring::{default_scorers, score_breakdown, CandidateSignals, ScoreInput, Scorer};
pub use selector::{Selected, TopKSelector};
pub use subjects::{MatchResult, MatchStrategy, SubjectMatcher, SubjectProfile};
