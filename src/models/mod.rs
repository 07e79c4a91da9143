// Model exports
pub mod domain;
pub mod grade;
pub mod requests;
pub mod responses;
pub mod taxonomy;

pub use domain::{
    Alternative, AuxiliaryAttributes, CandidateBatch, CandidateRecord, Criterion, CriterionWeights,
    FeedbackCounts, FeedbackPolarity, FeedbackSettings, FeedbackSignal, Institution, InstitutionSize,
    PreferenceSet, RankedResult, Requirement, RequesterProfile, SalaryQuartiles, ScoreBreakdown,
    YearlyEarnings,
};
pub use grade::{Grade, GradeParseError};
pub use requests::RankRequest;
pub use responses::{ErrorResponse, HealthResponse, RankResponse, ReloadResponse};
pub use taxonomy::{CareerInterestTaxonomy, InterestCategory, WeightedKeyword};
