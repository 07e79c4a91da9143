//! Course Match - ranking service for university course recommendations
//!
//! Scores a catalog of courses against a requester's subjects, predicted
//! grades and preferences, keeps the best candidates in a bounded heap, and
//! returns an explained, feedback-adjusted shortlist.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{Matcher, RankError, RankingEngine, RankingOutcome};
pub use models::{CandidateRecord, Grade, RankRequest, RankedResult, RequesterProfile};
