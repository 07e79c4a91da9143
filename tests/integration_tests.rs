// Integration tests for Course Match

use actix_web::{test, web, App};
use async_trait::async_trait;
use course_match::core::filters::classify;
use course_match::core::scoring::{ScoreInput, Scorer};
use course_match::core::{EngineSettings, Enricher, Matcher, RankError, RankingEngine};
use course_match::models::{
    AuxiliaryAttributes, CandidateBatch, CandidateRecord, CareerInterestTaxonomy, Criterion, FeedbackCounts,
    FeedbackPolarity, FeedbackSignal, Grade, Institution, PreferenceSet, RequesterProfile, Requirement,
};
use course_match::routes::{self, AppState};
use course_match::services::{
    AuxiliaryDataStore, AuxiliarySource, CatalogProvider, ConfigHandle, ContextFilter, FeedbackStore,
    RankingConfig, StoreError,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const TITLES: &[&str] = &[
    "Mathematics",
    "Physics",
    "Mechanical Engineering",
    "Accounting and Finance",
    "Economics",
    "History",
    "Computer Science",
    "Business Management",
    "Fine Art",
    "Law",
];

fn create_course(i: usize) -> CandidateRecord {
    let title = TITLES[i % TITLES.len()];
    CandidateRecord {
        id: format!("course-{}", i),
        title: title.to_string(),
        subject_area: None,
        qualification: Some(if i % 7 == 0 { "Degree Apprenticeship" } else { "BSc (Hons)" }.to_string()),
        institution: Institution {
            id: format!("inst-{}", i % 150),
            name: format!("University {}", i % 150),
            region: Some(if i % 3 == 0 { "London" } else { "Scotland" }.to_string()),
            rank: Some((i % 150) as u32 + 1),
            employability: Some(60.0 + (i % 40) as f64),
            student_count: Some(5_000 + (i % 30) as u32 * 1_000),
        },
        requirements: vec![Requirement {
            subject: if i % 2 == 0 { "Mathematics" } else { "English Literature" }.to_string(),
            min_grade: [Grade::AStar, Grade::A, Grade::B, Grade::C][i % 4],
        }],
        annual_cost: Some(9_250.0 + (i % 5) as f64 * 500.0),
        employability: None,
        subject_rank: None,
        median_salary: Some(20_000.0 + (i % 25) as f64 * 1_000.0),
        auxiliary: None,
    }
}

fn create_catalog(n: usize) -> CandidateBatch {
    (0..n).map(create_course).collect::<Vec<_>>().into()
}

fn create_profile(interests: &[&str]) -> RequesterProfile {
    RequesterProfile {
        requester_id: "student-42".to_string(),
        subjects: vec!["Maths".to_string(), "Physics".to_string(), "Economics".to_string()],
        predicted_grades: HashMap::from([
            ("Mathematics".to_string(), Grade::A),
            ("Physics".to_string(), Grade::B),
        ]),
        preferences: PreferenceSet {
            career_interests: interests.iter().map(|s| s.to_string()).collect(),
            preferred_region: Some("London".to_string()),
            max_budget: Some(9_500.0),
            ..Default::default()
        },
    }
}

struct FakeCatalog {
    records: CandidateBatch,
    calls: AtomicUsize,
    fail: bool,
}

impl FakeCatalog {
    fn new(records: CandidateBatch) -> Arc<Self> {
        Arc::new(Self {
            records,
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            records: Vec::new().into(),
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }
}

#[async_trait]
impl CatalogProvider for FakeCatalog {
    async fn fetch_candidates(&self, limit: usize) -> Result<CandidateBatch, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::Unavailable("catalog offline".to_string()));
        }
        if limit >= self.records.len() {
            return Ok(self.records.clone());
        }
        Ok(self.records[..limit].to_vec().into())
    }
}

struct FakeAuxiliary {
    source: AuxiliarySource,
    calls: AtomicUsize,
}

#[async_trait]
impl AuxiliaryDataStore for FakeAuxiliary {
    fn source(&self) -> AuxiliarySource {
        self.source
    }

    async fn batch_resolve(
        &self,
        course_ids: &[String],
    ) -> Result<HashMap<String, AuxiliaryAttributes>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(course_ids
            .iter()
            .map(|id| {
                let attrs = match self.source {
                    AuxiliarySource::Employment => AuxiliaryAttributes {
                        employment_rate: Some(88.0),
                        ..Default::default()
                    },
                    _ => AuxiliaryAttributes {
                        job_destinations: vec!["Analyst".to_string()],
                        ..Default::default()
                    },
                };
                (id.clone(), attrs)
            })
            .collect())
    }
}

#[derive(Default)]
struct FakeFeedback {
    own: HashMap<String, FeedbackCounts>,
    similar: HashMap<String, FeedbackCounts>,
    own_calls: AtomicUsize,
    similar_calls: AtomicUsize,
    own_requested: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl FeedbackStore for FakeFeedback {
    async fn aggregate_own(
        &self,
        _requester_id: &str,
        course_ids: &[String],
    ) -> Result<HashMap<String, FeedbackCounts>, StoreError> {
        self.own_calls.fetch_add(1, Ordering::SeqCst);
        self.own_requested.lock().unwrap().extend_from_slice(course_ids);
        if self.fail {
            return Err(StoreError::Unavailable("feedback offline".to_string()));
        }
        Ok(self.own.clone())
    }

    async fn aggregate_similar(
        &self,
        _course_ids: &[String],
        _requester_id: &str,
        filter: &ContextFilter,
    ) -> Result<HashMap<String, FeedbackCounts>, StoreError> {
        assert!(!filter.career_interests.is_empty());
        self.similar_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::Unavailable("feedback offline".to_string()));
        }
        Ok(self.similar.clone())
    }
}

struct Harness {
    engine: RankingEngine,
    catalog: Arc<FakeCatalog>,
    auxiliary: Vec<Arc<FakeAuxiliary>>,
    feedback: Arc<FakeFeedback>,
}

fn harness(catalog: Arc<FakeCatalog>, feedback: FakeFeedback, matcher: Matcher) -> Harness {
    let auxiliary: Vec<Arc<FakeAuxiliary>> = [AuxiliarySource::Employment, AuxiliarySource::JobDestinations]
        .into_iter()
        .map(|source| {
            Arc::new(FakeAuxiliary {
                source,
                calls: AtomicUsize::new(0),
            })
        })
        .collect();
    let sources = auxiliary
        .iter()
        .map(|a| a.clone() as Arc<dyn AuxiliaryDataStore>)
        .collect();
    let feedback = Arc::new(feedback);

    let engine = RankingEngine::new(
        matcher,
        catalog.clone(),
        Enricher::new(sources),
        feedback.clone(),
        Arc::new(ConfigHandle::fixed(RankingConfig::default())),
        EngineSettings::default(),
    );

    Harness {
        engine,
        catalog,
        auxiliary,
        feedback,
    }
}

#[tokio::test]
async fn test_large_catalog_returns_limit_from_true_top_k() {
    let catalog = create_catalog(50_000);
    let h = harness(FakeCatalog::new(catalog.clone()), FakeFeedback::default(), Matcher::default());
    let profile = create_profile(&[]);

    let outcome = h.engine.rank(profile.clone(), 20).await.unwrap();

    assert_eq!(outcome.results.len(), 20);
    assert_eq!(outcome.total_candidates, 50_000);
    assert_eq!(outcome.survivors, 100);

    // Full sort of the same stream
    let full = Matcher::default()
        .with_top_k(catalog.len())
        .shortlist(&profile, &catalog, &RankingConfig::default());
    let true_top: HashSet<String> = full
        .survivors
        .iter()
        .take(100)
        .map(|s| s.payload.record.id.clone())
        .collect();

    for result in &outcome.results {
        assert!(true_top.contains(&result.course_id), "{} not in true top-100", result.course_id);
        assert!((0.0..=1.0).contains(&result.score));
    }
    for pair in outcome.results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

struct CountingScorer {
    calls: Arc<AtomicUsize>,
}

impl Scorer for CountingScorer {
    fn criterion(&self) -> Criterion {
        Criterion::Employability
    }

    fn score(&self, _input: &ScoreInput<'_>) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        1.0
    }
}

#[tokio::test]
async fn test_each_candidate_is_scored_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let matcher = Matcher::new(vec![Box::new(CountingScorer { calls: calls.clone() })]);
    let h = harness(FakeCatalog::new(create_catalog(5_000)), FakeFeedback::default(), matcher);

    let outcome = h.engine.rank(create_profile(&[]), 20).await.unwrap();

    assert_eq!(outcome.results.len(), 20);
    assert_eq!(calls.load(Ordering::SeqCst), 5_000);
}

#[tokio::test]
async fn test_interest_filter_is_exclusive() {
    let h = harness(FakeCatalog::new(create_catalog(2_000)), FakeFeedback::default(), Matcher::default());
    let interests = ["Business & Finance"];

    let outcome = h.engine.rank(create_profile(&interests), 50).await.unwrap();

    assert!(!outcome.results.is_empty());
    let taxonomy = CareerInterestTaxonomy::builtin();
    let declared: Vec<String> = interests.iter().map(|s| s.to_string()).collect();
    for result in &outcome.results {
        let classification = classify(&result.title, &declared, &taxonomy);
        assert!(classification.aligned, "{} is not aligned", result.title);
        assert_ne!(result.title, "Mechanical Engineering");
    }
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_fetching() {
    let h = harness(FakeCatalog::new(create_catalog(10)), FakeFeedback::default(), Matcher::default());

    let mut profile = create_profile(&[]);
    profile.subjects.clear();
    let result = h.engine.rank(profile, 20).await;
    assert!(matches!(result, Err(RankError::InvalidInput(_))));

    let mut profile = create_profile(&[]);
    profile.preferences.max_budget = Some(-100.0);
    let result = h.engine.rank(profile, 20).await;
    assert!(matches!(result, Err(RankError::InvalidInput(_))));

    assert_eq!(h.catalog.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_catalog_failure_is_fatal() {
    let h = harness(FakeCatalog::failing(), FakeFeedback::default(), Matcher::default());

    let result = h.engine.rank(create_profile(&[]), 20).await;

    assert!(matches!(result, Err(RankError::CatalogUnavailable(_))));
}

#[tokio::test]
async fn test_feedback_failure_degrades_to_no_adjustment() {
    let feedback = FakeFeedback {
        fail: true,
        ..Default::default()
    };
    let h = harness(FakeCatalog::new(create_catalog(500)), feedback, Matcher::default());

    let outcome = h.engine.rank(create_profile(&["Business & Finance"]), 10).await.unwrap();

    assert!(!outcome.results.is_empty());
    assert!(outcome.results.iter().all(|r| r.feedback_adjustment == 0.0));
}

#[tokio::test]
async fn test_batched_calls_do_not_scale_with_survivors() {
    let h = harness(FakeCatalog::new(create_catalog(3_000)), FakeFeedback::default(), Matcher::default());

    let outcome = h.engine.rank(create_profile(&["Business & Finance"]), 20).await.unwrap();

    assert!(outcome.survivors > 1);
    for aux in &h.auxiliary {
        assert_eq!(aux.calls.load(Ordering::SeqCst), 1);
    }
    assert_eq!(h.feedback.own_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.feedback.similar_calls.load(Ordering::SeqCst), 1);

    // Every surviving result is enriched from both sources
    for result in &outcome.results {
        let aux = result.auxiliary.as_ref().unwrap();
        assert_eq!(aux.employment_rate, Some(88.0));
        assert_eq!(aux.job_destinations, vec!["Analyst"]);
    }
}

#[tokio::test]
async fn test_no_interests_skips_similar_lookup() {
    let h = harness(FakeCatalog::new(create_catalog(300)), FakeFeedback::default(), Matcher::default());

    h.engine.rank(create_profile(&[]), 20).await.unwrap();

    assert_eq!(h.feedback.own_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.feedback.similar_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_feedback_boosts_approved_course() {
    let catalog = create_catalog(300);
    let baseline = harness(FakeCatalog::new(catalog.clone()), FakeFeedback::default(), Matcher::default());
    let before = baseline.engine.rank(create_profile(&[]), 20).await.unwrap();
    let target = before.results[10].course_id.clone();
    let score_before = before.results[10].score;

    let feedback = FakeFeedback {
        own: FeedbackCounts::tally(&approvals("student-42", &target, 6)),
        ..Default::default()
    };
    let h = harness(FakeCatalog::new(catalog), feedback, Matcher::default());
    let after = h.engine.rank(create_profile(&[]), 20).await.unwrap();

    let boosted = after.results.iter().find(|r| r.course_id == target).unwrap();
    assert!(boosted.feedback_adjustment > 0.0);
    assert!(boosted.score > score_before && boosted.score <= 1.0);
    assert!(boosted.reasons.iter().any(|r| r.contains("students like you")));
    let position = after.results.iter().position(|r| r.course_id == target).unwrap();
    assert!(position <= 10);
}

fn approvals(requester_id: &str, course_id: &str, n: usize) -> Vec<FeedbackSignal> {
    (0..n)
        .map(|_| FeedbackSignal {
            requester_id: requester_id.to_string(),
            course_id: course_id.to_string(),
            polarity: FeedbackPolarity::Approve,
            recorded_at: chrono::Utc::now(),
            score_at_time: None,
            context: None,
        })
        .collect()
}

#[tokio::test]
async fn test_feedback_cannot_lift_course_into_top_k() {
    let catalog = create_catalog(300);
    let baseline = harness(FakeCatalog::new(catalog.clone()), FakeFeedback::default(), Matcher::default());
    let before = baseline.engine.rank(create_profile(&[]), 20).await.unwrap();
    let just_outside = before.results[5].course_id.clone();

    let feedback = FakeFeedback {
        own: FeedbackCounts::tally(&approvals("student-42", &just_outside, 50)),
        ..Default::default()
    };
    let h = harness(FakeCatalog::new(catalog), feedback, Matcher::default().with_top_k(5));
    let after = h.engine.rank(create_profile(&[]), 20).await.unwrap();

    assert_eq!(after.results.len(), 5);
    assert!(after.results.iter().all(|r| r.course_id != just_outside));
    let requested = h.feedback.own_requested.lock().unwrap();
    assert_eq!(requested.len(), 5);
    assert!(!requested.contains(&just_outside));
}

#[tokio::test]
async fn test_limit_is_capped() {
    let h = harness(FakeCatalog::new(create_catalog(1_000)), FakeFeedback::default(), Matcher::default());

    let outcome = h.engine.rank(create_profile(&[]), 500).await.unwrap();

    assert_eq!(outcome.results.len(), 100);
}

fn app_state(catalog: Arc<FakeCatalog>) -> AppState {
    let h = harness(catalog, FakeFeedback::default(), Matcher::default());
    AppState {
        engine: Arc::new(h.engine),
        database: None,
        default_limit: 20,
    }
}

#[actix_web::test]
async fn test_http_rank_courses() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(FakeCatalog::new(create_catalog(200)))))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/rankings")
        .set_json(serde_json::json!({
            "requesterId": "student-42",
            "subjects": ["Mathematics", "Physics"],
            "predictedGrades": { "Mathematics": "A*", "Physics": "a" },
            "preferences": { "preferredRegion": "London" },
            "limit": 5
        }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["results"].as_array().unwrap().len(), 5);
    assert_eq!(body["totalCandidates"], 200);
    assert!(body["rankingId"].is_string());
    assert!(body["results"][0]["breakdown"]["components"]["subject"].is_number());
}

#[actix_web::test]
async fn test_http_invalid_grade_is_bad_request() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(FakeCatalog::new(create_catalog(10)))))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/rankings")
        .set_json(serde_json::json!({
            "requesterId": "student-42",
            "subjects": ["Mathematics"],
            "predictedGrades": { "Mathematics": "Z" }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_input");
}

#[actix_web::test]
async fn test_http_empty_subjects_fail_validation() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(FakeCatalog::new(create_catalog(10)))))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/rankings")
        .set_json(serde_json::json!({ "requesterId": "student-42", "subjects": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_http_catalog_down_is_unavailable() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(FakeCatalog::failing())))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/rankings")
        .set_json(serde_json::json!({ "requesterId": "student-42", "subjects": ["History"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 503);
}

#[actix_web::test]
async fn test_http_health_and_reload() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(FakeCatalog::new(create_catalog(10)))))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");

    let req = test::TestRequest::post().uri("/api/v1/config/reload").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["interestCategories"], 10);
    assert_eq!(body["weights"]["subject"], 0.3);
}
