use actix_web::{http::StatusCode, web, HttpResponse, Responder, ResponseError};
use std::sync::Arc;
use validator::Validate;

use crate::core::{RankError, RankingEngine};
use crate::models::{ErrorResponse, HealthResponse, RankRequest, RankResponse, ReloadResponse};
use crate::services::PostgresClient;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RankingEngine>,
    /// Absent when running against in-memory collaborators
    pub database: Option<PostgresClient>,
    pub default_limit: u16,
}

impl ResponseError for RankError {
    fn status_code(&self) -> StatusCode {
        match self {
            RankError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RankError::CatalogUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            RankError::InvalidInput(_) => "invalid_input",
            RankError::CatalogUnavailable(_) => "catalog_unavailable",
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
            status_code: self.status_code().as_u16(),
        })
    }
}

/// Configure ranking and maintenance routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/rankings", web::post().to(rank_courses))
        .route("/config/reload", web::post().to(reload_config));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = match &state.database {
        Some(db) => db.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Rank courses endpoint
///
/// POST /api/v1/rankings
///
/// Request body:
/// ```json
/// {
///   "requesterId": "string",
///   "subjects": ["Mathematics", "Physics"],
///   "predictedGrades": { "Mathematics": "A*", "Physics": "A" },
///   "preferences": { "careerInterests": ["Engineering & Technology"], "maxBudget": 9250 },
///   "limit": 20
/// }
/// ```
async fn rank_courses(
    state: web::Data<AppState>,
    req: web::Json<RankRequest>,
) -> Result<HttpResponse, RankError> {
    if let Err(errors) = req.validate() {
        tracing::info!(requester_id = %req.requester_id, "Validation failed for ranking request: {}", errors);
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        }));
    }

    let request = req.into_inner();
    let limit = request.limit.unwrap_or(state.default_limit) as usize;
    let profile = request.into_profile()?;

    tracing::info!(requester_id = %profile.requester_id, limit, "Ranking courses");

    let outcome = state.engine.rank(profile, limit).await?;

    Ok(HttpResponse::Ok().json(RankResponse {
        ranking_id: uuid::Uuid::new_v4().to_string(),
        results: outcome.results,
        total_candidates: outcome.total_candidates,
        survivors: outcome.survivors,
    }))
}

/// Re-read weights, taxonomy and feedback settings
///
/// POST /api/v1/config/reload
async fn reload_config(state: web::Data<AppState>) -> impl Responder {
    let config = state.engine.config().reload().await;

    HttpResponse::Ok().json(ReloadResponse {
        weights: config.weights,
        interest_categories: config.taxonomy.categories.len(),
        reloaded_at: chrono::Utc::now(),
    })
}
