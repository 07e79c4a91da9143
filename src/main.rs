use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use course_match::config::Settings;
use course_match::core::{EngineSettings, Enricher, Matcher, RankingEngine};
use course_match::routes::{self, AppState};
use course_match::services::{
    AuxiliaryDataStore, AuxiliarySource, CachedCatalog, ConfigHandle, FileConfigStore, PostgresClient,
};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }

    info!("Starting course-match ranking service...");

    let settings = Settings::load().map_err(|e| startup_error("Failed to load configuration", e))?;

    info!("Configuration loaded successfully");

    let db_max_conn = settings.database.max_connections.unwrap_or(10);
    let postgres = PostgresClient::from_settings(
        &settings.database.url,
        Some(db_max_conn),
        settings.database.min_connections,
        settings.database.acquire_timeout_secs,
        settings.database.idle_timeout_secs,
    )
    .await
    .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?;

    info!("PostgreSQL client initialized (max: {} connections)", db_max_conn);

    let catalog = Arc::new(CachedCatalog::new(
        Arc::new(postgres.catalog()),
        settings.cache.max_entries,
        settings.cache.ttl_secs,
    ));

    info!(
        "Catalog cache initialized ({} snapshots, TTL: {}s)",
        settings.cache.max_entries, settings.cache.ttl_secs
    );

    let sources: Vec<Arc<dyn AuxiliaryDataStore>> = [
        AuxiliarySource::Employment,
        AuxiliarySource::Salary,
        AuxiliarySource::Earnings,
        AuxiliarySource::JobDestinations,
    ]
    .into_iter()
    .map(|source| Arc::new(postgres.auxiliary(source)) as Arc<dyn AuxiliaryDataStore>)
    .collect();

    let config_store = Arc::new(FileConfigStore::new(&settings.ranking.config_path));
    let config = Arc::new(ConfigHandle::load(config_store).await);

    info!("Ranking configuration loaded from {}", settings.ranking.config_path);

    let matcher = Matcher::with_default_scorers()
        .with_top_k(settings.ranking.top_k)
        .with_min_score(settings.ranking.min_score);

    info!("Matcher initialized: {:?}", matcher);

    let engine = RankingEngine::new(
        matcher,
        catalog,
        Enricher::new(sources),
        Arc::new(postgres.feedback()),
        config,
        EngineSettings {
            catalog_fetch_limit: settings.ranking.catalog_fetch_limit,
            max_limit: settings.ranking.max_limit as usize,
        },
    );

    let app_state = AppState {
        engine: Arc::new(engine),
        database: Some(postgres),
        default_limit: settings.ranking.default_limit,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
