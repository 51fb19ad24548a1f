mod config;
mod core;
mod error;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{error as actix_error, middleware, web, App, HttpServer};
use config::Settings;
use core::{DonorMatcher, HospitalMatcher, MatchPolicy};
use error::EngineError;
use routes::AppState;
use services::{CacheManager, NotifyClient, PostgresClient, ProfileClient};
use std::sync::Arc;
use tracing::{error, info};

/// Handle JSON payload errors
pub fn handle_json_payload_error(
    err: actix_error::JsonPayloadError,
    req: &actix_web::HttpRequest,
) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    EngineError::Validation(format!("Invalid JSON: {}", err)).into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(
    err: actix_error::QueryPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    EngineError::Validation(format!("Invalid query: {}", err)).into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt().with_target(false).with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting BloodLink engine...");

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    info!("Configuration loaded successfully");

    // Initialize profile service client
    let profiles = Arc::new(ProfileClient::new(
        settings.profiles.base_url,
        settings.profiles.api_key,
    ));

    info!("Profile service client initialized");

    // Initialize notification service client
    let notify = Arc::new(NotifyClient::new(
        settings.notify.base_url,
        settings.notify.api_key,
    ));

    // Initialize cache manager
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match CacheManager::new(&settings.cache.redis_url, l1_cache_size, cache_ttl).await {
        Ok(c) => {
            info!(
                "Cache manager initialized (L1: {} entries, TTL: {}s)",
                l1_cache_size, cache_ttl
            );
            Arc::new(c)
        }
        Err(e) => {
            error!("Failed to connect to Redis ({})", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "Redis connection required",
            ));
        }
    };

    // Initialize PostgreSQL client
    let db_max_conn = settings.database.max_connections.unwrap_or(10);
    let db_min_conn = settings.database.min_connections.unwrap_or(1);

    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            Some(db_max_conn),
            Some(db_min_conn),
        )
        .await
        .unwrap_or_else(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            panic!("PostgreSQL connection error: {}", e);
        }),
    );

    info!(
        "PostgreSQL client initialized (max: {} connections)",
        db_max_conn
    );

    // Initialize matchers with the configured policy
    let policy = MatchPolicy::from_label(&settings.matching.policy);
    let matcher = DonorMatcher::new(policy, settings.matching.donor_cooldown_days);
    let hospital_matcher = HospitalMatcher::new(policy, settings.shelf_life.clone());

    info!(
        "Matchers initialized (policy: {:?}, cohort size: {}, cadence: {} days)",
        policy, settings.rotation.cohort_size, settings.rotation.cadence_days
    );

    // Build application state
    let app_state = AppState {
        profiles,
        notify,
        cache,
        postgres,
        matcher,
        hospital_matcher,
        matching: settings.matching,
        rotation: settings.rotation,
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
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
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
