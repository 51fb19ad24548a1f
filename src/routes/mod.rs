// Route exports
pub mod cohorts;
pub mod donors;
pub mod hospitals;
pub mod schedule;

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use std::sync::Arc;

use crate::config::{MatchingSettings, RotationSettings};
use crate::core::{
    calculate_bounding_box, is_within_bounding_box, DonorMatcher, HospitalMatcher,
};
use crate::error::EngineError;
use crate::models::{BloodGroup, Donor, HealthResponse};
use crate::services::{CacheError, CacheKey, CacheManager, NotifyClient, PostgresClient, ProfileClient};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<ProfileClient>,
    pub notify: Arc<NotifyClient>,
    pub cache: Arc<CacheManager>,
    pub postgres: Arc<PostgresClient>,
    pub matcher: DonorMatcher,
    pub hospital_matcher: HospitalMatcher,
    pub matching: MatchingSettings,
    pub rotation: RotationSettings,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(donors::configure)
            .configure(hospitals::configure)
            .configure(cohorts::configure)
            .configure(schedule::configure),
    );
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Verify the gateway-resolved identity against the requested patient.
///
/// Authentication happens upstream; the gateway injects the resolved patient
/// id as a header. Patient-scoped operations never act on a payload patient
/// that does not match it.
pub(crate) fn require_patient_identity(
    req: &HttpRequest,
    patient_id: &str,
) -> Result<(), EngineError> {
    let resolved = req
        .headers()
        .get("x-patient-id")
        .and_then(|v| v.to_str().ok());

    match resolved {
        Some(resolved) if resolved == patient_id => Ok(()),
        Some(_) => Err(EngineError::PreconditionFailed(
            "authenticated patient does not match the requested patient".to_string(),
        )),
        None => Err(EngineError::PreconditionFailed(
            "missing resolved patient identity".to_string(),
        )),
    }
}

/// Assemble the candidate donor pool for a set of blood groups.
///
/// Pools are cached per group (snapshot consistency is fine for matching
/// reads); a cache failure falls through to the profile service. When an
/// origin is known, a bounding-box pre-filter trims the pool before the
/// haversine ranking — donors without coordinates always pass through.
pub(crate) async fn donor_pool(
    state: &AppState,
    groups: &[BloodGroup],
    origin: Option<(f64, f64)>,
    radius_km: f64,
) -> Result<Vec<Donor>, EngineError> {
    let mut pool: Vec<Donor> = Vec::new();

    for group in groups {
        let key = CacheKey::donor_pool(*group);
        match state.cache.get::<Vec<Donor>>(&key).await {
            Ok(donors) => {
                pool.extend(donors);
                continue;
            }
            Err(CacheError::CacheMiss(_)) => {}
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}, using profile service", key, e);
            }
        }

        let donors = state.profiles.list_donors(&[*group], None).await?;
        if let Err(e) = state.cache.set(&key, &donors).await {
            tracing::warn!("Cache write failed for {}: {}", key, e);
        }
        pool.extend(donors);
    }

    if let Some((lat, lon)) = origin {
        let bbox = calculate_bounding_box(lat, lon, radius_km);
        pool.retain(|donor| match donor.coords() {
            Some((dlat, dlon)) => is_within_bounding_box(dlat, dlon, &bbox),
            None => true,
        });
    }

    Ok(pool)
}
