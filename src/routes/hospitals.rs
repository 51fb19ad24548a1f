use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::core::{HospitalQuery, HospitalSort, MatchPolicy};
use crate::error::EngineError;
use crate::models::{
    BloodGroup, Component, FindHospitalsRequest, HospitalMatchesResponse,
};
use crate::routes::AppState;

/// Configure hospital matching routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/hospitals/match", web::post().to(find_matching_hospitals));
}

/// Ranked hospital/blood-bank search
///
/// POST /api/v1/hospitals/match
async fn find_matching_hospitals(
    state: web::Data<AppState>,
    req: web::Json<FindHospitalsRequest>,
) -> Result<HttpResponse, EngineError> {
    req.validate()
        .map_err(|e| EngineError::Validation(e.to_string()))?;

    let blood_group = match &req.blood_group {
        Some(raw) => Some(BloodGroup::from_wire(raw).ok_or_else(|| {
            EngineError::Validation(format!("unknown blood group '{}'", raw))
        })?),
        None => None,
    };
    let component = match &req.component {
        Some(raw) => Some(Component::from_wire(raw).ok_or_else(|| {
            EngineError::Validation(format!("unknown component '{}'", raw))
        })?),
        None => None,
    };

    let origin = match (req.patient_lat, req.patient_lng) {
        (Some(lat), Some(lng)) => Some((lat, lng)),
        _ => None,
    };

    let sort = HospitalSort::resolve(req.sort_by.as_deref(), req.urgency);

    let matcher = match req.compatible {
        Some(true) => state.hospital_matcher.with_policy(MatchPolicy::AboCompatible),
        Some(false) => state.hospital_matcher.with_policy(MatchPolicy::Exact),
        None => state.hospital_matcher.clone(),
    };

    let hospitals = state.postgres.list_hospitals().await?;

    let query = HospitalQuery {
        blood_group,
        component,
        location: req.location.clone(),
        origin,
        radius_km: req.radius_km,
        min_units: req.min_units,
        sort,
    };

    let outcome = matcher.rank(&query, hospitals);

    tracing::info!(
        "Hospital match returned {} of {} candidates",
        outcome.matches.len(),
        outcome.total_candidates
    );

    Ok(HttpResponse::Ok().json(HospitalMatchesResponse {
        matches: outcome.matches,
        total_candidates: outcome.total_candidates,
    }))
}
