use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::core::{calculate_bounding_box, Availability, DonorQuery, MatchPolicy};
use crate::error::EngineError;
use crate::models::{
    BloodGroup, BroadcastRequestDto, BroadcastResponse, RequestStatus, SearchDonorsRequest,
    SearchDonorsResponse,
};
use crate::routes::{donor_pool, require_patient_identity, AppState};

/// Configure donor search and broadcast routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/donors/search", web::post().to(search_donors))
        .route("/requests/broadcast", web::post().to(broadcast_request));
}

/// Ranked donor search
///
/// POST /api/v1/donors/search
async fn search_donors(
    state: web::Data<AppState>,
    req: web::Json<SearchDonorsRequest>,
) -> Result<HttpResponse, EngineError> {
    req.validate()
        .map_err(|e| EngineError::Validation(e.to_string()))?;

    let blood_group = BloodGroup::from_wire(&req.blood_group).ok_or_else(|| {
        EngineError::Validation(format!("unknown blood group '{}'", req.blood_group))
    })?;

    let policy = match req.compatible {
        Some(true) => MatchPolicy::AboCompatible,
        Some(false) => MatchPolicy::Exact,
        None => state.matcher.policy(),
    };

    let origin = match (req.patient_lat, req.patient_lng) {
        (Some(lat), Some(lng)) => Some((lat, lng)),
        _ => None,
    };
    let radius_km = req.radius_km.unwrap_or(state.matching.default_radius_km);

    tracing::info!(
        "Donor search: group {}, radius {}km, only_ready {}",
        blood_group,
        radius_km,
        req.only_ready
    );

    let groups = policy.donor_groups(blood_group);
    let candidates = donor_pool(&state, &groups, origin, radius_km).await?;

    let query = DonorQuery {
        blood_group,
        origin,
        radius_km,
        availability: if req.only_ready {
            Availability::Now
        } else {
            Availability::Any
        },
        exclude_donor_ids: vec![],
        today: chrono::Utc::now().date_naive(),
    };

    let outcome = state.matcher.with_policy(policy).rank(&query, candidates);

    let mut matches = outcome.matches;
    matches.truncate(req.limit.min(200) as usize);

    tracing::info!(
        "Donor search returned {} of {} candidates",
        matches.len(),
        outcome.total_candidates
    );

    Ok(HttpResponse::Ok().json(SearchDonorsResponse {
        matches,
        total_candidates: outcome.total_candidates,
    }))
}

/// Emergency broadcast dispatch
///
/// POST /api/v1/requests/broadcast
///
/// Exactly one broadcast record per successful invocation. Notification
/// fan-out happens after the record is committed and never affects the
/// response.
async fn broadcast_request(
    state: web::Data<AppState>,
    req: web::Json<BroadcastRequestDto>,
    http_req: HttpRequest,
) -> Result<HttpResponse, EngineError> {
    req.validate()
        .map_err(|e| EngineError::Validation(e.to_string()))?;

    let request = state
        .postgres
        .get_request(req.request_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("request {} not found", req.request_id)))?;

    require_patient_identity(&http_req, &request.patient_id)?;

    if request.status != RequestStatus::Pending {
        return Err(EngineError::PreconditionFailed(format!(
            "request {} is {}, not pending",
            request.id,
            request.status.as_str()
        )));
    }

    // Request coordinates win; the payload only fills a gap
    let origin = request.coords().or(match (req.patient_lat, req.patient_lng) {
        (Some(lat), Some(lng)) => Some((lat, lng)),
        _ => None,
    });
    let radius_km = req.radius_km.unwrap_or(state.matching.default_radius_km);

    // Emergency path pulls fresh snapshots, bypassing the pool cache
    let groups = state.matcher.policy().donor_groups(request.blood_group);
    let bbox = origin.map(|(lat, lng)| calculate_bounding_box(lat, lng, radius_km));
    let candidates = state.profiles.list_donors(&groups, bbox.as_ref()).await?;

    let query = DonorQuery {
        blood_group: request.blood_group,
        origin,
        radius_km,
        availability: Availability::Now,
        exclude_donor_ids: vec![],
        today: chrono::Utc::now().date_naive(),
    };

    let outcome = state.matcher.rank(&query, candidates);

    tracing::info!(
        "Broadcasting request {} to {} donors within {}km",
        request.id,
        outcome.matches.len(),
        radius_km
    );

    let broadcast = state
        .postgres
        .record_broadcast(request.id, radius_km, outcome.matches.len() as i32)
        .await?
        .ok_or_else(|| {
            EngineError::PreconditionFailed(format!(
                "request {} left pending status during dispatch",
                request.id
            ))
        })?;

    let response = BroadcastResponse {
        broadcast_id: broadcast.id,
        request_id: request.id,
        donors_notified: broadcast.donors_notified,
        radius_km,
        request_status: RequestStatus::Broadcasted,
    };

    // Fire-and-forget fan-out after the committed broadcast record
    let notify = state.notify.clone();
    let cache = state.cache.clone();
    let broadcast_id = broadcast.id;
    let matches = outcome.matches;
    let mut notified_request = request;
    notified_request.status = RequestStatus::Broadcasted;
    tokio::spawn(async move {
        notify.fan_out(broadcast_id, &notified_request, &matches).await;

        // Notified donors churn quickly after an emergency; drop cached pools
        if let Err(e) = cache.invalidate_pattern("donors:pool:*").await {
            tracing::warn!("Donor pool cache invalidation failed: {}", e);
        }
    });

    Ok(HttpResponse::Ok().json(response))
}
