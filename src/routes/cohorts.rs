use actix_web::{web, HttpRequest, HttpResponse};
use std::collections::HashSet;
use validator::Validate;

use crate::core::eligibility;
use crate::error::EngineError;
use crate::models::{
    CohortDetailsResponse, CohortMemberView, CreateCohortRequest, CreateCohortResponse,
    PatientQuery,
};
use crate::routes::{require_patient_identity, AppState};
use crate::services::NewCohortMember;

/// Configure cohort routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/cohorts", web::post().to(create_cohort))
        .route("/cohorts", web::get().to(get_cohort_details));
}

/// Create a rotating donor cohort
///
/// POST /api/v1/cohorts
///
/// Exactly `rotation.cohort_size` distinct donor emails are required. A
/// concurrent duplicate creation converges on the winning cohort instead of
/// surfacing the unique violation.
async fn create_cohort(
    state: web::Data<AppState>,
    req: web::Json<CreateCohortRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, EngineError> {
    req.validate()
        .map_err(|e| EngineError::Validation(e.to_string()))?;

    require_patient_identity(&http_req, &req.patient_id)?;

    let size = state.rotation.cohort_size;
    let distinct: HashSet<String> = req
        .donor_emails
        .iter()
        .map(|e| e.trim().to_lowercase())
        .collect();
    if req.donor_emails.len() != size || distinct.len() != size {
        return Err(EngineError::Validation(format!(
            "exactly {} distinct donor emails are required, got {}",
            size,
            req.donor_emails.len()
        )));
    }

    if state
        .postgres
        .get_active_cohort(&req.patient_id)
        .await?
        .is_some()
    {
        return Err(EngineError::Validation(format!(
            "patient {} already has an active cohort",
            req.patient_id
        )));
    }

    // Resolve every email to a donor snapshot before touching storage
    let mut members = Vec::with_capacity(size);
    for email in &req.donor_emails {
        let donor = state.profiles.find_donor_by_email(email.trim()).await?;
        members.push(NewCohortMember {
            donor_id: donor.donor_id,
            last_donation_date: donor.last_donation_date,
        });
    }

    match state
        .postgres
        .create_cohort(&req.patient_id, &req.name, req.start_date, &members)
        .await
    {
        Ok((cohort, rows)) => Ok(HttpResponse::Created().json(CreateCohortResponse {
            cohort,
            members: rows,
            already_existed: false,
        })),
        Err(e) => {
            let engine: EngineError = e.into();
            if engine.is_conflict() {
                // Lost the race; converge on the winner
                tracing::info!(
                    "Concurrent cohort creation for patient {}, returning existing",
                    req.patient_id
                );
                if let Some(cohort) = state.postgres.get_active_cohort(&req.patient_id).await? {
                    let rows = state.postgres.get_cohort_members(cohort.id).await?;
                    return Ok(HttpResponse::Ok().json(CreateCohortResponse {
                        cohort,
                        members: rows,
                        already_existed: true,
                    }));
                }
            }
            Err(engine)
        }
    }
}

/// Cohort details with live donor snapshots
///
/// GET /api/v1/cohorts?patientId=
///
/// Returns an empty membership list when the patient has no active cohort.
async fn get_cohort_details(
    state: web::Data<AppState>,
    query: web::Query<PatientQuery>,
    http_req: HttpRequest,
) -> Result<HttpResponse, EngineError> {
    require_patient_identity(&http_req, &query.patient_id)?;

    let cohort = match state.postgres.get_active_cohort(&query.patient_id).await? {
        Some(cohort) => cohort,
        None => {
            return Ok(HttpResponse::Ok().json(CohortDetailsResponse {
                cohort: None,
                members: vec![],
                next_transfusion_for: None,
            }));
        }
    };

    let members = state.postgres.get_cohort_members(cohort.id).await?;
    let next_transfusion_for = state
        .postgres
        .current_open_schedule(&query.patient_id)
        .await?
        .and_then(|s| s.scheduled_for);

    let today = chrono::Utc::now().date_naive();
    let mut views = Vec::with_capacity(members.len());

    for member in members {
        // A missing snapshot degrades the slot to not-ready, never a failure
        let donor = match &member.donor_id {
            Some(id) => match state.profiles.get_donor(id).await {
                Ok(donor) => Some(donor),
                Err(e) => {
                    tracing::warn!("Donor snapshot for {} unavailable: {}", id, e);
                    None
                }
            },
            None => None,
        };

        let last_donation = donor
            .as_ref()
            .and_then(|d| d.last_donation_date)
            .or(member.last_donation_date);

        let ready = donor
            .as_ref()
            .map(|d| {
                eligibility::classify(
                    d.eligibility_status.as_deref(),
                    last_donation,
                    today,
                    state.matcher.cooldown_days(),
                )
                .ready
            })
            .unwrap_or(false);

        views.push(CohortMemberView {
            sequence_order: member.sequence_order,
            donor_id: member.donor_id,
            name: donor.as_ref().map(|d| d.name.clone()),
            phone: donor.as_ref().and_then(|d| d.phone.clone()),
            blood_group: donor.as_ref().map(|d| d.blood_group),
            location: donor.as_ref().and_then(|d| d.location.clone()),
            ready,
            last_donation_date: last_donation,
            next_scheduled_for: member.next_scheduled_for,
        });
    }

    Ok(HttpResponse::Ok().json(CohortDetailsResponse {
        cohort: Some(cohort),
        members: views,
        next_transfusion_for,
    }))
}
