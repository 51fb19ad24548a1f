use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::core::{
    eligibility, next_scheduled_for, resolve_rotation_donor, Availability, DonorQuery,
    RotationOutcome, RotationSlot,
};
use crate::error::EngineError;
use crate::models::{
    BookTransfusionRequest, HistoryQuery, HistoryResponse, PatientQuery, PlanNextRequest,
    ScheduleListResponse, ScheduleView,
};
use crate::routes::{donor_pool, require_patient_identity, AppState};
use crate::services::NewSchedule;

/// Configure scheduling routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/schedule/plan", web::post().to(plan_next_transfusion))
        .route("/schedule/book", web::post().to(book_transfusion))
        .route("/schedule", web::get().to(list_schedule))
        .route("/schedule/history", web::get().to(list_history));
}

/// Plan the next transfusion slot
///
/// POST /api/v1/schedule/plan
///
/// Idempotent: an existing planned or booked slot is returned unchanged. The
/// UI calls this on load as well as on explicit action, so duplicate calls
/// are the normal case, not the exception.
async fn plan_next_transfusion(
    state: web::Data<AppState>,
    req: web::Json<PlanNextRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, EngineError> {
    req.validate()
        .map_err(|e| EngineError::Validation(e.to_string()))?;

    require_patient_identity(&http_req, &req.patient_id)?;

    if let Some(existing) = state.postgres.current_open_schedule(&req.patient_id).await? {
        tracing::debug!(
            "Open schedule {} already planned for patient {}, returning it",
            existing.id,
            req.patient_id
        );
        return Ok(HttpResponse::Ok().json(existing));
    }

    let cohort = state
        .postgres
        .get_active_cohort(&req.patient_id)
        .await?
        .ok_or_else(|| {
            EngineError::PreconditionFailed(format!(
                "patient {} has no active cohort",
                req.patient_id
            ))
        })?;

    let members = state.postgres.get_cohort_members(cohort.id).await?;
    let today = chrono::Utc::now().date_naive();

    // Classify every slot against a live donor snapshot
    let mut slots = Vec::with_capacity(members.len());
    let mut member_ids = Vec::new();
    let mut member_names: Vec<(String, String)> = Vec::new();
    for member in &members {
        let ready = match &member.donor_id {
            Some(id) => {
                member_ids.push(id.clone());
                match state.profiles.get_donor(id).await {
                    Ok(donor) => {
                        member_names.push((id.clone(), donor.name.clone()));
                        eligibility::classify(
                            donor.eligibility_status.as_deref(),
                            donor.last_donation_date.or(member.last_donation_date),
                            today,
                            state.matcher.cooldown_days(),
                        )
                        .ready
                    }
                    Err(e) => {
                        tracing::warn!("Donor snapshot for {} unavailable: {}", id, e);
                        false
                    }
                }
            }
            None => false,
        };

        slots.push(RotationSlot {
            sequence_order: member.sequence_order,
            donor_id: member.donor_id.clone(),
            ready,
        });
    }

    let last = state.postgres.last_cycle(&req.patient_id).await?;
    let cycle_number = last.map(|(c, _)| c + 1).unwrap_or(0);
    let previous_scheduled = last.and_then(|(_, at)| at);

    let (assigned_donor_id, assigned_donor_name, used_emergency_backup, member_position) =
        match resolve_rotation_donor(&slots, cycle_number, state.rotation.cohort_size) {
            RotationOutcome::Member { position, donor_id } => {
                let name = member_names
                    .iter()
                    .find(|(id, _)| *id == donor_id)
                    .map(|(_, name)| name.clone());
                (Some(donor_id), name, false, Some(position as i16))
            }
            RotationOutcome::RequiresBackup { position } => {
                tracing::info!(
                    "Cycle {} slot {} for patient {} is unavailable, selecting emergency backup",
                    cycle_number,
                    position,
                    req.patient_id
                );

                let patient = state.profiles.get_patient(&req.patient_id).await?;
                let radius_km = state.matching.emergency_radius_km;
                let groups = state.matcher.policy().donor_groups(patient.blood_group);
                let candidates =
                    donor_pool(&state, &groups, patient.coords(), radius_km).await?;

                let query = DonorQuery {
                    blood_group: patient.blood_group,
                    origin: patient.coords(),
                    radius_km,
                    availability: Availability::Now,
                    exclude_donor_ids: member_ids.clone(),
                    today,
                };

                let outcome = state.matcher.rank(&query, candidates);
                let backup = outcome.matches.into_iter().next().ok_or_else(|| {
                    EngineError::PreconditionFailed(
                        "no eligible emergency backup donor available".to_string(),
                    )
                })?;

                (Some(backup.donor_id), Some(backup.name), true, None)
            }
        };

    let scheduled_for = next_scheduled_for(
        cohort.start_date,
        previous_scheduled,
        state.rotation.cadence_days,
    );

    let new = NewSchedule {
        patient_id: req.patient_id.clone(),
        cohort_id: cohort.id,
        cycle_number,
        scheduled_for,
        component: req.component,
        units: req.units,
        assigned_donor_id,
        assigned_donor_name,
        used_emergency_backup,
        member_position,
    };

    match state.postgres.insert_schedule(&new).await {
        Ok(schedule) => Ok(HttpResponse::Created().json(schedule)),
        Err(e) => {
            let engine: EngineError = e.into();
            if engine.is_conflict() {
                // A concurrent plan won; converge on its row
                tracing::info!(
                    "Concurrent planning for patient {}, returning winning slot",
                    req.patient_id
                );
                if let Some(existing) =
                    state.postgres.current_open_schedule(&req.patient_id).await?
                {
                    return Ok(HttpResponse::Ok().json(existing));
                }
            }
            Err(engine)
        }
    }
}

/// Book a planned slot against a hospital and time
///
/// POST /api/v1/schedule/book
async fn book_transfusion(
    state: web::Data<AppState>,
    req: web::Json<BookTransfusionRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, EngineError> {
    req.validate()
        .map_err(|e| EngineError::Validation(e.to_string()))?;

    let schedule = state
        .postgres
        .get_schedule(req.schedule_id)
        .await?
        .ok_or_else(|| {
            EngineError::NotFound(format!("schedule {} not found", req.schedule_id))
        })?;

    require_patient_identity(&http_req, &schedule.patient_id)?;

    let hospital = state
        .postgres
        .get_hospital(req.hospital_id)
        .await?
        .ok_or_else(|| {
            EngineError::NotFound(format!("hospital {} not found", req.hospital_id))
        })?;

    match state
        .postgres
        .book_schedule(req.schedule_id, req.hospital_id, req.scheduled_for)
        .await?
    {
        Some(updated) => {
            tracing::info!(
                "Booked schedule {} at hospital {} for {}",
                updated.id,
                hospital.name,
                req.scheduled_for
            );
            Ok(HttpResponse::Ok().json(ScheduleView {
                schedule: updated,
                hospital_name: Some(hospital.name),
            }))
        }
        // Guard did not match: the row exists but is not planned
        None => Err(EngineError::PreconditionFailed(format!(
            "schedule {} is {}, not planned",
            schedule.id,
            schedule.status.as_str()
        ))),
    }
}

/// Full schedule for a patient, newest first
///
/// GET /api/v1/schedule?patientId=
async fn list_schedule(
    state: web::Data<AppState>,
    query: web::Query<PatientQuery>,
    http_req: HttpRequest,
) -> Result<HttpResponse, EngineError> {
    require_patient_identity(&http_req, &query.patient_id)?;

    let rows = state.postgres.list_schedules(&query.patient_id).await?;

    let entries = rows
        .into_iter()
        .map(|(schedule, hospital_name)| ScheduleView {
            schedule,
            hospital_name,
        })
        .collect();

    Ok(HttpResponse::Ok().json(ScheduleListResponse { entries }))
}

/// Completed transfusions, newest first
///
/// GET /api/v1/schedule/history?patientId=&limit=
async fn list_history(
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
    http_req: HttpRequest,
) -> Result<HttpResponse, EngineError> {
    require_patient_identity(&http_req, &query.patient_id)?;

    let limit = query.limit.clamp(1, 100);
    let rows = state.postgres.list_history(&query.patient_id, limit).await?;

    let records = rows
        .into_iter()
        .map(|(schedule, hospital_name)| ScheduleView {
            schedule,
            hospital_name,
        })
        .collect();

    Ok(HttpResponse::Ok().json(HistoryResponse { records }))
}
