use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{
    BloodGroup, Cohort, DonorMatch, HospitalMatch, RequestStatus, TransfusionSchedule,
};

/// Response for donor search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDonorsResponse {
    pub matches: Vec<DonorMatch>,
    pub total_candidates: usize,
}

/// Response for an emergency broadcast dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastResponse {
    #[serde(rename = "broadcastId")]
    pub broadcast_id: Uuid,
    #[serde(rename = "requestId")]
    pub request_id: Uuid,
    #[serde(rename = "donorsNotified")]
    pub donors_notified: i32,
    #[serde(rename = "radiusKm")]
    pub radius_km: f64,
    #[serde(rename = "requestStatus")]
    pub request_status: RequestStatus,
}

/// Response for hospital matching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalMatchesResponse {
    pub matches: Vec<HospitalMatch>,
    pub total_candidates: usize,
}

/// Response for cohort creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCohortResponse {
    pub cohort: Cohort,
    pub members: Vec<crate::models::domain::CohortMember>,
    /// True when a concurrent duplicate converged on an existing cohort
    #[serde(rename = "alreadyExisted", default)]
    pub already_existed: bool,
}

/// One cohort slot joined with its donor snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortMemberView {
    #[serde(rename = "sequenceOrder")]
    pub sequence_order: i16,
    #[serde(rename = "donorId")]
    pub donor_id: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "bloodGroup")]
    pub blood_group: Option<BloodGroup>,
    pub location: Option<String>,
    pub ready: bool,
    #[serde(rename = "lastDonationDate")]
    pub last_donation_date: Option<NaiveDate>,
    #[serde(rename = "nextScheduledFor")]
    pub next_scheduled_for: Option<DateTime<Utc>>,
}

/// Response for cohort detail lookup; members is empty when no cohort exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortDetailsResponse {
    pub cohort: Option<Cohort>,
    pub members: Vec<CohortMemberView>,
    #[serde(rename = "nextTransfusionFor")]
    pub next_transfusion_for: Option<DateTime<Utc>>,
}

/// Schedule row joined with its hospital display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleView {
    #[serde(flatten)]
    pub schedule: TransfusionSchedule,
    #[serde(rename = "hospitalName")]
    pub hospital_name: Option<String>,
}

/// Response for schedule listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleListResponse {
    pub entries: Vec<ScheduleView>,
}

/// Response for transfusion history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub records: Vec<ScheduleView>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
