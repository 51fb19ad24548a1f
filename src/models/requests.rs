use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Component, Urgency};

/// Request to search ranked donor candidates
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchDonorsRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "blood_group", rename = "bloodGroup")]
    pub blood_group: String,
    #[serde(alias = "patient_lat", rename = "patientLat", default)]
    pub patient_lat: Option<f64>,
    #[serde(alias = "patient_lng", rename = "patientLng", default)]
    pub patient_lng: Option<f64>,
    #[validate(range(min = 0.1, max = 500.0))]
    #[serde(alias = "radius_km", rename = "radiusKm", default)]
    pub radius_km: Option<f64>,
    #[serde(alias = "only_ready", rename = "onlyReady", default)]
    pub only_ready: bool,
    /// Opt into ABO/Rh-compatible expansion instead of exact group match
    #[serde(default)]
    pub compatible: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: u16,
}

fn default_limit() -> u16 {
    50
}

/// Request to broadcast an emergency blood request to matched donors
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BroadcastRequestDto {
    #[serde(alias = "request_id", rename = "requestId")]
    pub request_id: Uuid,
    #[serde(alias = "patient_lat", rename = "patientLat", default)]
    pub patient_lat: Option<f64>,
    #[serde(alias = "patient_lng", rename = "patientLng", default)]
    pub patient_lng: Option<f64>,
    #[validate(range(min = 0.1, max = 500.0))]
    #[serde(alias = "radius_km", rename = "radiusKm", default)]
    pub radius_km: Option<f64>,
}

/// Request to rank hospitals/blood banks for a component need
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindHospitalsRequest {
    #[serde(alias = "blood_group", rename = "bloodGroup", default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_urgency")]
    pub urgency: Urgency,
    #[serde(alias = "patient_lat", rename = "patientLat", default)]
    pub patient_lat: Option<f64>,
    #[serde(alias = "patient_lng", rename = "patientLng", default)]
    pub patient_lng: Option<f64>,
    #[validate(range(min = 0.1, max = 500.0))]
    #[serde(alias = "radius_km", rename = "radiusKm", default)]
    pub radius_km: Option<f64>,
    #[validate(range(min = 1))]
    #[serde(alias = "min_units", rename = "minUnits", default = "default_min_units")]
    pub min_units: i32,
    /// "units" | "freshness" | "distance"; defaults from urgency when absent
    #[serde(alias = "sort_by", rename = "sortBy", default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub compatible: Option<bool>,
}

fn default_urgency() -> Urgency {
    Urgency::Medium
}

fn default_min_units() -> i32 {
    1
}

/// Request to create a rotating donor cohort for a patient
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCohortRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "patient_id", rename = "patientId")]
    pub patient_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "donor_emails", rename = "donorEmails")]
    pub donor_emails: Vec<String>,
    #[serde(alias = "start_date", rename = "startDate")]
    pub start_date: NaiveDate,
    #[validate(length(min = 1))]
    pub name: String,
}

/// Request to plan the next transfusion slot for a patient
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PlanNextRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "patient_id", rename = "patientId")]
    pub patient_id: String,
    pub component: Component,
    #[validate(range(min = 1, max = 10))]
    #[serde(default = "default_units")]
    pub units: i32,
}

fn default_units() -> i32 {
    1
}

/// Request to book a planned slot against a hospital and time
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BookTransfusionRequest {
    #[serde(alias = "schedule_id", rename = "scheduleId")]
    pub schedule_id: Uuid,
    #[serde(alias = "hospital_id", rename = "hospitalId")]
    pub hospital_id: Uuid,
    #[serde(alias = "scheduled_for", rename = "scheduledFor")]
    pub scheduled_for: DateTime<Utc>,
}

/// Patient-scoped query string (?patientId=)
#[derive(Debug, Clone, Deserialize)]
pub struct PatientQuery {
    #[serde(alias = "patient_id", rename = "patientId")]
    pub patient_id: String,
}

/// History query string (?patientId=&limit=)
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    #[serde(alias = "patient_id", rename = "patientId")]
    pub patient_id: String,
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    20
}
