use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ABO/Rh blood group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APos,
    #[serde(rename = "A-")]
    ANeg,
    #[serde(rename = "B+")]
    BPos,
    #[serde(rename = "B-")]
    BNeg,
    #[serde(rename = "AB+")]
    AbPos,
    #[serde(rename = "AB-")]
    AbNeg,
    #[serde(rename = "O+")]
    OPos,
    #[serde(rename = "O-")]
    ONeg,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APos,
        BloodGroup::ANeg,
        BloodGroup::BPos,
        BloodGroup::BNeg,
        BloodGroup::AbPos,
        BloodGroup::AbNeg,
        BloodGroup::OPos,
        BloodGroup::ONeg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APos => "A+",
            BloodGroup::ANeg => "A-",
            BloodGroup::BPos => "B+",
            BloodGroup::BNeg => "B-",
            BloodGroup::AbPos => "AB+",
            BloodGroup::AbNeg => "AB-",
            BloodGroup::OPos => "O+",
            BloodGroup::ONeg => "O-",
        }
    }

    /// Parse the wire form ("A+", "ab-", "O+") case-insensitively.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A+" => Some(BloodGroup::APos),
            "A-" => Some(BloodGroup::ANeg),
            "B+" => Some(BloodGroup::BPos),
            "B-" => Some(BloodGroup::BNeg),
            "AB+" => Some(BloodGroup::AbPos),
            "AB-" => Some(BloodGroup::AbNeg),
            "O+" => Some(BloodGroup::OPos),
            "O-" => Some(BloodGroup::ONeg),
            _ => None,
        }
    }

    /// Donor groups a recipient of this group can receive red cells from.
    pub fn compatible_donors(&self) -> &'static [BloodGroup] {
        use BloodGroup::*;
        match self {
            ONeg => &[ONeg],
            OPos => &[OPos, ONeg],
            ANeg => &[ANeg, ONeg],
            APos => &[APos, ANeg, OPos, ONeg],
            BNeg => &[BNeg, ONeg],
            BPos => &[BPos, BNeg, OPos, ONeg],
            AbNeg => &[AbNeg, ANeg, BNeg, ONeg],
            AbPos => &BloodGroup::ALL,
        }
    }
}

impl std::fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blood component held in stock or transfused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    WholeBlood,
    RedCells,
    Plasma,
    Platelets,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::WholeBlood => "whole_blood",
            Component::RedCells => "red_cells",
            Component::Plasma => "plasma",
            Component::Platelets => "platelets",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "whole_blood" | "whole" => Some(Component::WholeBlood),
            "red_cells" | "rbc" => Some(Component::RedCells),
            "plasma" => Some(Component::Plasma),
            "platelets" => Some(Component::Platelets),
            _ => None,
        }
    }
}

/// Request urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn is_emergency(&self) -> bool {
        matches!(self, Urgency::Critical | Urgency::High)
    }
}

/// Blood request lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Broadcasted,
    Matched,
    Fulfilled,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Broadcasted => "broadcasted",
            RequestStatus::Matched => "matched",
            RequestStatus::Fulfilled => "fulfilled",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "broadcasted" => Some(RequestStatus::Broadcasted),
            "matched" => Some(RequestStatus::Matched),
            "fulfilled" => Some(RequestStatus::Fulfilled),
            "cancelled" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }
}

/// Transfusion schedule lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Planned,
    Booked,
    Completed,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Planned => "planned",
            ScheduleStatus::Booked => "booked",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "planned" => Some(ScheduleStatus::Planned),
            "booked" => Some(ScheduleStatus::Booked),
            "completed" => Some(ScheduleStatus::Completed),
            "cancelled" => Some(ScheduleStatus::Cancelled),
            _ => None,
        }
    }

    /// planned and booked rows block a new planning cycle
    pub fn is_open(&self) -> bool {
        matches!(self, ScheduleStatus::Planned | ScheduleStatus::Booked)
    }
}

/// Donor snapshot as served by the profile service
///
/// Every optional field defaults on absence; a malformed profile document
/// must degrade a match, never abort one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donor {
    #[serde(rename = "donorId", alias = "donor_id")]
    pub donor_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(rename = "bloodGroup")]
    pub blood_group: BloodGroup,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "eligibilityStatus", default)]
    pub eligibility_status: Option<String>,
    #[serde(rename = "lastDonationDate", default)]
    pub last_donation_date: Option<NaiveDate>,
    #[serde(rename = "donationCount", default)]
    pub donation_count: Option<i64>,
}

impl Donor {
    /// Both coordinates or nothing
    pub fn coords(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Patient snapshot as served by the profile service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    #[serde(rename = "patientId", alias = "patient_id")]
    pub patient_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "bloodGroup")]
    pub blood_group: BloodGroup,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Patient {
    pub fn coords(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Blood request row owned by the request flow, read and transitioned here
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodRequest {
    pub id: Uuid,
    #[serde(rename = "patientId")]
    pub patient_id: String,
    #[serde(rename = "requestType")]
    pub request_type: String,
    #[serde(rename = "bloodGroup")]
    pub blood_group: BloodGroup,
    pub component: Component,
    #[serde(rename = "quantityUnits")]
    pub quantity_units: i32,
    pub urgency: Urgency,
    pub status: RequestStatus,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl BloodRequest {
    pub fn coords(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Emergency broadcast record, one per dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broadcast {
    pub id: Uuid,
    #[serde(rename = "requestId")]
    pub request_id: Uuid,
    #[serde(rename = "radiusKm")]
    pub radius_km: f64,
    #[serde(rename = "donorsNotified")]
    pub donors_notified: i32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Rotating donor cohort, one active per patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cohort {
    pub id: Uuid,
    #[serde(rename = "patientId")]
    pub patient_id: String,
    pub name: String,
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
    pub active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Ordered cohort slot; donor_id is empty while the slot is pending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortMember {
    #[serde(rename = "cohortId")]
    pub cohort_id: Uuid,
    #[serde(rename = "donorId")]
    pub donor_id: Option<String>,
    #[serde(rename = "sequenceOrder")]
    pub sequence_order: i16,
    #[serde(rename = "lastDonationDate", default)]
    pub last_donation_date: Option<NaiveDate>,
    #[serde(rename = "nextScheduledFor", default)]
    pub next_scheduled_for: Option<DateTime<Utc>>,
}

/// Transfusion schedule row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransfusionSchedule {
    pub id: Uuid,
    #[serde(rename = "patientId")]
    pub patient_id: String,
    #[serde(rename = "cohortId")]
    pub cohort_id: Uuid,
    #[serde(rename = "cycleNumber")]
    pub cycle_number: i32,
    #[serde(rename = "scheduledFor")]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: ScheduleStatus,
    pub component: Component,
    pub units: i32,
    #[serde(rename = "hospitalId")]
    pub hospital_id: Option<Uuid>,
    #[serde(rename = "assignedDonorId")]
    pub assigned_donor_id: Option<String>,
    #[serde(rename = "assignedDonorName")]
    pub assigned_donor_name: Option<String>,
    #[serde(rename = "usedEmergencyBackup")]
    pub used_emergency_backup: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Hospital with current stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hospital {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub stock: Vec<HospitalStock>,
}

impl Hospital {
    pub fn coords(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// One stock line: units of a component/group pairing and their age
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalStock {
    pub component: Component,
    #[serde(rename = "bloodGroup")]
    pub blood_group: BloodGroup,
    pub units: i32,
    #[serde(rename = "freshnessDays")]
    pub freshness_days: i32,
}

/// Ranked donor candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorMatch {
    #[serde(rename = "donorId")]
    pub donor_id: String,
    pub name: String,
    pub phone: Option<String>,
    #[serde(rename = "bloodGroup")]
    pub blood_group: BloodGroup,
    pub location: Option<String>,
    #[serde(rename = "distanceKm")]
    pub distance_km: Option<f64>,
    #[serde(rename = "donationCount")]
    pub donation_count: Option<i64>,
    pub ready: bool,
}

/// Stock compatibility classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compatibility {
    Perfect,
    Good,
}

/// Ranked hospital candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalMatch {
    #[serde(rename = "hospitalId")]
    pub hospital_id: Uuid,
    pub name: String,
    pub address: String,
    pub contact: Option<String>,
    pub verified: bool,
    pub units: i32,
    #[serde(rename = "freshnessDays")]
    pub freshness_days: i32,
    #[serde(rename = "distanceKm")]
    pub distance_km: Option<f64>,
    pub compatibility: Compatibility,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blood_group_wire_roundtrip() {
        for group in BloodGroup::ALL {
            assert_eq!(BloodGroup::from_wire(group.as_str()), Some(group));
        }
        assert_eq!(BloodGroup::from_wire("ab+"), Some(BloodGroup::AbPos));
        assert_eq!(BloodGroup::from_wire("x+"), None);
    }

    #[test]
    fn test_universal_donor_and_recipient() {
        assert!(BloodGroup::ALL
            .iter()
            .all(|g| g.compatible_donors().contains(&BloodGroup::ONeg)));
        assert_eq!(BloodGroup::AbPos.compatible_donors().len(), 8);
        assert_eq!(BloodGroup::ONeg.compatible_donors(), &[BloodGroup::ONeg]);
    }

    #[test]
    fn test_donor_coords_require_both() {
        let json = r#"{"donorId":"d1","name":"Asha","bloodGroup":"A+","latitude":12.9}"#;
        let donor: Donor = serde_json::from_str(json).unwrap();
        assert!(donor.coords().is_none());
        assert!(donor.eligibility_status.is_none());
    }

    #[test]
    fn test_schedule_status_open() {
        assert!(ScheduleStatus::Planned.is_open());
        assert!(ScheduleStatus::Booked.is_open());
        assert!(!ScheduleStatus::Completed.is_open());
        assert!(!ScheduleStatus::Cancelled.is_open());
    }
}
