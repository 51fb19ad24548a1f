// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BloodGroup, BloodRequest, Broadcast, Cohort, CohortMember, Compatibility, Component, Donor,
    DonorMatch, Hospital, HospitalMatch, HospitalStock, Patient, RequestStatus, ScheduleStatus,
    TransfusionSchedule, Urgency,
};
pub use requests::{
    BookTransfusionRequest, BroadcastRequestDto, CreateCohortRequest, FindHospitalsRequest,
    HistoryQuery, PatientQuery, PlanNextRequest, SearchDonorsRequest,
};
pub use responses::{
    BroadcastResponse, CohortDetailsResponse, CohortMemberView, CreateCohortResponse,
    ErrorResponse, HealthResponse, HistoryResponse, HospitalMatchesResponse, ScheduleListResponse,
    ScheduleView, SearchDonorsResponse,
};
