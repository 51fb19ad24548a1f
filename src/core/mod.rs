// Core algorithm exports
pub mod distance;
pub mod eligibility;
pub mod hospital;
pub mod matcher;
pub mod rotation;

pub use distance::{
    calculate_bounding_box, distance_between, haversine_distance, is_within_bounding_box,
    BoundingBox,
};
pub use eligibility::{classify, Eligibility, EligibilityLabel};
pub use hospital::{HospitalMatcher, HospitalOutcome, HospitalQuery, HospitalSort};
pub use matcher::{Availability, DonorMatcher, DonorQuery, MatchOutcome, MatchPolicy};
pub use rotation::{
    next_scheduled_for, resolve_rotation_donor, rotation_position, RotationOutcome, RotationSlot,
};
