//! BloodLink Engine - donor matching and transfusion scheduling service
//!
//! This library implements the matching and scheduling core behind the
//! BloodLink platform: ranked donor search, emergency broadcast dispatch,
//! hospital stock matching, rotating donor cohorts and idempotent
//! transfusion planning.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    distance::{calculate_bounding_box, haversine_distance},
    DonorMatcher, DonorQuery, HospitalMatcher, HospitalQuery, MatchPolicy,
};
pub use error::EngineError;
pub use models::{BloodGroup, Component, Donor, DonorMatch, Hospital, HospitalMatch};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let d = haversine_distance(13.0827, 80.2707, 12.9716, 77.5946);
        assert!(d > 250.0 && d < 330.0);
        assert_eq!(BloodGroup::from_wire("O-"), Some(BloodGroup::ONeg));
    }
}
