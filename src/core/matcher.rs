use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::core::distance::distance_between;
use crate::core::eligibility;
use crate::models::{BloodGroup, Donor, DonorMatch};

/// Availability filter for donor searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Only donors whose eligibility classifies as ready today
    Now,
    /// Any donor regardless of readiness
    Any,
}

/// Blood-group matching policy
///
/// Exact match is the safe default; ABO/Rh expansion is an explicit opt-in,
/// never a hidden fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    Exact,
    AboCompatible,
}

impl MatchPolicy {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "abo_compatible" | "compatible" => MatchPolicy::AboCompatible,
            _ => MatchPolicy::Exact,
        }
    }

    /// Donor groups acceptable for a recipient of the given group
    pub fn donor_groups(&self, recipient: BloodGroup) -> Vec<BloodGroup> {
        match self {
            MatchPolicy::Exact => vec![recipient],
            MatchPolicy::AboCompatible => recipient.compatible_donors().to_vec(),
        }
    }
}

/// Parameters of one donor search
#[derive(Debug, Clone)]
pub struct DonorQuery {
    pub blood_group: BloodGroup,
    pub origin: Option<(f64, f64)>,
    pub radius_km: f64,
    pub availability: Availability,
    pub exclude_donor_ids: Vec<String>,
    pub today: NaiveDate,
}

/// Result of the ranking process
#[derive(Debug)]
pub struct MatchOutcome {
    pub matches: Vec<DonorMatch>,
    pub total_candidates: usize,
}

/// Donor ranking pipeline
///
/// # Pipeline stages
/// 1. Blood-group filter per policy
/// 2. Distance computation (unknown when either side lacks coordinates)
/// 3. Radius filter — only known distances are dropped
/// 4. Availability filter
/// 5. Sort: distance ascending, unknown last; ties by donation count descending
#[derive(Debug, Clone, Copy)]
pub struct DonorMatcher {
    policy: MatchPolicy,
    cooldown_days: i64,
}

impl DonorMatcher {
    pub fn new(policy: MatchPolicy, cooldown_days: i64) -> Self {
        Self {
            policy,
            cooldown_days,
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn cooldown_days(&self) -> i64 {
        self.cooldown_days
    }

    /// Same matcher with a per-request policy override
    pub fn with_policy(&self, policy: MatchPolicy) -> Self {
        Self { policy, ..*self }
    }

    /// Rank candidate donors for a query; a snapshot with no side effects.
    /// An empty result is a valid outcome, not an error.
    pub fn rank(&self, query: &DonorQuery, candidates: Vec<Donor>) -> MatchOutcome {
        let total_candidates = candidates.len();
        let accepted_groups = self.policy.donor_groups(query.blood_group);

        let mut matches: Vec<DonorMatch> = candidates
            .into_iter()
            // Stage 1: blood-group filter
            .filter(|donor| accepted_groups.contains(&donor.blood_group))
            .filter(|donor| !query.exclude_donor_ids.contains(&donor.donor_id))
            .filter_map(|donor| {
                // Stage 2: distance, unknown when coordinates are missing
                let distance_km = distance_between(query.origin, donor.coords());

                // Stage 3: radius drops known distances only; a donor without
                // coordinates is never silently excluded
                if let Some(d) = distance_km {
                    if d > query.radius_km {
                        return None;
                    }
                }

                let eligibility = eligibility::classify(
                    donor.eligibility_status.as_deref(),
                    donor.last_donation_date,
                    query.today,
                    self.cooldown_days,
                );

                // Stage 4: availability filter
                if query.availability == Availability::Now && !eligibility.ready {
                    return None;
                }

                Some(DonorMatch {
                    donor_id: donor.donor_id,
                    name: donor.name,
                    phone: donor.phone,
                    blood_group: donor.blood_group,
                    location: donor.location,
                    distance_km,
                    donation_count: donor.donation_count,
                    ready: eligibility.ready,
                })
            })
            .collect();

        // Stage 5: distance ascending with unknown last, ties broken by
        // donation count descending with unknown last among ties
        matches.sort_by(|a, b| {
            let da = a.distance_km.unwrap_or(f64::INFINITY);
            let db = b.distance_km.unwrap_or(f64::INFINITY);
            da.partial_cmp(&db)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b.donation_count
                        .unwrap_or(-1)
                        .cmp(&a.donation_count.unwrap_or(-1))
                })
        });

        MatchOutcome {
            matches,
            total_candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn donor(id: &str, group: BloodGroup, coords: Option<(f64, f64)>, donations: i64) -> Donor {
        Donor {
            donor_id: id.to_string(),
            name: format!("Donor {}", id),
            email: Some(format!("{}@example.org", id)),
            phone: Some("+910000000000".to_string()),
            blood_group: group,
            location: Some("Chennai".to_string()),
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            eligibility_status: Some("eligible".to_string()),
            last_donation_date: None,
            donation_count: Some(donations),
        }
    }

    fn query(radius_km: f64, availability: Availability) -> DonorQuery {
        DonorQuery {
            blood_group: BloodGroup::APos,
            origin: Some((13.0827, 80.2707)), // Chennai
            radius_km,
            availability,
            exclude_donor_ids: vec![],
            today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        }
    }

    fn matcher() -> DonorMatcher {
        DonorMatcher::new(MatchPolicy::Exact, 90)
    }

    #[test]
    fn test_radius_drops_known_far_keeps_unknown() {
        // ~3km, ~12km and unknown-location candidates against a 10km radius
        let candidates = vec![
            donor("near", BloodGroup::APos, Some((13.06, 80.25)), 2),
            donor("far", BloodGroup::APos, Some((13.19, 80.29)), 9),
            donor("nowhere", BloodGroup::APos, None, 5),
        ];

        let outcome = matcher().rank(&query(10.0, Availability::Any), candidates);

        let ids: Vec<&str> = outcome.matches.iter().map(|m| m.donor_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "nowhere"]);
        assert!(outcome.matches[0].distance_km.unwrap() < 10.0);
        assert!(outcome.matches[1].distance_km.is_none());
    }

    #[test]
    fn test_known_distances_sorted_ascending() {
        let candidates = vec![
            donor("b", BloodGroup::APos, Some((13.20, 80.30)), 0),
            donor("a", BloodGroup::APos, Some((13.09, 80.27)), 0),
            donor("c", BloodGroup::APos, None, 0),
        ];

        let outcome = matcher().rank(&query(100.0, Availability::Any), candidates);

        let known: Vec<f64> = outcome
            .matches
            .iter()
            .filter_map(|m| m.distance_km)
            .collect();
        assert!(known.windows(2).all(|w| w[0] <= w[1]));
        // unknown distance sorts after every known one
        assert!(outcome.matches.last().unwrap().distance_km.is_none());
    }

    #[test]
    fn test_tie_break_by_donation_count() {
        let candidates = vec![
            donor("low", BloodGroup::APos, None, 1),
            donor("high", BloodGroup::APos, None, 12),
            donor("unknown_count", BloodGroup::APos, None, 0),
        ];
        let mut unknown = donor("none", BloodGroup::APos, None, 0);
        unknown.donation_count = None;

        let mut all = candidates;
        all.push(unknown);

        let outcome = matcher().rank(&query(50.0, Availability::Any), all);
        let ids: Vec<&str> = outcome.matches.iter().map(|m| m.donor_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "low", "unknown_count", "none"]);
    }

    #[test]
    fn test_exact_policy_excludes_other_groups() {
        let candidates = vec![
            donor("same", BloodGroup::APos, None, 0),
            donor("universal", BloodGroup::ONeg, None, 0),
        ];

        let outcome = matcher().rank(&query(50.0, Availability::Any), candidates);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].donor_id, "same");
        assert_eq!(outcome.total_candidates, 2);
    }

    #[test]
    fn test_compatible_policy_admits_universal_donor() {
        let candidates = vec![
            donor("same", BloodGroup::APos, None, 0),
            donor("universal", BloodGroup::ONeg, None, 0),
            donor("wrong", BloodGroup::BPos, None, 0),
        ];

        let outcome = matcher()
            .with_policy(MatchPolicy::AboCompatible)
            .rank(&query(50.0, Availability::Any), candidates);

        let ids: Vec<&str> = outcome.matches.iter().map(|m| m.donor_id.as_str()).collect();
        assert!(ids.contains(&"same"));
        assert!(ids.contains(&"universal"));
        assert!(!ids.contains(&"wrong"));
    }

    #[test]
    fn test_availability_now_drops_not_ready() {
        let mut deferred = donor("deferred", BloodGroup::APos, None, 3);
        deferred.eligibility_status = Some("deferred_14d".to_string());
        let mut cooling = donor("cooling", BloodGroup::APos, None, 3);
        cooling.last_donation_date = NaiveDate::from_ymd_opt(2024, 5, 20);

        let candidates = vec![donor("ready", BloodGroup::APos, None, 3), deferred, cooling];

        let outcome = matcher().rank(&query(50.0, Availability::Now), candidates);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].donor_id, "ready");
        assert!(outcome.matches[0].ready);
    }

    #[test]
    fn test_excluded_ids_are_dropped() {
        let candidates = vec![
            donor("in_cohort", BloodGroup::APos, None, 0),
            donor("outside", BloodGroup::APos, None, 0),
        ];

        let mut q = query(50.0, Availability::Any);
        q.exclude_donor_ids = vec!["in_cohort".to_string()];

        let outcome = matcher().rank(&q, candidates);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].donor_id, "outside");
    }

    #[test]
    fn test_empty_result_is_success() {
        let outcome = matcher().rank(&query(10.0, Availability::Now), vec![]);
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.total_candidates, 0);
    }
}
