use std::cmp::Ordering;

use crate::config::ShelfLifeSettings;
use crate::core::distance::distance_between;
use crate::core::matcher::MatchPolicy;
use crate::models::{BloodGroup, Compatibility, Component, Hospital, HospitalMatch, Urgency};

/// Caller-selectable ranking order for hospital matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HospitalSort {
    /// Units descending
    Units,
    /// Freshness days ascending, ties by units descending
    Freshness,
    /// Distance ascending (unknown last), ties by units descending
    Distance,
}

impl HospitalSort {
    /// Parse a caller label; when absent the urgency picks the default —
    /// emergencies rank by distance, routine requests by stock depth.
    pub fn resolve(label: Option<&str>, urgency: Urgency) -> Self {
        match label.map(|s| s.trim().to_lowercase()) {
            Some(ref s) if s == "units" => HospitalSort::Units,
            Some(ref s) if s == "freshness" => HospitalSort::Freshness,
            Some(ref s) if s == "distance" => HospitalSort::Distance,
            _ if urgency.is_emergency() => HospitalSort::Distance,
            _ => HospitalSort::Units,
        }
    }
}

/// Parameters of one hospital search
#[derive(Debug, Clone)]
pub struct HospitalQuery {
    pub blood_group: Option<BloodGroup>,
    pub component: Option<Component>,
    pub location: Option<String>,
    pub origin: Option<(f64, f64)>,
    pub radius_km: Option<f64>,
    pub min_units: i32,
    pub sort: HospitalSort,
}

/// Result of the hospital ranking process
#[derive(Debug)]
pub struct HospitalOutcome {
    pub matches: Vec<HospitalMatch>,
    pub total_candidates: usize,
}

/// Hospital/blood-bank ranking pipeline
///
/// Stock past its component's shelf life is excluded outright — a stale unit
/// is never a valid match, not merely a low-ranked one.
#[derive(Debug, Clone)]
pub struct HospitalMatcher {
    policy: MatchPolicy,
    shelf_life: ShelfLifeSettings,
}

impl HospitalMatcher {
    pub fn new(policy: MatchPolicy, shelf_life: ShelfLifeSettings) -> Self {
        Self { policy, shelf_life }
    }

    pub fn with_policy(&self, policy: MatchPolicy) -> Self {
        Self {
            policy,
            shelf_life: self.shelf_life.clone(),
        }
    }

    pub fn rank(&self, query: &HospitalQuery, hospitals: Vec<Hospital>) -> HospitalOutcome {
        let total_candidates = hospitals.len();
        let accepted_groups = query
            .blood_group
            .map(|g| self.policy.donor_groups(g));

        let mut matches: Vec<HospitalMatch> = hospitals
            .into_iter()
            .filter(|hospital| match &query.location {
                Some(needle) => {
                    let needle = needle.to_lowercase();
                    hospital.name.to_lowercase().contains(&needle)
                        || hospital.address.to_lowercase().contains(&needle)
                }
                None => true,
            })
            .filter_map(|hospital| {
                let mut units = 0i32;
                let mut freshness_days: Option<i32> = None;
                let mut exact_group = false;

                for row in &hospital.stock {
                    if let Some(component) = query.component {
                        if row.component != component {
                            continue;
                        }
                    }
                    if let Some(groups) = &accepted_groups {
                        if !groups.contains(&row.blood_group) {
                            continue;
                        }
                    }
                    // stale stock is invalid, not low-ranked
                    if row.freshness_days > self.shelf_life.for_component(row.component) {
                        continue;
                    }

                    units += row.units;
                    freshness_days = Some(match freshness_days {
                        Some(f) => f.min(row.freshness_days),
                        None => row.freshness_days,
                    });
                    if query.blood_group == Some(row.blood_group) {
                        exact_group = true;
                    }
                }

                let freshness_days = freshness_days?;
                if units < query.min_units {
                    return None;
                }

                let distance_km = distance_between(query.origin, hospital.coords());
                if let (Some(d), Some(radius)) = (distance_km, query.radius_km) {
                    if d > radius {
                        return None;
                    }
                }

                let compatibility = if query.blood_group.is_some()
                    && query.component.is_some()
                    && exact_group
                {
                    Compatibility::Perfect
                } else {
                    Compatibility::Good
                };

                Some(HospitalMatch {
                    hospital_id: hospital.id,
                    name: hospital.name,
                    address: hospital.address,
                    contact: hospital.contact,
                    verified: hospital.verified,
                    units,
                    freshness_days,
                    distance_km,
                    compatibility,
                })
            })
            .collect();

        match query.sort {
            HospitalSort::Units => {
                matches.sort_by(|a, b| {
                    b.units.cmp(&a.units).then_with(|| {
                        let da = a.distance_km.unwrap_or(f64::INFINITY);
                        let db = b.distance_km.unwrap_or(f64::INFINITY);
                        da.partial_cmp(&db).unwrap_or(Ordering::Equal)
                    })
                });
            }
            HospitalSort::Freshness => {
                matches.sort_by(|a, b| {
                    a.freshness_days
                        .cmp(&b.freshness_days)
                        .then_with(|| b.units.cmp(&a.units))
                });
            }
            HospitalSort::Distance => {
                matches.sort_by(|a, b| {
                    let da = a.distance_km.unwrap_or(f64::INFINITY);
                    let db = b.distance_km.unwrap_or(f64::INFINITY);
                    da.partial_cmp(&db)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| b.units.cmp(&a.units))
                });
            }
        }

        HospitalOutcome {
            matches,
            total_candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HospitalStock;
    use uuid::Uuid;

    fn hospital(name: &str, coords: Option<(f64, f64)>, stock: Vec<HospitalStock>) -> Hospital {
        Hospital {
            id: Uuid::new_v4(),
            name: name.to_string(),
            address: format!("{} Road, Chennai", name),
            contact: Some("+914400000000".to_string()),
            verified: true,
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            stock,
        }
    }

    fn stock(component: Component, group: BloodGroup, units: i32, freshness: i32) -> HospitalStock {
        HospitalStock {
            component,
            blood_group: group,
            units,
            freshness_days: freshness,
        }
    }

    fn matcher() -> HospitalMatcher {
        HospitalMatcher::new(MatchPolicy::Exact, ShelfLifeSettings::default())
    }

    fn query(sort: HospitalSort) -> HospitalQuery {
        HospitalQuery {
            blood_group: Some(BloodGroup::APos),
            component: Some(Component::RedCells),
            location: None,
            origin: Some((13.0827, 80.2707)),
            radius_km: None,
            min_units: 1,
            sort,
        }
    }

    #[test]
    fn test_stale_stock_is_excluded_even_when_nothing_else_matches() {
        // 40-day-old red cells against a 35-day shelf life
        let hospitals = vec![hospital(
            "Stale General",
            None,
            vec![stock(Component::RedCells, BloodGroup::APos, 12, 40)],
        )];

        let outcome = matcher().rank(&query(HospitalSort::Units), hospitals);
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.total_candidates, 1);
    }

    #[test]
    fn test_min_units_filters_thin_stock() {
        let hospitals = vec![
            hospital(
                "Thin",
                None,
                vec![stock(Component::RedCells, BloodGroup::APos, 1, 3)],
            ),
            hospital(
                "Deep",
                None,
                vec![stock(Component::RedCells, BloodGroup::APos, 8, 3)],
            ),
        ];

        let mut q = query(HospitalSort::Units);
        q.min_units = 2;

        let outcome = matcher().rank(&q, hospitals);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].name, "Deep");
    }

    #[test]
    fn test_units_aggregate_across_matching_rows() {
        let hospitals = vec![hospital(
            "Split",
            None,
            vec![
                stock(Component::RedCells, BloodGroup::APos, 3, 10),
                stock(Component::RedCells, BloodGroup::APos, 4, 4),
                stock(Component::Plasma, BloodGroup::APos, 9, 4),
            ],
        )];

        let outcome = matcher().rank(&query(HospitalSort::Units), hospitals);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].units, 7);
        // freshest matching batch wins the freshness figure
        assert_eq!(outcome.matches[0].freshness_days, 4);
    }

    #[test]
    fn test_sort_by_freshness_ties_on_units() {
        let hospitals = vec![
            hospital(
                "Old",
                None,
                vec![stock(Component::RedCells, BloodGroup::APos, 10, 20)],
            ),
            hospital(
                "FreshSmall",
                None,
                vec![stock(Component::RedCells, BloodGroup::APos, 2, 5)],
            ),
            hospital(
                "FreshBig",
                None,
                vec![stock(Component::RedCells, BloodGroup::APos, 9, 5)],
            ),
        ];

        let outcome = matcher().rank(&query(HospitalSort::Freshness), hospitals);
        let names: Vec<&str> = outcome.matches.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["FreshBig", "FreshSmall", "Old"]);
    }

    #[test]
    fn test_sort_by_distance_unknown_last() {
        let hospitals = vec![
            hospital(
                "Nowhere",
                None,
                vec![stock(Component::RedCells, BloodGroup::APos, 5, 5)],
            ),
            hospital(
                "Near",
                Some((13.09, 80.27)),
                vec![stock(Component::RedCells, BloodGroup::APos, 5, 5)],
            ),
            hospital(
                "Far",
                Some((13.30, 80.40)),
                vec![stock(Component::RedCells, BloodGroup::APos, 5, 5)],
            ),
        ];

        let outcome = matcher().rank(&query(HospitalSort::Distance), hospitals);
        let names: Vec<&str> = outcome.matches.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Near", "Far", "Nowhere"]);
    }

    #[test]
    fn test_compatibility_classification() {
        let hospitals = vec![
            hospital(
                "Exact",
                None,
                vec![stock(Component::RedCells, BloodGroup::APos, 5, 5)],
            ),
            hospital(
                "Universal",
                None,
                vec![stock(Component::RedCells, BloodGroup::ONeg, 5, 5)],
            ),
        ];

        let outcome = matcher()
            .with_policy(MatchPolicy::AboCompatible)
            .rank(&query(HospitalSort::Units), hospitals);

        let by_name = |n: &str| {
            outcome
                .matches
                .iter()
                .find(|m| m.name == n)
                .unwrap()
                .compatibility
        };
        assert_eq!(by_name("Exact"), Compatibility::Perfect);
        assert_eq!(by_name("Universal"), Compatibility::Good);
    }

    #[test]
    fn test_location_text_filter() {
        let mut north = hospital(
            "North Clinic",
            None,
            vec![stock(Component::RedCells, BloodGroup::APos, 5, 5)],
        );
        north.address = "12 Anna Salai, Madurai".to_string();
        let south = hospital(
            "South Clinic",
            None,
            vec![stock(Component::RedCells, BloodGroup::APos, 5, 5)],
        );

        let mut q = query(HospitalSort::Units);
        q.location = Some("chennai".to_string());

        let outcome = matcher().rank(&q, vec![north, south]);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].name, "South Clinic");
    }

    #[test]
    fn test_sort_resolution_from_urgency() {
        assert_eq!(
            HospitalSort::resolve(None, Urgency::Critical),
            HospitalSort::Distance
        );
        assert_eq!(
            HospitalSort::resolve(None, Urgency::Low),
            HospitalSort::Units
        );
        assert_eq!(
            HospitalSort::resolve(Some("freshness"), Urgency::Critical),
            HospitalSort::Freshness
        );
    }
}
