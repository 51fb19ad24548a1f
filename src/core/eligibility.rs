use chrono::NaiveDate;

/// Coarse eligibility label derived from the profile service's raw status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityLabel {
    Eligible,
    Deferred,
    Unknown,
}

/// Classification result: the label plus a ready-now flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub label: EligibilityLabel,
    pub ready: bool,
}

/// Classify a donor's readiness from the opaque profile-service status label
/// and the donation cooldown.
///
/// The label is matched by case-insensitive containment: anything carrying
/// "eligible" counts as an eligible state, anything carrying "defer" as a
/// deferral. Unknown or missing labels classify as not-ready — matching must
/// degrade, never abort, on data the profile service invents later.
pub fn classify(
    raw_label: Option<&str>,
    last_donation: Option<NaiveDate>,
    today: NaiveDate,
    cooldown_days: i64,
) -> Eligibility {
    let label = match raw_label {
        Some(raw) => {
            let lower = raw.trim().to_lowercase();
            if lower.contains("eligible") && !lower.contains("ineligible") {
                EligibilityLabel::Eligible
            } else if lower.contains("defer") {
                EligibilityLabel::Deferred
            } else {
                EligibilityLabel::Unknown
            }
        }
        None => EligibilityLabel::Unknown,
    };

    let cooldown_clear = match last_donation {
        Some(last) => (today - last).num_days() >= cooldown_days,
        None => true,
    };

    Eligibility {
        label,
        ready: label == EligibilityLabel::Eligible && cooldown_clear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_eligible_label_and_clear_cooldown() {
        let e = classify(Some("eligible"), None, date(2024, 6, 1), 90);
        assert!(e.ready);
        assert_eq!(e.label, EligibilityLabel::Eligible);
    }

    #[test]
    fn test_label_containment_is_case_insensitive() {
        let e = classify(Some("Currently ELIGIBLE"), None, date(2024, 6, 1), 90);
        assert!(e.ready);
    }

    #[test]
    fn test_deferral_labels_are_not_ready() {
        let e = classify(Some("deferred_14d"), None, date(2024, 6, 1), 90);
        assert!(!e.ready);
        assert_eq!(e.label, EligibilityLabel::Deferred);
    }

    #[test]
    fn test_unknown_label_degrades_to_not_ready() {
        for raw in [Some("pending_review"), Some(""), None] {
            let e = classify(raw, None, date(2024, 6, 1), 90);
            assert!(!e.ready, "label {:?} must not be ready", raw);
            assert_eq!(e.label, EligibilityLabel::Unknown);
        }
    }

    #[test]
    fn test_cooldown_blocks_recent_donor() {
        let e = classify(
            Some("eligible"),
            Some(date(2024, 5, 1)),
            date(2024, 6, 1),
            90,
        );
        assert!(!e.ready);
        assert_eq!(e.label, EligibilityLabel::Eligible);
    }

    #[test]
    fn test_cooldown_boundary_is_inclusive() {
        let e = classify(
            Some("eligible"),
            Some(date(2024, 1, 1)),
            date(2024, 3, 31), // exactly 90 days later
            90,
        );
        assert!(e.ready);
    }

    #[test]
    fn test_ineligible_label_is_not_eligible() {
        let e = classify(Some("ineligible"), None, date(2024, 6, 1), 90);
        assert!(!e.ready);
        assert_eq!(e.label, EligibilityLabel::Unknown);
    }
}
