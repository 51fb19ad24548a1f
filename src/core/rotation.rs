use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// One cohort slot reduced to what rotation needs: its order, its donor and
/// whether that donor classifies as ready.
#[derive(Debug, Clone)]
pub struct RotationSlot {
    pub sequence_order: i16,
    pub donor_id: Option<String>,
    pub ready: bool,
}

/// Outcome of resolving the donor due for a cycle
///
/// Rotation knows the order; it never substitutes. A not-ready (or pending)
/// slot surfaces as `RequiresBackup` and backup selection stays with the
/// scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    Member { position: usize, donor_id: String },
    RequiresBackup { position: usize },
}

/// Slot position due for a cycle: cycle number modulo cohort size
#[inline]
pub fn rotation_position(cycle_number: i32, cohort_size: usize) -> usize {
    debug_assert!(cohort_size > 0);
    cycle_number.rem_euclid(cohort_size as i32) as usize
}

/// Resolve the member due for `cycle_number`
pub fn resolve_rotation_donor(
    slots: &[RotationSlot],
    cycle_number: i32,
    cohort_size: usize,
) -> RotationOutcome {
    let position = rotation_position(cycle_number, cohort_size);

    let slot = slots
        .iter()
        .find(|s| s.sequence_order as usize == position);

    match slot {
        Some(slot) if slot.ready => match &slot.donor_id {
            Some(donor_id) => RotationOutcome::Member {
                position,
                donor_id: donor_id.clone(),
            },
            None => RotationOutcome::RequiresBackup { position },
        },
        _ => RotationOutcome::RequiresBackup { position },
    }
}

/// Next transfusion timestamp: the rotation cadence added to the later of the
/// cohort's start date and the previous cycle's scheduled time.
pub fn next_scheduled_for(
    start_date: NaiveDate,
    previous: Option<DateTime<Utc>>,
    cadence_days: i64,
) -> DateTime<Utc> {
    let anchor = start_date.and_time(NaiveTime::MIN).and_utc();
    let base = match previous {
        Some(prev) if prev > anchor => prev,
        _ => anchor,
    };
    base + Duration::days(cadence_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(ready: [bool; 5]) -> Vec<RotationSlot> {
        ready
            .iter()
            .enumerate()
            .map(|(i, r)| RotationSlot {
                sequence_order: i as i16,
                donor_id: Some(format!("donor-{}", i)),
                ready: *r,
            })
            .collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rotation_period_is_cohort_size() {
        for cycle in 0..5 {
            let a = resolve_rotation_donor(&slots([true; 5]), cycle, 5);
            let b = resolve_rotation_donor(&slots([true; 5]), cycle + 5, 5);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_rotation_walks_slots_in_order() {
        let all = slots([true; 5]);
        for cycle in 0..10 {
            match resolve_rotation_donor(&all, cycle, 5) {
                RotationOutcome::Member { position, donor_id } => {
                    assert_eq!(position, (cycle as usize) % 5);
                    assert_eq!(donor_id, format!("donor-{}", position));
                }
                RotationOutcome::RequiresBackup { .. } => panic!("all slots ready"),
            }
        }
    }

    #[test]
    fn test_not_ready_slot_requires_backup() {
        let mut ready = [true; 5];
        ready[2] = false;
        let outcome = resolve_rotation_donor(&slots(ready), 7, 5); // 7 mod 5 = 2
        assert_eq!(outcome, RotationOutcome::RequiresBackup { position: 2 });
    }

    #[test]
    fn test_pending_slot_requires_backup() {
        let mut all = slots([true; 5]);
        all[0].donor_id = None;
        let outcome = resolve_rotation_donor(&all, 5, 5);
        assert_eq!(outcome, RotationOutcome::RequiresBackup { position: 0 });
    }

    #[test]
    fn test_missing_slot_requires_backup() {
        let four: Vec<RotationSlot> = slots([true; 5]).into_iter().take(4).collect();
        let outcome = resolve_rotation_donor(&four, 4, 5);
        assert_eq!(outcome, RotationOutcome::RequiresBackup { position: 4 });
    }

    #[test]
    fn test_first_cycle_cadence_from_start_date() {
        let next = next_scheduled_for(date(2024, 1, 1), None, 21);
        assert_eq!(next.date_naive(), date(2024, 1, 22));
    }

    #[test]
    fn test_cadence_advances_from_previous_cycle() {
        let prev = date(2024, 2, 10).and_time(NaiveTime::MIN).and_utc();
        let next = next_scheduled_for(date(2024, 1, 1), Some(prev), 21);
        assert_eq!(next.date_naive(), date(2024, 3, 2));
    }

    #[test]
    fn test_cadence_ignores_previous_before_start() {
        // a stale previous cycle behind the anchor never pulls the plan backwards
        let prev = date(2023, 11, 1).and_time(NaiveTime::MIN).and_utc();
        let next = next_scheduled_for(date(2024, 1, 1), Some(prev), 21);
        assert_eq!(next.date_naive(), date(2024, 1, 22));
    }
}
