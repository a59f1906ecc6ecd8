//! Duplicate reminder cleanup

use super::DoseKey;
use crate::database::Reminder;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Result of collapsing duplicate reminders
#[derive(Debug, Clone, Default)]
pub struct Deduplicated {
    /// One reminder per dose key, in first-seen key order
    pub kept: Vec<Reminder>,
    /// Everything else; the caller deletes these
    pub removed: Vec<Reminder>,
}

/// Latest update wins, then the highest id. A timestamp beats none.
fn recency(reminder: &Reminder) -> (Option<DateTime<Utc>>, i64) {
    (reminder.updated_at, reminder.id)
}

/// Keep one vaccine reminder per `(vaccine_name, dose_number)`.
///
/// General reminders carry no dose key and are always kept.
pub fn deduplicate(reminders: Vec<Reminder>) -> Deduplicated {
    let mut result = Deduplicated::default();
    let mut slots: HashMap<DoseKey, usize> = HashMap::new();

    for reminder in reminders {
        let Some(key) = DoseKey::of(&reminder) else {
            result.kept.push(reminder);
            continue;
        };

        match slots.get(&key) {
            Some(&slot) => {
                if recency(&reminder) > recency(&result.kept[slot]) {
                    let replaced = std::mem::replace(&mut result.kept[slot], reminder);
                    result.removed.push(replaced);
                } else {
                    result.removed.push(reminder);
                }
            }
            None => {
                slots.insert(key, result.kept.len());
                result.kept.push(reminder);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ReminderKind;
    use crate::schedule::fixtures::reminder;
    use chrono::TimeZone;

    fn ids(reminders: &[Reminder]) -> Vec<i64> {
        reminders.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_highest_id_wins_without_timestamps() {
        let input = vec![
            reminder(5, "V", 1, 1, None),
            reminder(9, "V", 1, 1, None),
            reminder(7, "V", 1, 1, None),
        ];

        let first = deduplicate(input);
        assert_eq!(ids(&first.kept), vec![9]);
        assert_eq!(ids(&first.removed), vec![5, 7]);

        let second = deduplicate(first.kept);
        assert_eq!(ids(&second.kept), vec![9]);
        assert!(second.removed.is_empty());
    }

    #[test]
    fn test_latest_update_beats_higher_id() {
        let mut touched = reminder(3, "V", 1, 1, None);
        touched.updated_at = Some(Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap());

        let result = deduplicate(vec![touched, reminder(8, "V", 1, 1, None)]);

        assert_eq!(ids(&result.kept), vec![3]);
        assert_eq!(ids(&result.removed), vec![8]);
    }

    #[test]
    fn test_equal_timestamps_fall_back_to_id() {
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        let mut a = reminder(4, "V", 2, 2, None);
        let mut b = reminder(6, "V", 2, 2, None);
        a.updated_at = Some(at);
        b.updated_at = Some(at);

        let result = deduplicate(vec![b, a]);
        assert_eq!(ids(&result.kept), vec![6]);
    }

    #[test]
    fn test_distinct_keys_are_all_kept_in_order() {
        let input = vec![
            reminder(1, "A", 1, 2, None),
            reminder(2, "A", 2, 2, None),
            reminder(3, "B", 1, 1, None),
            reminder(4, "A", 1, 2, None),
        ];

        let result = deduplicate(input);
        assert_eq!(ids(&result.kept), vec![4, 2, 3]);
        assert_eq!(ids(&result.removed), vec![1]);
    }

    #[test]
    fn test_general_reminders_pass_through() {
        let mut a = reminder(1, "Checkup", 1, 1, None);
        let mut b = reminder(2, "Checkup", 1, 1, None);
        a.kind = ReminderKind::General;
        b.kind = ReminderKind::General;

        let result = deduplicate(vec![a, b]);
        assert_eq!(result.kept.len(), 2);
        assert!(result.removed.is_empty());
    }
}
