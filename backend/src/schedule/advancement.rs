//! Dose advancement on completion

use super::table::DoseScheduleTable;
use super::DoseKey;
use crate::database::{Reminder, ReminderDraft, ReminderKind, ReminderStatus};
use chrono::NaiveDate;

/// Key of the dose that follows `reminder`, if its vaccine has one.
pub fn next_dose_key(reminder: &Reminder) -> Option<DoseKey> {
    let name = reminder.vaccine()?;
    let total = reminder.total_doses.unwrap_or(1);
    (reminder.dose_number < total).then(|| DoseKey::new(name, reminder.dose_number + 1))
}

/// Mark `reminder` completed on `completion_date` and draft its next dose.
///
/// Returns `None` on the last dose, for general reminders, when
/// `next_dose_exists` is set, or when the schedule has no interval for
/// the next dose.
pub fn on_dose_completed(
    reminder: &mut Reminder,
    completion_date: NaiveDate,
    schedules: &DoseScheduleTable,
    next_dose_exists: bool,
) -> Option<ReminderDraft> {
    reminder.status = ReminderStatus::Completed;
    reminder.last_dose_date = Some(completion_date);

    let next = next_dose_key(reminder)?;

    if next_dose_exists {
        tracing::debug!(
            "{} dose {} already scheduled",
            next.vaccine_name,
            next.dose_number
        );
        return None;
    }

    let Some(offset) = schedules
        .get(&next.vaccine_name)
        .and_then(|schedule| schedule.offset_for(next.dose_number))
    else {
        tracing::warn!(
            "No interval known for {} dose {}, not scheduling it",
            next.vaccine_name,
            next.dose_number
        );
        return None;
    };

    let due = offset.apply(completion_date)?;

    Some(ReminderDraft {
        kind: ReminderKind::Vaccine,
        title: reminder.title.clone(),
        vaccine_name: Some(next.vaccine_name),
        reminder_date: Some(due),
        dose_number: next.dose_number,
        total_doses: reminder.total_doses,
        recipient: reminder.recipient,
        description: reminder.description.clone(),
        icon: reminder.icon.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::fixtures::{date, reminder};
    use crate::schedule::{DoseSchedule, Offset};

    fn table() -> DoseScheduleTable {
        DoseScheduleTable::new().with(
            "X",
            DoseSchedule::new(vec![Offset::Days(0), Offset::Days(28), Offset::Days(56)]).unwrap(),
        )
    }

    #[test]
    fn test_completion_drafts_next_dose() {
        let mut first = reminder(1, "X", 1, 3, Some(date(2025, 1, 1)));

        let next = on_dose_completed(&mut first, date(2025, 1, 3), &table(), false).unwrap();

        assert_eq!(first.status, ReminderStatus::Completed);
        assert_eq!(first.last_dose_date, Some(date(2025, 1, 3)));
        assert_eq!(next.dose_number, 2);
        assert_eq!(next.reminder_date, Some(date(2025, 1, 31)));
        assert_eq!(next.vaccine_name.as_deref(), Some("X"));
        assert_eq!(next.total_doses, Some(3));
    }

    #[test]
    fn test_last_dose_has_no_successor() {
        let mut last = reminder(3, "X", 3, 3, Some(date(2025, 2, 26)));

        assert!(on_dose_completed(&mut last, date(2025, 2, 26), &table(), false).is_none());
        assert!(last.is_completed());
    }

    #[test]
    fn test_existing_next_dose_is_not_drafted_again() {
        let mut first = reminder(1, "X", 1, 3, Some(date(2025, 1, 1)));
        assert!(on_dose_completed(&mut first, date(2025, 1, 3), &table(), false).is_some());

        // Second completion of the same dose, next dose now stored
        assert!(on_dose_completed(&mut first, date(2025, 1, 3), &table(), true).is_none());
    }

    #[test]
    fn test_single_or_unset_total_never_advances() {
        let mut single = reminder(1, "X", 1, 1, None);
        assert!(on_dose_completed(&mut single, date(2025, 1, 3), &table(), false).is_none());

        let mut unset = reminder(2, "X", 1, 1, None);
        unset.total_doses = None;
        assert!(next_dose_key(&unset).is_none());
        assert!(on_dose_completed(&mut unset, date(2025, 1, 3), &table(), false).is_none());
    }

    #[test]
    fn test_unknown_vaccine_is_not_advanced() {
        let mut other = reminder(1, "Unlisted", 1, 2, None);

        assert_eq!(next_dose_key(&other), Some(DoseKey::new("Unlisted", 2)));
        assert!(on_dose_completed(&mut other, date(2025, 1, 3), &table(), false).is_none());
        assert!(other.is_completed());
    }
}
