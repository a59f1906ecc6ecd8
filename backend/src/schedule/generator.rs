//! Bulk reminder generation from a baby's date of birth

use super::table::{DoseSchedule, DoseScheduleTable};
use super::DoseKey;
use crate::database::{Reminder, ReminderDraft, Vaccine};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Draft every dose of `vaccines` that `existing` does not already hold.
///
/// Dose 1 is measured from `date_of_birth`; every later dose from the
/// previous one. An existing dose is never re-emitted but still serves as
/// the baseline of the dose after it. Vaccines missing from `schedules`
/// get a single dose due on the birth date.
pub fn generate(
    vaccines: &[Vaccine],
    schedules: &DoseScheduleTable,
    date_of_birth: NaiveDate,
    existing: &[Reminder],
) -> Vec<ReminderDraft> {
    let existing: HashMap<DoseKey, &Reminder> = existing
        .iter()
        .filter_map(|r| DoseKey::of(r).map(|key| (key, r)))
        .collect();

    let fallback = DoseSchedule::single();
    let mut drafts = Vec::new();

    for vaccine in vaccines {
        let (schedule, dose_count) = match schedules.get(&vaccine.name) {
            Some(schedule) => (schedule, vaccine.total_doses),
            None => {
                tracing::debug!("No dose schedule for {}, using a single dose", vaccine.name);
                (&fallback, 1)
            }
        };

        let mut baseline = date_of_birth;

        for dose in 1..=dose_count {
            let Some(due) = schedule.offset_for(dose).and_then(|o| o.apply(baseline)) else {
                tracing::warn!(
                    "Cannot schedule {} dose {} from {}",
                    vaccine.name,
                    dose,
                    baseline
                );
                break;
            };

            match existing.get(&DoseKey::new(vaccine.name.as_str(), dose)) {
                Some(present) => baseline = present.baseline_date().unwrap_or(due),
                None => {
                    drafts.push(ReminderDraft::for_vaccine_dose(vaccine, dose, Some(due)));
                    baseline = due;
                }
            }
        }
    }

    drafts
}
