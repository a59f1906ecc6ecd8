//! Vaccine dose scheduling
//!
//! Pure functions over reminders and the dose schedule table. Nothing in
//! here touches the database; the reminders service persists what these
//! functions decide.
//!
//! - [`table`]: dose ages per vaccine and the intervals derived from them
//! - [`generator`]: bulk reminder drafts from a date of birth
//! - [`advancement`]: next-dose draft when a dose is completed
//! - [`dedup`]: collapse duplicate `(vaccine, dose)` reminders
//! - [`urgency`]: derived due-soon classification

pub mod advancement;
pub mod dedup;
pub mod generator;
pub mod table;
pub mod urgency;

pub use advancement::{next_dose_key, on_dose_completed};
pub use dedup::{deduplicate, Deduplicated};
pub use generator::generate;
pub use table::{DoseSchedule, DoseScheduleTable, Offset};
pub use urgency::{classify, classify_at, days_remaining, Urgency};

use crate::database::Reminder;

/// Logical identity of a vaccine dose for one user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DoseKey {
    pub vaccine_name: String,
    pub dose_number: i64,
}

impl DoseKey {
    pub fn new(vaccine_name: impl Into<String>, dose_number: i64) -> Self {
        Self {
            vaccine_name: vaccine_name.into(),
            dose_number,
        }
    }

    /// Key of a vaccine reminder; general reminders have none.
    pub fn of(reminder: &Reminder) -> Option<Self> {
        reminder
            .vaccine()
            .map(|name| Self::new(name, reminder.dose_number))
    }
}
