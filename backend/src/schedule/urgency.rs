//! Due-soon classification

use crate::config::DUE_SOON_WINDOW_DAYS;
use crate::database::{Reminder, ReminderStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Derived display state of a reminder. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    Completed,
    Overdue,
    DueThisWeek,
    Upcoming,
    Unscheduled,
}

impl Urgency {
    /// Overdue or due within the window
    pub fn needs_attention(self) -> bool {
        matches!(self, Urgency::Overdue | Urgency::DueThisWeek)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Completed => "completed",
            Urgency::Overdue => "overdue",
            Urgency::DueThisWeek => "due-this-week",
            Urgency::Upcoming => "upcoming",
            Urgency::Unscheduled => "unscheduled",
        }
    }
}

/// Whole calendar days from `today` until `due`; negative once past.
pub fn days_remaining(due: NaiveDate, today: NaiveDate) -> i64 {
    (due - today).num_days()
}

pub fn classify_parts(status: ReminderStatus, due: Option<NaiveDate>, today: NaiveDate) -> Urgency {
    if status == ReminderStatus::Completed {
        return Urgency::Completed;
    }
    let Some(due) = due else {
        return Urgency::Unscheduled;
    };
    match days_remaining(due, today) {
        days if days < 0 => Urgency::Overdue,
        days if days <= DUE_SOON_WINDOW_DAYS => Urgency::DueThisWeek,
        _ => Urgency::Upcoming,
    }
}

pub fn classify(reminder: &Reminder, today: NaiveDate) -> Urgency {
    classify_parts(reminder.status, reminder.reminder_date, today)
}

/// Classify against an instant; only its calendar date matters.
pub fn classify_at(reminder: &Reminder, now: DateTime<Utc>) -> Urgency {
    classify(reminder, now.date_naive())
}
