//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde for serialization to API callers.

use crate::config::{DEFAULT_DOSE_NUMBER, DEFAULT_VACCINE_ICON};
use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Who a vaccine is intended for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RecipientType {
    Baby,
    Mother,
    Both,
}

impl RecipientType {
    /// Recipient used for reminders generated from a baby's schedule
    pub fn default_recipient(self) -> Recipient {
        match self {
            RecipientType::Mother => Recipient::Mother,
            RecipientType::Baby | RecipientType::Both => Recipient::Baby,
        }
    }

    pub fn includes(self, recipient: Recipient) -> bool {
        match (self, recipient) {
            (RecipientType::Both, _) => true,
            (RecipientType::Baby, Recipient::Baby) => true,
            (RecipientType::Mother, Recipient::Mother) => true,
            _ => false,
        }
    }
}

/// Who a single reminder is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Recipient {
    Mother,
    Baby,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReminderKind {
    Vaccine,
    General,
}

/// Stored reminder state. Urgency is derived on read and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Reference vaccine, seeded at startup
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vaccine {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub description: Option<String>,
    pub total_doses: i64,
    pub recipient_type: RecipientType,
    pub recommended: bool,
}

/// Vaccine seed entry
#[derive(Debug, Clone, Deserialize)]
pub struct NewVaccine {
    pub name: String,
    pub icon: String,
    pub description: Option<String>,
    pub total_doses: i64,
    pub recipient_type: RecipientType,
    pub recommended: bool,
}

/// Baby profile; the date of birth anchors the vaccine schedule
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Baby {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Option<Gender>,
    pub weight_at_birth_kg: Option<f64>,
    pub height_at_birth_cm: Option<f64>,
    pub head_circumference_at_birth_cm: Option<f64>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create baby request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBabyRequest {
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub weight_at_birth_kg: Option<f64>,
    pub height_at_birth_cm: Option<f64>,
    pub head_circumference_at_birth_cm: Option<f64>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub notes: Option<String>,
}

/// Update baby request; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBabyRequest {
    pub id: i64,
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub notes: Option<String>,
}

/// A scheduled or completed vaccine dose, or a general user reminder
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reminder {
    pub id: i64,
    pub user_id: i64,
    pub kind: ReminderKind,
    pub title: String,
    pub vaccine_name: Option<String>,
    pub reminder_date: Option<NaiveDate>,
    pub status: ReminderStatus,
    pub dose_number: i64,
    pub total_doses: Option<i64>,
    pub recipient: Recipient,
    pub last_dose_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub icon: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Reminder {
    pub fn is_completed(&self) -> bool {
        self.status == ReminderStatus::Completed
    }

    /// Vaccine name of a vaccine reminder; `None` for general reminders.
    pub fn vaccine(&self) -> Option<&str> {
        match self.kind {
            ReminderKind::Vaccine => self.vaccine_name.as_deref(),
            ReminderKind::General => None,
        }
    }

    /// Date a following dose is measured from: completion first, schedule second.
    pub fn baseline_date(&self) -> Option<NaiveDate> {
        self.last_dose_date.or(self.reminder_date)
    }
}

/// Unpersisted reminder produced by the scheduler or a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderDraft {
    pub kind: ReminderKind,
    pub title: String,
    pub vaccine_name: Option<String>,
    pub reminder_date: Option<NaiveDate>,
    pub dose_number: i64,
    pub total_doses: Option<i64>,
    pub recipient: Recipient,
    pub description: Option<String>,
    pub icon: String,
}

impl ReminderDraft {
    /// Draft for one dose of a reference vaccine.
    pub fn for_vaccine_dose(vaccine: &Vaccine, dose_number: i64, due: Option<NaiveDate>) -> Self {
        Self {
            kind: ReminderKind::Vaccine,
            title: vaccine.name.clone(),
            vaccine_name: Some(vaccine.name.clone()),
            reminder_date: due,
            dose_number,
            total_doses: Some(vaccine.total_doses),
            recipient: vaccine.recipient_type.default_recipient(),
            description: vaccine.description.clone(),
            icon: vaccine.icon.clone(),
        }
    }

    pub fn general(title: impl Into<String>, due: NaiveDate) -> Self {
        Self {
            kind: ReminderKind::General,
            title: title.into(),
            vaccine_name: None,
            reminder_date: Some(due),
            dose_number: DEFAULT_DOSE_NUMBER,
            total_doses: None,
            recipient: Recipient::Mother,
            description: None,
            icon: DEFAULT_VACCINE_ICON.to_string(),
        }
    }

    /// Reject drafts that must never reach the store.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Reminder title is required".into()));
        }
        if self.dose_number < 1 {
            return Err(AppError::Validation(format!(
                "Dose number must be positive, got {}",
                self.dose_number
            )));
        }
        if let Some(total) = self.total_doses {
            if total < 1 {
                return Err(AppError::Validation(format!(
                    "Total doses must be positive, got {}",
                    total
                )));
            }
        }
        match self.kind {
            ReminderKind::Vaccine => {
                if self.vaccine_name.as_deref().map_or(true, |n| n.trim().is_empty()) {
                    return Err(AppError::Validation(
                        "Vaccine reminders need a vaccine name".into(),
                    ));
                }
            }
            ReminderKind::General => {
                if self.reminder_date.is_none() {
                    return Err(AppError::Validation("Reminder date is required".into()));
                }
            }
        }
        Ok(())
    }
}

/// Application setting
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Setting {
    pub key: String,
    pub value: String,
}
