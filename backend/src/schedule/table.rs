//! Dose schedule table
//!
//! Each vaccine's schedule is the child's age at every dose. The offset
//! applied to a dose's baseline is the gap between consecutive ages, so
//! generation from the birth date and advancement from a completion date
//! both read the same numbers.

use crate::config::{DAYS_PER_MONTH, DAYS_PER_WEEK};
use crate::database::Vaccine;
use crate::error::{AppError, Result};
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A calendar distance from a baseline date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "lowercase")]
pub enum Offset {
    Days(u32),
    Weeks(u32),
    Months(u32),
}

impl Offset {
    pub const ZERO: Offset = Offset::Days(0);

    /// Date `self` after `base`; `None` past the end of the calendar.
    pub fn apply(self, base: NaiveDate) -> Option<NaiveDate> {
        match self {
            Offset::Days(n) => base.checked_add_days(Days::new(u64::from(n))),
            Offset::Weeks(n) => {
                base.checked_add_days(Days::new(u64::from(n) * u64::from(DAYS_PER_WEEK)))
            }
            Offset::Months(n) => base.checked_add_months(Months::new(n)),
        }
    }

    /// Approximate length in days, used only to compare mixed units.
    pub fn approx_days(self) -> u32 {
        match self {
            Offset::Days(n) => n,
            Offset::Weeks(n) => n.saturating_mul(DAYS_PER_WEEK),
            Offset::Months(n) => n.saturating_mul(DAYS_PER_MONTH),
        }
    }

    /// Gap from this age to a later one, in the shared unit when there is one.
    pub fn until(self, later: Offset) -> Offset {
        match (self, later) {
            (Offset::Days(a), Offset::Days(b)) => Offset::Days(b.saturating_sub(a)),
            (Offset::Weeks(a), Offset::Weeks(b)) => Offset::Weeks(b.saturating_sub(a)),
            (Offset::Months(a), Offset::Months(b)) => Offset::Months(b.saturating_sub(a)),
            _ => Offset::Days(later.approx_days().saturating_sub(self.approx_days())),
        }
    }
}

/// Ages at which each dose of one vaccine is due, dose 1 first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseSchedule {
    ages: Vec<Offset>,
}

impl DoseSchedule {
    /// Build a schedule; ages must be non-empty and never go backwards.
    pub fn new(ages: Vec<Offset>) -> Result<Self> {
        if ages.is_empty() {
            return Err(AppError::Catalog("Dose schedule needs at least one dose".into()));
        }
        if ages
            .windows(2)
            .any(|pair| pair[1].approx_days() < pair[0].approx_days())
        {
            return Err(AppError::Catalog(format!(
                "Dose ages must be non-decreasing: {:?}",
                ages
            )));
        }
        Ok(Self { ages })
    }

    /// One dose due on the baseline itself.
    pub fn single() -> Self {
        Self {
            ages: vec![Offset::ZERO],
        }
    }

    pub fn dose_count(&self) -> usize {
        self.ages.len()
    }

    pub fn ages(&self) -> &[Offset] {
        &self.ages
    }

    fn age_at(&self, dose_number: i64) -> Option<Offset> {
        let index = usize::try_from(dose_number.checked_sub(1)?).ok()?;
        self.ages.get(index).copied()
    }

    /// Offset from the baseline of `dose_number`: the age itself for dose 1,
    /// the gap from the previous dose otherwise.
    pub fn offset_for(&self, dose_number: i64) -> Option<Offset> {
        let age = self.age_at(dose_number)?;
        if dose_number == 1 {
            return Some(age);
        }
        let previous = self.age_at(dose_number - 1)?;
        Some(previous.until(age))
    }
}

/// Every vaccine's dose schedule, keyed by vaccine name
#[derive(Debug, Clone, Default)]
pub struct DoseScheduleTable {
    entries: HashMap<String, DoseSchedule>,
}

/// National immunization program, ages from birth
const NATIONAL_PROGRAM: &[(&str, &[Offset])] = &[
    ("BCG (Bacillus Calmette Guerin)", &[Offset::Days(0)]),
    (
        "Pentavalent Vaccine (Diphtheria, Pertussis, Tetanus, Hepatitis B and Hemophilus influenza B)",
        &[Offset::Weeks(6), Offset::Weeks(10), Offset::Weeks(14)],
    ),
    (
        "OPV (Oral Polio Vaccine)",
        &[Offset::Weeks(6), Offset::Weeks(10), Offset::Weeks(14)],
    ),
    (
        "PCV (Pneumococcal Conjugate Vaccine)",
        &[Offset::Weeks(6), Offset::Weeks(10), Offset::Months(9)],
    ),
    ("Rotavirus Vaccine", &[Offset::Weeks(6), Offset::Weeks(10)]),
    (
        "fIPV (Fractional Injectable Polio Vaccine)",
        &[Offset::Weeks(6), Offset::Weeks(14)],
    ),
    ("MR (Measles - Rubella)", &[Offset::Months(9), Offset::Months(15)]),
    ("JE (Japanese Encephalitis)", &[Offset::Months(12)]),
    ("Hepatitis A Vaccine", &[Offset::Months(12), Offset::Months(18)]),
    ("Typhoid Vaccine", &[Offset::Months(6)]),
    (
        "Varicella (Chickenpox) Vaccine",
        &[Offset::Months(12), Offset::Months(15)],
    ),
    ("Influenza (Flu) Vaccine", &[Offset::Months(6)]),
    (
        "HPV (Human Papillomavirus) Vaccine",
        &[Offset::Months(108), Offset::Months(114)],
    ),
    ("Meningococcal Vaccine", &[Offset::Months(9)]),
    (
        "Rabies (Pre-exposure) Vaccine",
        &[Offset::Days(0), Offset::Days(7), Offset::Days(28)],
    ),
];

impl DoseScheduleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule table for the national immunization program
    pub fn national() -> Self {
        let entries = NATIONAL_PROGRAM
            .iter()
            .map(|(name, ages)| {
                (
                    (*name).to_string(),
                    DoseSchedule {
                        ages: ages.to_vec(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, vaccine_name: impl Into<String>, schedule: DoseSchedule) {
        self.entries.insert(vaccine_name.into(), schedule);
    }

    pub fn with(mut self, vaccine_name: impl Into<String>, schedule: DoseSchedule) -> Self {
        self.insert(vaccine_name, schedule);
        self
    }

    pub fn get(&self, vaccine_name: &str) -> Option<&DoseSchedule> {
        self.entries.get(vaccine_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that every scheduled vaccine has one age per dose.
    pub fn validate_against(&self, vaccines: &[Vaccine]) -> Result<()> {
        for vaccine in vaccines {
            if vaccine.total_doses < 1 {
                return Err(AppError::Catalog(format!(
                    "{} has non-positive total doses {}",
                    vaccine.name, vaccine.total_doses
                )));
            }
            if let Some(schedule) = self.get(&vaccine.name) {
                if schedule.dose_count() as i64 != vaccine.total_doses {
                    return Err(AppError::Catalog(format!(
                        "{} has {} doses but its schedule lists {}",
                        vaccine.name,
                        vaccine.total_doses,
                        schedule.dose_count()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::fixtures::{date, vaccine};

    #[test]
    fn test_offset_apply_per_unit() {
        let birth = date(2025, 1, 31);

        assert_eq!(Offset::Days(28).apply(birth), Some(date(2025, 2, 28)));
        assert_eq!(Offset::Weeks(6).apply(birth), Some(date(2025, 3, 14)));
        // Month arithmetic clamps to the last day of shorter months
        assert_eq!(Offset::Months(1).apply(birth), Some(date(2025, 2, 28)));
        assert_eq!(Offset::ZERO.apply(birth), Some(birth));
    }

    #[test]
    fn test_until_keeps_shared_unit() {
        assert_eq!(Offset::Weeks(6).until(Offset::Weeks(10)), Offset::Weeks(4));
        assert_eq!(Offset::Months(9).until(Offset::Months(15)), Offset::Months(6));
        assert_eq!(Offset::Weeks(10).until(Offset::Months(9)), Offset::Days(200));
    }

    #[test]
    fn test_offset_for_uses_gap_between_doses() {
        let schedule =
            DoseSchedule::new(vec![Offset::Days(0), Offset::Days(28), Offset::Days(56)]).unwrap();

        assert_eq!(schedule.offset_for(1), Some(Offset::Days(0)));
        assert_eq!(schedule.offset_for(2), Some(Offset::Days(28)));
        assert_eq!(schedule.offset_for(3), Some(Offset::Days(28)));
        assert_eq!(schedule.offset_for(4), None);
        assert_eq!(schedule.offset_for(0), None);
        assert_eq!(schedule.offset_for(-1), None);
    }

    #[test]
    fn test_schedule_rejects_bad_ages() {
        assert!(DoseSchedule::new(vec![]).is_err());
        assert!(DoseSchedule::new(vec![Offset::Months(9), Offset::Weeks(10)]).is_err());
    }

    #[test]
    fn test_national_program_is_well_formed() {
        let table = DoseScheduleTable::national();
        assert_eq!(table.len(), NATIONAL_PROGRAM.len());

        for (name, ages) in NATIONAL_PROGRAM {
            assert!(
                DoseSchedule::new(ages.to_vec()).is_ok(),
                "{} has a malformed schedule",
                name
            );
        }
    }

    #[test]
    fn test_validate_against_dose_counts() {
        let table = DoseScheduleTable::new().with(
            "MR",
            DoseSchedule::new(vec![Offset::Months(9), Offset::Months(15)]).unwrap(),
        );

        assert!(table.validate_against(&[vaccine(1, "MR", 2)]).is_ok());
        assert!(table.validate_against(&[vaccine(1, "MR", 3)]).is_err());
        // Unscheduled vaccines are allowed
        assert!(table.validate_against(&[vaccine(2, "Other", 2)]).is_ok());
        assert!(table.validate_against(&[vaccine(3, "Broken", 0)]).is_err());
    }
}
