//! Time source for services

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date; scheduling never looks at time of day.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Noon UTC on `date`
    pub fn on(date: NaiveDate) -> Self {
        let midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        Self(midnight + Duration::hours(12))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_today() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let clock = FixedClock::on(date);

        assert_eq!(clock.today(), date);
        assert_eq!(clock.now().date_naive(), date);
    }
}
