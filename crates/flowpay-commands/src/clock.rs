use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now" for handlers that reason about due dates and report periods.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date in UTC. Due-date comparisons happen at this granularity.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{Clock, FixedClock};

    #[test]
    fn fixed_clock_reports_utc_calendar_date() {
        let clock = FixedClock::new(
            Utc.with_ymd_and_hms(2025, 11, 30, 23, 59, 0)
                .single()
                .expect("valid timestamp"),
        );
        assert_eq!(
            clock.today(),
            NaiveDate::from_ymd_opt(2025, 11, 30).expect("valid date")
        );
    }
}
