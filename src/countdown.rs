//! Countdown calculation.
//!
//! A [`Countdown`] is the absolute distance between an event's date and an
//! evaluation instant, split into days, hours, minutes and seconds. Days are
//! plain 24 hour multiples; there is no month or year component.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Point-in-time breakdown of the time left until (or since) a date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    /// The date is strictly before the evaluation instant
    pub is_overdue: bool,
}

impl Countdown {
    /// Countdown to `date` as of the current wall-clock time.
    pub fn until(date: DateTime<Utc>) -> Self {
        calculate_countdown(date, Utc::now())
    }

    /// Magnitude of the countdown in whole seconds.
    pub fn total_seconds(&self) -> u64 {
        self.days * 86_400 + self.hours * 3_600 + self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {:02}h {:02}m {:02}s",
            self.days, self.hours, self.minutes, self.seconds
        )?;
        if self.is_overdue {
            write!(f, " ago")?;
        }
        Ok(())
    }
}

/// Computes the countdown from `now` to `date`.
///
/// Works on whole milliseconds and floors every unit, so an event less than a
/// second overdue reports zero units with `is_overdue` set. The exact instant
/// is "due now", not overdue.
pub fn calculate_countdown(date: DateTime<Utc>, now: DateTime<Utc>) -> Countdown {
    let diff = date.signed_duration_since(now).num_milliseconds();
    let is_overdue = diff < 0;
    let abs = diff.unsigned_abs();

    Countdown {
        days: abs / MS_PER_DAY,
        hours: (abs % MS_PER_DAY) / MS_PER_HOUR,
        minutes: (abs % MS_PER_HOUR) / MS_PER_MINUTE,
        seconds: (abs % MS_PER_MINUTE) / MS_PER_SECOND,
        is_overdue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn ten_seconds_ahead() {
        let c = calculate_countdown(t() + Duration::seconds(10), t());
        assert_eq!(
            c,
            Countdown {
                days: 0,
                hours: 0,
                minutes: 0,
                seconds: 10,
                is_overdue: false
            }
        );
    }

    #[test]
    fn one_second_overdue_reports_magnitude() {
        let c = calculate_countdown(t() - Duration::seconds(1), t());
        assert!(c.is_overdue);
        assert_eq!(c.seconds, 1);
        assert_eq!(c.days + c.hours + c.minutes, 0);
    }

    #[test]
    fn exact_instant_is_not_overdue() {
        let c = calculate_countdown(t(), t());
        assert_eq!(c, Countdown::default());
    }

    #[test]
    fn decomposes_each_unit() {
        let c = calculate_countdown(t() + Duration::seconds(90_061), t());
        assert_eq!((c.days, c.hours, c.minutes, c.seconds), (1, 1, 1, 1));
        assert_eq!(c.total_seconds(), 90_061);
    }

    #[test]
    fn floors_partial_seconds() {
        let c = calculate_countdown(t() + Duration::milliseconds(1_999), t());
        assert_eq!(c.seconds, 1);

        let c = calculate_countdown(t() - Duration::milliseconds(400), t());
        assert!(c.is_overdue);
        assert_eq!(c.total_seconds(), 0);
    }

    #[test]
    fn days_are_not_capped_at_calendar_units() {
        let c = calculate_countdown(t() + Duration::days(400), t());
        assert_eq!(c.days, 400);
        assert_eq!(c.hours, 0);
    }

    #[test]
    fn display_format() {
        let offset = Duration::seconds(3 * 86_400 + 4 * 3_600 + 5 * 60 + 6);
        let ahead = calculate_countdown(t() + offset, t());
        assert_eq!(ahead.to_string(), "3d 04h 05m 06s");

        let behind = calculate_countdown(t() - Duration::seconds(61), t());
        assert_eq!(behind.to_string(), "0d 00h 01m 01s ago");
    }
}
