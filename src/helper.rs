use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::trace;

use crate::{CountdownError, Event, Result};

/// Format used to show dates to users
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

const NAIVE_DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%d/%m/%Y %H:%M"];
const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parses a user supplied date.
///
/// RFC 3339 strings keep their offset; the other accepted forms are read as
/// local time, and bare dates mean local midnight.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || CountdownError::InvalidDate {
        input: input.to_string(),
    };

    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Ok(date.with_timezone(&Utc));
    }

    let naive = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            NAIVE_DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(invalid)?;

    trace!("Parsed {} as local time {}", input, naive);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|date| date.with_timezone(&Utc))
        .ok_or_else(invalid)
}

/// Formats a date in local time for display.
pub fn format_date(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local)
        .format(DISPLAY_DATE_FORMAT)
        .to_string()
}

/// Case-insensitive substring match over name, description and category.
/// An empty query matches everything.
pub fn matches_query(event: &Event, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }

    let contains = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&query));

    contains(Some(event.name.as_str()))
        || contains(event.description.as_deref())
        || contains(event.category.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventDraft;

    #[test]
    fn parses_rfc3339_with_offset() {
        let date = parse_date("2024-12-31T23:00:00-02:00").unwrap();
        assert_eq!(date.to_rfc3339(), "2025-01-01T01:00:00+00:00");
    }

    #[test]
    fn parses_local_forms() {
        let expected = Local
            .with_ymd_and_hms(2025, 7, 14, 18, 30, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_date("2025-07-14 18:30").unwrap(), expected);
        assert_eq!(parse_date("14/07/2025 18:30").unwrap(), expected);

        let midnight = Local
            .with_ymd_and_hms(2025, 7, 14, 0, 0, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_date("2025-07-14").unwrap(), midnight);
        assert_eq!(parse_date(" 14/07/2025 ").unwrap(), midnight);
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_date("next tuesday").unwrap_err();
        assert!(matches!(err, CountdownError::InvalidDate { .. }));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let date = parse_date("2025-07-14 18:30").unwrap();
        assert_eq!(parse_date(&format_date(date)).unwrap(), date);
    }

    #[test]
    fn query_matches_any_text_field() {
        let mut draft = EventDraft::new("Birthday", Utc::now());
        draft.category = Some("Family".to_string());
        let event = Event::new(draft, Utc::now()).unwrap();

        assert!(matches_query(&event, "birth"));
        assert!(matches_query(&event, "FAMILY"));
        assert!(matches_query(&event, ""));
        assert!(!matches_query(&event, "work"));
    }
}
