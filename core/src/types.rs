//! Shared primitive types used across the desk.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Identifier of an investigation case, e.g. `SAR-2023-001`.
pub type CaseId = String;

/// Identifier of a customer, e.g. `CUST-8821`.
pub type CustomerId = String;

/// Identifier of an audit ledger entry, e.g. `LOG-3F9A01BC`.
pub type LogId = String;

/// Identity of whoever performs an action. Supplied by the calling context.
pub type Actor = String;

/// Render a timestamp in the fixed-width form stored in SQLite.
/// Microsecond precision with a `Z` suffix, so text order equals time order.
pub fn to_db_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp. Accepts RFC 3339 and the bare
/// `YYYY-MM-DD HH:MM:SS` form used by hand-written fixtures.
pub fn parse_db_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_timestamps_sort_lexically() {
        let a = Utc.with_ymd_and_hms(2023, 10, 9, 23, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2023, 10, 10, 0, 0, 0).unwrap();
        assert!(to_db_timestamp(&a) < to_db_timestamp(&b));
        assert_eq!(to_db_timestamp(&b), "2023-10-10T00:00:00.000000Z");
    }

    #[test]
    fn parses_both_accepted_forms() {
        let expected = Utc.with_ymd_and_hms(2023, 10, 12, 9, 15, 0).unwrap();
        assert_eq!(parse_db_timestamp("2023-10-12T09:15:00Z"), Some(expected));
        assert_eq!(parse_db_timestamp("2023-10-12 09:15:00"), Some(expected));
        assert_eq!(parse_db_timestamp("12/10/2023"), None);
    }
}
