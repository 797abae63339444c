//! Timestamp parsing for the formats found across the dumps.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a timestamp in any of the shapes the sources use:
///
/// - RFC 3339 (`2015-01-01T15:00:03Z`, `2012-03-10T22:00:15-08:00`)
/// - timeline-era GH Archive (`2012/03/10 22:00:15 -0800`)
/// - GHTorrent SQL (`2009-12-08 11:17:27`, taken as UTC)
///
/// The MySQL zero date `0000-00-00 00:00:00` and anything unparseable yield
/// `None`.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();
  if s.is_empty() || s.starts_with("0000-00-00") {
    return None;
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  if let Ok(dt) = DateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S %z") {
    return Some(dt.with_timezone(&Utc));
  }
  NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .ok()
    .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn all_source_formats_parse_to_utc() {
    let expected = Utc.with_ymd_and_hms(2012, 3, 11, 6, 0, 15).single().unwrap();
    assert_eq!(parse_timestamp("2012-03-11T06:00:15Z"), Some(expected));
    assert_eq!(parse_timestamp("2012-03-10T22:00:15-08:00"), Some(expected));
    assert_eq!(parse_timestamp("2012/03/10 22:00:15 -0800"), Some(expected));
    assert_eq!(parse_timestamp("2012-03-11 06:00:15"), Some(expected));
  }

  #[test]
  fn zero_and_garbage_dates_are_missing() {
    assert_eq!(parse_timestamp("0000-00-00 00:00:00"), None);
    assert_eq!(parse_timestamp(""), None);
    assert_eq!(parse_timestamp("last tuesday"), None);
  }
}
