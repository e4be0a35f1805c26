//! Timestamp plumbing: every internal computation runs on `i64` microseconds
//! since the Unix epoch; `chrono` types appear only at the public boundary.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::errors::ParseError;

/// Converts a timezone-aware timestamp to internal microseconds.
pub(crate) fn to_micros<Tz: chrono::TimeZone>(t: &DateTime<Tz>) -> i64 {
    t.timestamp_micros()
}

/// Converts internal microseconds back to a UTC timestamp.
pub(crate) fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros)
        .expect("timestamp out of the representable chrono range")
}

/// Position of `t` within `[lower, upper]` as a ratio in `[0, 1]`.
///
/// The span is assumed non-empty; the ratio is computed in `f64` over the
/// microsecond durations.
pub(crate) fn time_ratio(t: DateTime<Utc>, lower: DateTime<Utc>, upper: DateTime<Utc>) -> f64 {
    let duration = (to_micros(&upper) - to_micros(&lower)) as f64;
    if duration == 0.0 {
        return 0.0;
    }
    (to_micros(&t) - to_micros(&lower)) as f64 / duration
}

/// Maps a ratio in `[0, 1]` back onto the timestamp interval `[lower, upper]`.
pub(crate) fn time_at_ratio(
    ratio: f64,
    lower: DateTime<Utc>,
    upper: DateTime<Utc>,
) -> DateTime<Utc> {
    let duration = (to_micros(&upper) - to_micros(&lower)) as f64;
    from_micros(to_micros(&lower) + (ratio * duration) as i64)
}

/// Parses the timestamp syntaxes accepted across the textual input formats:
/// RFC 3339, `YYYY-MM-DD HH:MM:SS[(+|-)TZ]`, and a bare `YYYY-MM-DD`
/// (midnight UTC).
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ParseError> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(t.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let t = d
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ParseError(format!("invalid date '{s}'")))?;
        return Ok(t.and_utc());
    }
    Err(ParseError(format!("cannot parse timestamp '{s}'")))
}

/// Formats a timestamp the way the textual output prints it:
/// `YYYY-MM-DD HH:MM:SS+00`, with fractional seconds only when present.
pub(crate) fn format_timestamp(t: DateTime<Utc>) -> String {
    if t.timestamp_subsec_micros() == 0 {
        t.format("%Y-%m-%d %H:%M:%S%:::z").to_string()
    } else {
        t.format("%Y-%m-%d %H:%M:%S%.6f%:::z").to_string()
    }
}

/// Scales a duration by `ratio`, rounding to the nearest microsecond.
pub(crate) fn scale_delta(delta: TimeDelta, ratio: f64) -> TimeDelta {
    let micros = delta.num_microseconds().unwrap_or(i64::MAX) as f64;
    TimeDelta::microseconds((micros * ratio).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn parses_all_accepted_syntaxes() {
        assert_eq!(ts("2019-09-08"), ts("2019-09-08 00:00:00+00"));
        assert_eq!(ts("2019-09-08T12:30:00Z"), ts("2019-09-08 12:30:00"));
        assert_eq!(ts("2019-09-08 14:30:00+02"), ts("2019-09-08 12:30:00+00"));
        assert!(parse_timestamp("next tuesday").is_err());
    }

    #[test]
    fn round_trips_through_text() {
        let t = ts("2020-02-29 23:59:59+00");
        assert_eq!(ts(&format_timestamp(t)), t);
    }

    #[test]
    fn ratio_and_back() {
        let lower = ts("2020-01-01");
        let upper = ts("2020-01-03");
        let mid = ts("2020-01-02");
        assert_eq!(time_ratio(mid, lower, upper), 0.5);
        assert_eq!(time_at_ratio(0.5, lower, upper), mid);
        assert_eq!(time_at_ratio(0.0, lower, upper), lower);
        assert_eq!(time_at_ratio(1.0, lower, upper), upper);
    }
}
