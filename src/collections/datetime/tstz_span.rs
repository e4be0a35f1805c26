use std::fmt;
use std::hash::Hasher;

use chrono::{DateTime, TimeDelta, Utc};

use crate::collections::base::{Span, SpanType};
use crate::errors::ParseError;
use crate::utils::{format_timestamp, parse_timestamp, to_micros};

/// A span over timezone-aware timestamps, preserving bound inclusivity.
///
/// ## Example
/// ```
/// # use tempora::collections::datetime::TsTzSpan;
/// # use chrono::NaiveDate;
/// let from_ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d)
///     .unwrap().and_hms_opt(0, 0, 0)
///     .unwrap().and_utc();
///
/// let span: TsTzSpan = (from_ymd(2023, 1, 1)..from_ymd(2023, 1, 15)).into();
/// assert_eq!(span.lower(), from_ymd(2023, 1, 1));
/// assert_eq!(span.duration(), chrono::TimeDelta::days(14));
/// ```
pub type TsTzSpan = Span<DateTime<Utc>>;

impl SpanType for DateTime<Utc> {
    type Width = TimeDelta;

    const DISCRETE: bool = false;

    fn to_f64(self) -> f64 {
        to_micros(&self) as f64
    }

    fn from_f64(v: f64) -> Self {
        crate::utils::from_micros(v as i64)
    }

    fn width(lower: Self, upper: Self) -> TimeDelta {
        (upper - lower).abs()
    }

    fn add_width(v: Self, w: TimeDelta) -> Self {
        v + w
    }

    fn zero_width() -> TimeDelta {
        TimeDelta::zero()
    }

    fn width_to_f64(w: TimeDelta) -> f64 {
        w.num_microseconds().unwrap_or(i64::MAX) as f64
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        parse_timestamp(s)
    }

    fn format_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_timestamp(*self))
    }

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        state.write_i64(to_micros(self));
    }
}

impl TsTzSpan {
    /// Elapsed time between the bounds.
    pub fn duration(&self) -> TimeDelta {
        self.width()
    }
}
