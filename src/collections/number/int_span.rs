use std::fmt;
use std::hash::{Hash, Hasher};

use crate::collections::base::{Span, SpanType};
use crate::errors::{Error, ParseError};

/// A span over `i32`, canonicalized to half-open `[lo, hi)` form.
///
/// ## Example
/// ```
/// # use tempora::collections::number::IntSpan;
/// # use std::str::FromStr;
/// // A closed [1, 5] canonicalizes to [1, 6).
/// let span = IntSpan::from_str("[1, 5]").unwrap();
/// assert_eq!(span, (1..6).into());
/// assert_eq!(span.to_string(), "[1, 6)");
/// ```
pub type IntSpan = Span<i32>;

impl SpanType for i32 {
    type Width = i32;

    const DISCRETE: bool = true;

    fn next(self) -> Result<Self, Error> {
        self.checked_add(1).ok_or(Error::Overflow)
    }

    fn prev(self) -> Self {
        self.saturating_sub(1)
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(v: f64) -> Self {
        v.round() as i32
    }

    fn width(lower: Self, upper: Self) -> i32 {
        (upper - lower).abs()
    }

    fn add_width(v: Self, w: i32) -> Self {
        v + w
    }

    fn zero_width() -> i32 {
        0
    }

    fn width_to_f64(w: i32) -> f64 {
        w as f64
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        s.trim()
            .parse()
            .map_err(|_| ParseError(format!("cannot parse integer '{}'", s.trim())))
    }

    fn format_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        self.hash(state);
    }
}
