use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};

use crate::errors::ParseError;
use crate::temporal::base::TBaseType;
use crate::utils::{format_timestamp, parse_timestamp};

/// A single `(value, timestamp)` sample.
#[derive(Clone, PartialEq)]
pub struct TInstant<B: TBaseType> {
    value: B,
    t: DateTime<Utc>,
}

impl<B: TBaseType> TInstant<B> {
    pub fn new<Tz: TimeZone>(value: B, timestamp: DateTime<Tz>) -> Self {
        Self {
            value,
            t: timestamp.with_timezone(&Utc),
        }
    }

    pub fn value(&self) -> &B {
        &self.value
    }

    pub fn into_value(self) -> B {
        self.value
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.t
    }

    /// Bounding box of the sample; instants are the one subtype that does
    /// not cache theirs.
    pub fn bounding_box(&self) -> B::Bbox {
        B::instant_bbox(&self.value, self.t)
    }
}

impl<B: TBaseType> fmt::Display for TInstant<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.format_value(f)?;
        write!(f, "@{}", format_timestamp(self.t))
    }
}

impl<B: TBaseType> fmt::Debug for TInstant<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<B: TBaseType> FromStr for TInstant<B> {
    type Err = ParseError;

    /// Parses the `value@timestamp` form. Timestamps contain no `@`, so the
    /// split happens at the last one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let at = s
            .rfind('@')
            .ok_or_else(|| ParseError(format!("an instant requires '@': {s}")))?;
        let value = B::parse_value(&s[..at])?;
        let t = parse_timestamp(&s[at + 1..])?;
        Ok(Self::new(value, t))
    }
}

impl<B: TBaseType> Hash for TInstant<B> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash_value(state);
        state.write_i64(self.t.timestamp_micros());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_print() {
        let instant: TInstant<f64> = "1.5@2018-01-01 08:00:00+00".parse().unwrap();
        assert_eq!(*instant.value(), 1.5);
        assert_eq!(instant.to_string(), "1.5@2018-01-01 08:00:00+00");
    }

    #[test]
    fn text_values_may_contain_at_signs() {
        let instant: TInstant<String> = "\"a@b\"@2018-01-01 08:00:00+00".parse().unwrap();
        assert_eq!(instant.value(), "a@b");
    }

    #[test]
    fn bounding_box_of_a_number_is_degenerate() {
        let instant: TInstant<f64> = "2@2018-01-01".parse().unwrap();
        let bbox = instant.bounding_box();
        assert_eq!(bbox.xmin(), Some(2.0));
        assert_eq!(bbox.xmax(), Some(2.0));
    }
}
