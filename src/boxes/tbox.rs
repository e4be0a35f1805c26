use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::boxes::r#box::BoundingBox;
use crate::collections::base::Collection;
use crate::collections::datetime::TsTzSpan;
use crate::collections::number::{FloatSpan, IntSpan};
use crate::errors::{Error, ParseError};
use crate::num::round_float;

/// Bounding box of a temporal number: an optional value span and an optional
/// time span. At least one of the two axes is always present.
///
/// ## Example
/// ```
/// # use tempora::boxes::TBox;
/// # use std::str::FromStr;
/// let tbox = TBox::from_str("TBOX XT([0, 10), [2020-06-01, 2020-06-05])").unwrap();
/// assert!(tbox.has_x() && tbox.has_t());
/// assert_eq!(tbox.xmin(), Some(0.0));
/// ```
#[derive(Clone, PartialEq)]
pub struct TBox {
    span: Option<FloatSpan>,
    period: Option<TsTzSpan>,
}

impl TBox {
    pub fn new(span: Option<FloatSpan>, period: Option<TsTzSpan>) -> Result<Self, Error> {
        if span.is_none() && period.is_none() {
            return Err(Error::InvalidArg(
                "a temporal box requires a value or a time axis",
            ));
        }
        Ok(Self { span, period })
    }

    pub fn from_value(value: f64) -> Self {
        Self {
            span: Some(FloatSpan::singleton(value).expect("finite value")),
            period: None,
        }
    }

    pub fn from_span(span: FloatSpan) -> Self {
        Self {
            span: Some(span),
            period: None,
        }
    }

    pub fn from_time(t: DateTime<Utc>) -> Self {
        Self {
            span: None,
            period: Some(TsTzSpan::singleton(t).expect("valid timestamp")),
        }
    }

    pub fn from_tstzspan(period: TsTzSpan) -> Self {
        Self {
            span: None,
            period: Some(period),
        }
    }

    pub fn from_value_time(value: f64, t: DateTime<Utc>) -> Self {
        Self {
            span: Some(FloatSpan::singleton(value).expect("finite value")),
            period: Some(TsTzSpan::singleton(t).expect("valid timestamp")),
        }
    }

    // ------------------------- Accessors -------------------------------------

    pub fn has_x(&self) -> bool {
        self.span.is_some()
    }

    pub fn has_t(&self) -> bool {
        self.period.is_some()
    }

    pub fn span(&self) -> Option<FloatSpan> {
        self.span
    }

    pub fn tstzspan(&self) -> Option<TsTzSpan> {
        self.period
    }

    pub fn xmin(&self) -> Option<f64> {
        self.span.map(|s| s.lower())
    }

    pub fn xmax(&self) -> Option<f64> {
        self.span.map(|s| s.upper())
    }

    pub fn tmin(&self) -> Option<DateTime<Utc>> {
        self.period.map(|p| p.lower())
    }

    pub fn tmax(&self) -> Option<DateTime<Utc>> {
        self.period.map(|p| p.upper())
    }

    pub fn is_tmin_inclusive(&self) -> Option<bool> {
        self.period.map(|p| p.is_lower_inclusive())
    }

    pub fn is_tmax_inclusive(&self) -> Option<bool> {
        self.period.map(|p| p.is_upper_inclusive())
    }

    // ------------------------- Topological operations ------------------------

    /// Whether every axis of `other` is covered by the same axis of `self`.
    /// Axes missing from `self` must be missing from `other` too.
    pub fn contains_tbox(&self, other: &Self) -> bool {
        let x_ok = match (self.span, other.span) {
            (Some(a), Some(b)) => a.contains_span(&b),
            (None, Some(_)) => false,
            _ => true,
        };
        let t_ok = match (self.period, other.period) {
            (Some(a), Some(b)) => a.contains_span(&b),
            (None, Some(_)) => false,
            _ => true,
        };
        x_ok && t_ok
    }

    pub fn is_contained_in_tbox(&self, other: &Self) -> bool {
        other.contains_tbox(self)
    }

    /// Whether the boxes intersect on every axis common to both; boxes with
    /// no common axis do not overlap.
    pub fn overlaps_tbox(&self, other: &Self) -> bool {
        let mut common = false;
        if let (Some(a), Some(b)) = (self.span, other.span) {
            if !a.overlaps_span(&b) {
                return false;
            }
            common = true;
        }
        if let (Some(a), Some(b)) = (self.period, other.period) {
            if !a.overlaps_span(&b) {
                return false;
            }
            common = true;
        }
        common
    }

    /// Equal on the axes common to both boxes (at least one axis required).
    pub fn same_tbox(&self, other: &Self) -> bool {
        let mut common = false;
        if let (Some(a), Some(b)) = (self.span, other.span) {
            if a != b {
                return false;
            }
            common = true;
        }
        if let (Some(a), Some(b)) = (self.period, other.period) {
            if a != b {
                return false;
            }
            common = true;
        }
        common
    }

    /// The boxes touch: every common axis overlaps or is adjacent, and at
    /// least one common axis is adjacent without overlapping.
    pub fn is_adjacent_tbox(&self, other: &Self) -> bool {
        let mut touching = false;
        if let (Some(a), Some(b)) = (self.span, other.span) {
            if !a.overlaps_span(&b) && !a.is_adjacent_span(&b) {
                return false;
            }
            touching |= a.is_adjacent_span(&b);
        }
        if let (Some(a), Some(b)) = (self.period, other.period) {
            if !a.overlaps_span(&b) && !a.is_adjacent_span(&b) {
                return false;
            }
            touching |= a.is_adjacent_span(&b);
        }
        touching
    }

    // ------------------------- Position operations ---------------------------

    fn value_axes(&self, other: &Self) -> Result<(FloatSpan, FloatSpan), Error> {
        match (self.span, other.span) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(Error::InvalidArg("both boxes must have a value axis")),
        }
    }

    fn time_axes(&self, other: &Self) -> Result<(TsTzSpan, TsTzSpan), Error> {
        match (self.period, other.period) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(Error::InvalidArg("both boxes must have a time axis")),
        }
    }

    /// Strictly left of `other` on the value axis.
    pub fn is_left(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.value_axes(other)?;
        Ok(a.is_left(&b))
    }

    /// Does not extend to the right of `other` on the value axis.
    pub fn is_over_or_left(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.value_axes(other)?;
        Ok(a.is_over_or_left(&b))
    }

    pub fn is_right(&self, other: &Self) -> Result<bool, Error> {
        other.is_left(self)
    }

    pub fn is_over_or_right(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.value_axes(other)?;
        Ok(a.is_over_or_right(&b))
    }

    /// Strictly before `other` on the time axis.
    pub fn is_before(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.time_axes(other)?;
        Ok(a.is_left(&b))
    }

    pub fn is_over_or_before(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.time_axes(other)?;
        Ok(a.is_over_or_left(&b))
    }

    pub fn is_after(&self, other: &Self) -> Result<bool, Error> {
        other.is_before(self)
    }

    pub fn is_over_or_after(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.time_axes(other)?;
        Ok(a.is_over_or_right(&b))
    }

    // ------------------------- Set operations --------------------------------

    /// Union over the axes common to both boxes. In strict mode the boxes
    /// must intersect; otherwise any pair sharing at least one axis unions.
    pub fn union(&self, other: &Self, strict: bool) -> Result<Self, Error> {
        if strict && !self.overlaps_tbox(other) {
            return Err(Error::NotContiguous);
        }
        let span = match (self.span, other.span) {
            (Some(a), Some(b)) => Some(a.hull(&b)),
            _ => None,
        };
        let period = match (self.period, other.period) {
            (Some(a), Some(b)) => Some(a.hull(&b)),
            _ => None,
        };
        Self::new(span, period)
    }

    /// Per-axis intersection; `None` when any common axis is disjoint or no
    /// axis is common.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps_tbox(other) {
            return None;
        }
        let span = match (self.span, other.span) {
            (Some(a), Some(b)) => Some(a.intersection(&b)?),
            _ => None,
        };
        let period = match (self.period, other.period) {
            (Some(a), Some(b)) => Some(a.intersection(&b)?),
            _ => None,
        };
        Self::new(span, period).ok()
    }

    // ------------------------- Transformations -------------------------------

    /// Inflates the value axis by `d` on both sides.
    pub fn expand_value(&self, d: f64) -> Result<Self, Error> {
        let span = self
            .span
            .ok_or(Error::InvalidArg("the box has no value axis to expand"))?;
        let expanded = FloatSpan::new(
            span.lower() - d,
            span.upper() + d,
            span.is_lower_inclusive(),
            span.is_upper_inclusive(),
        )?;
        Ok(Self {
            span: Some(expanded),
            period: self.period,
        })
    }

    /// Inflates the time axis by `delta` on both sides.
    pub fn expand_time(&self, delta: TimeDelta) -> Result<Self, Error> {
        let period = self
            .period
            .ok_or(Error::InvalidArg("the box has no time axis to expand"))?;
        let expanded = TsTzSpan::new(
            period.lower() - delta,
            period.upper() + delta,
            period.is_lower_inclusive(),
            period.is_upper_inclusive(),
        )?;
        Ok(Self {
            span: self.span,
            period: Some(expanded),
        })
    }

    pub fn shift_scale_time(&self, delta: Option<TimeDelta>, width: Option<TimeDelta>) -> Self {
        Self {
            span: self.span,
            period: self.period.map(|p| p.shift_scale(delta, width)),
        }
    }

    pub fn shift_scale_value(&self, delta: Option<f64>, width: Option<f64>) -> Self {
        Self {
            span: self.span.map(|s| s.shift_scale(delta, width)),
            period: self.period,
        }
    }

    /// Rounds the value axis to `max_decimals` decimal places.
    pub fn round(&self, max_decimals: i32) -> Self {
        Self {
            span: self.span.map(|s| {
                FloatSpan::new(
                    round_float(s.lower(), max_decimals),
                    round_float(s.upper(), max_decimals),
                    s.is_lower_inclusive(),
                    s.is_upper_inclusive(),
                )
                .expect("rounding preserves bound order")
            }),
            period: self.period,
        }
    }

    // ------------------------- Distance operations ----------------------------

    /// Nearest approach distance between the value axes: 0 when the boxes
    /// intersect, infinity when their time axes are disjoint.
    pub fn nearest_approach_distance(&self, other: &Self) -> Result<f64, Error> {
        let (a, b) = self.value_axes(other)?;
        if let (Some(pa), Some(pb)) = (self.period, other.period) {
            if !pa.overlaps_span(&pb) {
                return Ok(f64::INFINITY);
            }
        }
        Ok(a.distance_to_span(&b))
    }
}

impl BoundingBox for TBox {
    fn period(&self) -> Option<TsTzSpan> {
        self.period
    }

    fn with_period(self, period: TsTzSpan) -> Self {
        Self {
            span: self.span,
            period: Some(period),
        }
    }

    fn extend(&mut self, other: &Self) {
        debug_assert_eq!(self.has_x(), other.has_x());
        debug_assert_eq!(self.has_t(), other.has_t());
        self.span = match (self.span, other.span) {
            (Some(a), Some(b)) => Some(a.hull(&b)),
            (a, b) => a.or(b),
        };
        self.period = match (self.period, other.period) {
            (Some(a), Some(b)) => Some(a.hull(&b)),
            (a, b) => a.or(b),
        };
    }

    fn overlaps_box(&self, other: &Self) -> bool {
        self.overlaps_tbox(other)
    }
}

impl fmt::Display for TBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.span, self.period) {
            (Some(s), Some(p)) => write!(f, "TBOX XT({s}, {p})"),
            (Some(s), None) => write!(f, "TBOX X({s})"),
            (None, Some(p)) => write!(f, "TBOX T({p})"),
            (None, None) => unreachable!("construction requires at least one axis"),
        }
    }
}

impl fmt::Debug for TBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for TBox {
    type Err = ParseError;

    /// Parses a `TBox` from its textual representation.
    ///
    /// ## Example
    /// ```
    /// # use tempora::boxes::TBox;
    /// let tbox: TBox = "TBOX XT([0, 10), [2020-06-01, 2020-06-05])".parse().unwrap();
    /// assert_eq!(tbox.to_string(), "TBOX XT([0, 10), [2020-06-01 00:00:00+00, 2020-06-05 00:00:00+00])");
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();
        let rest = ["TBOXINT", "TBOXFLOAT", "TBOX"]
            .iter()
            .find_map(|prefix| upper.strip_prefix(prefix).map(|r| (prefix.len(), r)))
            .ok_or_else(|| ParseError(format!("temporal box must start with TBOX: {s}")))
            .map(|(len, _)| trimmed[len..].trim_start())?;
        let (axes, rest) = rest
            .split_once('(')
            .ok_or_else(|| ParseError(format!("missing '(' in temporal box: {s}")))?;
        let inner = rest
            .trim_end()
            .strip_suffix(')')
            .ok_or_else(|| ParseError(format!("missing ')' in temporal box: {s}")))?;
        let axes = axes.trim().to_ascii_uppercase();
        let mut parts = Vec::new();
        let mut depth = 0usize;
        let mut start = 0usize;
        for (i, c) in inner.char_indices() {
            match c {
                '[' | '(' => depth += 1,
                ']' | ')' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(&inner[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        parts.push(&inner[start..]);
        match (axes.as_str(), parts.as_slice()) {
            ("X", [span]) => Ok(TBox::from_span(span.trim().parse()?)),
            ("T", [period]) => Ok(TBox::from_tstzspan(period.trim().parse()?)),
            ("XT", [span, period]) => {
                TBox::new(Some(span.trim().parse()?), Some(period.trim().parse()?))
                    .map_err(ParseError::from)
            }
            _ => Err(ParseError(format!("malformed temporal box: {s}"))),
        }
    }
}

impl Hash for TBox {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.span.hash(state);
        self.period.hash(state);
    }
}

impl From<FloatSpan> for TBox {
    fn from(span: FloatSpan) -> Self {
        Self::from_span(span)
    }
}

impl From<IntSpan> for TBox {
    fn from(span: IntSpan) -> Self {
        // The canonical [lo, hi) integer span covers the closed float
        // interval [lo, hi - 1].
        Self::from_span(
            FloatSpan::new(span.lower() as f64, (span.upper() - 1) as f64, true, true)
                .expect("canonical integer spans are non-empty"),
        )
    }
}

impl From<TsTzSpan> for TBox {
    fn from(period: TsTzSpan) -> Self {
        Self::from_tstzspan(period)
    }
}

impl From<&TBox> for Option<FloatSpan> {
    fn from(tbox: &TBox) -> Self {
        tbox.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn tbox(s: &str) -> TBox {
        TBox::from_str(s).unwrap()
    }

    #[test]
    fn requires_at_least_one_axis() {
        assert!(TBox::new(None, None).is_err());
    }

    #[test]
    fn topological_predicates() {
        let outer = tbox("TBOX XT([0, 10], [2020-01-01, 2020-01-10])");
        let inner = tbox("TBOX XT([2, 5], [2020-01-02, 2020-01-05])");
        let shifted = tbox("TBOX XT([8, 12], [2020-01-08, 2020-01-12])");
        assert!(outer.contains_tbox(&inner));
        assert!(inner.is_contained_in_tbox(&outer));
        assert!(outer.overlaps_tbox(&shifted));
        assert!(!inner.overlaps_tbox(&shifted));
        assert!(outer.same_tbox(&outer));
    }

    #[test]
    fn axes_missing_from_one_side() {
        let x_only = tbox("TBOX X([0, 10])");
        let t_only = tbox("TBOX T([2020-01-01, 2020-01-10])");
        // No common axis: no overlap.
        assert!(!x_only.overlaps_tbox(&t_only));
        // Value-only box cannot contain a box with a time axis.
        let both = tbox("TBOX XT([2, 5], [2020-01-02, 2020-01-05])");
        assert!(!x_only.contains_tbox(&both));
        assert!(x_only.is_left(&t_only).is_err());
    }

    #[test]
    fn adjacency_is_touching_without_overlap() {
        let a = tbox("TBOX XT([0, 5), [2020-01-01, 2020-01-10])");
        let b = tbox("TBOX XT([5, 9], [2020-01-01, 2020-01-10])");
        assert!(a.is_adjacent_tbox(&b));
        let c = tbox("TBOX XT([4, 9], [2020-01-01, 2020-01-10])");
        assert!(!a.is_adjacent_tbox(&c));
    }

    #[test]
    fn union_and_intersection() {
        let a = tbox("TBOX XT([0, 4], [2020-01-01, 2020-01-04])");
        let b = tbox("TBOX XT([2, 8], [2020-01-02, 2020-01-08])");
        let union = a.union(&b, true).unwrap();
        assert_eq!(union, tbox("TBOX XT([0, 8], [2020-01-01, 2020-01-08])"));
        let inter = a.intersection(&b).unwrap();
        assert_eq!(inter, tbox("TBOX XT([2, 4], [2020-01-02, 2020-01-04])"));
        let disjoint = tbox("TBOX XT([9, 10], [2020-02-01, 2020-02-02])");
        assert!(a.union(&disjoint, true).is_err());
        assert!(a.union(&disjoint, false).is_ok());
        assert!(a.intersection(&disjoint).is_none());
    }

    #[test]
    fn nad_is_infinite_on_disjoint_time() {
        let a = tbox("TBOX XT([0, 4], [2020-01-01, 2020-01-04])");
        let b = tbox("TBOX XT([8, 9], [2020-02-01, 2020-02-02])");
        assert_eq!(a.nearest_approach_distance(&b).unwrap(), f64::INFINITY);
        let c = tbox("TBOX XT([8, 9], [2020-01-02, 2020-01-08])");
        assert_eq!(a.nearest_approach_distance(&c).unwrap(), 4.0);
        let d = tbox("TBOX XT([2, 3], [2020-01-02, 2020-01-08])");
        assert_eq!(a.nearest_approach_distance(&d).unwrap(), 0.0);
    }

    #[test]
    fn expansion() {
        let a = tbox("TBOX XT([2, 4], [2020-01-02, 2020-01-04])");
        let widened = a.expand_value(2.0).unwrap();
        assert_eq!(widened.xmin(), Some(0.0));
        assert_eq!(widened.xmax(), Some(6.0));
        let longer = a.expand_time(TimeDelta::days(1)).unwrap();
        assert_eq!(
            longer.tstzspan().unwrap(),
            "[2020-01-01, 2020-01-05]".parse().unwrap()
        );
    }

    #[test]
    fn rounding_is_idempotent_on_the_box() {
        let a = TBox::from_span(FloatSpan::new(1.23456, 7.89123, true, true).unwrap());
        let rounded = a.round(2);
        assert_eq!(rounded.xmin(), Some(1.23));
        assert_eq!(rounded.round(2), rounded);
    }
}
