use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, Range, RangeInclusive};
use std::str::FromStr;

use crate::collections::base::collection::Collection;
use crate::collections::base::span_set::SpanSet;
use crate::errors::{Error, ParseError};

/// Base types a [`Span`] can range over: `i32`, `f64` and `DateTime<Utc>`.
///
/// The trait captures what the span algebra needs from the element domain:
/// a total order over valid values, width arithmetic, the discrete successor
/// for canonicalization, and the textual form of a single value.
pub trait SpanType: Copy + PartialEq + PartialOrd + fmt::Debug {
    /// Type of widths, durations and distances over this domain.
    type Width: Copy + PartialEq + PartialOrd + fmt::Debug;

    /// Discrete domains canonicalize spans to the half-open `[lo, hi)` form.
    const DISCRETE: bool;

    /// Rejects values the total order cannot accommodate (NaN, infinities).
    fn validate(self) -> Result<(), Error> {
        Ok(())
    }

    /// Successor of a discrete value; `Overflow` when it would wrap.
    /// Continuous domains never call this.
    fn next(self) -> Result<Self, Error> {
        Ok(self)
    }

    /// Predecessor of a discrete value; continuous domains return the value
    /// unchanged. Only called on canonical exclusive upper bounds, which are
    /// strictly greater than some valid lower bound.
    fn prev(self) -> Self {
        self
    }

    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;

    fn width(lower: Self, upper: Self) -> Self::Width;
    fn add_width(v: Self, w: Self::Width) -> Self;
    fn zero_width() -> Self::Width;
    fn width_to_f64(w: Self::Width) -> f64;

    fn parse_value(s: &str) -> Result<Self, ParseError>;
    fn format_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn hash_value<H: Hasher>(&self, state: &mut H);
}

/// A contiguous interval over a totally ordered domain, with independently
/// inclusive or exclusive bounds.
///
/// Invariants enforced by construction:
/// * `lower <= upper`; equal bounds require both to be inclusive,
/// * discrete domains are canonicalized to half-open `[lo, hi)` form
///   (a closed `[a, b]` becomes `[a, b + 1)`),
/// * bound values are valid under the domain's total order (no NaN).
///
/// ## Example
/// ```
/// # use tempora::collections::number::FloatSpan;
/// # use std::str::FromStr;
/// let span = FloatSpan::from_str("[23.9, 78.8)").unwrap();
/// assert_eq!(span.lower(), 23.9);
/// assert!(span.is_lower_inclusive());
/// assert!(!span.is_upper_inclusive());
/// ```
#[derive(Clone, Copy)]
pub struct Span<T: SpanType> {
    lower: T,
    upper: T,
    lower_inc: bool,
    upper_inc: bool,
}

pub(crate) fn cmp_values<T: SpanType>(a: T, b: T) -> Ordering {
    a.partial_cmp(&b)
        .expect("span values are validated to be totally ordered")
}

/// Whether a point admitted by the lower bound `(lv, li)` can also be
/// admitted by the upper bound `(uv, ui)`, i.e. the two bounds delimit a
/// non-empty set.
fn lower_le_upper<T: SpanType>(lv: T, li: bool, uv: T, ui: bool) -> bool {
    match cmp_values(lv, uv) {
        Ordering::Less => true,
        Ordering::Equal => li && ui,
        Ordering::Greater => false,
    }
}

/// Orders two lower bounds; an inclusive bound starts earlier than an
/// exclusive one at the same value.
pub(crate) fn cmp_lower<T: SpanType>(av: T, ai: bool, bv: T, bi: bool) -> Ordering {
    cmp_values(av, bv).then_with(|| bi.cmp(&ai))
}

/// Orders two upper bounds; an exclusive bound ends earlier than an
/// inclusive one at the same value.
pub(crate) fn cmp_upper<T: SpanType>(av: T, ai: bool, bv: T, bi: bool) -> Ordering {
    cmp_values(av, bv).then_with(|| ai.cmp(&bi))
}

impl<T: SpanType> Span<T> {
    /// Builds a span from its bounds, canonicalizing discrete domains.
    pub fn new(lower: T, upper: T, lower_inc: bool, upper_inc: bool) -> Result<Self, Error> {
        lower.validate()?;
        upper.validate()?;
        match cmp_values(lower, upper) {
            Ordering::Greater => {
                return Err(Error::InvalidArg("span lower bound is greater than upper"))
            }
            Ordering::Equal if !(lower_inc && upper_inc) => {
                return Err(Error::InvalidArg(
                    "a span over a single value must be inclusive on both sides",
                ))
            }
            _ => {}
        }
        if T::DISCRETE {
            let lower = if lower_inc { lower } else { lower.next()? };
            let upper = if upper_inc { upper.next()? } else { upper };
            if cmp_values(lower, upper) != Ordering::Less {
                return Err(Error::InvalidArg("canonicalized span is empty"));
            }
            Ok(Self {
                lower,
                upper,
                lower_inc: true,
                upper_inc: false,
            })
        } else {
            Ok(Self {
                lower,
                upper,
                lower_inc,
                upper_inc,
            })
        }
    }

    /// The span containing exactly one value.
    pub fn singleton(value: T) -> Result<Self, Error> {
        Self::new(value, value, true, true)
    }

    pub fn lower(&self) -> T {
        self.lower
    }

    pub fn upper(&self) -> T {
        self.upper
    }

    pub fn is_lower_inclusive(&self) -> bool {
        self.lower_inc
    }

    pub fn is_upper_inclusive(&self) -> bool {
        self.upper_inc
    }

    /// Width of the span (`upper - lower` over the domain's width type).
    pub fn width(&self) -> T::Width {
        T::width(self.lower, self.upper)
    }

    /// Greatest value the span admits: for discrete domains the predecessor
    /// of the canonical exclusive upper bound, otherwise the bound itself.
    pub(crate) fn last_value(&self) -> T {
        if T::DISCRETE {
            self.upper.prev()
        } else {
            self.upper
        }
    }

    pub fn contains_value(&self, value: T) -> bool {
        lower_le_upper(self.lower, self.lower_inc, value, true)
            && lower_le_upper(value, true, self.upper, self.upper_inc)
    }

    pub fn contains_span(&self, other: &Self) -> bool {
        cmp_lower(self.lower, self.lower_inc, other.lower, other.lower_inc) != Ordering::Greater
            && cmp_upper(self.upper, self.upper_inc, other.upper, other.upper_inc)
                != Ordering::Less
    }

    pub fn overlaps_span(&self, other: &Self) -> bool {
        lower_le_upper(self.lower, self.lower_inc, other.upper, other.upper_inc)
            && lower_le_upper(other.lower, other.lower_inc, self.upper, self.upper_inc)
    }

    /// Two spans are adjacent iff their union is contiguous but their
    /// intersection is empty: the bounds meet at one value with exactly one
    /// of the two being inclusive. The canonical `[lo, hi)` form makes the
    /// same rule cover discrete domains.
    pub fn is_adjacent_span(&self, other: &Self) -> bool {
        (self.upper == other.lower && self.upper_inc != other.lower_inc)
            || (other.upper == self.lower && other.upper_inc != self.lower_inc)
    }

    /// Strictly before: `self` ends before `other` starts.
    pub fn is_left_span(&self, other: &Self) -> bool {
        !lower_le_upper(other.lower, other.lower_inc, self.upper, self.upper_inc)
    }

    /// Does not extend to the right of `other`.
    pub fn is_over_or_left_span(&self, other: &Self) -> bool {
        cmp_upper(self.upper, self.upper_inc, other.upper, other.upper_inc) != Ordering::Greater
    }

    pub fn is_right_span(&self, other: &Self) -> bool {
        other.is_left_span(self)
    }

    /// Does not extend to the left of `other`.
    pub fn is_over_or_right_span(&self, other: &Self) -> bool {
        cmp_lower(self.lower, self.lower_inc, other.lower, other.lower_inc) != Ordering::Less
    }

    /// Distance between the closest values of the two spans; zero when they
    /// overlap or touch.
    pub fn distance_to_span(&self, other: &Self) -> T::Width {
        if self.overlaps_span(other) || self.is_adjacent_span(other) {
            return T::zero_width();
        }
        if self.is_left_span(other) {
            T::width(self.last_value(), other.lower)
        } else {
            T::width(other.last_value(), self.lower)
        }
    }

    /// Distance from the span to a single value; zero when contained.
    pub fn distance_to_value(&self, value: T) -> T::Width {
        if self.contains_value(value) {
            return T::zero_width();
        }
        if cmp_values(value, self.lower) == Ordering::Less {
            T::width(value, self.lower)
        } else {
            T::width(self.last_value(), value)
        }
    }

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps_span(other) {
            return None;
        }
        let (lower, lower_inc) =
            if cmp_lower(self.lower, self.lower_inc, other.lower, other.lower_inc)
                == Ordering::Less
            {
                (other.lower, other.lower_inc)
            } else {
                (self.lower, self.lower_inc)
            };
        let (upper, upper_inc) =
            if cmp_upper(self.upper, self.upper_inc, other.upper, other.upper_inc)
                == Ordering::Greater
            {
                (other.upper, other.upper_inc)
            } else {
                (self.upper, self.upper_inc)
            };
        Some(Self {
            lower,
            upper,
            lower_inc,
            upper_inc,
        })
    }

    /// Strict union: the single span covering both inputs, failing with
    /// [`Error::NotContiguous`] when they neither overlap nor touch.
    pub fn merge(&self, other: &Self) -> Result<Self, Error> {
        if !self.overlaps_span(other) && !self.is_adjacent_span(other) {
            return Err(Error::NotContiguous);
        }
        Ok(self.hull(other))
    }

    /// Non-strict union as a normalized span set.
    pub fn union(&self, other: &Self) -> SpanSet<T> {
        SpanSet::new(vec![*self, *other]).expect("two valid spans always form a valid span set")
    }

    /// Smallest span containing both inputs, regardless of contiguity.
    pub fn hull(&self, other: &Self) -> Self {
        let (lower, lower_inc) =
            if cmp_lower(self.lower, self.lower_inc, other.lower, other.lower_inc)
                == Ordering::Greater
            {
                (other.lower, other.lower_inc)
            } else {
                (self.lower, self.lower_inc)
            };
        let (upper, upper_inc) =
            if cmp_upper(self.upper, self.upper_inc, other.upper, other.upper_inc)
                == Ordering::Less
            {
                (other.upper, other.upper_inc)
            } else {
                (self.upper, self.upper_inc)
            };
        Self {
            lower,
            upper,
            lower_inc,
            upper_inc,
        }
    }

    /// The parts of `self` not covered by `other`: zero, one or two spans.
    pub fn difference(&self, other: &Self) -> Vec<Self> {
        let Some(inter) = self.intersection(other) else {
            return vec![*self];
        };
        let mut result = Vec::new();
        if cmp_lower(self.lower, self.lower_inc, inter.lower, inter.lower_inc) == Ordering::Less {
            let piece = Self {
                lower: self.lower,
                upper: inter.lower,
                lower_inc: self.lower_inc,
                upper_inc: !inter.lower_inc,
            };
            if piece.is_well_formed() {
                result.push(piece);
            }
        }
        if cmp_upper(self.upper, self.upper_inc, inter.upper, inter.upper_inc) == Ordering::Greater
        {
            let piece = Self {
                lower: inter.upper,
                upper: self.upper,
                lower_inc: !inter.upper_inc,
                upper_inc: self.upper_inc,
            };
            if piece.is_well_formed() {
                result.push(piece);
            }
        }
        result
    }

    /// A bound pair denotes a non-empty set.
    fn is_well_formed(&self) -> bool {
        lower_le_upper(self.lower, self.lower_inc, self.upper, self.upper_inc)
    }

    /// Returns a new span with both bounds shifted by `delta`.
    pub fn shift(&self, delta: T::Width) -> Self {
        self.shift_scale(Some(delta), None)
    }

    /// Returns a new span with the bounds scaled so that the width is
    /// `width`, anchored at the lower bound.
    ///
    /// # Panics
    /// Panics when `width` is not positive.
    pub fn scale(&self, width: T::Width) -> Self {
        self.shift_scale(None, Some(width))
    }

    /// Shifts by `delta` (when given) and then rescales the width to
    /// `width` (when given), anchored at the shifted lower bound.
    pub fn shift_scale(&self, delta: Option<T::Width>, width: Option<T::Width>) -> Self {
        let lower = match delta {
            Some(d) => T::add_width(self.lower, d),
            None => self.lower,
        };
        let upper = match delta {
            Some(d) => T::add_width(self.upper, d),
            None => self.upper,
        };
        match width {
            None => Self {
                lower,
                upper,
                ..*self
            },
            Some(w) => {
                assert!(
                    T::width_to_f64(w) > 0.0,
                    "span width must be strictly positive"
                );
                Self {
                    lower,
                    upper: T::add_width(lower, w),
                    ..*self
                }
            }
        }
    }

    /// Hull of the span and a single value.
    pub fn extend_to_value(&self, value: T) -> Result<Self, Error> {
        Ok(self.hull(&Self::singleton(value)?))
    }
}

impl<T: SpanType> Collection for Span<T> {
    type Type = T;

    fn contains(&self, content: &T) -> bool {
        self.contains_value(*content)
    }

    fn is_contained_in(&self, container: &Self) -> bool {
        container.contains_span(self)
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.overlaps_span(other)
    }

    fn is_adjacent(&self, other: &Self) -> bool {
        self.is_adjacent_span(other)
    }

    fn is_left(&self, other: &Self) -> bool {
        self.is_left_span(other)
    }

    fn is_over_or_left(&self, other: &Self) -> bool {
        self.is_over_or_left_span(other)
    }

    fn is_right(&self, other: &Self) -> bool {
        self.is_right_span(other)
    }

    fn is_over_or_right(&self, other: &Self) -> bool {
        self.is_over_or_right_span(other)
    }
}

impl<T: SpanType> PartialEq for Span<T> {
    fn eq(&self, other: &Self) -> bool {
        self.lower == other.lower
            && self.upper == other.upper
            && self.lower_inc == other.lower_inc
            && self.upper_inc == other.upper_inc
    }
}

impl<T: SpanType> Eq for Span<T> {}

impl<T: SpanType> PartialOrd for Span<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: SpanType> Ord for Span<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_lower(self.lower, self.lower_inc, other.lower, other.lower_inc)
            .then_with(|| cmp_upper(self.upper, self.upper_inc, other.upper, other.upper_inc))
    }
}

impl<T: SpanType> Hash for Span<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lower.hash_value(state);
        self.upper.hash_value(state);
        self.lower_inc.hash(state);
        self.upper_inc.hash(state);
    }
}

impl<T: SpanType> fmt::Display for Span<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.lower_inc { "[" } else { "(" })?;
        self.lower.format_value(f)?;
        f.write_str(", ")?;
        self.upper.format_value(f)?;
        f.write_str(if self.upper_inc { "]" } else { ")" })
    }
}

impl<T: SpanType> fmt::Debug for Span<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<T: SpanType> FromStr for Span<T> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let lower_inc = match s.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(ParseError(format!("span must start with '[' or '(': {s}"))),
        };
        let upper_inc = match s.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(ParseError(format!("span must end with ']' or ')': {s}"))),
        };
        let inner = &s[1..s.len() - 1];
        let (lo, hi) = inner
            .split_once(',')
            .ok_or_else(|| ParseError(format!("span must contain two bounds: {s}")))?;
        let span = Span::new(
            T::parse_value(lo)?,
            T::parse_value(hi)?,
            lower_inc,
            upper_inc,
        )?;
        Ok(span)
    }
}

impl<T: SpanType> From<Range<T>> for Span<T> {
    fn from(Range { start, end }: Range<T>) -> Self {
        Span::new(start, end, true, false).expect("invalid range bounds for a span")
    }
}

impl<T: SpanType> From<RangeInclusive<T>> for Span<T> {
    fn from(range: RangeInclusive<T>) -> Self {
        Span::new(*range.start(), *range.end(), true, true)
            .expect("invalid range bounds for a span")
    }
}

impl<T: SpanType> BitAnd for Span<T> {
    type Output = Option<Span<T>>;

    fn bitand(self, other: Self) -> Self::Output {
        self.intersection(&other)
    }
}
