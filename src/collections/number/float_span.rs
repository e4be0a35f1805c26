use std::fmt;
use std::hash::Hasher;

use crate::collections::base::{Span, SpanType};
use crate::errors::{Error, ParseError};

/// A span over `f64`, preserving the inclusivity of both bounds.
///
/// ## Example
/// ```
/// # use tempora::collections::number::FloatSpan;
/// let span: FloatSpan = (23.9..=78.8).into();
/// assert!(span.is_upper_inclusive());
/// let span: FloatSpan = (23.9..78.8).into();
/// assert!(!span.is_upper_inclusive());
/// ```
pub type FloatSpan = Span<f64>;

impl SpanType for f64 {
    type Width = f64;

    const DISCRETE: bool = false;

    fn validate(self) -> Result<(), Error> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(Error::InvalidArg("span bounds must be finite"))
        }
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(v: f64) -> Self {
        v
    }

    fn width(lower: Self, upper: Self) -> f64 {
        (upper - lower).abs()
    }

    fn add_width(v: Self, w: f64) -> Self {
        v + w
    }

    fn zero_width() -> f64 {
        0.0
    }

    fn width_to_f64(w: f64) -> f64 {
        w
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        s.trim()
            .parse()
            .map_err(|_| ParseError(format!("cannot parse float '{}'", s.trim())))
    }

    fn format_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.to_bits());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::base::Collection;

    #[test]
    fn bounds_keep_their_inclusivity() {
        let span: FloatSpan = "(23.9, 78.8]".parse().unwrap();
        assert!(!span.is_lower_inclusive());
        assert!(span.is_upper_inclusive());
        assert_eq!(span.lower(), 23.9);
        assert_eq!(span.upper(), 78.8);
    }

    #[test]
    fn nan_bounds_are_rejected() {
        assert!(FloatSpan::new(f64::NAN, 1.0, true, true).is_err());
        assert!(FloatSpan::new(0.0, f64::INFINITY, true, false).is_err());
    }

    #[test]
    fn adjacency_needs_exactly_one_inclusive_bound() {
        let half_open: FloatSpan = (1.0..3.0).into();
        let from_three: FloatSpan = (3.0..5.0).into();
        let after_three: FloatSpan = "(3, 5)".parse().unwrap();
        let closed: FloatSpan = (1.0..=3.0).into();
        // [1, 3) touches [3, 5): one exclusive, one inclusive.
        assert!(half_open.is_adjacent(&from_three));
        // [1, 3] and [3, 5) share the value 3: they overlap instead.
        assert!(!closed.is_adjacent(&from_three));
        assert!(closed.overlaps(&from_three));
        // [1, 3) and (3, 5) leave 3 uncovered: not contiguous.
        assert!(!half_open.is_adjacent(&after_three));
    }

    #[test]
    fn intersection_respects_bound_inclusivity() {
        let a: FloatSpan = (1.0..=5.0).into();
        let b: FloatSpan = "(3, 8]".parse().unwrap();
        let inter = a.intersection(&b).unwrap();
        assert_eq!(inter, "(3, 5]".parse().unwrap());
        // Touching at a single shared inclusive value yields a singleton.
        let c: FloatSpan = (5.0..=9.0).into();
        assert_eq!(a.intersection(&c).unwrap(), FloatSpan::singleton(5.0).unwrap());
    }

    #[test]
    fn difference_splits_around_the_cut() {
        let a: FloatSpan = (1.0..=9.0).into();
        let cut: FloatSpan = (3.0..5.0).into();
        let parts = a.difference(&cut);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "[1, 3)".parse().unwrap());
        assert_eq!(parts[1], "[5, 9]".parse().unwrap());
    }

    #[test]
    fn distance_between_disjoint_spans() {
        let a: FloatSpan = (1.0..3.0).into();
        let b: FloatSpan = (5.0..7.0).into();
        assert_eq!(a.distance_to_span(&b), 2.0);
        assert_eq!(a.distance_to_value(10.0), 7.0);
        assert_eq!(a.distance_to_value(2.5), 0.0);
    }

    #[test]
    fn shift_and_scale() {
        let span: FloatSpan = (2.0..4.0).into();
        assert_eq!(span.shift(3.0), (5.0..7.0).into());
        assert_eq!(span.scale(6.0), (2.0..8.0).into());
        assert_eq!(span.shift_scale(Some(1.0), Some(4.0)), (3.0..7.0).into());
    }
}
