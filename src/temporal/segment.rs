//! Segment kernel: per-segment solvers shared by the restriction engine,
//! the lifting framework and the distance operators. A segment is the span
//! between two consecutive instants of a sequence plus the interpolation
//! flag; all arithmetic runs on microsecond timestamps with `f64` ratios.

use chrono::{DateTime, Utc};

use crate::num::EPSILON;
use crate::temporal::base::TBaseType;
use crate::temporal::interpolation::TInterpolation;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::TSequence;
use crate::utils::time_at_ratio;

/// Timestamp at which the linear segment `start → end` passes through
/// `value`, or `None`. A crossing at a bound is reported; the caller owns
/// the inclusivity decision.
pub fn segment_at_value<B: TBaseType>(
    start: &TInstant<B>,
    end: &TInstant<B>,
    value: &B,
) -> Option<DateTime<Utc>> {
    let ratio = B::locate(start.value(), end.value(), value)?;
    Some(time_at_ratio(ratio, start.timestamp(), end.timestamp()))
}

/// Timestamp strictly inside `(lower, upper)` at which two synchronized
/// linear segments of the same base type coincide.
pub fn segment_intersection<B: TBaseType>(
    a_start: &B,
    a_end: &B,
    b_start: &B,
    b_end: &B,
    lower: DateTime<Utc>,
    upper: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let ratio = B::intersection_segments(a_start, a_end, b_start, b_end)?;
    Some(time_at_ratio(ratio, lower, upper))
}

/// Solutions of a per-segment within-distance test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DwithinRoots {
    /// The segments are never within the distance.
    Never,
    /// The whole segment is within the distance (parallel equal-speed
    /// motion, or a constant pair).
    Always,
    /// Within the distance exactly at one timestamp.
    One(DateTime<Utc>),
    /// Within the distance on the closed interval between two timestamps.
    Two(DateTime<Utc>, DateTime<Utc>),
}

impl DwithinRoots {
    /// Maps quadratic roots over the normalized parameter `[0, 1]` back to
    /// timestamps, collapsing roots closer than the shared tolerance.
    pub(crate) fn from_normalized(
        r1: f64,
        r2: f64,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> Self {
        if r2 < 0.0 || r1 > 1.0 {
            return DwithinRoots::Never;
        }
        let clamped1 = r1.max(0.0);
        let clamped2 = r2.min(1.0);
        if (clamped1 - clamped2).abs() < EPSILON {
            DwithinRoots::One(time_at_ratio(clamped1, lower, upper))
        } else {
            DwithinRoots::Two(
                time_at_ratio(clamped1, lower, upper),
                time_at_ratio(clamped2, lower, upper),
            )
        }
    }
}

/// Builds the boolean pieces of a per-segment within-distance answer over
/// `[lower, upper]` with the segment's bound inclusivity. The pieces are
/// step sequences meant to be stitched by sequence-set normalization.
pub(crate) fn dwithin_pieces(
    roots: DwithinRoots,
    lower: DateTime<Utc>,
    upper: DateTime<Utc>,
    lower_inc: bool,
    upper_inc: bool,
) -> Vec<TSequence<bool>> {
    let constant = |value: bool| {
        vec![step_piece(value, lower, upper, lower_inc, upper_inc)]
    };
    match roots {
        DwithinRoots::Never => constant(false),
        DwithinRoots::Always => constant(true),
        DwithinRoots::One(t) => {
            // A touch at an excluded bound belongs to the neighbor segment.
            if (t == lower && !lower_inc) || (t == upper && !upper_inc) {
                return constant(false);
            }
            let mut pieces = Vec::new();
            if t > lower {
                pieces.push(step_piece(false, lower, t, lower_inc, false));
            }
            pieces.push(step_piece(true, t, t, true, true));
            if t < upper {
                pieces.push(step_piece(false, t, upper, false, upper_inc));
            }
            pieces
        }
        DwithinRoots::Two(t1, t2) => {
            let mut pieces = Vec::new();
            let true_lower_inc = !(t1 == lower && !lower_inc);
            let true_upper_inc = !(t2 == upper && !upper_inc);
            if t1 > lower {
                pieces.push(step_piece(false, lower, t1, lower_inc, false));
            }
            pieces.push(step_piece(true, t1, t2, true_lower_inc, true_upper_inc));
            if t2 < upper {
                pieces.push(step_piece(false, t2, upper, false, upper_inc));
            }
            pieces
        }
    }
}

fn step_piece(
    value: bool,
    lower: DateTime<Utc>,
    upper: DateTime<Utc>,
    lower_inc: bool,
    upper_inc: bool,
) -> TSequence<bool> {
    let instants = if lower == upper {
        vec![TInstant::new(value, lower)]
    } else {
        vec![TInstant::new(value, lower), TInstant::new(value, upper)]
    };
    TSequence::from_parts_unchecked(instants, lower_inc, upper_inc, TInterpolation::Stepwise)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_timestamp;

    fn t(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn value_crossing_maps_ratio_to_time() {
        let a: TInstant<f64> = "1@2020-01-01".parse().unwrap();
        let b: TInstant<f64> = "3@2020-01-03".parse().unwrap();
        assert_eq!(segment_at_value(&a, &b, &2.0), Some(t("2020-01-02")));
        assert_eq!(segment_at_value(&a, &b, &5.0), None);
    }

    #[test]
    fn intersection_is_strictly_interior() {
        assert_eq!(
            segment_intersection(&1.0, &3.0, &3.0, &1.0, t("2020-01-01"), t("2020-01-03")),
            Some(t("2020-01-02"))
        );
        assert_eq!(
            segment_intersection(&1.0, &3.0, &1.0, &3.0, t("2020-01-01"), t("2020-01-03")),
            None
        );
    }

    #[test]
    fn roots_outside_the_unit_interval_vanish() {
        let lo = t("2020-01-01");
        let hi = t("2020-01-02");
        assert_eq!(
            DwithinRoots::from_normalized(1.5, 2.0, lo, hi),
            DwithinRoots::Never
        );
        assert_eq!(
            DwithinRoots::from_normalized(-0.5, 0.5, lo, hi),
            DwithinRoots::Two(lo, t("2020-01-01 12:00:00"))
        );
    }

    #[test]
    fn near_equal_roots_collapse() {
        let lo = t("2020-01-01");
        let hi = t("2020-01-02");
        match DwithinRoots::from_normalized(0.5, 0.5 + EPSILON / 2.0, lo, hi) {
            DwithinRoots::One(tm) => assert_eq!(tm, t("2020-01-01 12:00:00")),
            other => panic!("expected a single root, got {other:?}"),
        }
    }
}
