//! Lifted comparison operators: pointwise predicates over synchronized
//! temporal values, producing a temporal boolean. Linear inputs get their
//! crossings synthesized so the result switches at the exact instant.

use chrono::{DateTime, Utc};

use crate::temporal::base::{TBaseType, TOrderedType};
use crate::temporal::lifting::{lift_temporal_base, lift_temporal_temporal, LiftedBinOp};
use crate::temporal::tbool::TBool;
use crate::temporal::temporal::Temporal;
use crate::utils::time_at_ratio;

struct Compare<B> {
    pred: fn(&B, &B) -> bool,
}

impl<B: TBaseType> LiftedBinOp<B, B> for Compare<B> {
    type Out = bool;

    fn apply(&self, a: &B, b: &B) -> bool {
        (self.pred)(a, b)
    }

    fn discontinuous(&self) -> bool {
        true
    }

    fn turning_points(
        &self,
        a_start: &B,
        a_end: &B,
        b_start: &B,
        b_end: &B,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        B::intersection_segments(a_start, a_end, b_start, b_end)
            .map(|r| vec![time_at_ratio(r, lower, upper)])
            .unwrap_or_default()
    }
}

impl<B: TBaseType> Temporal<B> {
    /// Temporal equality with another temporal value.
    pub fn temporal_eq(&self, other: &Temporal<B>) -> Option<TBool> {
        lift_temporal_temporal(&Compare { pred: B::eq_base }, self, other)
    }

    pub fn temporal_ne(&self, other: &Temporal<B>) -> Option<TBool> {
        self.temporal_eq(other).map(|t| t.temporal_not())
    }

    /// Temporal equality with a constant.
    pub fn temporal_eq_value(&self, value: &B) -> TBool {
        lift_temporal_base(&Compare { pred: B::eq_base }, self, value)
            .expect("a unary lift covers the whole domain")
    }

    pub fn temporal_ne_value(&self, value: &B) -> TBool {
        self.temporal_eq_value(value).temporal_not()
    }
}

impl<B: TOrderedType> Temporal<B> {
    pub fn temporal_lt(&self, other: &Temporal<B>) -> Option<TBool> {
        lift_temporal_temporal(
            &Compare { pred: |a, b| B::cmp_base(a, b).is_lt() },
            self,
            other,
        )
    }

    pub fn temporal_le(&self, other: &Temporal<B>) -> Option<TBool> {
        lift_temporal_temporal(
            &Compare { pred: |a, b| B::cmp_base(a, b).is_le() },
            self,
            other,
        )
    }

    pub fn temporal_gt(&self, other: &Temporal<B>) -> Option<TBool> {
        lift_temporal_temporal(
            &Compare { pred: |a, b| B::cmp_base(a, b).is_gt() },
            self,
            other,
        )
    }

    pub fn temporal_ge(&self, other: &Temporal<B>) -> Option<TBool> {
        lift_temporal_temporal(
            &Compare { pred: |a, b| B::cmp_base(a, b).is_ge() },
            self,
            other,
        )
    }

    pub fn temporal_lt_value(&self, value: &B) -> TBool {
        lift_temporal_base(
            &Compare { pred: |a, b| B::cmp_base(a, b).is_lt() },
            self,
            value,
        )
        .expect("a unary lift covers the whole domain")
    }

    pub fn temporal_gt_value(&self, value: &B) -> TBool {
        lift_temporal_base(
            &Compare { pred: |a, b| B::cmp_base(a, b).is_gt() },
            self,
            value,
        )
        .expect("a unary lift covers the whole domain")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_timestamp;

    fn tf(s: &str) -> Temporal<f64> {
        s.parse().unwrap()
    }

    #[test]
    fn lt_of_crossing_ramps_switches_at_the_crossing() {
        let a = tf("[0@2020-01-01, 4@2020-01-05]");
        let b = tf("[4@2020-01-01, 0@2020-01-05]");
        let lt = a.temporal_lt(&b).unwrap();
        let crossing = parse_timestamp("2020-01-03").unwrap();
        assert_eq!(
            lt.value_at_timestamp(parse_timestamp("2020-01-02").unwrap(), true),
            Some(true)
        );
        // At the crossing the values are equal: not strictly less.
        assert_eq!(lt.value_at_timestamp(crossing, true), Some(false));
        assert_eq!(
            lt.value_at_timestamp(parse_timestamp("2020-01-04").unwrap(), true),
            Some(false)
        );
    }

    #[test]
    fn eq_against_a_constant_marks_the_crossing_instant() {
        let t = tf("[1@2020-01-01, 3@2020-01-03]");
        let eq = t.temporal_eq_value(&2.0);
        let crossing = parse_timestamp("2020-01-02").unwrap();
        assert_eq!(eq.value_at_timestamp(crossing, true), Some(true));
        assert_eq!(
            eq.value_at_timestamp(parse_timestamp("2020-01-01").unwrap(), true),
            Some(false)
        );
        assert_eq!(eq.when_true().unwrap().num_spans(), 1);
    }

    #[test]
    fn text_comparison_is_lexicographic() {
        let a: Temporal<String> = "{\"apple\"@2020-01-01}".parse().unwrap();
        let b: Temporal<String> = "{\"pear\"@2020-01-01}".parse().unwrap();
        let lt = a.temporal_lt(&b).unwrap();
        assert_eq!(lt.values(), vec![true]);
    }
}
