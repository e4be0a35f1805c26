//! Lifting framework: applies a base-type binary function pointwise to
//! temporal operands, synchronizing their samples, inserting turning points
//! where a lifted function changes slope, and splitting sequences at the
//! discontinuities of step-valued results.

use chrono::{DateTime, Utc};

use crate::collections::datetime::TsTzSpan;
use crate::temporal::base::TBaseType;
use crate::temporal::interpolation::TInterpolation;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;
use crate::temporal::temporal::Temporal;
use crate::utils::{from_micros, to_micros};

/// A liftable binary operation on base values.
///
/// `turning_points` reports the timestamps strictly inside a synchronized
/// segment pair at which the lifted result changes slope; they are inserted
/// as samples so that piecewise-linear results stay exact and step results
/// switch at the right instants. `discontinuous` marks operations whose
/// result can change in an instant (comparisons, predicates): their results
/// are assembled from constant runs between crossings.
pub trait LiftedBinOp<A: TBaseType, B: TBaseType> {
    type Out: TBaseType;

    fn apply(&self, a: &A, b: &B) -> Self::Out;

    fn discontinuous(&self) -> bool {
        false
    }

    #[allow(unused_variables)]
    fn turning_points(
        &self,
        a_start: &A,
        a_end: &A,
        b_start: &B,
        b_end: &B,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        Vec::new()
    }
}

/// Applies `op` over the synchronized domains of two temporal values.
/// Returns `None` when the time domains do not intersect.
pub fn lift_temporal_temporal<A, B, Op>(
    op: &Op,
    a: &Temporal<A>,
    b: &Temporal<B>,
) -> Option<Temporal<Op::Out>>
where
    A: TBaseType,
    B: TBaseType,
    Op: LiftedBinOp<A, B>,
{
    match (a, b) {
        (Temporal::Instant(ai), _) => {
            let bv = b.value_at_timestamp(ai.timestamp(), true)?;
            Some(Temporal::Instant(TInstant::new(
                op.apply(ai.value(), &bv),
                ai.timestamp(),
            )))
        }
        (_, Temporal::Instant(bi)) => {
            let av = a.value_at_timestamp(bi.timestamp(), true)?;
            Some(Temporal::Instant(TInstant::new(
                op.apply(&av, bi.value()),
                bi.timestamp(),
            )))
        }
        (Temporal::InstantSet(set), _) => {
            let instants: Vec<_> = set
                .instants()
                .iter()
                .filter_map(|i| {
                    b.value_at_timestamp(i.timestamp(), true)
                        .map(|bv| TInstant::new(op.apply(i.value(), &bv), i.timestamp()))
                })
                .collect();
            Temporal::from_instants(instants)
        }
        (_, Temporal::InstantSet(set)) => {
            let instants: Vec<_> = set
                .instants()
                .iter()
                .filter_map(|i| {
                    a.value_at_timestamp(i.timestamp(), true)
                        .map(|av| TInstant::new(op.apply(&av, i.value()), i.timestamp()))
                })
                .collect();
            Temporal::from_instants(instants)
        }
        _ => {
            let a_seqs = continuous_sequences(a);
            let b_seqs = continuous_sequences(b);
            let mut pieces = Vec::new();
            for sa in &a_seqs {
                for sb in &b_seqs {
                    pieces.extend(lift_seq_pair(op, sa, sb));
                }
            }
            Temporal::from_sequences(pieces)
        }
    }
}

/// Applies `op` between a temporal value and a constant right-hand side.
pub fn lift_temporal_base<A, B, Op>(op: &Op, a: &Temporal<A>, rhs: &B) -> Option<Temporal<Op::Out>>
where
    A: TBaseType,
    B: TBaseType,
    Op: LiftedBinOp<A, B>,
{
    match a {
        Temporal::Instant(i) => Some(Temporal::Instant(TInstant::new(
            op.apply(i.value(), rhs),
            i.timestamp(),
        ))),
        Temporal::InstantSet(set) => Temporal::from_instants(
            set.instants()
                .iter()
                .map(|i| TInstant::new(op.apply(i.value(), rhs), i.timestamp()))
                .collect(),
        ),
        Temporal::Sequence(_) | Temporal::SequenceSet(_) => {
            // A constant is a sequence over the operand's period; the
            // synchronized path then applies unchanged.
            let interp = if B::CONTINUOUS {
                TInterpolation::Linear
            } else {
                TInterpolation::Stepwise
            };
            let mut pieces = Vec::new();
            for sa in continuous_sequences(a) {
                let constant =
                    TSequence::from_value_and_tstz_span(rhs.clone(), sa.period(), interp)
                        .expect("a constant over a valid period is valid");
                pieces.extend(lift_seq_pair(op, &sa, &constant));
            }
            Temporal::from_sequences(pieces)
        }
    }
}

fn continuous_sequences<B: TBaseType>(t: &Temporal<B>) -> Vec<TSequence<B>> {
    match t {
        Temporal::Sequence(s) => vec![s.clone()],
        Temporal::SequenceSet(s) => s.sequences().to_vec(),
        _ => unreachable!("discrete values are handled before sequencing"),
    }
}

/// Synchronizes one sequence pair and applies the operation.
fn lift_seq_pair<A, B, Op>(op: &Op, a: &TSequence<A>, b: &TSequence<B>) -> Vec<TSequence<Op::Out>>
where
    A: TBaseType,
    B: TBaseType,
    Op: LiftedBinOp<A, B>,
{
    let Some(inter) = a.period().intersection(&b.period()) else {
        return Vec::new();
    };
    let (Some(a), Some(b)) = (a.at_tstzspan(&inter), b.at_tstzspan(&inter)) else {
        return Vec::new();
    };
    let a_linear = a.interpolation() == TInterpolation::Linear;
    let b_linear = b.interpolation() == TInterpolation::Linear;

    if inter.lower() == inter.upper() {
        let out = op.apply(a.start_instant().value(), b.start_instant().value());
        return vec![TSequence::from_parts_unchecked(
            vec![TInstant::new(out, inter.lower())],
            true,
            true,
            result_interp::<Op::Out>(false),
        )];
    }

    let mut grid = merge_timestamps(a.timestamps(), b.timestamps());
    if a_linear || b_linear {
        insert_turning_points(op, &a, &b, &mut grid);
    }

    if op.discontinuous() || (!<Op::Out as TBaseType>::CONTINUOUS && (a_linear || b_linear)) {
        return assemble_runs(op, &a, &b, &inter, &grid);
    }

    if <Op::Out as TBaseType>::CONTINUOUS && (a_linear || b_linear) {
        if a_linear != b_linear {
            // Split the step side into constant linear pieces and recurse;
            // each piece synchronizes as linear × linear.
            let mut pieces = Vec::new();
            if a_linear {
                for sb in b.step_to_linear() {
                    pieces.extend(lift_seq_pair(op, &a, &sb));
                }
            } else {
                for sa in a.step_to_linear() {
                    pieces.extend(lift_seq_pair(op, &sa, &b));
                }
            }
            return pieces;
        }
        let instants = grid
            .iter()
            .map(|&t| {
                TInstant::new(op.apply(&a.value_at_raw(t), &b.value_at_raw(t)), t)
            })
            .collect();
        return vec![TSequence::from_parts_unchecked(
            instants,
            inter.is_lower_inclusive(),
            inter.is_upper_inclusive(),
            TInterpolation::Linear,
        )];
    }

    // Both inputs step: sample the grid; the clipped closing instants
    // already carry left-hand values at exclusive bounds.
    let instants = grid
        .iter()
        .map(|&t| TInstant::new(op.apply(&a.value_at_raw(t), &b.value_at_raw(t)), t))
        .collect();
    vec![TSequence::from_parts_unchecked(
        instants,
        inter.is_lower_inclusive(),
        inter.is_upper_inclusive(),
        result_interp::<Op::Out>(false),
    )]
}

fn result_interp<Out: TBaseType>(linear: bool) -> TInterpolation {
    if linear && Out::CONTINUOUS {
        TInterpolation::Linear
    } else {
        TInterpolation::Stepwise
    }
}

fn merge_timestamps(a: Vec<DateTime<Utc>>, b: Vec<DateTime<Utc>>) -> Vec<DateTime<Utc>> {
    let mut merged = a;
    merged.extend(b);
    merged.sort();
    merged.dedup();
    merged
}

fn insert_turning_points<A, B, Op>(
    op: &Op,
    a: &TSequence<A>,
    b: &TSequence<B>,
    grid: &mut Vec<DateTime<Utc>>,
) where
    A: TBaseType,
    B: TBaseType,
    Op: LiftedBinOp<A, B>,
{
    let a_linear = a.interpolation() == TInterpolation::Linear;
    let b_linear = b.interpolation() == TInterpolation::Linear;
    let mut extra = Vec::new();
    for window in grid.windows(2) {
        let (t1, t2) = (window[0], window[1]);
        let a1 = a.value_at_raw(t1);
        let a2 = if a_linear { a.value_at_raw(t2) } else { a1.clone() };
        let b1 = b.value_at_raw(t1);
        let b2 = if b_linear { b.value_at_raw(t2) } else { b1.clone() };
        extra.extend(
            op.turning_points(&a1, &a2, &b1, &b2, t1, t2)
                .into_iter()
                .filter(|t| *t > t1 && *t < t2),
        );
    }
    if !extra.is_empty() {
        tracing::trace!("inserted {} turning points", extra.len());
        grid.extend(extra);
        grid.sort();
        grid.dedup();
    }
}

/// Builds a discontinuous result from constant runs: one degenerate run per
/// grid point, one open run per grid interval sampled at its midpoint.
/// Normalization then stitches the runs into maximal step sequences.
fn assemble_runs<A, B, Op>(
    op: &Op,
    a: &TSequence<A>,
    b: &TSequence<B>,
    inter: &TsTzSpan,
    grid: &[DateTime<Utc>],
) -> Vec<TSequence<Op::Out>>
where
    A: TBaseType,
    B: TBaseType,
    Op: LiftedBinOp<A, B>,
{
    let mut runs: Vec<TSequence<Op::Out>> = Vec::new();
    for (i, &t) in grid.iter().enumerate() {
        let at_bound = (t == inter.lower() && !inter.is_lower_inclusive())
            || (t == inter.upper() && !inter.is_upper_inclusive());
        if !at_bound {
            let point_value = op.apply(&a.value_at_raw(t), &b.value_at_raw(t));
            runs.push(TSequence::from_parts_unchecked(
                vec![TInstant::new(point_value, t)],
                true,
                true,
                TInterpolation::Stepwise,
            ));
        }
        if let Some(&t_next) = grid.get(i + 1) {
            let mid = from_micros((to_micros(&t) + to_micros(&t_next)) / 2);
            let interval_value = op.apply(&a.value_at_raw(mid), &b.value_at_raw(mid));
            runs.push(TSequence::from_parts_unchecked(
                vec![
                    TInstant::new(interval_value.clone(), t),
                    TInstant::new(interval_value, t_next),
                ],
                false,
                false,
                TInterpolation::Stepwise,
            ));
        }
    }
    match TSequenceSet::make(runs, true) {
        Ok(set) => set.sequences().to_vec(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::EPSILON;
    use crate::utils::{parse_timestamp, time_at_ratio, time_ratio};

    struct Add;

    impl LiftedBinOp<f64, f64> for Add {
        type Out = f64;

        fn apply(&self, a: &f64, b: &f64) -> f64 {
            a + b
        }
    }

    struct Lt;

    impl LiftedBinOp<f64, f64> for Lt {
        type Out = bool;

        fn apply(&self, a: &f64, b: &f64) -> bool {
            a < b
        }

        fn discontinuous(&self) -> bool {
            true
        }

        fn turning_points(
            &self,
            a1: &f64,
            a2: &f64,
            b1: &f64,
            b2: &f64,
            lower: DateTime<Utc>,
            upper: DateTime<Utc>,
        ) -> Vec<DateTime<Utc>> {
            f64::intersection_segments(a1, a2, b1, b2)
                .map(|r| vec![time_at_ratio(r, lower, upper)])
                .unwrap_or_default()
        }
    }

    fn tf(s: &str) -> Temporal<f64> {
        s.parse().unwrap()
    }

    #[test]
    fn instant_pairs_need_equal_timestamps() {
        let a = tf("1@2020-01-01");
        let b = tf("2@2020-01-01");
        let sum = lift_temporal_temporal(&Add, &a, &b).unwrap();
        assert_eq!(sum, tf("3@2020-01-01"));
        let c = tf("2@2020-01-02");
        assert!(lift_temporal_temporal(&Add, &a, &c).is_none());
    }

    #[test]
    fn sequences_synchronize_on_the_union_grid() {
        let a = tf("[1@2020-01-01, 3@2020-01-03]");
        let b = tf("[10@2020-01-02, 20@2020-01-03]");
        let sum = lift_temporal_temporal(&Add, &a, &b).unwrap();
        // Intersection is [01-02, 01-03]; a interpolates to 2 at 01-02.
        assert_eq!(
            sum,
            tf("[12@2020-01-02, 23@2020-01-03]")
        );
    }

    #[test]
    fn constant_rhs_lifts_over_the_whole_domain() {
        let a = tf("{[1@2020-01-01, 3@2020-01-03], [5@2020-01-05, 5@2020-01-06]}");
        let sum = lift_temporal_base(&Add, &a, &10.0).unwrap();
        assert_eq!(
            sum,
            tf("{[11@2020-01-01, 13@2020-01-03], [15@2020-01-05, 15@2020-01-06]}")
        );
    }

    #[test]
    fn comparison_splits_at_the_crossing() {
        // a goes 0 → 4, b stays 2: a < b before the midpoint crossing.
        let a = tf("[0@2020-01-01, 4@2020-01-05]");
        let lt = lift_temporal_base(&Lt, &a, &2.0).unwrap();
        let crossing = parse_timestamp("2020-01-03").unwrap();
        assert_eq!(lt.value_at_timestamp(parse_timestamp("2020-01-02").unwrap(), true), Some(true));
        assert_eq!(lt.value_at_timestamp(crossing, true), Some(false));
        assert_eq!(lt.value_at_timestamp(parse_timestamp("2020-01-04").unwrap(), true), Some(false));
        // The change happens exactly at the crossing: one step sequence.
        match &lt {
            Temporal::Sequence(s) => {
                assert_eq!(s.interpolation(), TInterpolation::Stepwise);
                let ratio = time_ratio(
                    s.instants()[1].timestamp(),
                    parse_timestamp("2020-01-01").unwrap(),
                    parse_timestamp("2020-01-05").unwrap(),
                );
                assert!((ratio - 0.5).abs() < EPSILON);
            }
            other => panic!("expected a sequence, got {other:?}"),
        }
    }

    #[test]
    fn equality_of_crossing_linears_is_true_at_an_instant() {
        struct Eq2;
        impl LiftedBinOp<f64, f64> for Eq2 {
            type Out = bool;
            fn apply(&self, a: &f64, b: &f64) -> bool {
                crate::num::float_eq(*a, *b)
            }
            fn discontinuous(&self) -> bool {
                true
            }
            fn turning_points(
                &self,
                a1: &f64,
                a2: &f64,
                b1: &f64,
                b2: &f64,
                lower: DateTime<Utc>,
                upper: DateTime<Utc>,
            ) -> Vec<DateTime<Utc>> {
                f64::intersection_segments(a1, a2, b1, b2)
                    .map(|r| vec![time_at_ratio(r, lower, upper)])
                    .unwrap_or_default()
            }
        }
        let a = tf("[0@2020-01-01, 4@2020-01-05]");
        let b = tf("[4@2020-01-01, 0@2020-01-05]");
        let eq = lift_temporal_temporal(&Eq2, &a, &b).unwrap();
        let crossing = parse_timestamp("2020-01-03").unwrap();
        assert_eq!(eq.value_at_timestamp(crossing, true), Some(true));
        assert_eq!(
            eq.value_at_timestamp(parse_timestamp("2020-01-02").unwrap(), true),
            Some(false)
        );
        assert_eq!(
            eq.value_at_timestamp(parse_timestamp("2020-01-04").unwrap(), true),
            Some(false)
        );
        // True only at the isolated crossing instant; the step pieces before
        // and at the crossing join, the piece after stays separate.
        match &eq {
            Temporal::SequenceSet(s) => assert_eq!(s.num_sequences(), 2),
            other => panic!("expected a sequence set, got {other:?}"),
        }
    }
}
