//! Operations shared by the numeric temporal types: value-span and TBox
//! restriction, lifted arithmetic, temporal distance and the time-weighted
//! aggregates.

use chrono::{DateTime, Utc};

use crate::boxes::TBox;
use crate::collections::base::{Span, SpanSet, SpanType};
use crate::collections::datetime::{TsTzSpan, TsTzSpanSet};
use crate::errors::Error;
use crate::num::EPSILON;
use crate::temporal::base::{TBaseType, TOrderedType};
use crate::temporal::interpolation::TInterpolation;
use crate::temporal::lifting::{lift_temporal_base, lift_temporal_temporal, LiftedBinOp};
use crate::temporal::temporal::Temporal;
use crate::temporal::tsequence::TSequence;
use crate::utils::time_at_ratio;

/// Marker for base types that are numbers: totally ordered, usable as span
/// elements, equipped with arithmetic, and boxed by [`TBox`].
pub trait TNumberType: TOrderedType + TBaseType<Bbox = TBox> + SpanType + NumOps {}

impl TNumberType for i32 {}
impl TNumberType for f64 {}

/// Arithmetic over the numeric base values.
pub trait NumOps: Copy {
    fn add_values(a: Self, b: Self) -> Self;
    fn sub_values(a: Self, b: Self) -> Self;
    fn mul_values(a: Self, b: Self) -> Self;
    fn div_values(a: Self, b: Self) -> Self;
}

// ------------------------- Lifted arithmetic ---------------------------------

struct Arith<B> {
    f: fn(B, B) -> B,
    /// Ratio of the interior extremum of the lifted result, when any.
    turn: fn(B, B, B, B) -> Option<f64>,
}

impl<B: TNumberType> LiftedBinOp<B, B> for Arith<B> {
    type Out = B;

    fn apply(&self, a: &B, b: &B) -> B {
        (self.f)(*a, *b)
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
        (self.turn)(*a_start, *a_end, *b_start, *b_end)
            .filter(|r| *r > EPSILON && *r < 1.0 - EPSILON)
            .map(|r| vec![time_at_ratio(r, lower, upper)])
            .unwrap_or_default()
    }
}

fn no_turn<B>(_: B, _: B, _: B, _: B) -> Option<f64> {
    None
}

/// Vertex of the quadratic `(a1 + Δa·r)(b1 + Δb·r)`: the one timestamp at
/// which the product of two linear segments changes slope.
fn product_turn<B: TNumberType>(a1: B, a2: B, b1: B, b2: B) -> Option<f64> {
    let (a1, a2, b1, b2) = (a1.to_f64(), a2.to_f64(), b1.to_f64(), b2.to_f64());
    let quad = (a2 - a1) * (b2 - b1);
    if quad.abs() < EPSILON {
        return None;
    }
    let slope = a1 * (b2 - b1) + b1 * (a2 - a1);
    Some(-slope / (2.0 * quad))
}

struct Dist;

impl<B: TNumberType> LiftedBinOp<B, B> for Dist {
    type Out = f64;

    fn apply(&self, a: &B, b: &B) -> f64 {
        (a.to_f64() - b.to_f64()).abs()
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
        // |a - b| kinks where the segments intersect.
        B::intersection_segments(a_start, a_end, b_start, b_end)
            .map(|r| vec![time_at_ratio(r, lower, upper)])
            .unwrap_or_default()
    }
}

struct Abs;

impl<B: TNumberType> LiftedBinOp<B, B> for Abs {
    type Out = B;

    fn apply(&self, a: &B, _zero: &B) -> B {
        B::from_f64(a.to_f64().abs())
    }

    fn turning_points(
        &self,
        a_start: &B,
        a_end: &B,
        _b_start: &B,
        _b_end: &B,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        B::locate(a_start, a_end, &B::from_f64(0.0))
            .filter(|r| *r > EPSILON && *r < 1.0 - EPSILON)
            .map(|r| vec![time_at_ratio(r, lower, upper)])
            .unwrap_or_default()
    }
}

impl<B: TNumberType> Temporal<B> {
    // ------------------------- Accessors ---------------------------------

    /// Hull of the values taken, as a span.
    pub fn value_span(&self) -> Span<B> {
        use crate::temporal::temporal::OrderedTemporal;
        Span::new(self.min_value(), self.max_value(), true, true)
            .expect("numeric temporal values are finite")
    }

    /// Value ranges actually taken, one span per sequence.
    pub fn value_spans(&self) -> SpanSet<B> {
        let spans: Vec<Span<B>> = match self {
            Temporal::SequenceSet(s) => s
                .sequences()
                .iter()
                .map(|q| Temporal::Sequence(q.clone()).value_span())
                .collect(),
            _ => vec![self.value_span()],
        };
        SpanSet::new(spans).expect("numeric temporal values are non-empty")
    }

    // ------------------------- Restriction -------------------------------

    /// Portions whose value falls in `span`.
    pub fn at_span(&self, span: &Span<B>) -> Option<Temporal<B>> {
        match self {
            Temporal::Instant(i) => span.contains_value(*i.value()).then(|| self.clone()),
            Temporal::InstantSet(s) => s
                .filter(|i| span.contains_value(*i.value()))
                .map(Temporal::InstantSet),
            _ => {
                let spans = self.span_time_spans(span)?;
                self.at_time_set(&spans)
            }
        }
    }

    /// Portions whose value falls outside `span`.
    pub fn minus_span(&self, span: &Span<B>) -> Option<Temporal<B>> {
        match self {
            Temporal::Instant(i) => (!span.contains_value(*i.value())).then(|| self.clone()),
            Temporal::InstantSet(s) => s
                .filter(|i| !span.contains_value(*i.value()))
                .map(Temporal::InstantSet),
            _ => match self.span_time_spans(span) {
                None => Some(self.clone()),
                Some(spans) => self.minus_time_set(&spans),
            },
        }
    }

    pub fn at_span_set(&self, spans: &SpanSet<B>) -> Option<Temporal<B>> {
        let mut results: Vec<Temporal<B>> = Vec::new();
        for span in spans.iter() {
            if let Some(part) = self.at_span(span) {
                results.push(part);
            }
        }
        match results.len() {
            0 => None,
            1 => Some(results.pop().expect("one element")),
            _ => Temporal::merge_many(&results).ok(),
        }
    }

    pub fn minus_span_set(&self, spans: &SpanSet<B>) -> Option<Temporal<B>> {
        let mut time_spans: Vec<TsTzSpan> = Vec::new();
        for span in spans.iter() {
            if let Some(set) = self.span_time_spans(span) {
                time_spans.extend(set.iter().copied());
            }
        }
        match TsTzSpanSet::new(time_spans) {
            Err(_) => Some(self.clone()),
            Ok(cut) => self.minus_time_set(&cut),
        }
    }

    /// Restriction to a temporal box: value axis first, then time axis.
    pub fn at_tbox(&self, tbox: &TBox) -> Option<Temporal<B>> {
        let mut result = self.clone();
        if let Some(span) = tbox.span() {
            let value_span = Span::new(
                B::from_f64(span.lower()),
                B::from_f64(span.upper()),
                span.is_lower_inclusive(),
                span.is_upper_inclusive(),
            )
            .ok()?;
            result = result.at_span(&value_span)?;
        }
        if let Some(period) = tbox.tstzspan() {
            result = result.at_tstzspan(&period)?;
        }
        Some(result)
    }

    pub fn minus_tbox(&self, tbox: &TBox) -> Option<Temporal<B>> {
        let Some(at) = self.at_tbox(tbox) else {
            return Some(self.clone());
        };
        self.minus_time_set(&at.time())
    }

    /// Time spans on which the value lies inside `span`.
    fn span_time_spans(&self, span: &Span<B>) -> Option<TsTzSpanSet> {
        let sequences: Vec<&TSequence<B>> = match self {
            Temporal::Sequence(s) => vec![s],
            Temporal::SequenceSet(s) => s.sequences().iter().collect(),
            _ => return None,
        };
        let mut all: Vec<TsTzSpan> = Vec::new();
        for seq in sequences {
            let mut buf = Vec::new();
            sequence_span_times(seq, span, &mut buf);
            if let Some(clipped) = TsTzSpanSet::new(buf)
                .ok()
                .and_then(|set| set.intersection_span(&seq.period()))
            {
                all.extend(clipped.iter().copied());
            }
        }
        TsTzSpanSet::new(all).ok()
    }

    // ------------------------- Arithmetic --------------------------------

    pub fn add(&self, other: &Temporal<B>) -> Option<Temporal<B>> {
        lift_temporal_temporal(
            &Arith { f: |a, b| B::add_values(a, b), turn: no_turn },
            self,
            other,
        )
    }

    pub fn add_value(&self, value: B) -> Option<Temporal<B>> {
        lift_temporal_base(
            &Arith { f: |a, b| B::add_values(a, b), turn: no_turn },
            self,
            &value,
        )
    }

    pub fn subtract(&self, other: &Temporal<B>) -> Option<Temporal<B>> {
        lift_temporal_temporal(
            &Arith { f: |a, b| B::sub_values(a, b), turn: no_turn },
            self,
            other,
        )
    }

    pub fn multiply(&self, other: &Temporal<B>) -> Option<Temporal<B>> {
        lift_temporal_temporal(
            &Arith { f: |a, b| B::mul_values(a, b), turn: product_turn },
            self,
            other,
        )
    }

    /// Temporal division; the divisor must never cross zero.
    pub fn divide(&self, other: &Temporal<B>) -> Result<Option<Temporal<B>>, Error> {
        if other.ever_eq(&B::from_f64(0.0)) {
            return Err(Error::InvalidArg("division by a temporal value reaching zero"));
        }
        Ok(lift_temporal_temporal(
            &Arith { f: |a, b| B::div_values(a, b), turn: product_turn },
            self,
            other,
        ))
    }

    /// Absolute value, with kinks inserted at zero crossings.
    pub fn abs(&self) -> Temporal<B> {
        lift_temporal_base(&Abs, self, &B::from_f64(0.0))
            .expect("a unary lift covers the whole domain")
    }

    /// Change of value between successive instants, as a step value on each
    /// gap. `None` for instantaneous inputs.
    pub fn delta_value(&self) -> Option<Temporal<B>> {
        let deltas = |seq: &TSequence<B>| -> Option<TSequence<B>> {
            if seq.num_instants() < 2 {
                return None;
            }
            let instants: Vec<_> = seq
                .instants()
                .windows(2)
                .map(|w| {
                    crate::temporal::tinstant::TInstant::new(
                        B::sub_values(*w[1].value(), *w[0].value()),
                        w[0].timestamp(),
                    )
                })
                .chain(std::iter::once(crate::temporal::tinstant::TInstant::new(
                    B::sub_values(
                        *seq.end_instant().value(),
                        *seq.instants()[seq.num_instants() - 2].value(),
                    ),
                    seq.end_timestamp(),
                )))
                .collect();
            Some(TSequence::from_parts_unchecked(
                instants,
                seq.is_lower_inclusive(),
                false,
                TInterpolation::Stepwise,
            ))
        };
        match self {
            Temporal::Sequence(s) => deltas(s).map(Temporal::Sequence),
            Temporal::SequenceSet(s) => Temporal::from_sequences(
                s.sequences().iter().filter_map(deltas).collect(),
            ),
            _ => None,
        }
    }

    // ------------------------- Distance ----------------------------------

    /// Temporal distance to another temporal number, with turning points at
    /// the segment intersections.
    pub fn distance(&self, other: &Temporal<B>) -> Option<Temporal<f64>> {
        lift_temporal_temporal(&Dist, self, other)
    }

    /// Temporal distance to a constant number.
    pub fn distance_to_value(&self, value: B) -> Temporal<f64> {
        lift_temporal_base(&Dist, self, &value)
            .expect("a unary lift covers the whole domain")
    }

    /// Minimum of the temporal distance; infinite when the time domains are
    /// disjoint.
    pub fn nearest_approach_distance(&self, other: &Temporal<B>) -> f64 {
        use crate::temporal::temporal::OrderedTemporal;
        match self.distance(other) {
            Some(d) => d.min_value(),
            None => f64::INFINITY,
        }
    }

    // ------------------------- Aggregates --------------------------------

    /// Area under the curve: linear segments contribute trapezoids, step
    /// segments rectangles. Discrete values integrate to zero.
    pub fn integral(&self) -> f64 {
        let seq_integral = |seq: &TSequence<B>| -> f64 {
            seq.instants()
                .windows(2)
                .map(|w| {
                    let dt = (w[1].timestamp() - w[0].timestamp())
                        .num_microseconds()
                        .unwrap_or(0) as f64
                        / 1_000_000.0;
                    match seq.interpolation() {
                        TInterpolation::Linear => {
                            (w[0].value().to_f64() + w[1].value().to_f64()) / 2.0 * dt
                        }
                        _ => w[0].value().to_f64() * dt,
                    }
                })
                .sum()
        };
        match self {
            Temporal::Sequence(s) => seq_integral(s),
            Temporal::SequenceSet(s) => s.sequences().iter().map(seq_integral).sum(),
            _ => 0.0,
        }
    }

    /// Time-weighted average; plain average for discrete values.
    pub fn time_weighted_average(&self) -> f64 {
        match self {
            Temporal::Instant(_) | Temporal::InstantSet(_) => {
                let values = self.values();
                values.iter().map(|v| v.to_f64()).sum::<f64>() / values.len() as f64
            }
            _ => {
                let seconds = self.duration(false).num_microseconds().unwrap_or(0) as f64
                    / 1_000_000.0;
                if seconds == 0.0 {
                    let values = self.values();
                    values.iter().map(|v| v.to_f64()).sum::<f64>() / values.len() as f64
                } else {
                    self.integral() / seconds
                }
            }
        }
    }
}

/// Collects the raw (unclipped) time spans on which one sequence's value
/// lies inside `span`.
fn sequence_span_times<B: TNumberType>(
    seq: &TSequence<B>,
    span: &Span<B>,
    out: &mut Vec<TsTzSpan>,
) {
    let instants = seq.instants();
    if instants.len() == 1 {
        if span.contains_value(*instants[0].value()) {
            out.push(seq.period());
        }
        return;
    }
    match seq.interpolation() {
        TInterpolation::Linear => {
            for w in instants.windows(2) {
                let (a, b) = (w[0].value().to_f64(), w[1].value().to_f64());
                let (t1, t2) = (w[0].timestamp(), w[1].timestamp());
                let lo = span.lower().to_f64();
                let hi = span.upper().to_f64();
                if (a - b).abs() < EPSILON {
                    if span.contains_value(*w[0].value()) {
                        out.push(TsTzSpan::new(t1, t2, true, true).expect("ordered"));
                    }
                    continue;
                }
                let increasing = b > a;
                let r_of = |v: f64| ((v - a) / (b - a)).clamp(0.0, 1.0);
                let (mut r_lo, mut lo_inc) = if lo < a.min(b) {
                    (0.0, true)
                } else if lo > a.max(b) {
                    continue;
                } else {
                    (r_of(lo), span.is_lower_inclusive())
                };
                let (mut r_hi, mut hi_inc) = if hi > a.max(b) {
                    (1.0, true)
                } else if hi < a.min(b) {
                    continue;
                } else {
                    (r_of(hi), span.is_upper_inclusive())
                };
                if !increasing {
                    std::mem::swap(&mut r_lo, &mut r_hi);
                    std::mem::swap(&mut lo_inc, &mut hi_inc);
                }
                if r_lo > r_hi {
                    continue;
                }
                let lower = time_at_ratio(r_lo, t1, t2);
                let upper = time_at_ratio(r_hi, t1, t2);
                if lower == upper && !(lo_inc && hi_inc) {
                    continue;
                }
                if let Ok(s) = TsTzSpan::new(lower, upper, lo_inc, hi_inc) {
                    out.push(s);
                }
            }
        }
        _ => {
            for w in instants.windows(2) {
                if span.contains_value(*w[0].value()) {
                    out.push(
                        TsTzSpan::new(w[0].timestamp(), w[1].timestamp(), true, false)
                            .expect("ordered"),
                    );
                }
            }
            if span.contains_value(*seq.end_instant().value()) {
                out.push(
                    TsTzSpan::singleton(seq.end_timestamp()).expect("valid timestamp"),
                );
            }
        }
    }
}

impl NumOps for i32 {
    fn add_values(a: Self, b: Self) -> Self {
        a + b
    }
    fn sub_values(a: Self, b: Self) -> Self {
        a - b
    }
    fn mul_values(a: Self, b: Self) -> Self {
        a * b
    }
    fn div_values(a: Self, b: Self) -> Self {
        a / b
    }
}

impl NumOps for f64 {
    fn add_values(a: Self, b: Self) -> Self {
        a + b
    }
    fn sub_values(a: Self, b: Self) -> Self {
        a - b
    }
    fn mul_values(a: Self, b: Self) -> Self {
        a * b
    }
    fn div_values(a: Self, b: Self) -> Self {
        a / b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::temporal::OrderedTemporal;
    use crate::utils::parse_timestamp;

    fn tf(s: &str) -> Temporal<f64> {
        s.parse().unwrap()
    }

    #[test]
    fn at_span_clips_a_linear_ramp() {
        let t = tf("[0@2020-01-01, 10@2020-01-11]");
        let clipped = t.at_span(&(2.0..=4.0).into()).unwrap();
        assert!((clipped.start_value() - 2.0).abs() < EPSILON);
        assert!((clipped.end_value() - 4.0).abs() < EPSILON);
        assert_eq!(
            clipped.start_timestamp(),
            parse_timestamp("2020-01-03").unwrap()
        );
        assert_eq!(
            clipped.end_timestamp(),
            parse_timestamp("2020-01-05").unwrap()
        );
    }

    #[test]
    fn at_and_minus_span_partition_the_domain() {
        let t = tf("[0@2020-01-01, 10@2020-01-11]");
        let span: Span<f64> = (2.0..=4.0).into();
        let at = t.at_span(&span).unwrap();
        let minus = t.minus_span(&span).unwrap();
        let reunion = at.time().union(&minus.time());
        assert_eq!(reunion, t.time());
    }

    #[test]
    fn minus_span_excludes_the_crossing_boundaries() {
        let t = tf("[0@2020-01-01, 10@2020-01-11]");
        let minus = t.minus_span(&(2.0..=4.0).into()).unwrap();
        match &minus {
            Temporal::SequenceSet(s) => {
                assert_eq!(s.num_sequences(), 2);
                assert!(!s.sequences()[0].is_upper_inclusive());
                assert!(!s.sequences()[1].is_lower_inclusive());
            }
            other => panic!("expected a sequence set, got {other:?}"),
        }
    }

    #[test]
    fn descending_segments_clip_too() {
        let t = tf("[10@2020-01-01, 0@2020-01-11]");
        let clipped = t.at_span(&(2.0..=4.0).into()).unwrap();
        assert!((clipped.start_value() - 4.0).abs() < EPSILON);
        assert!((clipped.end_value() - 2.0).abs() < EPSILON);
    }

    #[test]
    fn step_at_span_keeps_whole_treads() {
        let t: Temporal<f64> =
            "Interp=Step;[1@2020-01-01, 5@2020-01-03, 2@2020-01-05]".parse().unwrap();
        let clipped = t.at_span(&(0.0..=2.5).into()).unwrap();
        // Value 1 holds on [01, 03); value 2 at [05, 05].
        assert_eq!(clipped.time().num_spans(), 2);
    }

    #[test]
    fn at_tbox_intersects_both_axes() {
        let t = tf("[0@2020-01-01, 10@2020-01-11]");
        let tbox: TBox = "TBOX XT([2, 8], [2020-01-01, 2020-01-04])".parse().unwrap();
        let clipped = t.at_tbox(&tbox).unwrap();
        assert!((clipped.start_value() - 2.0).abs() < EPSILON);
        assert_eq!(
            clipped.end_timestamp(),
            parse_timestamp("2020-01-04").unwrap()
        );
    }

    #[test]
    fn arithmetic_lifts_pointwise() {
        let a = tf("[1@2020-01-01, 3@2020-01-03]");
        let b = tf("[10@2020-01-01, 10@2020-01-03]");
        assert_eq!(a.add(&b).unwrap(), tf("[11@2020-01-01, 13@2020-01-03]"));
        assert_eq!(a.subtract(&b).unwrap(), tf("[-9@2020-01-01, -7@2020-01-03]"));
        assert_eq!(a.add_value(1.0).unwrap(), tf("[2@2020-01-01, 4@2020-01-03]"));
    }

    #[test]
    fn product_of_opposite_ramps_has_a_vertex() {
        let a = tf("[0@2020-01-01, 4@2020-01-05]");
        let b = tf("[4@2020-01-01, 0@2020-01-05]");
        let product = a.multiply(&b).unwrap();
        // The product 4t(1-t) peaks at the midpoint with value 4.
        assert_eq!(product.max_value(), 4.0);
        assert_eq!(
            product.max_instant().timestamp(),
            parse_timestamp("2020-01-03").unwrap()
        );
    }

    #[test]
    fn division_by_zero_crossing_is_rejected() {
        let a = tf("[1@2020-01-01, 1@2020-01-03]");
        let b = tf("[-1@2020-01-01, 1@2020-01-03]");
        assert!(a.divide(&b).is_err());
        let c = tf("[2@2020-01-01, 4@2020-01-03]");
        assert!(a.divide(&c).unwrap().is_some());
    }

    #[test]
    fn distance_kinks_at_the_crossing() {
        let a = tf("[0@2020-01-01, 4@2020-01-05]");
        let b = tf("[4@2020-01-01, 0@2020-01-05]");
        let d = a.distance(&b).unwrap();
        assert_eq!(d.min_value(), 0.0);
        assert_eq!(
            d.min_instant().timestamp(),
            parse_timestamp("2020-01-03").unwrap()
        );
        assert_eq!(a.nearest_approach_distance(&b), 0.0);
    }

    #[test]
    fn nad_is_infinite_on_disjoint_domains() {
        let a = tf("[0@2020-01-01, 4@2020-01-05]");
        let b = tf("[0@2021-01-01, 4@2021-01-05]");
        assert_eq!(a.nearest_approach_distance(&b), f64::INFINITY);
    }

    #[test]
    fn abs_inserts_the_zero_kink() {
        let t = tf("[-2@2020-01-01, 2@2020-01-05]");
        let absolute = t.abs();
        assert_eq!(absolute.min_value(), 0.0);
        assert_eq!(
            absolute.min_instant().timestamp(),
            parse_timestamp("2020-01-03").unwrap()
        );
        assert_eq!(absolute.start_value(), 2.0);
    }

    #[test]
    fn integral_and_time_weighted_average() {
        let t = tf("[0@2020-01-01, 4@2020-01-05]");
        let four_days = 4.0 * 86_400.0;
        assert_eq!(t.integral(), 2.0 * four_days);
        assert_eq!(t.time_weighted_average(), 2.0);
        let step: Temporal<f64> =
            "Interp=Step;[1@2020-01-01, 3@2020-01-03, 3@2020-01-05]".parse().unwrap();
        // 1 for two days, then 3 for two days.
        assert_eq!(step.time_weighted_average(), 2.0);
    }

    #[test]
    fn value_span_of_an_int_is_canonical() {
        let t: Temporal<i32> = "{1@2020-01-01, 5@2020-01-02}".parse().unwrap();
        assert_eq!(t.value_span(), (1..6).into());
    }
}
