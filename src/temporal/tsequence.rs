use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::boxes::r#box::BoundingBox;
use crate::collections::datetime::{TsTzSpan, TsTzSpanSet};
use crate::errors::{Error, ParseError};
use crate::temporal::base::TBaseType;
use crate::temporal::interpolation::TInterpolation;
use crate::temporal::tinstant::TInstant;
use crate::utils::{scale_delta, time_at_ratio, time_ratio};

/// A contiguous piecewise function on a time span: instants with strictly
/// increasing timestamps, bound inclusivity flags, and a step or linear
/// interpolation.
///
/// Construction normalizes on request: a middle instant collinear with its
/// neighbors (linear), or equal in value to its predecessor (step), is
/// removed. A singleton sequence is coerced to inclusive bounds.
#[derive(Clone, PartialEq)]
pub struct TSequence<B: TBaseType> {
    instants: Vec<TInstant<B>>,
    lower_inc: bool,
    upper_inc: bool,
    interp: TInterpolation,
    bbox: B::Bbox,
}

impl<B: TBaseType> TSequence<B> {
    /// Full-control constructor.
    pub fn make(
        instants: Vec<TInstant<B>>,
        lower_inc: bool,
        upper_inc: bool,
        interp: TInterpolation,
        normalize: bool,
    ) -> Result<Self, Error> {
        if instants.is_empty() {
            return Err(Error::InvalidArg("a sequence requires instants"));
        }
        if interp == TInterpolation::Discrete {
            return Err(Error::InvalidArg(
                "discrete interpolation belongs to instant sets",
            ));
        }
        if interp == TInterpolation::Linear && !B::CONTINUOUS {
            return Err(Error::InvalidArg(
                "the base type does not support linear interpolation",
            ));
        }
        for pair in instants.windows(2) {
            if pair[0].timestamp() >= pair[1].timestamp() {
                return Err(Error::InvalidArg(
                    "instant timestamps must strictly increase",
                ));
            }
            B::check_compatible(pair[0].value(), pair[1].value())?;
        }
        let (lower_inc, upper_inc) = if instants.len() == 1 {
            (true, true)
        } else {
            (lower_inc, upper_inc)
        };
        let instants = if normalize {
            normalize_instants(instants, interp)
        } else {
            instants
        };
        let bbox = compute_bbox(&instants, lower_inc, upper_inc);
        Ok(Self {
            instants,
            lower_inc,
            upper_inc,
            interp,
            bbox,
        })
    }

    /// Convenience constructor: inclusive lower bound, exclusive upper bound
    /// (inclusive for instantaneous sequences), normalizing.
    pub fn new(instants: Vec<TInstant<B>>, interp: TInterpolation) -> Result<Self, Error> {
        let upper_inc = instants.len() == 1;
        Self::make(instants, true, upper_inc, interp, true)
    }

    /// A constant sequence over a time span.
    pub fn from_value_and_tstz_span(
        value: B,
        span: TsTzSpan,
        interp: TInterpolation,
    ) -> Result<Self, Error> {
        let instants = if span.lower() == span.upper() {
            vec![TInstant::new(value, span.lower())]
        } else {
            vec![
                TInstant::new(value.clone(), span.lower()),
                TInstant::new(value, span.upper()),
            ]
        };
        Self::make(
            instants,
            span.is_lower_inclusive(),
            span.is_upper_inclusive(),
            interp,
            false,
        )
    }

    pub(crate) fn from_parts_unchecked(
        instants: Vec<TInstant<B>>,
        lower_inc: bool,
        upper_inc: bool,
        interp: TInterpolation,
    ) -> Self {
        let (lower_inc, upper_inc) = if instants.len() == 1 {
            (true, true)
        } else {
            (lower_inc, upper_inc)
        };
        let bbox = compute_bbox(&instants, lower_inc, upper_inc);
        Self {
            instants,
            lower_inc,
            upper_inc,
            interp,
            bbox,
        }
    }

    // ------------------------- Accessors -------------------------------------

    pub fn instants(&self) -> &[TInstant<B>] {
        &self.instants
    }

    pub fn num_instants(&self) -> usize {
        self.instants.len()
    }

    pub fn start_instant(&self) -> &TInstant<B> {
        &self.instants[0]
    }

    pub fn end_instant(&self) -> &TInstant<B> {
        self.instants.last().expect("sequences are non-empty")
    }

    pub fn is_lower_inclusive(&self) -> bool {
        self.lower_inc
    }

    pub fn is_upper_inclusive(&self) -> bool {
        self.upper_inc
    }

    pub fn interpolation(&self) -> TInterpolation {
        self.interp
    }

    pub fn bounding_box(&self) -> &B::Bbox {
        &self.bbox
    }

    pub fn start_timestamp(&self) -> DateTime<Utc> {
        self.instants[0].timestamp()
    }

    pub fn end_timestamp(&self) -> DateTime<Utc> {
        self.end_instant().timestamp()
    }

    /// The time span on which the sequence is defined, with its exact bound
    /// inclusivity.
    pub fn period(&self) -> TsTzSpan {
        TsTzSpan::new(
            self.start_timestamp(),
            self.end_timestamp(),
            self.lower_inc,
            self.upper_inc,
        )
        .expect("sequence timestamps are ordered")
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.instants.iter().map(|i| i.timestamp()).collect()
    }

    pub fn values(&self) -> Vec<B> {
        self.instants.iter().map(|i| i.value().clone()).collect()
    }

    pub fn duration(&self) -> TimeDelta {
        self.end_timestamp() - self.start_timestamp()
    }

    /// Two-instant sub-sequences, one per segment.
    pub fn segments(&self) -> Vec<TSequence<B>> {
        if self.instants.len() < 2 {
            return vec![self.clone()];
        }
        let n = self.instants.len() - 1;
        (0..n)
            .map(|i| {
                Self::from_parts_unchecked(
                    vec![self.instants[i].clone(), self.instants[i + 1].clone()],
                    if i == 0 { self.lower_inc } else { true },
                    if i == n - 1 { self.upper_inc } else { false },
                    self.interp,
                )
            })
            .collect()
    }

    // ------------------------- Value lookup ----------------------------------

    /// Value at `t`. With `strict` the timestamp must belong to the period
    /// (bound inclusivity honored); otherwise the closed hull of the
    /// timestamps is accepted, answering with the limit value at an
    /// exclusive bound.
    pub fn value_at_timestamp(&self, t: DateTime<Utc>, strict: bool) -> Option<B> {
        if strict && !self.period().contains_value(t) {
            return None;
        }
        if t < self.start_timestamp() || t > self.end_timestamp() {
            return None;
        }
        Some(self.value_at_raw(t))
    }

    /// Value at a timestamp known to lie within the closed timestamp hull.
    pub(crate) fn value_at_raw(&self, t: DateTime<Utc>) -> B {
        match self
            .instants
            .binary_search_by_key(&t, |i| i.timestamp())
        {
            Ok(idx) => self.instants[idx].value().clone(),
            Err(idx) => {
                // t lies strictly between instants idx-1 and idx.
                let prev = &self.instants[idx - 1];
                match self.interp {
                    TInterpolation::Linear => {
                        let next = &self.instants[idx];
                        let ratio = time_ratio(t, prev.timestamp(), next.timestamp());
                        B::interpolate(prev.value(), next.value(), ratio)
                    }
                    _ => prev.value().clone(),
                }
            }
        }
    }

    /// Left-limit value at `t`: what the sequence evaluates to just before
    /// `t`. Differs from [`Self::value_at_raw`] only for step sequences at
    /// exact sample timestamps.
    fn value_before(&self, t: DateTime<Utc>) -> B {
        if self.interp == TInterpolation::Linear {
            return self.value_at_raw(t);
        }
        match self.instants.binary_search_by_key(&t, |i| i.timestamp()) {
            Ok(0) | Err(0) => self.instants[0].value().clone(),
            Ok(idx) => self.instants[idx - 1].value().clone(),
            Err(idx) => self.instants[idx - 1].value().clone(),
        }
    }

    // ------------------------- Restriction -----------------------------------

    pub fn at_timestamp(&self, t: DateTime<Utc>) -> Option<TInstant<B>> {
        if !self.period().contains_value(t) {
            return None;
        }
        Some(TInstant::new(self.value_at_raw(t), t))
    }

    /// Restricts the sequence to a time span, synthesizing interpolated
    /// bound instants as needed.
    pub fn at_tstzspan(&self, span: &TsTzSpan) -> Option<TSequence<B>> {
        let inter = self.period().intersection(span)?;
        let (lo, hi) = (inter.lower(), inter.upper());
        if lo == hi {
            return Some(Self::from_parts_unchecked(
                vec![TInstant::new(self.value_at_raw(lo), lo)],
                true,
                true,
                self.interp,
            ));
        }
        let mut instants = Vec::new();
        instants.push(TInstant::new(self.value_at_raw(lo), lo));
        for instant in &self.instants {
            if instant.timestamp() > lo && instant.timestamp() < hi {
                instants.push(instant.clone());
            }
        }
        let closing = if inter.is_upper_inclusive() {
            self.value_at_raw(hi)
        } else {
            self.value_before(hi)
        };
        instants.push(TInstant::new(closing, hi));
        Some(Self::from_parts_unchecked(
            instants,
            inter.is_lower_inclusive(),
            inter.is_upper_inclusive(),
            self.interp,
        ))
    }

    /// Restricts the sequence to a set of time spans, in time order.
    pub fn at_tstzspan_set(&self, spans: &TsTzSpanSet) -> Vec<TSequence<B>> {
        spans
            .iter()
            .filter_map(|span| self.at_tstzspan(span))
            .collect()
    }

    /// Complement of a span set within the sequence's own period.
    pub(crate) fn complement_periods(&self, spans: &TsTzSpanSet) -> Option<TsTzSpanSet> {
        TsTzSpanSet::from_span(self.period()).difference(spans)
    }

    /// The time spans over which the sequence equals `value`: whole
    /// segments for constant stretches, degenerate spans for linear
    /// crossings. The result is already clipped to the period.
    pub fn value_time_spans(&self, value: &B) -> Option<TsTzSpanSet> {
        let mut spans: Vec<TsTzSpan> = Vec::new();
        let n = self.instants.len();
        match self.interp {
            TInterpolation::Linear => {
                for window in self.instants.windows(2) {
                    let (a, b) = (&window[0], &window[1]);
                    if B::eq_base(a.value(), b.value()) {
                        if B::eq_base(a.value(), value) {
                            spans.push(
                                TsTzSpan::new(a.timestamp(), b.timestamp(), true, true)
                                    .expect("ordered instants"),
                            );
                        }
                    } else if let Some(ratio) = B::locate(a.value(), b.value(), value) {
                        let t = time_at_ratio(ratio, a.timestamp(), b.timestamp());
                        spans.push(TsTzSpan::singleton(t).expect("valid timestamp"));
                    }
                }
                if n == 1 && B::eq_base(self.instants[0].value(), value) {
                    spans.push(self.period());
                }
            }
            _ => {
                for window in self.instants.windows(2) {
                    let (a, b) = (&window[0], &window[1]);
                    if B::eq_base(a.value(), value) {
                        spans.push(
                            TsTzSpan::new(a.timestamp(), b.timestamp(), true, false)
                                .expect("ordered instants"),
                        );
                    }
                }
                if B::eq_base(self.end_instant().value(), value) {
                    spans.push(
                        TsTzSpan::singleton(self.end_timestamp()).expect("valid timestamp"),
                    );
                }
            }
        }
        let candidate = TsTzSpanSet::new(spans).ok()?;
        candidate.intersection_span(&self.period())
    }

    // ------------------------- Transformations -------------------------------

    /// Shifts the sequence in time and/or rescales its duration.
    pub fn shift_scale_time(
        &self,
        shift: Option<TimeDelta>,
        duration: Option<TimeDelta>,
    ) -> TSequence<B> {
        let start = self.start_timestamp();
        let new_start = match shift {
            Some(delta) => start + delta,
            None => start,
        };
        let old_duration = self.duration();
        let ratio = match (duration, old_duration.num_microseconds()) {
            (Some(new), Some(old)) if old > 0 => {
                new.num_microseconds().unwrap_or(i64::MAX) as f64 / old as f64
            }
            _ => 1.0,
        };
        let instants = self
            .instants
            .iter()
            .map(|i| {
                let offset = scale_delta(i.timestamp() - start, ratio);
                TInstant::new(i.value().clone(), new_start + offset)
            })
            .collect();
        Self::from_parts_unchecked(instants, self.lower_inc, self.upper_inc, self.interp)
    }

    /// Replaces each step segment with a pair of constant-valued linear
    /// segments, splitting at discontinuities. The result covers the same
    /// period with the same values.
    pub fn step_to_linear(&self) -> Vec<TSequence<B>> {
        if self.interp == TInterpolation::Linear || self.instants.len() == 1 {
            let mut copy = self.clone();
            copy.interp = TInterpolation::Linear;
            return vec![copy];
        }
        let mut result = Vec::new();
        let n = self.instants.len();
        for (i, window) in self.instants.windows(2).enumerate() {
            let (a, b) = (&window[0], &window[1]);
            let last = i + 2 == n;
            let upper_inc = last && self.upper_inc && B::eq_base(a.value(), b.value());
            result.push(Self::from_parts_unchecked(
                vec![
                    TInstant::new(a.value().clone(), a.timestamp()),
                    TInstant::new(a.value().clone(), b.timestamp()),
                ],
                if i == 0 { self.lower_inc } else { true },
                upper_inc,
                TInterpolation::Linear,
            ));
            if last && self.upper_inc && !B::eq_base(a.value(), b.value()) {
                result.push(Self::from_parts_unchecked(
                    vec![b.clone()],
                    true,
                    true,
                    TInterpolation::Linear,
                ));
            }
        }
        result
    }

    /// Appends an instant at a timestamp at or after the end of the
    /// sequence. An equal timestamp requires an equal value.
    pub fn append_instant(&self, instant: TInstant<B>) -> Result<TSequence<B>, Error> {
        let end = self.end_timestamp();
        if instant.timestamp() < end {
            return Err(Error::InvalidArg(
                "appended instants must not precede the sequence end",
            ));
        }
        if instant.timestamp() == end {
            if !B::eq_base(instant.value(), self.end_instant().value()) {
                return Err(Error::InvalidArg(
                    "appending at the end timestamp requires an equal value",
                ));
            }
            return Ok(self.clone());
        }
        let mut instants = self.instants.clone();
        instants.push(instant);
        Self::make(instants, self.lower_inc, true, self.interp, true)
    }
}

fn normalize_instants<B: TBaseType>(
    instants: Vec<TInstant<B>>,
    interp: TInterpolation,
) -> Vec<TInstant<B>> {
    if instants.len() < 3 || interp == TInterpolation::Discrete {
        return instants;
    }
    let mut kept: Vec<TInstant<B>> = Vec::with_capacity(instants.len());
    for instant in instants {
        while kept.len() >= 2 {
            let a = &kept[kept.len() - 2];
            let b = &kept[kept.len() - 1];
            let ratio = time_ratio(b.timestamp(), a.timestamp(), instant.timestamp());
            let redundant = match interp {
                TInterpolation::Linear => B::collinear(a.value(), b.value(), instant.value(), ratio),
                _ => B::eq_base(a.value(), b.value()),
            };
            if redundant {
                let removed = kept.pop();
                tracing::trace!(
                    "normalization removed redundant instant at {:?}",
                    removed.map(|r| r.timestamp())
                );
            } else {
                break;
            }
        }
        kept.push(instant);
    }
    kept
}

fn compute_bbox<B: TBaseType>(
    instants: &[TInstant<B>],
    lower_inc: bool,
    upper_inc: bool,
) -> B::Bbox {
    let mut bbox = instants[0].bounding_box();
    for instant in &instants[1..] {
        bbox.extend(&instant.bounding_box());
    }
    let period = TsTzSpan::new(
        instants[0].timestamp(),
        instants[instants.len() - 1].timestamp(),
        lower_inc || instants.len() == 1,
        upper_inc || instants.len() == 1,
    )
    .expect("sequence timestamps are ordered");
    bbox.with_period(period)
}

impl<B: TBaseType> fmt::Display for TSequence<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if B::CONTINUOUS && self.interp == TInterpolation::Stepwise {
            f.write_str("Interp=Step;")?;
        }
        f.write_str(if self.lower_inc { "[" } else { "(" })?;
        for (i, instant) in self.instants.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{instant}")?;
        }
        f.write_str(if self.upper_inc { "]" } else { ")" })
    }
}

impl<B: TBaseType> fmt::Debug for TSequence<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<B: TBaseType> FromStr for TSequence<B> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rest = s.trim();
        let mut interp = if B::CONTINUOUS {
            TInterpolation::Linear
        } else {
            TInterpolation::Stepwise
        };
        if let Some(tail) = rest.strip_prefix("Interp=") {
            let (name, tail) = tail
                .split_once(';')
                .ok_or_else(|| ParseError(format!("missing ';' after Interp: {s}")))?;
            interp = name.parse()?;
            rest = tail.trim_start();
        }
        let lower_inc = match rest.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => {
                return Err(ParseError(format!(
                    "a sequence must start with '[' or '(': {s}"
                )))
            }
        };
        let upper_inc = match rest.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => {
                return Err(ParseError(format!(
                    "a sequence must end with ']' or ')': {s}"
                )))
            }
        };
        let inner = &rest[1..rest.len() - 1];
        let instants: Result<Vec<TInstant<B>>, ParseError> =
            split_top_level(inner).map(|part| part.parse()).collect();
        Self::make(instants?, lower_inc, upper_inc, interp, true).map_err(ParseError::from)
    }
}

/// Splits a comma-separated list at depth zero, tracking parentheses and
/// double quotes so point and text values survive intact.
pub(crate) fn split_top_level(s: &str) -> impl Iterator<Item = &str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' | '[' if !in_quotes => depth += 1,
            ')' | ']' if !in_quotes => depth = depth.saturating_sub(1),
            ',' if depth == 0 && !in_quotes => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts.into_iter()
}

impl<B: TBaseType> Hash for TSequence<B> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instants.hash(state);
        self.lower_inc.hash(state);
        self.upper_inc.hash(state);
        self.interp.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_timestamp;

    fn seq(s: &str) -> TSequence<f64> {
        s.parse().unwrap()
    }

    #[test]
    fn construction_validates_order_and_interp() {
        let a: TInstant<f64> = "1@2020-01-02".parse().unwrap();
        let b: TInstant<f64> = "2@2020-01-01".parse().unwrap();
        assert!(TSequence::new(vec![a], TInterpolation::Linear).is_ok());
        let a: TInstant<f64> = "1@2020-01-02".parse().unwrap();
        assert!(TSequence::new(vec![b, a], TInterpolation::Linear).is_err());
        let c: TInstant<i32> = "1@2020-01-01".parse().unwrap();
        assert!(TSequence::new(vec![c], TInterpolation::Linear).is_err());
    }

    #[test]
    fn linear_normalization_removes_collinear_middles() {
        let s = seq("[1@2020-01-01, 2@2020-01-02, 3@2020-01-03]");
        assert_eq!(s.num_instants(), 2);
        // Normalizing twice is the identity.
        let again = TSequence::make(
            s.instants().to_vec(),
            s.is_lower_inclusive(),
            s.is_upper_inclusive(),
            s.interpolation(),
            true,
        )
        .unwrap();
        assert_eq!(s, again);
    }

    #[test]
    fn step_normalization_removes_repeats() {
        let s: TSequence<i32> = "[1@2020-01-01, 1@2020-01-02, 2@2020-01-03]".parse().unwrap();
        assert_eq!(s.num_instants(), 2);
        assert_eq!(s.values(), vec![1, 2]);
    }

    #[test]
    fn singleton_is_coerced_inclusive() {
        let s: TSequence<f64> = TSequence::make(
            vec!["1@2020-01-01".parse().unwrap()],
            true,
            false,
            TInterpolation::Linear,
            true,
        )
        .unwrap();
        assert!(s.is_upper_inclusive());
    }

    #[test]
    fn linear_lookup_interpolates() {
        let s = seq("[1@2020-01-01, 3@2020-01-03]");
        let mid = parse_timestamp("2020-01-02").unwrap();
        assert_eq!(s.value_at_timestamp(mid, true), Some(2.0));
        let outside = parse_timestamp("2020-01-04").unwrap();
        assert_eq!(s.value_at_timestamp(outside, false), None);
    }

    #[test]
    fn step_lookup_returns_left_value() {
        let s: TSequence<f64> = "Interp=Step;[1@2020-01-01, 3@2020-01-03]".parse().unwrap();
        let mid = parse_timestamp("2020-01-02").unwrap();
        assert_eq!(s.value_at_timestamp(mid, true), Some(1.0));
        assert_eq!(
            s.value_at_timestamp(parse_timestamp("2020-01-03").unwrap(), true),
            Some(3.0)
        );
    }

    #[test]
    fn strictness_honors_exclusive_bounds() {
        let s = seq("(1@2020-01-01, 3@2020-01-03)");
        let start = parse_timestamp("2020-01-01").unwrap();
        assert_eq!(s.value_at_timestamp(start, true), None);
        assert_eq!(s.value_at_timestamp(start, false), Some(1.0));
    }

    #[test]
    fn restriction_to_a_span_interpolates_bounds() {
        let s = seq("[1@2020-01-01, 5@2020-01-05]");
        let span: TsTzSpan = "[2020-01-02, 2020-01-03]".parse().unwrap();
        let clipped = s.at_tstzspan(&span).unwrap();
        assert_eq!(clipped.values(), vec![2.0, 3.0]);
        assert!(clipped.is_lower_inclusive() && clipped.is_upper_inclusive());
        // Disjoint span yields nothing.
        let far: TsTzSpan = "[2021-01-01, 2021-01-02]".parse().unwrap();
        assert!(s.at_tstzspan(&far).is_none());
    }

    #[test]
    fn step_restriction_closes_with_the_left_value() {
        let s: TSequence<f64> =
            "Interp=Step;[1@2020-01-01, 2@2020-01-03, 3@2020-01-05]".parse().unwrap();
        let span: TsTzSpan = "[2020-01-01, 2020-01-03)".parse().unwrap();
        let clipped = s.at_tstzspan(&span).unwrap();
        assert_eq!(clipped.values(), vec![1.0, 1.0]);
        assert!(!clipped.is_upper_inclusive());
    }

    #[test]
    fn value_crossing_synthesizes_the_instant() {
        // The seed scenario: at([1@2020-01-01, 3@2020-01-03], 2) hits
        // 2@2020-01-02.
        let s = seq("[1@2020-01-01, 3@2020-01-03]");
        let spans = s.value_time_spans(&2.0).unwrap();
        assert_eq!(spans.num_spans(), 1);
        assert_eq!(
            spans.start_span().lower(),
            parse_timestamp("2020-01-02").unwrap()
        );
        assert_eq!(spans.start_span().lower(), spans.start_span().upper());
    }

    #[test]
    fn constant_linear_stretch_matches_as_a_span() {
        let s = seq("[2@2020-01-01, 2@2020-01-03, 4@2020-01-05]");
        let spans = s.value_time_spans(&2.0).unwrap();
        assert_eq!(spans.num_spans(), 1);
        assert_eq!(
            spans.start_span().upper(),
            parse_timestamp("2020-01-03").unwrap()
        );
    }

    #[test]
    fn step_value_spans_are_right_open() {
        let s: TSequence<f64> =
            "Interp=Step;[1@2020-01-01, 2@2020-01-03, 1@2020-01-05]".parse().unwrap();
        let spans = s.value_time_spans(&1.0).unwrap();
        assert_eq!(spans.num_spans(), 2);
        assert!(!spans.start_span().is_upper_inclusive());
        // The closing instant carries value 1 and the upper bound is
        // inclusive, so the last span is the degenerate end instant.
        assert_eq!(
            spans.end_span().lower(),
            parse_timestamp("2020-01-05").unwrap()
        );
    }

    #[test]
    fn shift_scale_round_trip() {
        let s = seq("[1@2020-01-01, 3@2020-01-03]");
        let shifted = s.shift_scale_time(Some(TimeDelta::days(2)), Some(TimeDelta::days(4)));
        assert_eq!(shifted.start_timestamp(), parse_timestamp("2020-01-03").unwrap());
        assert_eq!(shifted.duration(), TimeDelta::days(4));
        let back = shifted.shift_scale_time(Some(TimeDelta::days(-2)), Some(TimeDelta::days(2)));
        assert_eq!(back, seq("[1@2020-01-01, 3@2020-01-03]"));
    }

    #[test]
    fn step_to_linear_splits_at_jumps() {
        let s: TSequence<f64> =
            "Interp=Step;[1@2020-01-01, 2@2020-01-03]".parse().unwrap();
        let pieces = s.step_to_linear();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].values(), vec![1.0, 1.0]);
        assert!(!pieces[0].is_upper_inclusive());
        assert_eq!(pieces[1].values(), vec![2.0]);
    }

    #[test]
    fn append_extends_or_rejects() {
        let s = seq("[1@2020-01-01, 3@2020-01-03]");
        let appended = s.append_instant("5@2020-01-05".parse().unwrap()).unwrap();
        // 1 → 3 → 5 is collinear, so normalization folds the middle.
        assert_eq!(appended.num_instants(), 2);
        assert_eq!(appended.end_timestamp(), parse_timestamp("2020-01-05").unwrap());
        assert!(s.append_instant("9@2019-01-01".parse().unwrap()).is_err());
    }
}
