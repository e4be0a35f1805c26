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
use crate::temporal::tsequence::{split_top_level, TSequence};

/// A set of sequences with the same interpolation and strictly ordered,
/// non-overlapping periods.
///
/// Normalization merges sequences whose periods touch and whose joining
/// instants agree in value, which keeps the representation canonical without
/// ever merging across a genuine discontinuity.
#[derive(Clone, PartialEq)]
pub struct TSequenceSet<B: TBaseType> {
    sequences: Vec<TSequence<B>>,
    bbox: B::Bbox,
}

impl<B: TBaseType> TSequenceSet<B> {
    pub fn make(sequences: Vec<TSequence<B>>, normalize: bool) -> Result<Self, Error> {
        if sequences.is_empty() {
            return Err(Error::InvalidArg("a sequence set requires sequences"));
        }
        let interp = sequences[0].interpolation();
        if sequences.iter().any(|s| s.interpolation() != interp) {
            return Err(Error::InvalidArg(
                "all sequences in a set must share one interpolation",
            ));
        }
        let mut sequences = sequences;
        sequences.sort_by(|a, b| a.period().cmp(&b.period()));
        for pair in sequences.windows(2) {
            if pair[0].period().overlaps_span(&pair[1].period()) {
                return Err(Error::InvalidArg(
                    "sequence periods must not overlap",
                ));
            }
        }
        let sequences = if normalize {
            merge_adjacent(sequences)
        } else {
            sequences
        };
        let bbox = compute_bbox(&sequences);
        Ok(Self { sequences, bbox })
    }

    pub fn new(sequences: Vec<TSequence<B>>) -> Result<Self, Error> {
        Self::make(sequences, true)
    }

    pub fn from_sequence(sequence: TSequence<B>) -> Self {
        let bbox = sequence.bounding_box().clone();
        Self {
            sequences: vec![sequence],
            bbox,
        }
    }

    /// Breaks an instant stream into sequences wherever consecutive
    /// instants are farther apart than `max_time` or, for base types with a
    /// metric, `max_dist`.
    pub fn make_gaps(
        instants: Vec<TInstant<B>>,
        interp: TInterpolation,
        max_dist: Option<f64>,
        max_time: Option<TimeDelta>,
    ) -> Result<Self, Error> {
        if instants.is_empty() {
            return Err(Error::InvalidArg("a sequence set requires instants"));
        }
        let mut groups: Vec<Vec<TInstant<B>>> = Vec::new();
        let mut current: Vec<TInstant<B>> = Vec::new();
        for instant in instants {
            let split = current.last().is_some_and(|prev| {
                let time_gap = max_time
                    .is_some_and(|gap| instant.timestamp() - prev.timestamp() > gap);
                let dist_gap = max_dist.zip(B::base_distance(prev.value(), instant.value()))
                    .is_some_and(|(gap, d)| d > gap);
                time_gap || dist_gap
            });
            if split {
                groups.push(std::mem::take(&mut current));
            }
            current.push(instant);
        }
        groups.push(current);
        let sequences: Result<Vec<_>, _> = groups
            .into_iter()
            .map(|g| {
                let upper_inc = true;
                TSequence::make(g, true, upper_inc, interp, true)
            })
            .collect();
        Self::make(sequences?, false)
    }

    // ------------------------- Accessors -------------------------------------

    pub fn sequences(&self) -> &[TSequence<B>] {
        &self.sequences
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn start_sequence(&self) -> &TSequence<B> {
        &self.sequences[0]
    }

    pub fn end_sequence(&self) -> &TSequence<B> {
        self.sequences.last().expect("sequence sets are non-empty")
    }

    pub fn interpolation(&self) -> TInterpolation {
        self.sequences[0].interpolation()
    }

    pub fn bounding_box(&self) -> &B::Bbox {
        &self.bbox
    }

    pub fn num_instants(&self) -> usize {
        self.sequences.iter().map(|s| s.num_instants()).sum()
    }

    pub fn instants(&self) -> impl Iterator<Item = &TInstant<B>> {
        self.sequences.iter().flat_map(|s| s.instants().iter())
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.instants().map(|i| i.timestamp()).collect()
    }

    pub fn values(&self) -> Vec<B> {
        self.instants().map(|i| i.value().clone()).collect()
    }

    /// Time projection: the periods of the member sequences.
    pub fn time(&self) -> TsTzSpanSet {
        TsTzSpanSet::new(self.sequences.iter().map(|s| s.period()).collect())
            .expect("sequence sets are non-empty")
    }

    /// Covering period, gaps included.
    pub fn period(&self) -> TsTzSpan {
        self.start_sequence()
            .period()
            .hull(&self.end_sequence().period())
    }

    pub fn duration(&self, ignore_gaps: bool) -> TimeDelta {
        if ignore_gaps {
            self.period().duration()
        } else {
            self.sequences.iter().map(|s| s.duration()).sum()
        }
    }

    pub fn value_at_timestamp(&self, t: DateTime<Utc>, strict: bool) -> Option<B> {
        self.sequences
            .iter()
            .find_map(|s| s.value_at_timestamp(t, strict))
    }

    // ------------------------- Restriction -----------------------------------

    pub fn at_tstzspan(&self, span: &TsTzSpan) -> Option<TSequenceSet<B>> {
        let clipped: Vec<_> = self
            .sequences
            .iter()
            .filter_map(|s| s.at_tstzspan(span))
            .collect();
        Self::make(clipped, false).ok()
    }

    pub fn at_tstzspan_set(&self, spans: &TsTzSpanSet) -> Option<TSequenceSet<B>> {
        let clipped: Vec<_> = self
            .sequences
            .iter()
            .flat_map(|s| s.at_tstzspan_set(spans))
            .collect();
        Self::make(clipped, false).ok()
    }

    /// Time spans where the set equals `value`.
    pub fn value_time_spans(&self, value: &B) -> Option<TsTzSpanSet> {
        let mut spans = Vec::new();
        for sequence in &self.sequences {
            if let Some(set) = sequence.value_time_spans(value) {
                spans.extend(set.iter().copied());
            }
        }
        TsTzSpanSet::new(spans).ok()
    }

    /// Complement of a span set within the set's own time projection.
    pub(crate) fn complement_periods(&self, spans: &TsTzSpanSet) -> Option<TsTzSpanSet> {
        self.time().difference(spans)
    }

    // ------------------------- Transformations -------------------------------

    pub fn shift_scale_time(
        &self,
        shift: Option<TimeDelta>,
        duration: Option<TimeDelta>,
    ) -> TSequenceSet<B> {
        // Scaling maps the whole extent; each sequence is repositioned
        // proportionally inside it.
        let start = self.period().lower();
        let old_total = (self.period().upper() - start).num_microseconds().unwrap_or(0);
        let ratio = match (duration, old_total) {
            (Some(new), old) if old > 0 => {
                new.num_microseconds().unwrap_or(i64::MAX) as f64 / old as f64
            }
            _ => 1.0,
        };
        let new_start = match shift {
            Some(delta) => start + delta,
            None => start,
        };
        let sequences = self
            .sequences
            .iter()
            .map(|s| {
                let offset = s.start_timestamp() - start;
                let scaled_offset = crate::utils::scale_delta(offset, ratio);
                let scaled_duration = crate::utils::scale_delta(s.duration(), ratio);
                let shift_for_seq =
                    Some(new_start + scaled_offset - s.start_timestamp());
                let duration_for_seq =
                    (s.duration() > TimeDelta::zero()).then_some(scaled_duration);
                s.shift_scale_time(shift_for_seq, duration_for_seq)
            })
            .collect();
        Self::make(sequences, false).expect("rescaling preserves ordering")
    }

    pub fn step_to_linear(&self) -> TSequenceSet<B> {
        let pieces = self
            .sequences
            .iter()
            .flat_map(|s| s.step_to_linear())
            .collect();
        Self::make(pieces, true).expect("conversion preserves validity")
    }
}

/// Merges sequences whose periods touch with agreeing join instants.
fn merge_adjacent<B: TBaseType>(sequences: Vec<TSequence<B>>) -> Vec<TSequence<B>> {
    let mut result: Vec<TSequence<B>> = Vec::with_capacity(sequences.len());
    for seq in sequences {
        let Some(prev) = result.last() else {
            result.push(seq);
            continue;
        };
        let boundary = prev.end_timestamp() == seq.start_timestamp();
        let covered = prev.is_upper_inclusive() || seq.is_lower_inclusive();
        let agree = B::eq_base(prev.end_instant().value(), seq.start_instant().value());
        if boundary && covered && agree {
            let prev = result.pop().expect("non-empty");
            let mut instants = prev.instants().to_vec();
            instants.extend_from_slice(&seq.instants()[1..]);
            tracing::trace!("merged adjacent sequences at {:?}", seq.start_timestamp());
            result.push(TSequence::from_parts_unchecked(
                instants,
                prev.is_lower_inclusive(),
                seq.is_upper_inclusive(),
                prev.interpolation(),
            ));
        } else if boundary
            && prev.interpolation() == TInterpolation::Stepwise
            && !prev.is_upper_inclusive()
            && seq.is_lower_inclusive()
            && prev.num_instants() >= 2
        {
            // A step discontinuity is representable in one sequence: the
            // closing instant of an exclusive-upper step sequence only marks
            // the bound, so it is dropped in favor of the joining instant.
            let prev = result.pop().expect("non-empty");
            let mut instants = prev.instants().to_vec();
            instants.pop();
            instants.extend_from_slice(seq.instants());
            result.push(TSequence::from_parts_unchecked(
                instants,
                prev.is_lower_inclusive(),
                seq.is_upper_inclusive(),
                prev.interpolation(),
            ));
        } else {
            result.push(seq);
        }
    }
    result
}

fn compute_bbox<B: TBaseType>(sequences: &[TSequence<B>]) -> B::Bbox {
    let mut bbox = sequences[0].bounding_box().clone();
    for sequence in &sequences[1..] {
        bbox.extend(sequence.bounding_box());
    }
    let period = TsTzSpan::new(
        sequences[0].start_timestamp(),
        sequences[sequences.len() - 1].end_timestamp(),
        sequences[0].is_lower_inclusive(),
        sequences[sequences.len() - 1].is_upper_inclusive(),
    )
    .expect("sequence sets are time ordered");
    bbox.with_period(period)
}

impl<B: TBaseType> fmt::Display for TSequenceSet<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if B::CONTINUOUS && self.interpolation() == TInterpolation::Stepwise {
            f.write_str("Interp=Step;")?;
        }
        f.write_str("{")?;
        for (i, sequence) in self.sequences.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            // Member sequences inherit the set-level interpolation prefix.
            f.write_str(if sequence.is_lower_inclusive() { "[" } else { "(" })?;
            for (j, instant) in sequence.instants().iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{instant}")?;
            }
            f.write_str(if sequence.is_upper_inclusive() { "]" } else { ")" })?;
        }
        f.write_str("}")
    }
}

impl<B: TBaseType> fmt::Debug for TSequenceSet<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<B: TBaseType> FromStr for TSequenceSet<B> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rest = s.trim();
        let mut interp_prefix = None;
        if let Some(tail) = rest.strip_prefix("Interp=") {
            let (name, tail) = tail
                .split_once(';')
                .ok_or_else(|| ParseError(format!("missing ';' after Interp: {s}")))?;
            interp_prefix = Some(name.parse::<TInterpolation>()?);
            rest = tail.trim_start();
        }
        let inner = rest
            .strip_prefix('{')
            .and_then(|r| r.strip_suffix('}'))
            .ok_or_else(|| ParseError(format!("a sequence set is enclosed in braces: {s}")))?;
        let sequences: Result<Vec<TSequence<B>>, ParseError> = split_top_level(inner)
            .map(|part| {
                let part = part.trim();
                match interp_prefix {
                    Some(TInterpolation::Stepwise) => format!("Interp=Step;{part}").parse(),
                    _ => part.parse(),
                }
            })
            .collect();
        Self::make(sequences?, true).map_err(ParseError::from)
    }
}

impl<B: TBaseType> Hash for TSequenceSet<B> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sequences.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seqset(s: &str) -> TSequenceSet<f64> {
        s.parse().unwrap()
    }

    #[test]
    fn rejects_overlap_and_mixed_interpolation() {
        let a: TSequence<f64> = "[1@2020-01-01, 2@2020-01-05]".parse().unwrap();
        let b: TSequence<f64> = "[9@2020-01-03, 8@2020-01-08]".parse().unwrap();
        assert!(TSequenceSet::new(vec![a.clone(), b]).is_err());
        let c: TSequence<f64> = "Interp=Step;[1@2020-02-01, 2@2020-02-05]".parse().unwrap();
        assert!(TSequenceSet::new(vec![a, c]).is_err());
    }

    #[test]
    fn sorts_and_merges_touching_sequences() {
        let set = seqset("{[3@2020-01-03, 4@2020-01-04], [1@2020-01-01, 3@2020-01-03)}");
        assert_eq!(set.num_sequences(), 1);
        assert_eq!(
            set.to_string(),
            "{[1@2020-01-01 00:00:00+00, 3@2020-01-03 00:00:00+00, 4@2020-01-04 00:00:00+00]}"
        );
    }

    #[test]
    fn keeps_genuine_discontinuities_apart() {
        let set = seqset("{[1@2020-01-01, 3@2020-01-03), [9@2020-01-03, 8@2020-01-08]}");
        assert_eq!(set.num_sequences(), 2);
    }

    #[test]
    fn time_projection_and_duration() {
        let set = seqset("{[1@2020-01-01, 2@2020-01-03], [5@2020-01-05, 6@2020-01-06]}");
        assert_eq!(set.time().num_spans(), 2);
        assert_eq!(set.duration(false), TimeDelta::days(3));
        assert_eq!(set.duration(true), TimeDelta::days(5));
    }

    #[test]
    fn make_gaps_splits_on_time_and_distance() {
        let instants: Vec<TInstant<f64>> = vec![
            "1@2020-01-01".parse().unwrap(),
            "2@2020-01-02".parse().unwrap(),
            // Three-day silence: new sequence.
            "3@2020-01-05".parse().unwrap(),
            // Value jump beyond 10: new sequence.
            "20@2020-01-06".parse().unwrap(),
        ];
        let set = TSequenceSet::make_gaps(
            instants,
            TInterpolation::Linear,
            Some(10.0),
            Some(TimeDelta::days(1)),
        )
        .unwrap();
        assert_eq!(set.num_sequences(), 3);
    }

    #[test]
    fn parse_round_trip_with_step_prefix() {
        let text = "Interp=Step;{[1@2020-01-01 00:00:00+00, 2@2020-01-03 00:00:00+00)}";
        let set = seqset(text);
        assert_eq!(set.interpolation(), TInterpolation::Stepwise);
        assert_eq!(set.to_string(), text);
    }
}
