use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::collections::datetime::{TsTzSpan, TsTzSpanSet};
use crate::errors::{Error, ParseError};
use crate::temporal::base::{TBaseType, TOrderedType};
use crate::temporal::interpolation::TInterpolation;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tinstant_set::TInstantSet;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;

/// A temporal value: a time-indexed function into the base type `B`,
/// discretized as one of four subtypes.
///
/// Values are immutable after construction; every transformation returns a
/// new value. Restrictions over an empty or non-matching domain return
/// `None` rather than an error.
#[derive(Clone, PartialEq)]
pub enum Temporal<B: TBaseType> {
    Instant(TInstant<B>),
    InstantSet(TInstantSet<B>),
    Sequence(TSequence<B>),
    SequenceSet(TSequenceSet<B>),
}

impl<B: TBaseType> Temporal<B> {
    // ------------------------- Constructors ----------------------------------

    /// Canonical wrapper for a restriction result: no sequences is `None`,
    /// one becomes the `Sequence` variant, several a normalized set.
    pub(crate) fn from_sequences(mut sequences: Vec<TSequence<B>>) -> Option<Self> {
        match sequences.len() {
            0 => None,
            1 => Some(Temporal::Sequence(sequences.pop().expect("one element"))),
            _ => {
                let set = TSequenceSet::make(sequences, true).ok()?;
                if set.num_sequences() == 1 {
                    Some(Temporal::Sequence(set.sequences()[0].clone()))
                } else {
                    Some(Temporal::SequenceSet(set))
                }
            }
        }
    }

    /// Canonical wrapper for a discrete result.
    pub(crate) fn from_instants(mut instants: Vec<TInstant<B>>) -> Option<Self> {
        match instants.len() {
            0 => None,
            1 => Some(Temporal::Instant(instants.pop().expect("one element"))),
            _ => Some(Temporal::InstantSet(TInstantSet::from_sorted_unchecked(
                instants,
            ))),
        }
    }

    // ------------------------- Accessors -------------------------------------

    pub fn subtype_name(&self) -> &'static str {
        match self {
            Temporal::Instant(_) => "Instant",
            Temporal::InstantSet(_) => "InstantSet",
            Temporal::Sequence(_) => "Sequence",
            Temporal::SequenceSet(_) => "SequenceSet",
        }
    }

    /// Interpolation of the value; the discrete subtypes report
    /// [`TInterpolation::Discrete`].
    pub fn interpolation(&self) -> TInterpolation {
        match self {
            Temporal::Instant(_) | Temporal::InstantSet(_) => TInterpolation::Discrete,
            Temporal::Sequence(s) => s.interpolation(),
            Temporal::SequenceSet(s) => s.interpolation(),
        }
    }

    /// Header flags: dimensionality and capability bits of the value.
    pub fn flags(&self) -> crate::TemporalFlags {
        use crate::temporal::base::TempType;
        let mut flags = crate::TemporalFlags::none();
        if B::CONTINUOUS {
            flags |= crate::TemporalFlags::Continuous;
        }
        match B::TEMP_TYPE {
            TempType::GeomPoint => flags |= crate::TemporalFlags::Spatial,
            TempType::GeogPoint => {
                flags |= crate::TemporalFlags::Spatial | crate::TemporalFlags::Geodetic
            }
            _ => {}
        }
        if self.start_value().has_z() {
            flags |= crate::TemporalFlags::HasZ;
        }
        if !matches!(self, Temporal::Instant(_)) {
            flags |= crate::TemporalFlags::HasBBox;
        }
        flags
    }

    /// Bounding box; instants compute theirs, the other subtypes answer from
    /// the cache.
    pub fn bounding_box(&self) -> B::Bbox {
        match self {
            Temporal::Instant(i) => i.bounding_box(),
            Temporal::InstantSet(s) => s.bounding_box().clone(),
            Temporal::Sequence(s) => s.bounding_box().clone(),
            Temporal::SequenceSet(s) => s.bounding_box().clone(),
        }
    }

    pub fn instants(&self) -> Vec<TInstant<B>> {
        match self {
            Temporal::Instant(i) => vec![i.clone()],
            Temporal::InstantSet(s) => s.instants().to_vec(),
            Temporal::Sequence(s) => s.instants().to_vec(),
            Temporal::SequenceSet(s) => s.instants().cloned().collect(),
        }
    }

    pub fn num_instants(&self) -> usize {
        match self {
            Temporal::Instant(_) => 1,
            Temporal::InstantSet(s) => s.num_instants(),
            Temporal::Sequence(s) => s.num_instants(),
            Temporal::SequenceSet(s) => s.num_instants(),
        }
    }

    pub fn instant_n(&self, n: usize) -> Option<TInstant<B>> {
        self.instants().get(n).cloned()
    }

    pub fn start_instant(&self) -> TInstant<B> {
        match self {
            Temporal::Instant(i) => i.clone(),
            Temporal::InstantSet(s) => s.start_instant().clone(),
            Temporal::Sequence(s) => s.start_instant().clone(),
            Temporal::SequenceSet(s) => s.start_sequence().start_instant().clone(),
        }
    }

    pub fn end_instant(&self) -> TInstant<B> {
        match self {
            Temporal::Instant(i) => i.clone(),
            Temporal::InstantSet(s) => s.end_instant().clone(),
            Temporal::Sequence(s) => s.end_instant().clone(),
            Temporal::SequenceSet(s) => s.end_sequence().end_instant().clone(),
        }
    }

    pub fn values(&self) -> Vec<B> {
        self.instants().into_iter().map(|i| i.into_value()).collect()
    }

    pub fn start_value(&self) -> B {
        self.start_instant().into_value()
    }

    pub fn end_value(&self) -> B {
        self.end_instant().into_value()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.instants().iter().map(|i| i.timestamp()).collect()
    }

    pub fn num_timestamps(&self) -> usize {
        self.num_instants()
    }

    pub fn timestamp_n(&self, n: usize) -> Option<DateTime<Utc>> {
        self.timestamps().get(n).copied()
    }

    pub fn start_timestamp(&self) -> DateTime<Utc> {
        self.start_instant().timestamp()
    }

    pub fn end_timestamp(&self) -> DateTime<Utc> {
        self.end_instant().timestamp()
    }

    /// Time projection as a normalized span set.
    pub fn time(&self) -> TsTzSpanSet {
        match self {
            Temporal::Instant(i) => TsTzSpanSet::from_span(
                TsTzSpan::singleton(i.timestamp()).expect("valid timestamp"),
            ),
            Temporal::InstantSet(s) => s.time(),
            Temporal::Sequence(s) => TsTzSpanSet::from_span(s.period()),
            Temporal::SequenceSet(s) => s.time(),
        }
    }

    /// Covering time span, gaps included.
    pub fn tstzspan(&self) -> TsTzSpan {
        match self {
            Temporal::Instant(i) => TsTzSpan::singleton(i.timestamp()).expect("valid timestamp"),
            Temporal::InstantSet(s) => TsTzSpan::new(
                s.start_instant().timestamp(),
                s.end_instant().timestamp(),
                true,
                true,
            )
            .expect("instant sets are time ordered"),
            Temporal::Sequence(s) => s.period(),
            Temporal::SequenceSet(s) => s.period(),
        }
    }

    pub fn duration(&self, ignore_gaps: bool) -> TimeDelta {
        match self {
            Temporal::Instant(_) | Temporal::InstantSet(_) => {
                if ignore_gaps {
                    self.tstzspan().duration()
                } else {
                    TimeDelta::zero()
                }
            }
            Temporal::Sequence(s) => s.duration(),
            Temporal::SequenceSet(s) => s.duration(ignore_gaps),
        }
    }

    /// Value at a timestamp. With `strict` the timestamp must belong to the
    /// domain; otherwise exclusive sequence bounds answer with their limit
    /// value.
    pub fn value_at_timestamp(&self, t: DateTime<Utc>, strict: bool) -> Option<B> {
        match self {
            Temporal::Instant(i) => (i.timestamp() == t).then(|| i.value().clone()),
            Temporal::InstantSet(s) => s.value_at_timestamp(t).cloned(),
            Temporal::Sequence(s) => s.value_at_timestamp(t, strict),
            Temporal::SequenceSet(s) => s.value_at_timestamp(t, strict),
        }
    }

    /// Two-instant segments of the continuous subtypes.
    pub fn segments(&self) -> Vec<TSequence<B>> {
        match self {
            Temporal::Instant(_) | Temporal::InstantSet(_) => Vec::new(),
            Temporal::Sequence(s) => s.segments(),
            Temporal::SequenceSet(s) => s.sequences().iter().flat_map(|q| q.segments()).collect(),
        }
    }

    // ------------------------- Ever / always ---------------------------------

    /// Whether the value is ever equal to `value`, crossing included for
    /// linear sequences.
    pub fn ever_eq(&self, value: &B) -> bool {
        match self {
            Temporal::Instant(i) => B::eq_base(i.value(), value),
            Temporal::InstantSet(s) => s.instants().iter().any(|i| B::eq_base(i.value(), value)),
            Temporal::Sequence(s) => s.value_time_spans(value).is_some(),
            Temporal::SequenceSet(s) => s.value_time_spans(value).is_some(),
        }
    }

    /// Whether the value equals `value` on its whole domain.
    pub fn always_eq(&self, value: &B) -> bool {
        self.instants()
            .iter()
            .all(|i| B::eq_base(i.value(), value))
    }

    // ------------------------- Conversions -----------------------------------

    pub fn to_instant(&self) -> Result<TInstant<B>, Error> {
        let instants = self.instants();
        match instants.as_slice() {
            [single] => Ok(single.clone()),
            _ => Err(Error::InvalidArg(
                "only a single-instant value converts to an instant",
            )),
        }
    }

    pub fn to_instant_set(&self) -> TInstantSet<B> {
        TInstantSet::from_sorted_unchecked(self.instants())
    }

    pub fn to_sequence(&self, interp: TInterpolation) -> Result<TSequence<B>, Error> {
        match self {
            Temporal::Sequence(s) if s.interpolation() == interp => Ok(s.clone()),
            Temporal::SequenceSet(s) if s.num_sequences() == 1 => {
                let seq = &s.sequences()[0];
                if seq.interpolation() == interp {
                    Ok(seq.clone())
                } else {
                    TSequence::make(
                        seq.instants().to_vec(),
                        seq.is_lower_inclusive(),
                        seq.is_upper_inclusive(),
                        interp,
                        true,
                    )
                }
            }
            _ => TSequence::make(self.instants(), true, true, interp, true),
        }
    }

    pub fn to_sequence_set(&self, interp: TInterpolation) -> Result<TSequenceSet<B>, Error> {
        match self {
            Temporal::SequenceSet(s) if s.interpolation() == interp => Ok(s.clone()),
            Temporal::Sequence(s) if s.interpolation() == interp => {
                Ok(TSequenceSet::from_sequence(s.clone()))
            }
            Temporal::InstantSet(s) => {
                // Each instant becomes an instantaneous sequence.
                let sequences: Result<Vec<_>, _> = s
                    .instants()
                    .iter()
                    .map(|i| TSequence::make(vec![i.clone()], true, true, interp, false))
                    .collect();
                TSequenceSet::make(sequences?, false)
            }
            _ => Ok(TSequenceSet::from_sequence(self.to_sequence(interp)?)),
        }
    }

    /// Changes the interpolation, keeping the samples.
    pub fn set_interpolation(&self, interp: TInterpolation) -> Result<Temporal<B>, Error> {
        match interp {
            TInterpolation::Discrete => Ok(Temporal::InstantSet(self.to_instant_set())),
            _ => match self {
                Temporal::Instant(i) => Ok(Temporal::Instant(i.clone())),
                Temporal::SequenceSet(_) => {
                    Ok(Temporal::SequenceSet(self.to_sequence_set(interp)?))
                }
                _ => Ok(Temporal::Sequence(self.to_sequence(interp)?)),
            },
        }
    }

    /// Converts step sequences to linear ones with the same graph.
    pub fn step_to_linear(&self) -> Result<Temporal<B>, Error> {
        if !B::CONTINUOUS {
            return Err(Error::InvalidArg(
                "the base type does not support linear interpolation",
            ));
        }
        match self {
            Temporal::Sequence(s) => {
                Ok(Self::from_sequences(s.step_to_linear()).expect("conversion is total"))
            }
            Temporal::SequenceSet(s) => Ok(Temporal::SequenceSet(s.step_to_linear())),
            other => Ok(other.clone()),
        }
    }

    // ------------------------- Transformations -------------------------------

    /// Shifts the time dimension and/or rescales the total duration.
    pub fn shift_scale_time(
        &self,
        shift: Option<TimeDelta>,
        duration: Option<TimeDelta>,
    ) -> Temporal<B> {
        match self {
            Temporal::Instant(i) => Temporal::Instant(TInstant::new(
                i.value().clone(),
                i.timestamp() + shift.unwrap_or_else(TimeDelta::zero),
            )),
            Temporal::InstantSet(s) => {
                let start = s.start_instant().timestamp();
                let total = (s.end_instant().timestamp() - start)
                    .num_microseconds()
                    .unwrap_or(0);
                let ratio = match (duration, total) {
                    (Some(new), old) if old > 0 => {
                        new.num_microseconds().unwrap_or(i64::MAX) as f64 / old as f64
                    }
                    _ => 1.0,
                };
                let new_start = start + shift.unwrap_or_else(TimeDelta::zero);
                Temporal::InstantSet(TInstantSet::from_sorted_unchecked(
                    s.instants()
                        .iter()
                        .map(|i| {
                            let offset =
                                crate::utils::scale_delta(i.timestamp() - start, ratio);
                            TInstant::new(i.value().clone(), new_start + offset)
                        })
                        .collect(),
                ))
            }
            Temporal::Sequence(s) => Temporal::Sequence(s.shift_scale_time(shift, duration)),
            Temporal::SequenceSet(s) => Temporal::SequenceSet(s.shift_scale_time(shift, duration)),
        }
    }

    pub fn shift_time(&self, delta: TimeDelta) -> Temporal<B> {
        self.shift_scale_time(Some(delta), None)
    }

    pub fn scale_time(&self, duration: TimeDelta) -> Temporal<B> {
        self.shift_scale_time(None, Some(duration))
    }

    // ------------------------- Append / merge --------------------------------

    /// Appends an instant at or after the end, promoting the subtype as
    /// needed. Exceeding `max_dist` or `max_time` starts a new sequence.
    pub fn append_instant(
        &self,
        instant: TInstant<B>,
        max_dist: Option<f64>,
        max_time: Option<TimeDelta>,
    ) -> Result<Temporal<B>, Error> {
        let end = self.end_instant();
        if instant.timestamp() < end.timestamp() {
            return Err(Error::InvalidArg(
                "appended instants must not precede the end",
            ));
        }
        let gap = max_time
            .is_some_and(|gap| instant.timestamp() - end.timestamp() > gap)
            || max_dist
                .zip(B::base_distance(end.value(), instant.value()))
                .is_some_and(|(gap, d)| d > gap);
        match self {
            Temporal::Instant(i) => {
                if instant.timestamp() == i.timestamp() {
                    if B::eq_base(instant.value(), i.value()) {
                        return Ok(self.clone());
                    }
                    return Err(Error::InvalidArg(
                        "appending at the same timestamp requires an equal value",
                    ));
                }
                Ok(Temporal::InstantSet(TInstantSet::new(vec![
                    i.clone(),
                    instant,
                ])?))
            }
            Temporal::InstantSet(s) => {
                let mut instants = s.instants().to_vec();
                instants.push(instant);
                Ok(Temporal::InstantSet(TInstantSet::new(instants)?))
            }
            Temporal::Sequence(s) => {
                if gap {
                    let tail = TSequence::make(
                        vec![instant],
                        true,
                        true,
                        s.interpolation(),
                        false,
                    )?;
                    Ok(Temporal::SequenceSet(TSequenceSet::make(
                        vec![s.clone(), tail],
                        false,
                    )?))
                } else {
                    Ok(Temporal::Sequence(s.append_instant(instant)?))
                }
            }
            Temporal::SequenceSet(s) => {
                let mut sequences = s.sequences().to_vec();
                let last = sequences.pop().expect("sequence sets are non-empty");
                if gap {
                    sequences.push(last);
                    sequences.push(TSequence::make(
                        vec![instant],
                        true,
                        true,
                        s.interpolation(),
                        false,
                    )?);
                } else {
                    sequences.push(last.append_instant(instant)?);
                }
                Ok(Temporal::SequenceSet(TSequenceSet::make(sequences, false)?))
            }
        }
    }

    /// Appends a whole sequence after the end of the value.
    pub fn append_sequence(&self, sequence: TSequence<B>) -> Result<Temporal<B>, Error> {
        let mut sequences = match self {
            Temporal::Sequence(s) => vec![s.clone()],
            Temporal::SequenceSet(s) => s.sequences().to_vec(),
            _ => {
                return Err(Error::InvalidArg(
                    "only sequence values can append sequences",
                ))
            }
        };
        if sequence.start_timestamp() < sequences.last().expect("non-empty").end_timestamp() {
            return Err(Error::InvalidArg(
                "appended sequences must not precede the end",
            ));
        }
        sequences.push(sequence);
        let set = TSequenceSet::make(sequences, true)?;
        if set.num_sequences() == 1 {
            Ok(Temporal::Sequence(set.sequences()[0].clone()))
        } else {
            Ok(Temporal::SequenceSet(set))
        }
    }

    /// Merges two temporal values. Overlapping domains must agree in value
    /// within the shared tolerance.
    pub fn merge(&self, other: &Temporal<B>) -> Result<Temporal<B>, Error> {
        Self::merge_many(&[self.clone(), other.clone()])
    }

    pub fn merge_many(values: &[Temporal<B>]) -> Result<Temporal<B>, Error> {
        if values.is_empty() {
            return Err(Error::InvalidArg("merging requires at least one value"));
        }
        let discrete = values
            .iter()
            .all(|v| matches!(v, Temporal::Instant(_) | Temporal::InstantSet(_)));
        if discrete {
            let mut instants: Vec<TInstant<B>> = values.iter().flat_map(|v| v.instants()).collect();
            instants.sort_by_key(|i| i.timestamp());
            let mut merged: Vec<TInstant<B>> = Vec::with_capacity(instants.len());
            for instant in instants {
                if let Some(prev) = merged.last() {
                    if prev.timestamp() == instant.timestamp() {
                        if B::eq_base(prev.value(), instant.value()) {
                            continue;
                        }
                        return Err(Error::InvalidArg(
                            "merged values disagree at a shared timestamp",
                        ));
                    }
                }
                merged.push(instant);
            }
            return Self::from_instants(merged)
                .ok_or(Error::InvalidArg("merging requires at least one instant"));
        }
        if values
            .iter()
            .any(|v| matches!(v, Temporal::Instant(_) | Temporal::InstantSet(_)))
        {
            return Err(Error::TypeMismatch(
                "cannot merge discrete and continuous values",
            ));
        }
        let interp = values[0].interpolation();
        let mut sequences: Vec<TSequence<B>> = Vec::new();
        let mut covered: Option<TsTzSpanSet> = None;
        for value in values {
            if value.interpolation() != interp {
                return Err(Error::TypeMismatch(
                    "merged values must share one interpolation",
                ));
            }
            let contribution: Vec<TSequence<B>> = match value {
                Temporal::Sequence(s) => vec![s.clone()],
                Temporal::SequenceSet(s) => s.sequences().to_vec(),
                _ => unreachable!("discrete values handled above"),
            };
            for seq in contribution {
                match covered.clone() {
                    None => {
                        covered = Some(TsTzSpanSet::from_span(seq.period()));
                        sequences.push(seq);
                    }
                    Some(cov) => {
                        // Check agreement on the overlap, then keep only the
                        // uncovered part.
                        if let Some(overlap) =
                            cov.intersection(&TsTzSpanSet::from_span(seq.period()))
                        {
                            for span in overlap.iter() {
                                for existing in &sequences {
                                    let Some(piece) = existing.at_tstzspan(span) else {
                                        continue;
                                    };
                                    for instant in piece.instants() {
                                        let ours = seq.value_at_timestamp(
                                            instant.timestamp(),
                                            false,
                                        );
                                        if !ours.is_some_and(|v| B::eq_base(&v, instant.value()))
                                        {
                                            return Err(Error::InvalidArg(
                                                "merged values disagree on overlapping time",
                                            ));
                                        }
                                    }
                                }
                            }
                        }
                        if let Some(uncovered) =
                            TsTzSpanSet::from_span(seq.period()).difference(&cov)
                        {
                            sequences.extend(seq.at_tstzspan_set(&uncovered));
                            covered = Some(cov.union(&TsTzSpanSet::from_span(seq.period())));
                        }
                    }
                }
            }
        }
        let set = TSequenceSet::make(sequences, true)?;
        if set.num_sequences() == 1 {
            Ok(Temporal::Sequence(set.sequences()[0].clone()))
        } else {
            Ok(Temporal::SequenceSet(set))
        }
    }

    // ------------------------- Restriction: time -----------------------------

    pub fn at_timestamp(&self, t: DateTime<Utc>) -> Option<Temporal<B>> {
        match self {
            Temporal::Instant(i) => (i.timestamp() == t).then(|| self.clone()),
            Temporal::InstantSet(s) => s
                .value_at_timestamp(t)
                .map(|v| Temporal::Instant(TInstant::new(v.clone(), t))),
            Temporal::Sequence(s) => s.at_timestamp(t).map(Temporal::Instant),
            Temporal::SequenceSet(s) => s
                .sequences()
                .iter()
                .find_map(|q| q.at_timestamp(t))
                .map(Temporal::Instant),
        }
    }

    pub fn minus_timestamp(&self, t: DateTime<Utc>) -> Option<Temporal<B>> {
        let cut = TsTzSpanSet::from_span(TsTzSpan::singleton(t).expect("valid timestamp"));
        self.minus_time_set(&cut)
    }

    pub fn at_timestamp_set(&self, ts: &[DateTime<Utc>]) -> Option<Temporal<B>> {
        let mut instants: Vec<TInstant<B>> = ts
            .iter()
            .filter_map(|&t| {
                self.value_at_timestamp(t, true)
                    .map(|v| TInstant::new(v, t))
            })
            .collect();
        instants.sort_by_key(|i| i.timestamp());
        instants.dedup_by(|a, b| a.timestamp() == b.timestamp());
        Self::from_instants(instants)
    }

    pub fn minus_timestamp_set(&self, ts: &[DateTime<Utc>]) -> Option<Temporal<B>> {
        let spans: Vec<TsTzSpan> = ts
            .iter()
            .map(|&t| TsTzSpan::singleton(t).expect("valid timestamp"))
            .collect();
        match TsTzSpanSet::new(spans) {
            Ok(cut) => self.minus_time_set(&cut),
            Err(_) => Some(self.clone()),
        }
    }

    pub fn at_tstzspan(&self, span: &TsTzSpan) -> Option<Temporal<B>> {
        self.at_time_set(&TsTzSpanSet::from_span(*span))
    }

    pub fn minus_tstzspan(&self, span: &TsTzSpan) -> Option<Temporal<B>> {
        self.minus_time_set(&TsTzSpanSet::from_span(*span))
    }

    /// Restriction to a time span set: the portions of the value whose
    /// timestamps fall inside it.
    pub fn at_time_set(&self, spans: &TsTzSpanSet) -> Option<Temporal<B>> {
        match self {
            Temporal::Instant(i) => spans
                .contains_value(i.timestamp())
                .then(|| self.clone()),
            Temporal::InstantSet(s) => s
                .filter(|i| spans.contains_value(i.timestamp()))
                .map(Temporal::InstantSet)
                .map(Self::compact_discrete),
            Temporal::Sequence(s) => Self::from_sequences(s.at_tstzspan_set(spans)),
            Temporal::SequenceSet(s) => {
                let clipped: Vec<_> = s
                    .sequences()
                    .iter()
                    .flat_map(|q| q.at_tstzspan_set(spans))
                    .collect();
                Self::from_sequences(clipped)
            }
        }
    }

    /// Complement restriction: the portions outside the span set.
    pub fn minus_time_set(&self, spans: &TsTzSpanSet) -> Option<Temporal<B>> {
        match self {
            Temporal::Instant(i) => {
                (!spans.contains_value(i.timestamp())).then(|| self.clone())
            }
            Temporal::InstantSet(s) => s
                .filter(|i| !spans.contains_value(i.timestamp()))
                .map(Temporal::InstantSet)
                .map(Self::compact_discrete),
            Temporal::Sequence(s) => {
                let keep = s.complement_periods(spans)?;
                Self::from_sequences(s.at_tstzspan_set(&keep))
            }
            Temporal::SequenceSet(s) => {
                let keep = s.complement_periods(spans)?;
                let clipped: Vec<_> = s
                    .sequences()
                    .iter()
                    .flat_map(|q| q.at_tstzspan_set(&keep))
                    .collect();
                Self::from_sequences(clipped)
            }
        }
    }

    /// Applies a base-value function to every sample, preserving timestamps,
    /// bounds and interpolation. The caller guarantees the function keeps
    /// the sequence semantics intact (monotone reparametrizations, casts).
    pub(crate) fn map_base<C: TBaseType>(&self, f: &dyn Fn(&B) -> C) -> Temporal<C> {
        let map_instants = |instants: &[TInstant<B>]| -> Vec<TInstant<C>> {
            instants
                .iter()
                .map(|i| TInstant::new(f(i.value()), i.timestamp()))
                .collect()
        };
        let map_seq = |s: &TSequence<B>| -> TSequence<C> {
            let interp = if s.interpolation() == TInterpolation::Linear && !C::CONTINUOUS {
                TInterpolation::Stepwise
            } else {
                s.interpolation()
            };
            TSequence::from_parts_unchecked(
                map_instants(s.instants()),
                s.is_lower_inclusive(),
                s.is_upper_inclusive(),
                interp,
            )
        };
        match self {
            Temporal::Instant(i) => Temporal::Instant(TInstant::new(f(i.value()), i.timestamp())),
            Temporal::InstantSet(s) => Temporal::InstantSet(TInstantSet::from_sorted_unchecked(
                map_instants(s.instants()),
            )),
            Temporal::Sequence(s) => Temporal::Sequence(map_seq(s)),
            Temporal::SequenceSet(s) => Temporal::SequenceSet(
                TSequenceSet::make(s.sequences().iter().map(map_seq).collect(), false)
                    .expect("mapping preserves the time structure"),
            ),
        }
    }

    fn compact_discrete(value: Temporal<B>) -> Temporal<B> {
        match value {
            Temporal::InstantSet(s) if s.num_instants() == 1 => {
                Temporal::Instant(s.instants()[0].clone())
            }
            other => other,
        }
    }

    // ------------------------- Restriction: value ----------------------------

    /// The portions of the value equal to `value`. Linear sequences
    /// synthesize the crossing instants; the `at` side owns them.
    pub fn at_value(&self, value: &B) -> Option<Temporal<B>> {
        match self {
            Temporal::Instant(i) => B::eq_base(i.value(), value).then(|| self.clone()),
            Temporal::InstantSet(s) => s
                .filter(|i| B::eq_base(i.value(), value))
                .map(Temporal::InstantSet)
                .map(Self::compact_discrete),
            Temporal::Sequence(s) => {
                let spans = s.value_time_spans(value)?;
                Self::from_sequences(s.at_tstzspan_set(&spans))
            }
            Temporal::SequenceSet(s) => {
                let spans = s.value_time_spans(value)?;
                self.at_time_set(&spans)
            }
        }
    }

    /// The portions of the value different from `value`; boundary instants
    /// introduced by linear crossings belong to the `at` side.
    pub fn minus_value(&self, value: &B) -> Option<Temporal<B>> {
        match self {
            Temporal::Instant(i) => (!B::eq_base(i.value(), value)).then(|| self.clone()),
            Temporal::InstantSet(s) => s
                .filter(|i| !B::eq_base(i.value(), value))
                .map(Temporal::InstantSet)
                .map(Self::compact_discrete),
            Temporal::Sequence(s) => match s.value_time_spans(value) {
                None => Some(self.clone()),
                Some(spans) => self.minus_time_set(&spans),
            },
            Temporal::SequenceSet(s) => match s.value_time_spans(value) {
                None => Some(self.clone()),
                Some(spans) => self.minus_time_set(&spans),
            },
        }
    }

    /// Restriction to a set of values.
    pub fn at_values(&self, values: &[B]) -> Option<Temporal<B>> {
        match self {
            Temporal::Instant(i) => values
                .iter()
                .any(|v| B::eq_base(i.value(), v))
                .then(|| self.clone()),
            Temporal::InstantSet(s) => s
                .filter(|i| values.iter().any(|v| B::eq_base(i.value(), v)))
                .map(Temporal::InstantSet)
                .map(Self::compact_discrete),
            _ => {
                let spans = self.values_time_spans(values)?;
                self.at_time_set(&spans)
            }
        }
    }

    pub fn minus_values(&self, values: &[B]) -> Option<Temporal<B>> {
        match self {
            Temporal::Instant(i) => values
                .iter()
                .all(|v| !B::eq_base(i.value(), v))
                .then(|| self.clone()),
            Temporal::InstantSet(s) => s
                .filter(|i| values.iter().all(|v| !B::eq_base(i.value(), v)))
                .map(Temporal::InstantSet)
                .map(Self::compact_discrete),
            _ => match self.values_time_spans(values) {
                None => Some(self.clone()),
                Some(spans) => self.minus_time_set(&spans),
            },
        }
    }

    fn values_time_spans(&self, values: &[B]) -> Option<TsTzSpanSet> {
        let mut spans: Vec<TsTzSpan> = Vec::new();
        for value in values {
            let set = match self {
                Temporal::Sequence(s) => s.value_time_spans(value),
                Temporal::SequenceSet(s) => s.value_time_spans(value),
                _ => None,
            };
            if let Some(set) = set {
                spans.extend(set.iter().copied());
            }
        }
        TsTzSpanSet::new(spans).ok()
    }
}

/// Accessors and restrictions unlocked by a total order on the base type.
pub trait OrderedTemporal<B: TOrderedType> {
    fn min_value(&self) -> B;
    fn max_value(&self) -> B;
    fn min_instant(&self) -> TInstant<B>;
    fn max_instant(&self) -> TInstant<B>;
    fn at_min(&self) -> Option<Temporal<B>>;
    fn minus_min(&self) -> Option<Temporal<B>>;
    fn at_max(&self) -> Option<Temporal<B>>;
    fn minus_max(&self) -> Option<Temporal<B>>;
    fn ever_lt(&self, value: &B) -> bool;
    fn ever_le(&self, value: &B) -> bool;
    fn always_lt(&self, value: &B) -> bool;
    fn always_le(&self, value: &B) -> bool;
}

impl<B: TOrderedType> OrderedTemporal<B> for Temporal<B> {
    fn min_value(&self) -> B {
        self.values()
            .into_iter()
            .min_by(|a, b| B::cmp_base(a, b))
            .expect("temporal values are non-empty")
    }

    fn max_value(&self) -> B {
        self.values()
            .into_iter()
            .max_by(|a, b| B::cmp_base(a, b))
            .expect("temporal values are non-empty")
    }

    fn min_instant(&self) -> TInstant<B> {
        self.instants()
            .into_iter()
            .min_by(|a, b| B::cmp_base(a.value(), b.value()))
            .expect("temporal values are non-empty")
    }

    fn max_instant(&self) -> TInstant<B> {
        self.instants()
            .into_iter()
            .max_by(|a, b| B::cmp_base(a.value(), b.value()))
            .expect("temporal values are non-empty")
    }

    fn at_min(&self) -> Option<Temporal<B>> {
        self.at_value(&self.min_value())
    }

    fn minus_min(&self) -> Option<Temporal<B>> {
        self.minus_value(&self.min_value())
    }

    fn at_max(&self) -> Option<Temporal<B>> {
        self.at_value(&self.max_value())
    }

    fn minus_max(&self) -> Option<Temporal<B>> {
        self.minus_value(&self.max_value())
    }

    fn ever_lt(&self, value: &B) -> bool {
        B::cmp_base(&self.min_value(), value).is_lt()
    }

    fn ever_le(&self, value: &B) -> bool {
        B::cmp_base(&self.min_value(), value).is_le()
    }

    fn always_lt(&self, value: &B) -> bool {
        B::cmp_base(&self.max_value(), value).is_lt()
    }

    fn always_le(&self, value: &B) -> bool {
        B::cmp_base(&self.max_value(), value).is_le()
    }
}

impl<B: TBaseType> fmt::Display for Temporal<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temporal::Instant(i) => fmt::Display::fmt(i, f),
            Temporal::InstantSet(s) => fmt::Display::fmt(s, f),
            Temporal::Sequence(s) => fmt::Display::fmt(s, f),
            Temporal::SequenceSet(s) => fmt::Display::fmt(s, f),
        }
    }
}

impl<B: TBaseType> fmt::Debug for Temporal<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.subtype_name(), self)
    }
}

impl<B: TBaseType> FromStr for Temporal<B> {
    type Err = ParseError;

    /// Dispatches on the leading syntax: braces hold instant sets (when
    /// followed by bare instants) or sequence sets (when followed by
    /// bracketed sequences); brackets hold a sequence; anything else is a
    /// single instant.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let after_prefix = trimmed
            .strip_prefix("Interp=")
            .and_then(|tail| tail.split_once(';'))
            .map(|(_, rest)| rest.trim_start())
            .unwrap_or(trimmed);
        match after_prefix.chars().next() {
            Some('{') => {
                let first_inner = after_prefix[1..].trim_start().chars().next();
                if matches!(first_inner, Some('[') | Some('(')) {
                    Ok(Temporal::SequenceSet(trimmed.parse()?))
                } else {
                    Ok(Temporal::InstantSet(after_prefix.parse()?))
                }
            }
            Some('[') | Some('(') => Ok(Temporal::Sequence(trimmed.parse()?)),
            _ => Ok(Temporal::Instant(trimmed.parse()?)),
        }
    }
}

impl<B: TBaseType> Hash for Temporal<B> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Temporal::Instant(i) => i.hash(state),
            Temporal::InstantSet(s) => s.hash(state),
            Temporal::Sequence(s) => s.hash(state),
            Temporal::SequenceSet(s) => s.hash(state),
        }
    }
}

impl<B: TBaseType> From<TInstant<B>> for Temporal<B> {
    fn from(value: TInstant<B>) -> Self {
        Temporal::Instant(value)
    }
}

impl<B: TBaseType> From<TSequence<B>> for Temporal<B> {
    fn from(value: TSequence<B>) -> Self {
        Temporal::Sequence(value)
    }
}

impl<B: TBaseType> From<TSequenceSet<B>> for Temporal<B> {
    fn from(value: TSequenceSet<B>) -> Self {
        Temporal::SequenceSet(value)
    }
}
