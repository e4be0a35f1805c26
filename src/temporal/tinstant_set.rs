use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::boxes::r#box::BoundingBox;
use crate::collections::datetime::{TsTzSpan, TsTzSpanSet};
use crate::errors::{Error, ParseError};
use crate::temporal::base::TBaseType;
use crate::temporal::tinstant::TInstant;

/// A set of instants with strictly increasing timestamps, the discrete
/// subtype: the value is undefined between samples.
#[derive(Clone, PartialEq)]
pub struct TInstantSet<B: TBaseType> {
    instants: Vec<TInstant<B>>,
    bbox: B::Bbox,
}

impl<B: TBaseType> TInstantSet<B> {
    /// Builds an instant set, validating that timestamps strictly increase
    /// and that the values are mutually compatible.
    pub fn new(instants: Vec<TInstant<B>>) -> Result<Self, Error> {
        if instants.is_empty() {
            return Err(Error::InvalidArg("an instant set requires instants"));
        }
        for pair in instants.windows(2) {
            if pair[0].timestamp() >= pair[1].timestamp() {
                return Err(Error::InvalidArg(
                    "instant timestamps must strictly increase",
                ));
            }
            B::check_compatible(pair[0].value(), pair[1].value())?;
        }
        let bbox = compute_bbox(&instants);
        Ok(Self { instants, bbox })
    }

    pub(crate) fn from_sorted_unchecked(instants: Vec<TInstant<B>>) -> Self {
        debug_assert!(instants
            .windows(2)
            .all(|p| p[0].timestamp() < p[1].timestamp()));
        let bbox = compute_bbox(&instants);
        Self { instants, bbox }
    }

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
        self.instants.last().expect("instant sets are non-empty")
    }

    pub fn bounding_box(&self) -> &B::Bbox {
        &self.bbox
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.instants.iter().map(|i| i.timestamp()).collect()
    }

    pub fn values(&self) -> Vec<B> {
        self.instants.iter().map(|i| i.value().clone()).collect()
    }

    /// Time projection: one degenerate span per instant.
    pub fn time(&self) -> TsTzSpanSet {
        TsTzSpanSet::new(
            self.instants
                .iter()
                .map(|i| TsTzSpan::singleton(i.timestamp()).expect("valid timestamp"))
                .collect(),
        )
        .expect("instant sets are non-empty")
    }

    pub fn value_at_timestamp(&self, t: DateTime<Utc>) -> Option<&B> {
        self.instants
            .binary_search_by_key(&t, |i| i.timestamp())
            .ok()
            .map(|idx| self.instants[idx].value())
    }

    /// Keeps the instants satisfying `keep`; `None` when nothing survives.
    pub(crate) fn filter(&self, mut keep: impl FnMut(&TInstant<B>) -> bool) -> Option<Self> {
        let kept: Vec<_> = self
            .instants
            .iter()
            .filter(|i| keep(i))
            .cloned()
            .collect();
        if kept.is_empty() {
            None
        } else {
            Some(Self::from_sorted_unchecked(kept))
        }
    }
}

fn compute_bbox<B: TBaseType>(instants: &[TInstant<B>]) -> B::Bbox {
    let mut bbox = instants[0].bounding_box();
    for instant in &instants[1..] {
        bbox.extend(&instant.bounding_box());
    }
    bbox
}

impl<B: TBaseType> fmt::Display for TInstantSet<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, instant) in self.instants.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{instant}")?;
        }
        f.write_str("}")
    }
}

impl<B: TBaseType> fmt::Debug for TInstantSet<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<B: TBaseType> FromStr for TInstantSet<B> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix('{')
            .and_then(|r| r.strip_suffix('}'))
            .ok_or_else(|| ParseError(format!("an instant set is enclosed in braces: {s}")))?;
        let instants: Result<Vec<_>, _> = crate::temporal::tsequence::split_top_level(inner)
            .map(|part| part.parse())
            .collect();
        Self::new(instants?).map_err(ParseError::from)
    }
}

impl<B: TBaseType> Hash for TInstantSet<B> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instants.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsorted_and_duplicate_timestamps() {
        let a: TInstant<i32> = "1@2020-01-02".parse().unwrap();
        let b: TInstant<i32> = "2@2020-01-01".parse().unwrap();
        assert!(TInstantSet::new(vec![a.clone(), b]).is_err());
        assert!(TInstantSet::new(vec![a.clone(), a]).is_err());
    }

    #[test]
    fn parse_and_print() {
        let set: TInstantSet<i32> = "{1@2020-01-01, 2@2020-01-02}".parse().unwrap();
        assert_eq!(set.num_instants(), 2);
        assert_eq!(
            set.to_string(),
            "{1@2020-01-01 00:00:00+00, 2@2020-01-02 00:00:00+00}"
        );
    }

    #[test]
    fn time_projection_is_degenerate_spans() {
        let set: TInstantSet<i32> = "{1@2020-01-01, 2@2020-01-02}".parse().unwrap();
        let time = set.time();
        assert_eq!(time.num_spans(), 2);
        assert!(time.start_span().is_lower_inclusive());
        assert_eq!(time.start_span().lower(), time.start_span().upper());
    }

    #[test]
    fn exact_lookup_only() {
        let set: TInstantSet<i32> = "{1@2020-01-01, 2@2020-01-03}".parse().unwrap();
        assert_eq!(
            set.value_at_timestamp(crate::utils::parse_timestamp("2020-01-01").unwrap()),
            Some(&1)
        );
        assert_eq!(
            set.value_at_timestamp(crate::utils::parse_timestamp("2020-01-02").unwrap()),
            None
        );
    }
}
