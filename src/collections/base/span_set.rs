use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::BitAnd;
use std::str::FromStr;

use crate::collections::base::collection::Collection;
use crate::collections::base::span::{Span, SpanType};
use crate::errors::{Error, ParseError};

/// A normalized union of [`Span`]s: strictly sorted, pairwise disjoint and
/// non-adjacent after canonicalization. Construction sorts and coalesces.
///
/// ## Example
/// ```
/// # use tempora::collections::number::FloatSpanSet;
/// # use std::str::FromStr;
/// let set = FloatSpanSet::from_str("{[1, 3), [2, 5], [7, 8]}").unwrap();
/// assert_eq!(set.num_spans(), 2);
/// assert_eq!(set.to_string(), "{[1, 5], [7, 8]}");
/// ```
#[derive(Clone)]
pub struct SpanSet<T: SpanType> {
    spans: Vec<Span<T>>,
}

impl<T: SpanType> SpanSet<T> {
    /// Builds a span set from arbitrary spans, sorting and merging any that
    /// overlap or touch.
    pub fn new(mut spans: Vec<Span<T>>) -> Result<Self, Error> {
        if spans.is_empty() {
            return Err(Error::InvalidArg("a span set requires at least one span"));
        }
        spans.sort();
        let mut normalized: Vec<Span<T>> = Vec::with_capacity(spans.len());
        for span in spans {
            match normalized.last_mut() {
                Some(last) if last.overlaps_span(&span) || last.is_adjacent_span(&span) => {
                    *last = last.hull(&span);
                }
                _ => normalized.push(span),
            }
        }
        Ok(Self { spans: normalized })
    }

    pub fn from_span(span: Span<T>) -> Self {
        Self { spans: vec![span] }
    }

    pub fn spans(&self) -> &[Span<T>] {
        &self.spans
    }

    pub fn num_spans(&self) -> usize {
        self.spans.len()
    }

    pub fn start_span(&self) -> Span<T> {
        self.spans[0]
    }

    pub fn end_span(&self) -> Span<T> {
        *self.spans.last().expect("span sets are non-empty")
    }

    pub fn span_n(&self, n: usize) -> Option<Span<T>> {
        self.spans.get(n).copied()
    }

    /// Smallest single span covering the whole set.
    pub fn to_span(&self) -> Span<T> {
        self.start_span().hull(&self.end_span())
    }

    /// Total width. With `ignore_gaps` the gaps between spans count too,
    /// i.e. the width of the covering span is returned.
    pub fn width(&self, ignore_gaps: bool) -> T::Width {
        if ignore_gaps {
            return self.to_span().width();
        }
        let total: f64 = self
            .spans
            .iter()
            .map(|s| T::width_to_f64(s.width()))
            .sum();
        // Round-trip through the domain's width representation.
        T::width(T::from_f64(0.0), T::from_f64(total))
    }

    pub fn contains_value(&self, value: T) -> bool {
        self.spans.iter().any(|s| s.contains_value(value))
    }

    pub fn contains_span(&self, span: &Span<T>) -> bool {
        self.spans.iter().any(|s| s.contains_span(span))
    }

    pub fn contains_span_set(&self, other: &Self) -> bool {
        other.spans.iter().all(|s| self.contains_span(s))
    }

    pub fn overlaps_span(&self, span: &Span<T>) -> bool {
        self.spans.iter().any(|s| s.overlaps_span(span))
    }

    pub fn overlaps_span_set(&self, other: &Self) -> bool {
        // Merge walk over the two sorted sequences.
        let (mut i, mut j) = (0, 0);
        while i < self.spans.len() && j < other.spans.len() {
            let (a, b) = (&self.spans[i], &other.spans[j]);
            if a.overlaps_span(b) {
                return true;
            }
            if a.is_left_span(b) {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    pub fn is_adjacent_span_set(&self, other: &Self) -> bool {
        self.spans
            .iter()
            .any(|a| other.spans.iter().any(|b| a.is_adjacent_span(b)))
            && !self.overlaps_span_set(other)
    }

    pub fn intersection_span(&self, span: &Span<T>) -> Option<Self> {
        let pieces: Vec<_> = self
            .spans
            .iter()
            .filter_map(|s| s.intersection(span))
            .collect();
        Self::new(pieces).ok()
    }

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let mut pieces = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.spans.len() && j < other.spans.len() {
            let (a, b) = (&self.spans[i], &other.spans[j]);
            if let Some(piece) = a.intersection(b) {
                pieces.push(piece);
            }
            if a.is_over_or_left_span(b) {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self::new(pieces).ok()
    }

    pub fn union_span(&self, span: &Span<T>) -> Self {
        let mut spans = self.spans.clone();
        spans.push(*span);
        Self::new(spans).expect("union of valid spans is a valid span set")
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut spans = self.spans.clone();
        spans.extend_from_slice(&other.spans);
        Self::new(spans).expect("union of valid spans is a valid span set")
    }

    /// The parts of `self` not covered by `span`; `None` when nothing is
    /// left.
    pub fn difference_span(&self, span: &Span<T>) -> Option<Self> {
        let mut pieces = Vec::new();
        for s in &self.spans {
            pieces.extend(s.difference(span));
        }
        Self::new(pieces).ok()
    }

    pub fn difference(&self, other: &Self) -> Option<Self> {
        let mut pieces = self.spans.clone();
        for cut in &other.spans {
            let mut next = Vec::with_capacity(pieces.len() + 1);
            for piece in &pieces {
                next.extend(piece.difference(cut));
            }
            pieces = next;
            if pieces.is_empty() {
                return None;
            }
        }
        Self::new(pieces).ok()
    }

    pub fn distance_to_value(&self, value: T) -> T::Width {
        self.spans
            .iter()
            .map(|s| s.distance_to_value(value))
            .min_by(|a, b| {
                a.partial_cmp(b)
                    .expect("span widths are totally ordered")
            })
            .expect("span sets are non-empty")
    }

    pub fn distance_to_span(&self, span: &Span<T>) -> T::Width {
        self.spans
            .iter()
            .map(|s| s.distance_to_span(span))
            .min_by(|a, b| {
                a.partial_cmp(b)
                    .expect("span widths are totally ordered")
            })
            .expect("span sets are non-empty")
    }

    pub fn distance_to_span_set(&self, other: &Self) -> T::Width {
        other
            .spans
            .iter()
            .map(|s| self.distance_to_span(s))
            .min_by(|a, b| {
                a.partial_cmp(b)
                    .expect("span widths are totally ordered")
            })
            .expect("span sets are non-empty")
    }

    pub fn shift(&self, delta: T::Width) -> Self {
        self.shift_scale(Some(delta), None)
    }

    pub fn scale(&self, width: T::Width) -> Self {
        self.shift_scale(None, Some(width))
    }

    /// Shifts every span by `delta` and then rescales the whole extent so
    /// that the covering span has width `width`, keeping relative positions.
    pub fn shift_scale(&self, delta: Option<T::Width>, width: Option<T::Width>) -> Self {
        let shifted: Vec<Span<T>> = match delta {
            Some(d) => self.spans.iter().map(|s| s.shift(d)).collect(),
            None => self.spans.clone(),
        };
        let Some(w) = width else {
            return Self { spans: shifted };
        };
        assert!(
            T::width_to_f64(w) > 0.0,
            "span set width must be strictly positive"
        );
        let anchor = shifted[0].lower().to_f64();
        let old_width = shifted.last().expect("non-empty").upper().to_f64() - anchor;
        let ratio = if old_width == 0.0 {
            1.0
        } else {
            T::width_to_f64(w) / old_width
        };
        let remap = |v: T| T::from_f64(anchor + (v.to_f64() - anchor) * ratio);
        let spans = shifted
            .iter()
            .map(|s| {
                Span::new(
                    remap(s.lower()),
                    remap(s.upper()),
                    s.is_lower_inclusive() || T::DISCRETE,
                    s.is_upper_inclusive() && !T::DISCRETE,
                )
                .expect("rescaling preserves span ordering")
            })
            .collect();
        Self { spans }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Span<T>> {
        self.spans.iter()
    }
}

impl<T: SpanType> Collection for SpanSet<T> {
    type Type = T;

    fn contains(&self, content: &T) -> bool {
        self.contains_value(*content)
    }

    fn is_contained_in(&self, container: &Self) -> bool {
        container.contains_span_set(self)
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.overlaps_span_set(other)
    }

    fn is_adjacent(&self, other: &Self) -> bool {
        self.is_adjacent_span_set(other)
    }

    fn is_left(&self, other: &Self) -> bool {
        self.end_span().is_left_span(&other.start_span())
    }

    fn is_over_or_left(&self, other: &Self) -> bool {
        self.end_span().is_over_or_left_span(&other.end_span())
    }

    fn is_right(&self, other: &Self) -> bool {
        other.is_left(self)
    }

    fn is_over_or_right(&self, other: &Self) -> bool {
        self.start_span().is_over_or_right_span(&other.start_span())
    }
}

impl<T: SpanType> PartialEq for SpanSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.spans == other.spans
    }
}

impl<T: SpanType> Eq for SpanSet<T> {}

impl<T: SpanType> PartialOrd for SpanSet<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: SpanType> Ord for SpanSet<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.spans.cmp(&other.spans)
    }
}

impl<T: SpanType> Hash for SpanSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.spans.hash(state);
    }
}

impl<T: SpanType> fmt::Display for SpanSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{span}")?;
        }
        f.write_str("}")
    }
}

impl<T: SpanType> fmt::Debug for SpanSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<T: SpanType> FromStr for SpanSet<T> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let inner = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| ParseError(format!("span set must be enclosed in braces: {s}")))?;
        let mut spans = Vec::new();
        let mut depth = 0usize;
        let mut start = 0usize;
        for (i, c) in inner.char_indices() {
            match c {
                '[' | '(' => depth += 1,
                ']' | ')' => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| ParseError(format!("unbalanced brackets: {s}")))?
                }
                ',' if depth == 0 => {
                    spans.push(inner[start..i].parse()?);
                    start = i + 1;
                }
                _ => {}
            }
        }
        if !inner[start..].trim().is_empty() {
            spans.push(inner[start..].parse()?);
        }
        SpanSet::new(spans).map_err(ParseError::from)
    }
}

impl<T: SpanType> From<Span<T>> for SpanSet<T> {
    fn from(span: Span<T>) -> Self {
        Self::from_span(span)
    }
}

impl<T: SpanType> BitAnd for SpanSet<T> {
    type Output = Option<SpanSet<T>>;

    fn bitand(self, other: Self) -> Self::Output {
        self.intersection(&other)
    }
}

impl<'a, T: SpanType> IntoIterator for &'a SpanSet<T> {
    type Item = &'a Span<T>;
    type IntoIter = std::slice::Iter<'a, Span<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.iter()
    }
}
