use chrono::TimeDelta;

use crate::collections::base::SpanSet;

/// A normalized set of disjoint [`TsTzSpan`](super::TsTzSpan)s, the time
/// projection of every temporal value.
pub type TsTzSpanSet = SpanSet<chrono::DateTime<chrono::Utc>>;

impl TsTzSpanSet {
    /// Total covered duration; with `ignore_gaps` the duration of the
    /// covering span.
    pub fn duration(&self, ignore_gaps: bool) -> TimeDelta {
        if ignore_gaps {
            return self.to_span().duration();
        }
        self.iter().map(|s| s.duration()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_with_and_without_gaps() {
        let set: TsTzSpanSet = "{[2019-09-08, 2019-09-10], [2019-09-11, 2019-09-12]}"
            .parse()
            .unwrap();
        assert_eq!(set.duration(false), TimeDelta::days(3));
        assert_eq!(set.duration(true), TimeDelta::days(4));
    }

    #[test]
    fn parse_round_trip() {
        let text = "{[2019-09-08 00:00:00+00, 2019-09-10 00:00:00+00), [2019-09-11 00:00:00+00, 2019-09-12 00:00:00+00]}";
        let set: TsTzSpanSet = text.parse().unwrap();
        assert_eq!(set.to_string(), text);
    }

    #[test]
    fn degenerate_spans_merge_into_touching_neighbors() {
        // An instantaneous span at the open end of a half-open span closes it.
        let set: TsTzSpanSet = "{[2020-01-01, 2020-01-02), [2020-01-02, 2020-01-02]}"
            .parse()
            .unwrap();
        assert_eq!(set.num_spans(), 1);
        assert_eq!(set.to_string(), "{[2020-01-01 00:00:00+00, 2020-01-02 00:00:00+00]}");
    }
}
