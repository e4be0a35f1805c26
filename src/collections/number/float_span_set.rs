use crate::collections::base::SpanSet;

/// A normalized set of disjoint [`FloatSpan`](super::FloatSpan)s.
pub type FloatSpanSet = SpanSet<f64>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::base::Collection;

    #[test]
    fn overlapping_inputs_merge() {
        let set: FloatSpanSet = "{[1, 3), [2, 5], [7, 8]}".parse().unwrap();
        assert_eq!(set.num_spans(), 2);
        assert_eq!(set.to_string(), "{[1, 5], [7, 8]}");
    }

    #[test]
    fn adjacent_inputs_coalesce_only_when_contiguous() {
        // [1, 3) + [3, 5] close the gap; (5, 6] leaves 5 uncovered.
        let set: FloatSpanSet = "{[1, 3), [3, 5], (5, 6]}".parse().unwrap();
        assert_eq!(set.to_string(), "{[1, 5], (5, 6]}");
    }

    #[test]
    fn intersection_walks_both_sets() {
        let a: FloatSpanSet = "{[1, 4), [6, 9)}".parse().unwrap();
        let b: FloatSpanSet = "{[2, 7)}".parse().unwrap();
        let inter = a.intersection(&b).unwrap();
        assert_eq!(inter.to_string(), "{[2, 4), [6, 7)}");
        let c: FloatSpanSet = "{[10, 11)}".parse().unwrap();
        assert!(a.intersection(&c).is_none());
    }

    #[test]
    fn distance_takes_the_closest_pair() {
        let a: FloatSpanSet = "{[1, 2), [8, 9)}".parse().unwrap();
        let b: FloatSpanSet = "{[4, 5)}".parse().unwrap();
        assert_eq!(a.distance_to_span_set(&b), 2.0);
        assert_eq!(a.distance_to_value(3.0), 1.0);
    }

    #[test]
    fn positional_predicates_use_the_extremes() {
        let a: FloatSpanSet = "{[1, 2), [3, 4)}".parse().unwrap();
        let b: FloatSpanSet = "{[5, 6)}".parse().unwrap();
        assert!(a.is_left(&b));
        assert!(b.is_right(&a));
        assert!(a.is_over_or_left(&b));
        assert!(!a.overlaps(&b));
    }
}
