use crate::collections::base::SpanSet;

/// A normalized set of disjoint [`IntSpan`](super::IntSpan)s.
pub type IntSpanSet = SpanSet<i32>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::base::Collection;

    #[test]
    fn construction_sorts_and_coalesces() {
        let set: IntSpanSet = "{[5, 7), [1, 3), [3, 4)}".parse().unwrap();
        assert_eq!(set.num_spans(), 2);
        assert_eq!(set.to_string(), "{[1, 4), [5, 7)}");
    }

    #[test]
    fn closed_inputs_touch_after_canonicalization() {
        // [1, 2] becomes [1, 3), which is adjacent to [3, 5).
        let set: IntSpanSet = "{[1, 2], [3, 4]}".parse().unwrap();
        assert_eq!(set.num_spans(), 1);
        assert_eq!(set.to_string(), "{[1, 5)}");
    }

    #[test]
    fn membership_and_hull() {
        let set: IntSpanSet = "{[1, 3), [5, 7)}".parse().unwrap();
        assert!(set.contains(&1));
        assert!(!set.contains(&3));
        assert!(set.contains(&6));
        assert_eq!(set.to_span(), (1..7).into());
        assert_eq!(set.width(false), 4);
        assert_eq!(set.width(true), 6);
    }

    #[test]
    fn difference_leaves_the_uncovered_parts() {
        let a: IntSpanSet = "{[1, 10)}".parse().unwrap();
        let b: IntSpanSet = "{[2, 4), [6, 8)}".parse().unwrap();
        let diff = a.difference(&b).unwrap();
        assert_eq!(diff.to_string(), "{[1, 2), [4, 6), [8, 10)}");
        assert!(b.difference(&a).is_none());
    }
}
