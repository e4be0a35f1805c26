//! Quad-tree space-partitioning index over span and box keys, following the
//! SP-GiST protocol: `choose` picks a quadrant by comparing a key's bounds
//! to the centroid, `picksplit` takes the component-wise median as the new
//! centroid, `inner_consistent` prunes quadrants by the monotonicity of the
//! operator in each (lower, upper) pair, and `leaf_consistent` dispatches to
//! the exact predicates.
//!
//! Soundness contract: for every supported strategy, an index scan returns
//! exactly the leaves a sequential scan with the same predicate returns.

use std::collections::BTreeMap;

use crate::boxes::{STBox, TBox};
use crate::collections::base::Collection;
use crate::collections::datetime::TsTzSpan;

/// Query strategies of the index, mirroring the operator catalog of the
/// boxes: topological, positional on the value/x axis, the y and z axes,
/// and the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Overlaps,
    Contains,
    ContainedBy,
    Same,
    Adjacent,
    Left,
    OverLeft,
    Right,
    OverRight,
    Below,
    OverBelow,
    Above,
    OverAbove,
    Front,
    OverFront,
    Back,
    OverBack,
    Before,
    OverBefore,
    After,
    OverAfter,
}

/// A key the quad-tree can hold: a fixed list of `(lower, upper)` axis
/// coordinates plus the exact leaf predicate.
pub trait QuadTreeKey: Clone {
    /// Number of (lower, upper) axis pairs.
    fn num_axes(&self) -> usize;

    fn axis_lower(&self, axis: usize) -> f64;
    fn axis_upper(&self, axis: usize) -> f64;

    /// Axis a positional strategy constrains, or `None` when the strategy
    /// does not apply to this key kind.
    fn strategy_axis(&self, strategy: Strategy) -> Option<usize>;

    /// Exact predicate between a leaf key and the query key.
    fn leaf_matches(&self, query: &Self, strategy: Strategy) -> bool;

    /// Builds the centroid key from per-axis bound coordinates, copying
    /// any non-geometric attributes (SRID, flags) from `template`.
    fn from_axis_bounds(lowers: &[f64], uppers: &[f64], template: &Self) -> Self;
}

enum Node<K> {
    Leaf(Vec<(u64, K)>),
    Inner {
        centroid: K,
        children: BTreeMap<u32, Node<K>>,
    },
}

/// An in-memory quad-tree over keys of one kind.
pub struct QuadTree<K: QuadTreeKey> {
    root: Option<Node<K>>,
    leaf_capacity: usize,
    len: usize,
}

impl<K: QuadTreeKey> Default for QuadTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: QuadTreeKey> QuadTree<K> {
    pub fn new() -> Self {
        Self {
            root: None,
            leaf_capacity: 16,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, id: u64, key: K) {
        self.len += 1;
        match self.root.take() {
            None => {
                self.root = Some(Node::Leaf(vec![(id, key)]));
            }
            Some(node) => {
                self.root = Some(self.insert_into(node, id, key));
            }
        }
    }

    fn insert_into(&self, node: Node<K>, id: u64, key: K) -> Node<K> {
        match node {
            Node::Inner { centroid, mut children } => {
                // Choose: the quadrant from the sign of each bound
                // comparison against the centroid.
                let quadrant = quadrant_of(&key, &centroid);
                let child = match children.remove(&quadrant) {
                    Some(child) => self.insert_into(child, id, key),
                    None => Node::Leaf(vec![(id, key)]),
                };
                children.insert(quadrant, child);
                Node::Inner { centroid, children }
            }
            Node::Leaf(mut entries) => {
                entries.push((id, key));
                if entries.len() <= self.leaf_capacity {
                    return Node::Leaf(entries);
                }
                self.picksplit(entries)
            }
        }
    }

    /// Picksplit: the component-wise median of the keys' bounds becomes the
    /// centroid and the entries are redistributed into its quadrants.
    fn picksplit(&self, entries: Vec<(u64, K)>) -> Node<K> {
        let template = &entries[0].1;
        let axes = template.num_axes();
        let mut lowers = Vec::with_capacity(axes);
        let mut uppers = Vec::with_capacity(axes);
        for axis in 0..axes {
            lowers.push(median(entries.iter().map(|(_, k)| k.axis_lower(axis))));
            uppers.push(median(entries.iter().map(|(_, k)| k.axis_upper(axis))));
        }
        let centroid = K::from_axis_bounds(&lowers, &uppers, template);
        let mut children: BTreeMap<u32, Node<K>> = BTreeMap::new();
        let mut undivided = true;
        {
            let mut first: Option<u32> = None;
            for (_, key) in &entries {
                let q = quadrant_of(key, &centroid);
                match first {
                    None => first = Some(q),
                    Some(f) if f != q => {
                        undivided = false;
                        break;
                    }
                    _ => {}
                }
            }
        }
        if undivided {
            // All keys share one quadrant of their own median: the keys are
            // identical for splitting purposes, so the leaf grows instead.
            return Node::Leaf(entries);
        }
        for (id, key) in entries {
            let q = quadrant_of(&key, &centroid);
            match children.entry(q).or_insert_with(|| Node::Leaf(Vec::new())) {
                Node::Leaf(list) => list.push((id, key)),
                Node::Inner { .. } => unreachable!("fresh children are leaves"),
            }
        }
        tracing::trace!("picksplit created {} quadrants", children.len());
        Node::Inner { centroid, children }
    }

    /// Index scan: ids of the leaves matching `strategy` against `query`,
    /// in ascending id order.
    pub fn query(&self, query: &K, strategy: Strategy) -> Vec<u64> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            scan(root, query, strategy, &mut out);
        }
        out.sort_unstable();
        out
    }
}

fn scan<K: QuadTreeKey>(node: &Node<K>, query: &K, strategy: Strategy, out: &mut Vec<u64>) {
    match node {
        Node::Leaf(entries) => {
            for (id, key) in entries {
                if key.leaf_matches(query, strategy) {
                    out.push(*id);
                }
            }
        }
        Node::Inner { centroid, children } => {
            for (&quadrant, child) in children {
                if quadrant_may_match(quadrant, centroid, query, strategy) {
                    scan(child, query, strategy, out);
                }
            }
        }
    }
}

/// Quadrant of `key` relative to `centroid`: two bits per axis, set when
/// the key's bound is at or above the centroid's.
fn quadrant_of<K: QuadTreeKey>(key: &K, centroid: &K) -> u32 {
    let mut q = 0u32;
    for axis in 0..key.num_axes() {
        if key.axis_lower(axis) >= centroid.axis_lower(axis) {
            q |= 1 << (2 * axis);
        }
        if key.axis_upper(axis) >= centroid.axis_upper(axis) {
            q |= 1 << (2 * axis + 1);
        }
    }
    q
}

/// Per-axis bound constraints a strategy imposes on the keys that can match.
#[derive(Default, Clone, Copy)]
struct AxisConstraint {
    /// Keys must satisfy `key.lower <= x`.
    lower_at_most: Option<f64>,
    /// Keys must satisfy `key.lower >= x`.
    lower_at_least: Option<f64>,
    /// Keys must satisfy `key.upper <= x`.
    upper_at_most: Option<f64>,
    /// Keys must satisfy `key.upper >= x`.
    upper_at_least: Option<f64>,
}

/// Inner consistency: whether the quadrant's sub-tree can hold a matching
/// key, derived from the monotonicity of each constraint in (lower, upper).
/// `Same` and `Adjacent` keep every quadrant, which stays correct when the
/// centroid lies exactly on a key bound.
fn quadrant_may_match<K: QuadTreeKey>(
    quadrant: u32,
    centroid: &K,
    query: &K,
    strategy: Strategy,
) -> bool {
    let axes = centroid.num_axes();
    let mut constraints = vec![AxisConstraint::default(); axes];
    match strategy {
        Strategy::Same | Strategy::Adjacent => return true,
        Strategy::Overlaps => {
            for (axis, c) in constraints.iter_mut().enumerate() {
                c.lower_at_most = Some(query.axis_upper(axis));
                c.upper_at_least = Some(query.axis_lower(axis));
            }
        }
        Strategy::Contains => {
            for (axis, c) in constraints.iter_mut().enumerate() {
                c.lower_at_most = Some(query.axis_lower(axis));
                c.upper_at_least = Some(query.axis_upper(axis));
            }
        }
        Strategy::ContainedBy => {
            for (axis, c) in constraints.iter_mut().enumerate() {
                c.lower_at_least = Some(query.axis_lower(axis));
                c.upper_at_most = Some(query.axis_upper(axis));
            }
        }
        positional => {
            let Some(axis) = centroid.strategy_axis(positional) else {
                return true;
            };
            let c = &mut constraints[axis];
            match positional {
                Strategy::Left | Strategy::Below | Strategy::Front | Strategy::Before => {
                    c.upper_at_most = Some(query.axis_lower(axis));
                }
                Strategy::OverLeft
                | Strategy::OverBelow
                | Strategy::OverFront
                | Strategy::OverBefore => {
                    c.upper_at_most = Some(query.axis_upper(axis));
                }
                Strategy::Right | Strategy::Above | Strategy::Back | Strategy::After => {
                    c.lower_at_least = Some(query.axis_upper(axis));
                }
                Strategy::OverRight
                | Strategy::OverAbove
                | Strategy::OverBack
                | Strategy::OverAfter => {
                    c.lower_at_least = Some(query.axis_lower(axis));
                }
                _ => unreachable!("topological strategies handled above"),
            }
        }
    }
    for (axis, c) in constraints.iter().enumerate() {
        let lower_high = quadrant & (1 << (2 * axis)) != 0;
        let upper_high = quadrant & (1 << (2 * axis + 1)) != 0;
        let cl = centroid.axis_lower(axis);
        let cu = centroid.axis_upper(axis);
        // key.lower <= x is impossible for the high half when x < cl.
        if let Some(x) = c.lower_at_most {
            if lower_high && x < cl {
                return false;
            }
        }
        // key.lower >= x is impossible for the low half when x >= cl.
        if let Some(x) = c.lower_at_least {
            if !lower_high && x >= cl {
                return false;
            }
        }
        if let Some(x) = c.upper_at_most {
            if upper_high && x < cu {
                return false;
            }
        }
        if let Some(x) = c.upper_at_least {
            if !upper_high && x >= cu {
                return false;
            }
        }
    }
    true
}

fn median(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(f64::total_cmp);
    sorted[sorted.len() / 2]
}

// ------------------------- Key kinds -----------------------------------------

impl QuadTreeKey for TsTzSpan {
    fn num_axes(&self) -> usize {
        1
    }

    fn axis_lower(&self, _axis: usize) -> f64 {
        crate::utils::to_micros(&self.lower()) as f64
    }

    fn axis_upper(&self, _axis: usize) -> f64 {
        crate::utils::to_micros(&self.upper()) as f64
    }

    fn strategy_axis(&self, strategy: Strategy) -> Option<usize> {
        match strategy {
            Strategy::Before | Strategy::OverBefore | Strategy::After | Strategy::OverAfter => {
                Some(0)
            }
            _ => None,
        }
    }

    fn leaf_matches(&self, query: &Self, strategy: Strategy) -> bool {
        match strategy {
            Strategy::Overlaps => self.overlaps_span(query),
            Strategy::Contains => self.contains_span(query),
            Strategy::ContainedBy => query.contains_span(self),
            Strategy::Same => self == query,
            Strategy::Adjacent => self.is_adjacent(query),
            Strategy::Before => self.is_left(query),
            Strategy::OverBefore => self.is_over_or_left(query),
            Strategy::After => self.is_right(query),
            Strategy::OverAfter => self.is_over_or_right(query),
            _ => false,
        }
    }

    fn from_axis_bounds(lowers: &[f64], uppers: &[f64], _template: &Self) -> Self {
        let lower = crate::utils::from_micros(lowers[0] as i64);
        let upper = crate::utils::from_micros(uppers[0] as i64);
        if lower <= upper {
            TsTzSpan::new(lower, upper, true, true).expect("ordered median bounds")
        } else {
            TsTzSpan::new(upper, lower, true, true).expect("ordered median bounds")
        }
    }
}

impl QuadTreeKey for TBox {
    fn num_axes(&self) -> usize {
        2
    }

    fn axis_lower(&self, axis: usize) -> f64 {
        match axis {
            0 => self.xmin().unwrap_or(f64::MIN),
            _ => self
                .tmin()
                .map(|t| crate::utils::to_micros(&t) as f64)
                .unwrap_or(f64::MIN),
        }
    }

    fn axis_upper(&self, axis: usize) -> f64 {
        match axis {
            0 => self.xmax().unwrap_or(f64::MAX),
            _ => self
                .tmax()
                .map(|t| crate::utils::to_micros(&t) as f64)
                .unwrap_or(f64::MAX),
        }
    }

    fn strategy_axis(&self, strategy: Strategy) -> Option<usize> {
        match strategy {
            Strategy::Left | Strategy::OverLeft | Strategy::Right | Strategy::OverRight => Some(0),
            Strategy::Before | Strategy::OverBefore | Strategy::After | Strategy::OverAfter => {
                Some(1)
            }
            _ => None,
        }
    }

    fn leaf_matches(&self, query: &Self, strategy: Strategy) -> bool {
        match strategy {
            Strategy::Overlaps => self.overlaps_tbox(query),
            Strategy::Contains => self.contains_tbox(query),
            Strategy::ContainedBy => self.is_contained_in_tbox(query),
            Strategy::Same => self.same_tbox(query),
            Strategy::Adjacent => self.is_adjacent_tbox(query),
            Strategy::Left => self.is_left(query).unwrap_or(false),
            Strategy::OverLeft => self.is_over_or_left(query).unwrap_or(false),
            Strategy::Right => self.is_right(query).unwrap_or(false),
            Strategy::OverRight => self.is_over_or_right(query).unwrap_or(false),
            Strategy::Before => self.is_before(query).unwrap_or(false),
            Strategy::OverBefore => self.is_over_or_before(query).unwrap_or(false),
            Strategy::After => self.is_after(query).unwrap_or(false),
            Strategy::OverAfter => self.is_over_or_after(query).unwrap_or(false),
            _ => false,
        }
    }

    fn from_axis_bounds(lowers: &[f64], uppers: &[f64], _template: &Self) -> Self {
        let span = crate::collections::number::FloatSpan::new(
            lowers[0].min(uppers[0]),
            lowers[0].max(uppers[0]),
            true,
            true,
        )
        .expect("finite median bounds");
        let tmin = crate::utils::from_micros(lowers[1].min(uppers[1]) as i64);
        let tmax = crate::utils::from_micros(lowers[1].max(uppers[1]) as i64);
        let period = TsTzSpan::new(tmin, tmax, true, true).expect("ordered median bounds");
        TBox::new(Some(span), Some(period)).expect("both axes present")
    }
}

impl QuadTreeKey for STBox {
    /// x, y, optionally z, then time.
    fn num_axes(&self) -> usize {
        if self.has_z() {
            4
        } else {
            3
        }
    }

    fn axis_lower(&self, axis: usize) -> f64 {
        let spatial = [self.xmin(), self.ymin(), self.zmin()];
        let t_axis = self.num_axes() - 1;
        if axis == t_axis {
            self.tmin()
                .map(|t| crate::utils::to_micros(&t) as f64)
                .unwrap_or(f64::MIN)
        } else {
            spatial[axis].unwrap_or(f64::MIN)
        }
    }

    fn axis_upper(&self, axis: usize) -> f64 {
        let spatial = [self.xmax(), self.ymax(), self.zmax()];
        let t_axis = self.num_axes() - 1;
        if axis == t_axis {
            self.tmax()
                .map(|t| crate::utils::to_micros(&t) as f64)
                .unwrap_or(f64::MAX)
        } else {
            spatial[axis].unwrap_or(f64::MAX)
        }
    }

    fn strategy_axis(&self, strategy: Strategy) -> Option<usize> {
        match strategy {
            Strategy::Left | Strategy::OverLeft | Strategy::Right | Strategy::OverRight => Some(0),
            Strategy::Below | Strategy::OverBelow | Strategy::Above | Strategy::OverAbove => {
                Some(1)
            }
            Strategy::Front | Strategy::OverFront | Strategy::Back | Strategy::OverBack => {
                self.has_z().then_some(2)
            }
            Strategy::Before | Strategy::OverBefore | Strategy::After | Strategy::OverAfter => {
                Some(self.num_axes() - 1)
            }
            _ => None,
        }
    }

    fn leaf_matches(&self, query: &Self, strategy: Strategy) -> bool {
        match strategy {
            Strategy::Overlaps => self.overlaps_stbox(query).unwrap_or(false),
            Strategy::Contains => self.contains_stbox(query).unwrap_or(false),
            Strategy::ContainedBy => self.is_contained_in_stbox(query).unwrap_or(false),
            Strategy::Same => self.same_stbox(query).unwrap_or(false),
            Strategy::Adjacent => self.is_adjacent_stbox(query).unwrap_or(false),
            Strategy::Left => self.is_left(query).unwrap_or(false),
            Strategy::OverLeft => self.is_over_or_left(query).unwrap_or(false),
            Strategy::Right => self.is_right(query).unwrap_or(false),
            Strategy::OverRight => self.is_over_or_right(query).unwrap_or(false),
            Strategy::Below => self.is_below(query).unwrap_or(false),
            Strategy::OverBelow => self.is_over_or_below(query).unwrap_or(false),
            Strategy::Above => self.is_above(query).unwrap_or(false),
            Strategy::OverAbove => self.is_over_or_above(query).unwrap_or(false),
            Strategy::Front => self.is_front(query).unwrap_or(false),
            Strategy::OverFront => self.is_over_or_front(query).unwrap_or(false),
            Strategy::Back => self.is_back(query).unwrap_or(false),
            Strategy::OverBack => self.is_over_or_back(query).unwrap_or(false),
            Strategy::Before => self.is_before(query).unwrap_or(false),
            Strategy::OverBefore => self.is_over_or_before(query).unwrap_or(false),
            Strategy::After => self.is_after(query).unwrap_or(false),
            Strategy::OverAfter => self.is_over_or_after(query).unwrap_or(false),
        }
    }

    fn from_axis_bounds(lowers: &[f64], uppers: &[f64], template: &Self) -> Self {
        let pair = |i: usize| {
            let lo = lowers[i].min(uppers[i]);
            let hi = lowers[i].max(uppers[i]);
            (lo, hi)
        };
        let t_axis = template.num_axes() - 1;
        let z = template.has_z().then(|| pair(2));
        let tmin = crate::utils::from_micros(lowers[t_axis].min(uppers[t_axis]) as i64);
        let tmax = crate::utils::from_micros(lowers[t_axis].max(uppers[t_axis]) as i64);
        let period = TsTzSpan::new(tmin, tmax, true, true).expect("ordered median bounds");
        STBox::new(
            Some(pair(0)),
            Some(pair(1)),
            z,
            Some(period),
            template.is_geodetic(),
            template.srid(),
        )
        .expect("median bounds form a box")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn day(d: u32) -> String {
        format!("2020-01-{d:02}")
    }

    fn span(lo: u32, hi: u32) -> TsTzSpan {
        TsTzSpan::from_str(&format!("[{}, {}]", day(lo), day(hi))).unwrap()
    }

    /// Index scan must equal sequential scan for every strategy.
    fn check_soundness<K: QuadTreeKey>(keys: &[K], query: &K, strategies: &[Strategy]) {
        let mut tree = QuadTree::new();
        for (i, key) in keys.iter().enumerate() {
            tree.insert(i as u64, key.clone());
        }
        for &strategy in strategies {
            let sequential: Vec<u64> = keys
                .iter()
                .enumerate()
                .filter(|(_, k)| k.leaf_matches(query, strategy))
                .map(|(i, _)| i as u64)
                .collect();
            let indexed = tree.query(query, strategy);
            assert_eq!(indexed, sequential, "strategy {strategy:?}");
        }
    }

    #[test]
    fn period_tree_matches_sequential_scan() {
        let keys: Vec<TsTzSpan> = (1..=27)
            .map(|i| span(i, i + (i % 4)))
            .collect();
        let query = span(10, 14);
        check_soundness(
            &keys,
            &query,
            &[
                Strategy::Overlaps,
                Strategy::Contains,
                Strategy::ContainedBy,
                Strategy::Same,
                Strategy::Adjacent,
                Strategy::Before,
                Strategy::OverBefore,
                Strategy::After,
                Strategy::OverAfter,
            ],
        );
    }

    #[test]
    fn tbox_tree_matches_sequential_scan() {
        let mut keys = Vec::new();
        for i in 0..30u32 {
            let lo = (i % 10) as f64;
            let text = format!(
                "TBOX XT([{}, {}], [{}, {}])",
                lo,
                lo + 3.0,
                day(1 + i % 20),
                day(3 + i % 20)
            );
            keys.push(TBox::from_str(&text).unwrap());
        }
        let query = TBox::from_str(&format!(
            "TBOX XT([4, 7], [{}, {}])",
            day(5),
            day(9)
        ))
        .unwrap();
        check_soundness(
            &keys,
            &query,
            &[
                Strategy::Overlaps,
                Strategy::Contains,
                Strategy::ContainedBy,
                Strategy::Same,
                Strategy::Adjacent,
                Strategy::Left,
                Strategy::OverLeft,
                Strategy::Right,
                Strategy::OverRight,
                Strategy::Before,
                Strategy::After,
            ],
        );
    }

    #[test]
    fn stbox_tree_matches_sequential_scan() {
        let mut keys = Vec::new();
        for i in 0..40u32 {
            let x = (i % 8) as f64;
            let y = (i % 5) as f64;
            let text = format!(
                "STBOX XT((({}, {}), ({}, {})), [{}, {}])",
                x,
                y,
                x + 2.0,
                y + 2.0,
                day(1 + i % 15),
                day(4 + i % 15)
            );
            keys.push(STBox::from_str(&text).unwrap());
        }
        let query = STBox::from_str(&format!(
            "STBOX XT(((3, 2), (6, 4)), [{}, {}])",
            day(4),
            day(8)
        ))
        .unwrap();
        check_soundness(
            &keys,
            &query,
            &[
                Strategy::Overlaps,
                Strategy::Contains,
                Strategy::ContainedBy,
                Strategy::Same,
                Strategy::Left,
                Strategy::Right,
                Strategy::Below,
                Strategy::Above,
                Strategy::Before,
                Strategy::OverAfter,
            ],
        );
    }

    #[test]
    fn overlap_probe_returns_exactly_the_intersecting_entries() {
        // Entries on either side of the query box.
        let mut tree = QuadTree::new();
        for i in 0..10u64 {
            let x = i as f64;
            let key = STBox::new(
                Some((x, x + 0.5)),
                Some((0.0, 1.0)),
                None,
                Some(span(1, 2)),
                false,
                0,
            )
            .unwrap();
            tree.insert(i, key);
        }
        let query = STBox::new(
            Some((3.2, 6.1)),
            Some((0.0, 1.0)),
            None,
            Some(span(1, 2)),
            false,
            0,
        )
        .unwrap();
        assert_eq!(tree.query(&query, Strategy::Overlaps), vec![3, 4, 5, 6]);
    }

    #[test]
    fn identical_keys_do_not_split_forever() {
        let mut tree = QuadTree::new();
        let key = span(1, 2);
        for i in 0..100 {
            tree.insert(i, key);
        }
        assert_eq!(tree.len(), 100);
        assert_eq!(tree.query(&key, Strategy::Same).len(), 100);
    }
}
