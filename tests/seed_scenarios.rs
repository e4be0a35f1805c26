//! End-to-end scenarios over concrete textual inputs.

use tempora::{
    CancelToken, Error, FloatSpan, FloatSpanSet, GeomPoint, Geometry, IntSpan, QuadTree, STBox,
    Strategy, TFloat, TGeomPoint, TInt, TPointTrait, Temporal,
};

#[test]
fn moving_point_clipped_by_a_polygon() {
    let t: TGeomPoint = "[Point(0 0)@2020-01-01, Point(10 10)@2020-01-02]"
        .parse()
        .unwrap();
    let polygon = Geometry::from_wkt("POLYGON((3 3, 3 7, 7 7, 7 3, 3 3))").unwrap();
    let inside = t
        .at_geometry(&polygon, None, &CancelToken::new())
        .unwrap()
        .unwrap();
    // A single sequence from Point(3 3) to Point(7 7), entered and left at
    // the times where the trajectory crosses the boundary.
    match &inside {
        Temporal::Sequence(seq) => {
            assert!(seq.start_instant().value().distance(&GeomPoint::new(3.0, 3.0)) < 1e-9);
            assert!(seq.end_instant().value().distance(&GeomPoint::new(7.0, 7.0)) < 1e-9);
        }
        other => panic!("expected a single sequence, got {other:?}"),
    }
    let day = chrono::TimeDelta::days(1);
    let start: chrono::DateTime<chrono::Utc> = "2020-01-01T00:00:00Z".parse().unwrap();
    assert_eq!(
        inside.start_timestamp(),
        start + chrono::TimeDelta::microseconds((day.num_microseconds().unwrap() as f64 * 0.3) as i64)
    );
}

#[test]
fn linear_float_hit_at_an_interpolated_instant() {
    let t: TFloat = "[1@2020-01-01, 3@2020-01-03]".parse().unwrap();
    let hit = t.at_value(&2.0).unwrap();
    assert_eq!(hit.num_instants(), 1);
    assert_eq!(hit.start_value(), 2.0);
    let expected: chrono::DateTime<chrono::Utc> = "2020-01-02T00:00:00Z".parse().unwrap();
    assert_eq!(hit.start_timestamp(), expected);
}

#[test]
fn tdwithin_against_an_offset_fixed_point() {
    let t: TGeomPoint = "[Point(0 0)@2020-01-01, Point(10 0)@2020-01-11]"
        .parse()
        .unwrap();
    let within = t
        .tdwithin_point(&GeomPoint::new(5.0, 1.0), 2.0, &CancelToken::new())
        .unwrap()
        .unwrap();
    // True exactly while x ∈ [5 − √3, 5 + √3]; x moves one unit per day.
    let true_time = within.at_value(&true).unwrap().time();
    assert_eq!(true_time.num_spans(), 1);
    let duration = true_time.duration(false);
    let expected_days = 2.0 * 3.0f64.sqrt();
    let got_days = duration.num_microseconds().unwrap() as f64 / 86_400e6;
    assert!((got_days - expected_days).abs() < 1e-5, "{got_days} days");
}

#[test]
fn minus_a_value_set_covering_everything_is_empty() {
    let t: TInt = "{1@2020-01-01, 1@2020-01-02, 1@2020-01-03}".parse().unwrap();
    assert!(t.minus_values(&[1, 2]).is_none());
    assert_eq!(t.at_values(&[1, 2]).unwrap(), t);
}

#[test]
fn strict_union_of_disjoint_spans_fails_lenient_builds_a_set() {
    let a: FloatSpan = (1.0..=3.0).into();
    let b: FloatSpan = (5.0..=7.0).into();
    assert_eq!(a.merge(&b).unwrap_err(), Error::NotContiguous);
    let set: FloatSpanSet = a.union(&b);
    assert_eq!(set.num_spans(), 2);
    assert!(set.contains_value(2.0));
    assert!(!set.contains_value(4.0));

    // Canonicalized integer spans that touch do merge.
    let c: IntSpan = (1..=3).into();
    let d: IntSpan = (4..=7).into();
    assert_eq!(c.merge(&d).unwrap(), (1..8).into());
}

#[test]
fn index_probe_returns_exactly_the_overlapping_boxes() {
    let mut tree = QuadTree::new();
    let mut keys = Vec::new();
    for i in 0..20i32 {
        let x = i as f64;
        let text = format!(
            "STBOX XT((({}, 0), ({}, 1)), [2020-01-01, 2020-01-02])",
            x,
            x + 0.75
        );
        let key: STBox = text.parse().unwrap();
        tree.insert(i as u64, key.clone());
        keys.push(key);
    }
    let query: STBox = "STBOX XT(((5.5, 0), (9.25, 1)), [2020-01-01, 2020-01-02])"
        .parse()
        .unwrap();
    let hits = tree.query(&query, Strategy::Overlaps);
    let expected: Vec<u64> = keys
        .iter()
        .enumerate()
        .filter(|(_, k)| k.overlaps_stbox(&query).unwrap())
        .map(|(i, _)| i as u64)
        .collect();
    assert_eq!(hits, expected);
    // Entries on either side of the query stay out.
    assert!(!hits.contains(&0));
    assert!(!hits.contains(&19));
}
