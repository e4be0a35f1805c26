//! Cross-module algebraic properties of the temporal algebra: round-trips,
//! restriction laws, distance consistency and normalization idempotence.

use chrono::TimeDelta;
use tempora::{
    CancelToken, FloatSpan, OrderedTemporal, TBox, TFloat, TGeomPoint, TPointTrait, TText,
    Temporal, TsTzSpanSet,
};

fn tf(s: &str) -> TFloat {
    s.parse().unwrap()
}

fn tp(s: &str) -> TGeomPoint {
    s.parse().unwrap()
}

#[test]
fn text_round_trip_is_structural() {
    for text in [
        "1.5@2020-01-01 00:00:00+00",
        "{1@2020-01-01 00:00:00+00, 2@2020-01-02 00:00:00+00}",
        "[1@2020-01-01 00:00:00+00, 3@2020-01-03 00:00:00+00)",
        "Interp=Step;[1@2020-01-01 00:00:00+00, 3@2020-01-03 00:00:00+00]",
        "{[1@2020-01-01 00:00:00+00, 3@2020-01-03 00:00:00+00), [7@2020-01-07 00:00:00+00]}",
    ] {
        let t = tf(text);
        let reparsed: TFloat = t.to_string().parse().unwrap();
        assert_eq!(reparsed, t, "{text}");
    }
    let text: TText = "{[\"a\"@2020-01-01, \"b\"@2020-01-02]}".parse().unwrap();
    let reparsed: TText = text.to_string().parse().unwrap();
    assert_eq!(reparsed, text);
}

#[test]
fn shift_scale_then_inverse_is_identity() {
    let t = tf("[1@2020-01-01, 3@2020-01-03, 4@2020-01-05]");
    let there = t.shift_scale_time(Some(TimeDelta::days(7)), Some(TimeDelta::days(8)));
    let back = there.shift_scale_time(Some(TimeDelta::days(-7)), Some(TimeDelta::days(4)));
    assert_eq!(back, t);
}

#[test]
fn at_is_idempotent() {
    let t = tf("[0@2020-01-01, 10@2020-01-11]");
    let span: FloatSpan = (2.0..=4.0).into();
    let once = t.at_span(&span).unwrap();
    let twice = once.at_span(&span).unwrap();
    assert_eq!(twice, once);

    let at_value_once = t.at_value(&5.0).unwrap();
    let at_value_twice = at_value_once.at_value(&5.0).unwrap();
    assert_eq!(at_value_twice, at_value_once);
}

#[test]
fn at_and_minus_partition_the_time_domain() {
    let t = tf("[0@2020-01-01, 10@2020-01-11]");
    for restrictor in [(2.0..=4.0).into(), (0.0..5.0).into(), (9.0..=20.0).into()] {
        let restrictor: FloatSpan = restrictor;
        let at = t.at_span(&restrictor);
        let minus = t.minus_span(&restrictor);
        let reunion = match (&at, &minus) {
            (Some(a), Some(m)) => a.time().union(&m.time()),
            (Some(a), None) => a.time(),
            (None, Some(m)) => m.time(),
            (None, None) => panic!("restriction lost the whole domain"),
        };
        assert_eq!(reunion, t.time(), "{restrictor:?}");
        // The two sides share at most the synthesized boundary instants.
        if let (Some(a), Some(m)) = (&at, &minus) {
            if let Some(shared) = a.time().intersection(&m.time()) {
                for span in shared.iter() {
                    assert_eq!(span.lower(), span.upper());
                }
            }
        }
    }
}

#[test]
fn at_distributes_over_span_union() {
    let t = tf("[0@2020-01-01, 10@2020-01-11]");
    let r1: FloatSpan = (1.0..=2.0).into();
    let r2: FloatSpan = (6.0..=8.0).into();
    let both = r1.union(&r2);
    let combined = t.at_span_set(&both).unwrap();
    let separate = {
        let a = t.at_span(&r1).unwrap();
        let b = t.at_span(&r2).unwrap();
        a.merge(&b).unwrap()
    };
    assert_eq!(combined.time(), separate.time());
}

#[test]
fn at_distributes_over_time_union() {
    let t = tf("[0@2020-01-01, 10@2020-01-11]");
    let s1: TsTzSpanSet = "{[2020-01-02, 2020-01-04]}".parse().unwrap();
    let s2: TsTzSpanSet = "{[2020-01-06, 2020-01-08]}".parse().unwrap();
    let union = s1.union(&s2);
    let combined = t.at_time_set(&union).unwrap();
    let separate = t
        .at_time_set(&s1)
        .unwrap()
        .merge(&t.at_time_set(&s2).unwrap())
        .unwrap();
    assert_eq!(combined.time(), separate.time());
}

#[test]
fn disjoint_boxes_imply_no_zero_distance() {
    let a = tp("[Point(0 0)@2020-01-01, Point(1 1)@2020-01-05]");
    let b = tp("[Point(10 10)@2020-01-01, Point(8 8)@2020-01-05]");
    let a_box = a.bounding_box();
    let b_box = b.bounding_box();
    assert!(!a_box.overlaps_stbox(&b_box).unwrap() || a_box.tstzspan() != b_box.tstzspan());
    let d = a.tdistance(&b).unwrap().unwrap();
    assert!(d.min_value() > 0.0);
}

#[test]
fn nad_is_the_minimum_of_tdistance() {
    let a = tp("[Point(0 0)@2020-01-01, Point(10 0)@2020-01-05]");
    let b = tp("[Point(10 3)@2020-01-01, Point(0 3)@2020-01-05]");
    let d = a.tdistance(&b).unwrap().unwrap();
    assert_eq!(a.nearest_approach_distance(&b).unwrap(), d.min_value());
}

#[test]
fn tdwithin_agrees_with_the_pointwise_distance() {
    let a = tp("[Point(0 0)@2020-01-01, Point(10 0)@2020-01-11]");
    let b = tp("[Point(10 1)@2020-01-01, Point(0 1)@2020-01-11]");
    let dist = 3.0;
    let within = a.tdwithin(&b, dist, &CancelToken::new()).unwrap().unwrap();
    // Sample densely against the exactly computed distance; the lifted
    // tdistance is piecewise linear between turning points by design, so it
    // is not the reference here.
    let start = a.start_timestamp();
    for hour in 0..240 {
        let t = start + TimeDelta::hours(hour);
        let w = within.value_at_timestamp(t, false).unwrap();
        let pa = a.value_at_timestamp(t, false).unwrap();
        let pb = b.value_at_timestamp(t, false).unwrap();
        let dv = ((pa.x - pb.x).powi(2) + (pa.y - pb.y).powi(2)).sqrt();
        if (dv - dist).abs() > 1e-6 {
            assert_eq!(w, dv <= dist, "at {t}: distance {dv}");
        }
    }
    // The minimum of the lifted distance still agrees at its samples.
    let d = a.tdistance(&b).unwrap().unwrap();
    assert_eq!(d.min_value(), 1.0);
}

#[test]
fn normalization_is_idempotent_at_the_value_level() {
    let t = tf("[1@2020-01-01, 2@2020-01-02, 3@2020-01-03, 3@2020-01-04, 3@2020-01-05]");
    // The collinear middles collapse on construction: the ramp keeps its
    // endpoints and the kink at the plateau.
    assert_eq!(t.num_instants(), 3);
    let reparsed: TFloat = t.to_string().parse().unwrap();
    assert_eq!(reparsed.num_instants(), t.num_instants());
}

#[test]
fn tbox_filters_agree_with_exact_restriction() {
    let t = tf("[0@2020-01-01, 10@2020-01-11]");
    let tbox: TBox = "TBOX XT([3, 6], [2020-01-02, 2020-01-09])".parse().unwrap();
    let clipped = t.at_tbox(&tbox).unwrap();
    for instant in clipped.instants() {
        assert!(*instant.value() >= 3.0 - 1e-9 && *instant.value() <= 6.0 + 1e-9);
        assert!(tbox.tstzspan().unwrap().contains_value(instant.timestamp()));
    }
    // Everything the filter kept really was in the original.
    for instant in clipped.instants() {
        let original = t.value_at_timestamp(instant.timestamp(), false).unwrap();
        assert!((original - instant.value()).abs() < 1e-9);
    }
}

#[test]
fn geometry_restriction_composes_with_time_restriction() {
    use tempora::Geometry;
    let t = tp("[Point(0 0)@2020-01-01, Point(10 10)@2020-01-11]");
    let square = Geometry::from_wkt("POLYGON((2 2, 2 8, 8 8, 8 2, 2 2))").unwrap();
    let inside = t
        .at_geometry(&square, None, &CancelToken::new())
        .unwrap()
        .unwrap();
    // Restricting the restriction to its own time span changes nothing.
    let again = inside.at_time_set(&inside.time()).unwrap();
    assert_eq!(again.time(), inside.time());
    assert_eq!(TPointTrait::srid(&inside), 0);
}

#[test]
fn merge_requires_agreement_on_overlaps() {
    let a = tf("[1@2020-01-01, 3@2020-01-03]");
    let same = tf("[2@2020-01-02, 3@2020-01-03, 5@2020-01-05]");
    let merged = a.merge(&same).unwrap();
    assert_eq!(merged.start_timestamp(), a.start_timestamp());
    assert_eq!(merged.end_value(), 5.0);

    let conflicting = tf("[9@2020-01-02, 9@2020-01-04]");
    assert!(a.merge(&conflicting).is_err());
}

#[test]
fn conversion_matrix_round_trips_where_lossless() {
    let instant = tf("1@2020-01-01");
    let seq = instant.to_sequence(tempora::TInterpolation::Linear).unwrap();
    assert_eq!(seq.num_instants(), 1);
    let back = Temporal::Sequence(seq).to_instant().unwrap();
    assert_eq!(Temporal::Instant(back), instant);

    let discrete = tf("{1@2020-01-01, 2@2020-01-02}");
    let seqset = discrete
        .to_sequence_set(tempora::TInterpolation::Linear)
        .unwrap();
    assert_eq!(seqset.num_sequences(), 2);
    let rediscretized = Temporal::SequenceSet(seqset)
        .set_interpolation(tempora::TInterpolation::Discrete)
        .unwrap();
    assert_eq!(rediscretized, discrete);
}
