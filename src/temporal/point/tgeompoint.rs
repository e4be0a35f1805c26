use chrono::{DateTime, Utc};
use geo_types::{LineString, MultiLineString};

use crate::boxes::STBox;
use crate::collections::datetime::{TsTzSpan, TsTzSpanSet};
use crate::collections::number::FloatSpan;
use crate::errors::{CancelToken, Error};
use crate::geom::{GeomPoint, Geometry};
use crate::num::float_eq;
use crate::temporal::base::TBaseType;
use crate::temporal::interpolation::TInterpolation;
use crate::temporal::lifting::{lift_temporal_base, lift_temporal_temporal, LiftedBinOp};
use crate::temporal::number::TFloat;
use crate::temporal::point::tpoint::{locate_time_on_sequence, TPointTrait, TPointType};
use crate::temporal::temporal::Temporal;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;
use crate::utils::time_at_ratio;

/// A temporal geometric (planar) point.
///
/// ## Example
/// ```
/// # use tempora::TGeomPoint;
/// let t: TGeomPoint = "[Point(0 0)@2020-01-01, Point(10 10)@2020-01-02]".parse().unwrap();
/// assert_eq!(t.end_value().x, 10.0);
/// ```
pub type TGeomPoint = Temporal<GeomPoint>;
pub type TGeomPointInst = TInstant<GeomPoint>;
pub type TGeomPointSeq = TSequence<GeomPoint>;
pub type TGeomPointSeqSet = TSequenceSet<GeomPoint>;

struct Bearing;

impl LiftedBinOp<GeomPoint, GeomPoint> for Bearing {
    type Out = f64;

    fn apply(&self, a: &GeomPoint, b: &GeomPoint) -> f64 {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let mut az = dx.atan2(dy);
        if az < 0.0 {
            az += 2.0 * std::f64::consts::PI;
        }
        az
    }

    /// The bearing to a moving target has an extremum where the relative
    /// position is parallel to the relative velocity, a linear condition.
    fn turning_points(
        &self,
        a_start: &GeomPoint,
        a_end: &GeomPoint,
        b_start: &GeomPoint,
        b_end: &GeomPoint,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        let rx0 = b_start.x - a_start.x;
        let ry0 = b_start.y - a_start.y;
        let rvx = (b_end.x - a_end.x) - rx0;
        let rvy = (b_end.y - a_end.y) - ry0;
        // cross(r(t), r'(t)) = 0  ⇔  (rx0 + rvx t)·rvy − (ry0 + rvy t)·rvx = 0,
        // whose t-terms cancel into a linear equation.
        let denom = rx0 * rvy - ry0 * rvx;
        let slope = rvx * ry0 - rvy * rx0;
        if float_eq(slope, 0.0) {
            return Vec::new();
        }
        let ratio = denom / slope;
        if ratio > crate::num::EPSILON && ratio < 1.0 - crate::num::EPSILON {
            vec![time_at_ratio(ratio, lower, upper)]
        } else {
            Vec::new()
        }
    }
}

impl TGeomPoint {
    /// Trajectory of the moving point: a line string for linear motion, the
    /// visited points otherwise.
    pub fn trajectory(&self) -> Geometry {
        let srid = TPointTrait::srid(self);
        if self.interpolation() == TInterpolation::Linear {
            let lines: Vec<LineString<f64>> = match self {
                Temporal::SequenceSet(s) => s
                    .sequences()
                    .iter()
                    .map(|q| LineString::from(
                        q.instants().iter().map(|i| (i.value().x, i.value().y)).collect::<Vec<_>>(),
                    ))
                    .collect(),
                _ => vec![LineString::from(
                    self.instants()
                        .iter()
                        .map(|i| (i.value().x, i.value().y))
                        .collect::<Vec<_>>(),
                )],
            };
            if lines.len() == 1 {
                let only = lines.into_iter().next().expect("one line");
                Geometry::new(geo_types::Geometry::LineString(only), srid)
            } else {
                Geometry::new(
                    geo_types::Geometry::MultiLineString(MultiLineString::new(lines)),
                    srid,
                )
            }
        } else {
            let points: Vec<geo_types::Point<f64>> = self
                .instants()
                .iter()
                .map(|i| geo_types::Point::new(i.value().x, i.value().y))
                .collect();
            Geometry::new(
                geo_types::Geometry::MultiPoint(geo_types::MultiPoint::new(points)),
                srid,
            )
        }
    }

    /// Temporal bearing towards a fixed point.
    pub fn bearing_to_point(&self, point: &GeomPoint) -> TFloat {
        lift_temporal_base(&Bearing, self, point)
            .expect("a unary lift covers the whole domain")
    }

    /// Temporal bearing towards another moving point.
    pub fn bearing(&self, other: &TGeomPoint) -> Result<Option<TFloat>, Error> {
        GeomPoint::check_compatible(&self.start_value(), &other.start_value())?;
        Ok(lift_temporal_temporal(&Bearing, self, other))
    }

    // ------------------------- Geometry restriction ----------------------

    /// The portions of the moving point inside `geometry`, optionally
    /// filtered by a span on the z axis. Boundary instants synthesized at
    /// the entry and exit crossings belong to the result.
    pub fn at_geometry(
        &self,
        geometry: &Geometry,
        zspan: Option<&FloatSpan>,
        token: &CancelToken,
    ) -> Result<Option<TGeomPoint>, Error> {
        geometry.check_srid(TPointTrait::srid(self))?;
        if geometry.is_empty() {
            return Ok(None);
        }
        let inside = self.geometry_time_spans(geometry, token)?;
        let mut result = match inside {
            Some(spans) => self.at_time_set(&spans),
            None => None,
        };
        if let (Some(found), Some(zspan)) = (&result, zspan) {
            let Some(tz) = found.z() else {
                return Err(Error::MixedDimensions(
                    "a z-span filter requires 3D points",
                ));
            };
            result = match tz.at_span(zspan) {
                Some(keep) => found.at_time_set(&keep.time()),
                None => None,
            };
        }
        Ok(result)
    }

    /// The portions of the moving point outside `geometry`; the crossing
    /// instants stay with the `at` side.
    pub fn minus_geometry(
        &self,
        geometry: &Geometry,
        zspan: Option<&FloatSpan>,
        token: &CancelToken,
    ) -> Result<Option<TGeomPoint>, Error> {
        match self.at_geometry(geometry, zspan, token)? {
            None => Ok(Some(self.clone())),
            Some(at) => Ok(self.minus_time_set(&at.time())),
        }
    }

    /// Restriction to a spatio-temporal box: time axis, then the xy extent
    /// as a rectangle, then the z interval.
    pub fn at_stbox(&self, stbox: &STBox, token: &CancelToken) -> Result<Option<TGeomPoint>, Error> {
        if stbox.is_geodetic() {
            return Err(Error::MixedDimensions(
                "a planar point cannot be restricted to a geodetic box",
            ));
        }
        let mut result = self.clone();
        if let Some(period) = stbox.tstzspan() {
            match result.at_tstzspan(&period) {
                Some(r) => result = r,
                None => return Ok(None),
            }
        }
        if let (Some(xmin), Some(xmax), Some(ymin), Some(ymax)) =
            (stbox.xmin(), stbox.xmax(), stbox.ymin(), stbox.ymax())
        {
            let rect = Geometry::new(
                geo_types::Geometry::Rect(geo_types::Rect::new(
                    geo_types::Coord { x: xmin, y: ymin },
                    geo_types::Coord { x: xmax, y: ymax },
                )),
                stbox.srid(),
            );
            let zspan = match (stbox.zmin(), stbox.zmax()) {
                (Some(lo), Some(hi)) => Some(FloatSpan::new(lo, hi, true, true)?),
                _ => None,
            };
            return result.at_geometry(&rect, zspan.as_ref(), token);
        }
        Ok(Some(result))
    }

    pub fn minus_stbox(
        &self,
        stbox: &STBox,
        token: &CancelToken,
    ) -> Result<Option<TGeomPoint>, Error> {
        match self.at_stbox(stbox, token)? {
            None => Ok(Some(self.clone())),
            Some(at) => Ok(self.minus_time_set(&at.time())),
        }
    }

    /// Time spans during which the moving point lies inside the geometry.
    fn geometry_time_spans(
        &self,
        geometry: &Geometry,
        token: &CancelToken,
    ) -> Result<Option<TsTzSpanSet>, Error> {
        let mut spans: Vec<TsTzSpan> = Vec::new();
        match self {
            Temporal::Instant(i) => {
                if geometry.intersects_point(&i.value().planar()) {
                    spans.push(TsTzSpan::singleton(i.timestamp()).expect("valid timestamp"));
                }
            }
            Temporal::InstantSet(s) => {
                for i in s.instants() {
                    if geometry.intersects_point(&i.value().planar()) {
                        spans.push(TsTzSpan::singleton(i.timestamp()).expect("valid timestamp"));
                    }
                }
            }
            Temporal::Sequence(s) => {
                sequence_geometry_spans(s, geometry, token, &mut spans)?;
            }
            Temporal::SequenceSet(s) => {
                for seq in s.sequences() {
                    token.check()?;
                    sequence_geometry_spans(seq, geometry, token, &mut spans)?;
                }
            }
        }
        Ok(TsTzSpanSet::new(spans).ok())
    }
}

/// Collects the inside time spans of one sequence against a geometry:
/// bounding-box prune, simple-fragment decomposition, planar clip, and
/// crossing timestamps via point location on the fragment. The raw spans
/// are clipped to the sequence's own period so excluded bounds stay
/// excluded.
fn sequence_geometry_spans(
    seq: &TSequence<GeomPoint>,
    geometry: &Geometry,
    token: &CancelToken,
    out: &mut Vec<TsTzSpan>,
) -> Result<(), Error> {
    let mut buf = Vec::new();
    collect_sequence_geometry_spans(seq, geometry, token, &mut buf)?;
    if let Ok(set) = TsTzSpanSet::new(buf) {
        if let Some(clipped) = set.intersection_span(&seq.period()) {
            out.extend(clipped.iter().copied());
        }
    }
    Ok(())
}

fn collect_sequence_geometry_spans(
    seq: &TSequence<GeomPoint>,
    geometry: &Geometry,
    token: &CancelToken,
    out: &mut Vec<TsTzSpan>,
) -> Result<(), Error> {
    use geo::BoundingRect;
    use geo::Intersects;

    if let Some(rect) = geometry.inner().bounding_rect() {
        let seq_box = seq.bounding_box();
        let disjoint = seq_box.xmax().is_some_and(|v| v < rect.min().x)
            || seq_box.xmin().is_some_and(|v| v > rect.max().x)
            || seq_box.ymax().is_some_and(|v| v < rect.min().y)
            || seq_box.ymin().is_some_and(|v| v > rect.max().y);
        if disjoint {
            tracing::trace!("geometry restriction pruned by bounding box");
            return Ok(());
        }
    }

    if seq.interpolation() != TInterpolation::Linear {
        // Samples hold their value until the next one: whole treads are in
        // or out.
        let instants = seq.instants();
        for w in instants.windows(2) {
            if geometry.intersects_point(&w[0].value().planar()) {
                out.push(
                    TsTzSpan::new(w[0].timestamp(), w[1].timestamp(), true, false)
                        .expect("ordered"),
                );
            }
        }
        if geometry.intersects_point(&seq.end_instant().value().planar())
            && seq.is_upper_inclusive()
        {
            out.push(TsTzSpan::singleton(seq.end_timestamp()).expect("valid timestamp"));
        }
        return Ok(());
    }

    let fragments = super::tpoint::split_simple(seq, token)?;
    for fragment in &fragments {
        token.check()?;
        if fragment.num_instants() == 1 {
            if geometry.intersects_point(&fragment.start_instant().value().planar()) {
                out.push(
                    TsTzSpan::singleton(fragment.start_timestamp()).expect("valid timestamp"),
                );
            }
            continue;
        }
        let coords: Vec<(f64, f64)> = fragment
            .instants()
            .iter()
            .map(|i| (i.value().x, i.value().y))
            .collect();
        let trajectory = MultiLineString::new(vec![LineString::from(coords)]);
        if let Some(clipped) = geometry.clip_lines(&trajectory, false) {
            for piece in &clipped.0 {
                if piece.0.is_empty() {
                    continue;
                }
                let first = piece.0.first().expect("non-empty piece");
                let last = piece.0.last().expect("non-empty piece");
                let t1 = locate_time_on_sequence(
                    fragment,
                    &GeomPoint::new(first.x, first.y),
                );
                let t2 = locate_time_on_sequence(fragment, &GeomPoint::new(last.x, last.y));
                if let (Some(t1), Some(t2)) = (t1, t2) {
                    let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
                    out.push(TsTzSpan::new(lo, hi, true, true).expect("ordered crossing"));
                }
            }
        } else {
            // Point/line geometry: isolated crossings, plus whole segments
            // riding along the geometry.
            for w in fragment.instants().windows(2) {
                let start = w[0].value().planar();
                let end = w[1].value().planar();
                let on_start = geometry.intersects_point(&start);
                let on_end = geometry.intersects_point(&end);
                let line = geo_types::Line::new(start.coord(), end.coord());
                if on_start && on_end && geometry.inner().intersects(&line) {
                    out.push(
                        TsTzSpan::new(w[0].timestamp(), w[1].timestamp(), true, true)
                            .expect("ordered"),
                    );
                    continue;
                }
                for hit in geometry.segment_intersection_points(&start, &end) {
                    if let Some(r) = GeomPoint::locate_on_segment(&start, &end, &hit) {
                        let t = time_at_ratio(r, w[0].timestamp(), w[1].timestamp());
                        out.push(TsTzSpan::singleton(t).expect("valid timestamp"));
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_timestamp;

    fn tp(s: &str) -> TGeomPoint {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_print() {
        let string = "[POINT(0 0)@2018-01-01 08:00:00+00, POINT(1 1)@2018-01-02 08:00:00+00]";
        let result = tp(string);
        assert_eq!(format!("{result:?}"), format!("Sequence({string})"));
    }

    #[test]
    fn restriction_to_a_polygon_interpolates_the_crossings() {
        // The seed scenario: a diagonal run clipped by the square
        // (3 3, 3 7, 7 7, 7 3).
        let t = tp("[Point(0 0)@2020-01-01, Point(10 10)@2020-01-02]");
        let square = Geometry::from_wkt("POLYGON((3 3, 3 7, 7 7, 7 3, 3 3))").unwrap();
        let inside = t
            .at_geometry(&square, None, &CancelToken::new())
            .unwrap()
            .unwrap();
        assert!(inside.start_value().distance(&GeomPoint::new(3.0, 3.0)) < 1e-9);
        assert!(inside.end_value().distance(&GeomPoint::new(7.0, 7.0)) < 1e-9);
        let expected_t1 = time_at_ratio(
            0.3,
            parse_timestamp("2020-01-01").unwrap(),
            parse_timestamp("2020-01-02").unwrap(),
        );
        assert_eq!(inside.start_timestamp(), expected_t1);
        // at is idempotent.
        let again = inside
            .at_geometry(&square, None, &CancelToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(again.time(), inside.time());
    }

    #[test]
    fn at_and_minus_geometry_partition_time() {
        let t = tp("[Point(0 0)@2020-01-01, Point(10 10)@2020-01-02]");
        let square = Geometry::from_wkt("POLYGON((3 3, 3 7, 7 7, 7 3, 3 3))").unwrap();
        let at = t
            .at_geometry(&square, None, &CancelToken::new())
            .unwrap()
            .unwrap();
        let minus = t
            .minus_geometry(&square, None, &CancelToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(at.time().union(&minus.time()), t.time());
        // The crossing instants belong to the at side only.
        match &minus {
            Temporal::SequenceSet(s) => {
                assert_eq!(s.num_sequences(), 2);
                assert!(!s.sequences()[0].is_upper_inclusive());
                assert!(!s.sequences()[1].is_lower_inclusive());
            }
            other => panic!("expected a sequence set, got {other:?}"),
        }
    }

    #[test]
    fn disjoint_geometry_restricts_to_nothing() {
        let t = tp("[Point(0 0)@2020-01-01, Point(1 1)@2020-01-02]");
        let far = Geometry::from_wkt("POLYGON((30 30, 30 40, 40 40, 40 30, 30 30))").unwrap();
        assert!(t
            .at_geometry(&far, None, &CancelToken::new())
            .unwrap()
            .is_none());
        let minus = t
            .minus_geometry(&far, None, &CancelToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(minus, t);
    }

    #[test]
    fn stbox_restriction_applies_space_and_time() {
        let t = tp("[Point(0 0)@2020-01-01, Point(10 10)@2020-01-11]");
        let stbox: STBox = "STBOX XT(((2, 2), (8, 8)), [2020-01-01, 2020-01-06])"
            .parse()
            .unwrap();
        let clipped = t.at_stbox(&stbox, &CancelToken::new()).unwrap().unwrap();
        assert!(clipped.start_value().distance(&GeomPoint::new(2.0, 2.0)) < 1e-9);
        // Time cap at 01-06 cuts before the spatial exit at (8, 8).
        assert_eq!(
            clipped.end_timestamp(),
            parse_timestamp("2020-01-06").unwrap()
        );
    }

    #[test]
    fn discrete_points_restrict_by_membership() {
        let t = tp("{Point(1 1)@2020-01-01, Point(5 5)@2020-01-02, Point(9 9)@2020-01-03}");
        let square = Geometry::from_wkt("POLYGON((4 4, 4 6, 6 6, 6 4, 4 4))").unwrap();
        let inside = t
            .at_geometry(&square, None, &CancelToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(inside.num_instants(), 1);
        assert_eq!(inside.start_value(), GeomPoint::new(5.0, 5.0));
    }

    #[test]
    fn trajectory_of_linear_motion_is_a_linestring() {
        let t = tp("[Point(0 0)@2020-01-01, Point(10 10)@2020-01-02]");
        assert_eq!(t.trajectory().geom_type(), "LineString");
        let d: TGeomPoint = "{Point(0 0)@2020-01-01, Point(1 1)@2020-01-02}".parse().unwrap();
        assert_eq!(d.trajectory().geom_type(), "MultiPoint");
    }

    #[test]
    fn bearing_to_a_fixed_point() {
        let t = tp("[Point(0 0)@2020-01-01, Point(0 5)@2020-01-02]");
        let east = GeomPoint::new(10.0, 0.0);
        let bearing = t.bearing_to_point(&east);
        // Due east at the start.
        assert!((bearing.start_value() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }
}
