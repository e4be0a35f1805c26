//! Capabilities and operators shared by the temporal point types: base-type
//! wiring for [`GeomPoint`] and [`GeogPoint`], spatial accessors, the
//! temporal distance family and the within-distance engine.

use std::fmt;
use std::hash::Hasher;

use chrono::{DateTime, Utc};

use crate::boxes::STBox;
use crate::collections::datetime::TsTzSpan;
use crate::errors::{CancelToken, Error, ParseError};
use crate::geom::{make_line, stbox_of_point, GeogPoint, GeomPoint, Geometry};
use crate::io::wkb::{WkbReader, WkbWriter};
use crate::num::{float_eq, solve_quadratic, QuadraticRoots, EPSILON};
use crate::temporal::base::{TBaseType, TempType};
use crate::temporal::interpolation::TInterpolation;
use crate::temporal::lifting::{lift_temporal_base, lift_temporal_temporal, LiftedBinOp};
use crate::temporal::number::TFloat;
use crate::temporal::segment::{dwithin_pieces, DwithinRoots};
use crate::temporal::tbool::TBool;
use crate::temporal::temporal::{OrderedTemporal, Temporal};
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;
use crate::utils::time_at_ratio;

/// Per-segment within-distance answer in the normalized parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentWithin {
    Never,
    Always,
    Ratios(f64, f64),
}

/// Base-type capabilities of the point types the spatial temporals range
/// over.
pub trait TPointType: TBaseType<Bbox = STBox> {
    const GEODETIC: bool;

    fn make_point(x: f64, y: f64, z: Option<f64>, srid: i32) -> Self;
    fn coords(&self) -> (f64, f64, Option<f64>);
    fn point_srid(&self) -> i32;

    /// The type's distance metric: planar Euclidean or great-circle meters.
    fn metric_distance(a: &Self, b: &Self) -> f64;

    /// Planar view for the geometry collaborator.
    fn planar(&self) -> GeomPoint;

    /// Ratio strictly inside `(0, 1)` minimizing the distance between two
    /// synchronized segments, when an analytic solver exists.
    fn distance_turning_ratio(s1: &Self, e1: &Self, s2: &Self, e2: &Self) -> Option<f64>;

    /// Solves `distance(seg1(r), seg2(r)) = d` over the normalized
    /// parameter. `None` means no analytic solver exists for the metric and
    /// the caller must fall back to sampling.
    fn dwithin_ratios(
        s1: &Self,
        e1: &Self,
        s2: &Self,
        e2: &Self,
        d: f64,
    ) -> Option<SegmentWithin>;
}

// ------------------------- Planar segment solvers ----------------------------

fn relative_motion(
    s1: &GeomPoint,
    e1: &GeomPoint,
    s2: &GeomPoint,
    e2: &GeomPoint,
) -> ([f64; 3], [f64; 3]) {
    let z = |p: &GeomPoint| p.z.unwrap_or(0.0);
    let offset = [s1.x - s2.x, s1.y - s2.y, z(s1) - z(s2)];
    let velocity = [
        (e1.x - s1.x) - (e2.x - s2.x),
        (e1.y - s1.y) - (e2.y - s2.y),
        (z(e1) - z(s1)) - (z(e2) - z(s2)),
    ];
    (offset, velocity)
}

fn planar_distance_turning_ratio(
    s1: &GeomPoint,
    e1: &GeomPoint,
    s2: &GeomPoint,
    e2: &GeomPoint,
) -> Option<f64> {
    let (offset, velocity) = relative_motion(s1, e1, s2, e2);
    let a: f64 = velocity.iter().map(|v| v * v).sum();
    if a < EPSILON {
        return None;
    }
    let b: f64 = 2.0 * offset.iter().zip(&velocity).map(|(o, v)| o * v).sum::<f64>();
    let ratio = -b / (2.0 * a);
    (ratio > EPSILON && ratio < 1.0 - EPSILON).then_some(ratio)
}

/// The quadratic of the squared distance between two moving points, solved
/// for `distance = d`: the a == 0 branch covers parallel equal-speed motion.
fn planar_dwithin_ratios(
    s1: &GeomPoint,
    e1: &GeomPoint,
    s2: &GeomPoint,
    e2: &GeomPoint,
    d: f64,
) -> SegmentWithin {
    let (offset, velocity) = relative_motion(s1, e1, s2, e2);
    let a: f64 = velocity.iter().map(|v| v * v).sum();
    let b: f64 = 2.0 * offset.iter().zip(&velocity).map(|(o, v)| o * v).sum::<f64>();
    let c: f64 = offset.iter().map(|o| o * o).sum::<f64>() - d * d;
    if a < EPSILON {
        return if s1.distance(s2) <= d + EPSILON {
            SegmentWithin::Always
        } else {
            SegmentWithin::Never
        };
    }
    match solve_quadratic(a, b, c) {
        QuadraticRoots::None => SegmentWithin::Never,
        QuadraticRoots::One(r) => SegmentWithin::Ratios(r, r),
        QuadraticRoots::Two(r1, r2) => SegmentWithin::Ratios(r1, r2),
    }
}

fn planar_segment_intersection(
    s1: &GeomPoint,
    e1: &GeomPoint,
    s2: &GeomPoint,
    e2: &GeomPoint,
) -> Option<f64> {
    let (offset, velocity) = relative_motion(s1, e1, s2, e2);
    let mut ratio: Option<f64> = None;
    for (o, v) in offset.iter().zip(&velocity) {
        if v.abs() < EPSILON {
            if o.abs() > EPSILON {
                return None;
            }
            continue;
        }
        let r = -o / v;
        match ratio {
            None => ratio = Some(r),
            Some(prev) if !float_eq(prev, r) => return None,
            _ => {}
        }
    }
    ratio.filter(|r| *r > EPSILON && *r < 1.0 - EPSILON)
}

// ------------------------- Base-type wiring ----------------------------------

impl TBaseType for GeomPoint {
    type Bbox = STBox;

    const CONTINUOUS: bool = true;
    const TEMP_TYPE: TempType = TempType::GeomPoint;

    fn instant_bbox(value: &Self, t: DateTime<Utc>) -> STBox {
        stbox_of_point(
            value,
            false,
            Some(TsTzSpan::singleton(t).expect("valid timestamp")),
        )
    }

    fn eq_base(a: &Self, b: &Self) -> bool {
        float_eq(a.x, b.x)
            && float_eq(a.y, b.y)
            && match (a.z, b.z) {
                (Some(az), Some(bz)) => float_eq(az, bz),
                (None, None) => true,
                _ => false,
            }
    }

    fn base_distance(a: &Self, b: &Self) -> Option<f64> {
        Some(a.distance(b))
    }

    fn interpolate(start: &Self, end: &Self, ratio: f64) -> Self {
        start.lerp(end, ratio)
    }

    fn locate(start: &Self, end: &Self, value: &Self) -> Option<f64> {
        GeomPoint::locate_on_segment(start, end, value)
    }

    fn intersection_segments(s1: &Self, e1: &Self, s2: &Self, e2: &Self) -> Option<f64> {
        planar_segment_intersection(s1, e1, s2, e2)
    }

    fn srid(&self) -> i32 {
        self.srid
    }

    fn has_z(&self) -> bool {
        self.z.is_some()
    }

    fn check_compatible(a: &Self, b: &Self) -> Result<(), Error> {
        if a.srid != b.srid && a.srid != 0 && b.srid != 0 {
            return Err(Error::MixedDimensions("points have different SRIDs"));
        }
        if a.z.is_some() != b.z.is_some() {
            return Err(Error::MixedDimensions("2D and 3D points cannot be combined"));
        }
        Ok(())
    }

    fn format_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        s.parse()
    }

    fn write_wkb(&self, out: &mut WkbWriter) {
        out.write_u8(self.z.is_some() as u8);
        out.write_i32(self.srid);
        out.write_f64(self.x);
        out.write_f64(self.y);
        if let Some(z) = self.z {
            out.write_f64(z);
        }
    }

    fn read_wkb(reader: &mut WkbReader<'_>) -> Result<Self, Error> {
        let has_z = reader.read_u8()? != 0;
        let srid = reader.read_i32()?;
        let x = reader.read_f64()?;
        let y = reader.read_f64()?;
        let z = if has_z { Some(reader.read_f64()?) } else { None };
        Ok(Self { x, y, z, srid })
    }

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        use std::hash::Hash;
        self.hash(state);
    }
}

impl TPointType for GeomPoint {
    const GEODETIC: bool = false;

    fn make_point(x: f64, y: f64, z: Option<f64>, srid: i32) -> Self {
        Self { x, y, z, srid }
    }

    fn coords(&self) -> (f64, f64, Option<f64>) {
        (self.x, self.y, self.z)
    }

    fn point_srid(&self) -> i32 {
        self.srid
    }

    fn metric_distance(a: &Self, b: &Self) -> f64 {
        a.distance(b)
    }

    fn planar(&self) -> GeomPoint {
        *self
    }

    fn distance_turning_ratio(s1: &Self, e1: &Self, s2: &Self, e2: &Self) -> Option<f64> {
        planar_distance_turning_ratio(s1, e1, s2, e2)
    }

    fn dwithin_ratios(s1: &Self, e1: &Self, s2: &Self, e2: &Self, d: f64) -> Option<SegmentWithin> {
        Some(planar_dwithin_ratios(s1, e1, s2, e2, d))
    }
}

impl TBaseType for GeogPoint {
    type Bbox = STBox;

    const CONTINUOUS: bool = true;
    const TEMP_TYPE: TempType = TempType::GeogPoint;

    fn instant_bbox(value: &Self, t: DateTime<Utc>) -> STBox {
        stbox_of_point(
            &value.0,
            true,
            Some(TsTzSpan::singleton(t).expect("valid timestamp")),
        )
    }

    fn eq_base(a: &Self, b: &Self) -> bool {
        GeomPoint::eq_base(&a.0, &b.0)
    }

    fn base_distance(a: &Self, b: &Self) -> Option<f64> {
        Some(a.distance(b))
    }

    fn interpolate(start: &Self, end: &Self, ratio: f64) -> Self {
        GeogPoint(start.0.lerp(&end.0, ratio))
    }

    fn locate(start: &Self, end: &Self, value: &Self) -> Option<f64> {
        GeomPoint::locate_on_segment(&start.0, &end.0, &value.0)
    }

    fn intersection_segments(s1: &Self, e1: &Self, s2: &Self, e2: &Self) -> Option<f64> {
        planar_segment_intersection(&s1.0, &e1.0, &s2.0, &e2.0)
    }

    fn srid(&self) -> i32 {
        self.0.srid
    }

    fn has_z(&self) -> bool {
        self.0.z.is_some()
    }

    fn check_compatible(a: &Self, b: &Self) -> Result<(), Error> {
        GeomPoint::check_compatible(&a.0, &b.0)
    }

    fn format_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        s.parse()
    }

    fn write_wkb(&self, out: &mut WkbWriter) {
        self.0.write_wkb(out);
    }

    fn read_wkb(reader: &mut WkbReader<'_>) -> Result<Self, Error> {
        GeomPoint::read_wkb(reader).map(GeogPoint)
    }

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        use std::hash::Hash;
        self.hash(state);
    }
}

impl TPointType for GeogPoint {
    const GEODETIC: bool = true;

    fn make_point(x: f64, y: f64, z: Option<f64>, srid: i32) -> Self {
        GeogPoint(GeomPoint { x, y, z, srid })
    }

    fn coords(&self) -> (f64, f64, Option<f64>) {
        (self.0.x, self.0.y, self.0.z)
    }

    fn point_srid(&self) -> i32 {
        self.0.srid
    }

    fn metric_distance(a: &Self, b: &Self) -> f64 {
        a.distance(b)
    }

    fn planar(&self) -> GeomPoint {
        self.0
    }

    /// The great-circle metric has no closed quadratic form; turning points
    /// fall back to the synchronized samples.
    fn distance_turning_ratio(_: &Self, _: &Self, _: &Self, _: &Self) -> Option<f64> {
        None
    }

    fn dwithin_ratios(_: &Self, _: &Self, _: &Self, _: &Self, _: f64) -> Option<SegmentWithin> {
        None
    }
}

// ------------------------- Lifted distance -----------------------------------

struct PointDist;

impl<B: TPointType> LiftedBinOp<B, B> for PointDist {
    type Out = f64;

    fn apply(&self, a: &B, b: &B) -> f64 {
        B::metric_distance(a, b)
    }

    fn turning_points(
        &self,
        a_start: &B,
        a_end: &B,
        b_start: &B,
        b_end: &B,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        B::distance_turning_ratio(a_start, a_end, b_start, b_end)
            .map(|r| vec![time_at_ratio(r, lower, upper)])
            .unwrap_or_default()
    }
}

struct WithinSampled<B> {
    distance: f64,
    _marker: std::marker::PhantomData<B>,
}

impl<B: TPointType> LiftedBinOp<B, B> for WithinSampled<B> {
    type Out = bool;

    fn apply(&self, a: &B, b: &B) -> bool {
        B::metric_distance(a, b) <= self.distance + EPSILON
    }

    fn discontinuous(&self) -> bool {
        true
    }
}

/// Spatial accessors and operators of the temporal point types, in the
/// shape the temporal point interface exposes them.
pub trait TPointTrait<B: TPointType> {
    fn srid(&self) -> i32;
    fn x(&self) -> TFloat;
    fn y(&self) -> TFloat;
    fn z(&self) -> Option<TFloat>;
    fn length(&self) -> f64;
    fn cumulative_length(&self) -> TFloat;
    fn speed(&self) -> Option<TFloat>;
    fn twcentroid(&self) -> B;
    fn direction(&self) -> Option<f64>;
    fn azimuth(&self) -> Option<TFloat>;
    fn stboxes(&self) -> Vec<STBox>;
    fn is_simple(&self) -> bool;
    fn make_simple(&self, token: &CancelToken) -> Result<Vec<TSequence<B>>, Error>;
    fn tdistance(&self, other: &Temporal<B>) -> Result<Option<TFloat>, Error>;
    fn tdistance_to_point(&self, point: &B) -> TFloat;
    fn nearest_approach_distance(&self, other: &Temporal<B>) -> Result<f64, Error>;
    fn nearest_approach_instant(&self, other: &Temporal<B>) -> Result<Option<TInstant<B>>, Error>;
    fn shortest_line(&self, other: &Temporal<B>) -> Result<Option<Geometry>, Error>;
    fn tdwithin(&self, other: &Temporal<B>, d: f64, token: &CancelToken)
        -> Result<Option<TBool>, Error>;
    fn tdwithin_point(&self, point: &B, d: f64, token: &CancelToken)
        -> Result<Option<TBool>, Error>;
}

fn check_point_compat<B: TPointType>(a: &Temporal<B>, b: &Temporal<B>) -> Result<(), Error> {
    B::check_compatible(&a.start_value(), &b.start_value())
}

impl<B: TPointType> TPointTrait<B> for Temporal<B> {
    fn srid(&self) -> i32 {
        self.start_value().point_srid()
    }

    fn x(&self) -> TFloat {
        self.map_base(&|p: &B| p.coords().0)
    }

    fn y(&self) -> TFloat {
        self.map_base(&|p: &B| p.coords().1)
    }

    fn z(&self) -> Option<TFloat> {
        self.start_value().coords().2?;
        Some(self.map_base(&|p: &B| p.coords().2.unwrap_or(0.0)))
    }

    /// Length of the trajectory: the metric sum over linear segments.
    fn length(&self) -> f64 {
        self.segments()
            .iter()
            .filter(|s| s.interpolation() == TInterpolation::Linear)
            .map(|s| {
                B::metric_distance(s.start_instant().value(), s.end_instant().value())
            })
            .sum()
    }

    fn cumulative_length(&self) -> TFloat {
        let mut acc = 0.0;
        let map_seq = |seq: &TSequence<B>, acc: &mut f64| -> TSequence<f64> {
            let linear = seq.interpolation() == TInterpolation::Linear;
            let mut instants = Vec::with_capacity(seq.num_instants());
            let mut prev: Option<&TInstant<B>> = None;
            for instant in seq.instants() {
                if let (Some(p), true) = (prev, linear) {
                    *acc += B::metric_distance(p.value(), instant.value());
                }
                instants.push(TInstant::new(*acc, instant.timestamp()));
                prev = Some(instant);
            }
            TSequence::from_parts_unchecked(
                instants,
                seq.is_lower_inclusive(),
                seq.is_upper_inclusive(),
                if linear {
                    TInterpolation::Linear
                } else {
                    TInterpolation::Stepwise
                },
            )
        };
        match self {
            Temporal::Sequence(s) => Temporal::Sequence(map_seq(s, &mut acc)),
            Temporal::SequenceSet(s) => Temporal::SequenceSet(
                TSequenceSet::make(
                    s.sequences().iter().map(|q| map_seq(q, &mut acc)).collect(),
                    false,
                )
                .expect("mapping preserves the time structure"),
            ),
            other => other.map_base(&|_| 0.0),
        }
    }

    /// Speed over each segment, as a step function. `None` for values
    /// without segments.
    fn speed(&self) -> Option<TFloat> {
        let speed_seq = |seq: &TSequence<B>| -> Option<TSequence<f64>> {
            if seq.num_instants() < 2 {
                return None;
            }
            let mut instants = Vec::with_capacity(seq.num_instants());
            for w in seq.instants().windows(2) {
                let dt = (w[1].timestamp() - w[0].timestamp())
                    .num_microseconds()
                    .unwrap_or(0) as f64
                    / 1_000_000.0;
                let v = B::metric_distance(w[0].value(), w[1].value()) / dt;
                instants.push(TInstant::new(v, w[0].timestamp()));
            }
            let closing = instants.last().expect("two instants minimum").value().clone();
            instants.push(TInstant::new(closing, seq.end_timestamp()));
            Some(TSequence::from_parts_unchecked(
                instants,
                seq.is_lower_inclusive(),
                seq.is_upper_inclusive(),
                TInterpolation::Stepwise,
            ))
        };
        match self {
            Temporal::Sequence(s) => speed_seq(s).map(Temporal::Sequence),
            Temporal::SequenceSet(s) => Temporal::from_sequences(
                s.sequences().iter().filter_map(speed_seq).collect(),
            ),
            _ => None,
        }
    }

    /// Time-weighted centroid of the trajectory.
    fn twcentroid(&self) -> B {
        let x = self.x().time_weighted_average();
        let y = self.y().time_weighted_average();
        let z = self.z().map(|tz| tz.time_weighted_average());
        B::make_point(x, y, z, self.srid())
    }

    /// Azimuth from the first to the last position, in radians from north,
    /// or `None` when they coincide.
    fn direction(&self) -> Option<f64> {
        let start = self.start_value().planar();
        let end = self.end_value().planar();
        azimuth_between(&start, &end)
    }

    /// Per-segment azimuth as a step function, skipping stationary
    /// segments.
    fn azimuth(&self) -> Option<TFloat> {
        let mut pieces: Vec<TSequence<f64>> = Vec::new();
        for seg in self.segments() {
            if seg.interpolation() != TInterpolation::Linear {
                continue;
            }
            let (a, b) = (seg.start_instant(), seg.end_instant());
            let Some(value) = azimuth_between(&a.value().planar(), &b.value().planar()) else {
                continue;
            };
            pieces.push(TSequence::from_parts_unchecked(
                vec![
                    TInstant::new(value, a.timestamp()),
                    TInstant::new(value, b.timestamp()),
                ],
                seg.is_lower_inclusive(),
                false,
                TInterpolation::Stepwise,
            ));
        }
        match TSequenceSet::make(pieces, true) {
            Ok(set) => Some(Temporal::SequenceSet(set)),
            Err(_) => None,
        }
    }

    /// One spatio-temporal box per segment.
    fn stboxes(&self) -> Vec<STBox> {
        self.segments()
            .iter()
            .map(|s| s.bounding_box().clone())
            .collect()
    }

    fn is_simple(&self) -> bool {
        match self.make_simple(&CancelToken::new()) {
            Ok(fragments) => fragments.len() <= 1,
            Err(_) => false,
        }
    }

    /// Decomposes the trajectory into simple (non-self-intersecting)
    /// fragments by scanning each new segment against the fragment so far.
    fn make_simple(&self, token: &CancelToken) -> Result<Vec<TSequence<B>>, Error> {
        let mut fragments = Vec::new();
        for seq in continuous_or_promoted(self) {
            fragments.extend(split_simple(&seq, token)?);
        }
        Ok(fragments)
    }

    fn tdistance(&self, other: &Temporal<B>) -> Result<Option<TFloat>, Error> {
        check_point_compat(self, other)?;
        Ok(lift_temporal_temporal(&PointDist, self, other))
    }

    fn tdistance_to_point(&self, point: &B) -> TFloat {
        lift_temporal_base(&PointDist, self, point)
            .expect("a unary lift covers the whole domain")
    }

    fn nearest_approach_distance(&self, other: &Temporal<B>) -> Result<f64, Error> {
        Ok(match self.tdistance(other)? {
            Some(d) => d.min_value(),
            None => f64::INFINITY,
        })
    }

    /// The instant of `self` realizing the nearest approach.
    fn nearest_approach_instant(&self, other: &Temporal<B>) -> Result<Option<TInstant<B>>, Error> {
        let Some(distance) = self.tdistance(other)? else {
            return Ok(None);
        };
        let t = distance.min_instant().timestamp();
        Ok(self
            .value_at_timestamp(t, false)
            .map(|v| TInstant::new(v, t)))
    }

    /// The two-point geometry connecting the positions at the nearest
    /// approach.
    fn shortest_line(&self, other: &Temporal<B>) -> Result<Option<Geometry>, Error> {
        let Some(instant) = self.nearest_approach_instant(other)? else {
            return Ok(None);
        };
        let t = instant.timestamp();
        let Some(their) = other.value_at_timestamp(t, false) else {
            return Ok(None);
        };
        Ok(Some(make_line(
            &instant.value().planar(),
            &their.planar(),
        )))
    }

    /// Temporal within-distance: true exactly while the two moving points
    /// are within `d` of each other, with the per-segment quadratic roots
    /// synthesized as switch instants.
    fn tdwithin(
        &self,
        other: &Temporal<B>,
        d: f64,
        token: &CancelToken,
    ) -> Result<Option<TBool>, Error> {
        check_point_compat(self, other)?;
        if discrete_like(self) || discrete_like(other) {
            let within = WithinSampled { distance: d, _marker: std::marker::PhantomData };
            return Ok(lift_temporal_temporal(&within, self, other));
        }
        let mut pieces: Vec<TSequence<bool>> = Vec::new();
        for sa in continuous_or_promoted(self) {
            token.check()?;
            for sb in continuous_or_promoted(other) {
                pieces.extend(tdwithin_seq_pair(&sa, &sb, d)?);
            }
        }
        match TSequenceSet::make(pieces, true) {
            Ok(set) => {
                if set.num_sequences() == 1 {
                    Ok(Some(Temporal::Sequence(set.sequences()[0].clone())))
                } else {
                    Ok(Some(Temporal::SequenceSet(set)))
                }
            }
            Err(_) => Ok(None),
        }
    }

    fn tdwithin_point(
        &self,
        point: &B,
        d: f64,
        token: &CancelToken,
    ) -> Result<Option<TBool>, Error> {
        let constant = constant_like(self, point.clone());
        self.tdwithin(&constant, d, token)
    }
}

/// Azimuth in radians clockwise from north, `None` for coincident points.
fn azimuth_between(a: &GeomPoint, b: &GeomPoint) -> Option<f64> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if float_eq(dx, 0.0) && float_eq(dy, 0.0) {
        return None;
    }
    let mut az = dx.atan2(dy);
    if az < 0.0 {
        az += 2.0 * std::f64::consts::PI;
    }
    Some(az)
}

fn discrete_like<B: TBaseType>(t: &Temporal<B>) -> bool {
    matches!(t, Temporal::Instant(_) | Temporal::InstantSet(_))
}

/// The continuous sequences of a value, promoting an instant to an
/// instantaneous sequence.
fn continuous_or_promoted<B: TBaseType>(t: &Temporal<B>) -> Vec<TSequence<B>> {
    match t {
        Temporal::Sequence(s) => vec![s.clone()],
        Temporal::SequenceSet(s) => s.sequences().to_vec(),
        Temporal::Instant(i) => vec![TSequence::from_parts_unchecked(
            vec![i.clone()],
            true,
            true,
            TInterpolation::Stepwise,
        )],
        Temporal::InstantSet(s) => s
            .instants()
            .iter()
            .map(|i| {
                TSequence::from_parts_unchecked(
                    vec![i.clone()],
                    true,
                    true,
                    TInterpolation::Stepwise,
                )
            })
            .collect(),
    }
}

/// A constant temporal with the same time structure as `frame`.
fn constant_like<B: TBaseType>(frame: &Temporal<B>, value: B) -> Temporal<B> {
    frame.map_base(&move |_| value.clone())
}

/// Per-pair within-distance assembly mirroring the quadratic case analysis
/// of the segment kernel.
fn tdwithin_seq_pair<B: TPointType>(
    a: &TSequence<B>,
    b: &TSequence<B>,
    d: f64,
) -> Result<Vec<TSequence<bool>>, Error> {
    let Some(inter) = a.period().intersection(&b.period()) else {
        return Ok(Vec::new());
    };
    let (Some(a), Some(b)) = (a.at_tstzspan(&inter), b.at_tstzspan(&inter)) else {
        return Ok(Vec::new());
    };
    if inter.lower() == inter.upper() {
        let within = B::metric_distance(a.start_instant().value(), b.start_instant().value())
            <= d + EPSILON;
        return Ok(vec![TSequence::from_parts_unchecked(
            vec![TInstant::new(within, inter.lower())],
            true,
            true,
            TInterpolation::Stepwise,
        )]);
    }
    let mut grid: Vec<DateTime<Utc>> = a.timestamps();
    grid.extend(b.timestamps());
    grid.sort();
    grid.dedup();

    let a_linear = a.interpolation() == TInterpolation::Linear;
    let b_linear = b.interpolation() == TInterpolation::Linear;
    let mut pieces = Vec::new();
    for (i, w) in grid.windows(2).enumerate() {
        let (t1, t2) = (w[0], w[1]);
        let a1 = a.value_at_raw(t1);
        let a2 = if a_linear { a.value_at_raw(t2) } else { a1.clone() };
        let b1 = b.value_at_raw(t1);
        let b2 = if b_linear { b.value_at_raw(t2) } else { b1.clone() };
        let lower_inc = if i == 0 { inter.is_lower_inclusive() } else { true };
        let last = i + 2 == grid.len();
        let upper_inc = last && inter.is_upper_inclusive();
        let roots = match B::dwithin_ratios(&a1, &a2, &b1, &b2, d) {
            Some(SegmentWithin::Never) => DwithinRoots::Never,
            Some(SegmentWithin::Always) => DwithinRoots::Always,
            Some(SegmentWithin::Ratios(r1, r2)) => {
                DwithinRoots::from_normalized(r1, r2, t1, t2)
            }
            // No analytic solver for the metric: switch on the endpoint
            // samples only.
            None => {
                let within = B::metric_distance(&a1, &b1) <= d + EPSILON;
                if within {
                    DwithinRoots::Always
                } else {
                    DwithinRoots::Never
                }
            }
        };
        pieces.extend(dwithin_pieces(roots, t1, t2, lower_inc, upper_inc));
    }
    Ok(pieces)
}

/// Splits one sequence into simple fragments.
pub(crate) fn split_simple<B: TPointType>(
    seq: &TSequence<B>,
    token: &CancelToken,
) -> Result<Vec<TSequence<B>>, Error> {
    use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
    use geo_types::{Coord, Line};

    if seq.num_instants() <= 2 || seq.interpolation() != TInterpolation::Linear {
        return Ok(vec![seq.clone()]);
    }
    let coords: Vec<Coord<f64>> = seq
        .instants()
        .iter()
        .map(|i| {
            let p = i.value().planar();
            Coord { x: p.x, y: p.y }
        })
        .collect();
    let mut fragments = Vec::new();
    let mut start = 0usize;
    let n = coords.len() - 1;
    for i in 1..n {
        token.check()?;
        let current = Line::new(coords[i], coords[i + 1]);
        // Backtracking onto the immediate predecessor is a self-overlap the
        // pairwise scan below cannot see, since adjacent segments always
        // share their vertex.
        let prev = Line::new(coords[i - 1], coords[i]);
        let reversed = matches!(
            line_intersection(current, prev),
            Some(LineIntersection::Collinear { .. })
        );
        let mut crosses = reversed;
        for j in start..i.saturating_sub(1) {
            let earlier = Line::new(coords[j], coords[j + 1]);
            if line_intersection(current, earlier).is_some() {
                crosses = true;
                break;
            }
        }
        if crosses {
            tracing::debug!("trajectory self-intersects; fragment cut at instant {i}");
            fragments.push(TSequence::from_parts_unchecked(
                seq.instants()[start..=i].to_vec(),
                if start == 0 { seq.is_lower_inclusive() } else { true },
                false,
                seq.interpolation(),
            ));
            start = i;
        }
    }
    fragments.push(TSequence::from_parts_unchecked(
        seq.instants()[start..].to_vec(),
        if start == 0 { seq.is_lower_inclusive() } else { true },
        seq.is_upper_inclusive(),
        seq.interpolation(),
    ));
    Ok(fragments)
}

/// Time at which the trajectory of a simple fragment passes through `p`.
pub(crate) fn locate_time_on_sequence<B: TPointType>(
    seq: &TSequence<B>,
    p: &GeomPoint,
) -> Option<DateTime<Utc>> {
    for w in seq.instants().windows(2) {
        let start = w[0].value().planar();
        let end = w[1].value().planar();
        if let Some(r) = GeomPoint::locate_on_segment(&start, &end, p) {
            return Some(time_at_ratio(r, w[0].timestamp(), w[1].timestamp()));
        }
    }
    if seq.num_instants() == 1 {
        let only = seq.start_instant().value().planar();
        if only.distance(p) < EPSILON {
            return Some(seq.start_timestamp());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tp(s: &str) -> Temporal<GeomPoint> {
        s.parse().unwrap()
    }

    #[test]
    fn accessors_project_coordinates() {
        let t = tp("[Point(0 0)@2020-01-01, Point(10 20)@2020-01-02]");
        assert_eq!(t.x().end_value(), 10.0);
        assert_eq!(t.y().end_value(), 20.0);
        assert!(t.z().is_none());
        assert_eq!(t.length(), (100.0f64 + 400.0).sqrt());
    }

    #[test]
    fn speed_is_stepwise() {
        let t = tp("[Point(0 0)@2020-01-01, Point(0 86.4)@2020-01-02]");
        let speed = t.speed().unwrap();
        // 86.4 units over 86400 seconds.
        assert!((speed.start_value() - 0.001).abs() < EPSILON);
        assert_eq!(speed.interpolation(), TInterpolation::Stepwise);
    }

    #[test]
    fn distance_turning_point_finds_the_closest_approach() {
        // Two points moving on parallel tracks in opposite directions.
        let a = tp("[Point(0 0)@2020-01-01, Point(10 0)@2020-01-05]");
        let b = tp("[Point(10 2)@2020-01-01, Point(0 2)@2020-01-05]");
        let d = a.tdistance(&b).unwrap().unwrap();
        assert_eq!(d.min_value(), 2.0);
        assert_eq!(
            d.min_instant().timestamp(),
            crate::utils::parse_timestamp("2020-01-03").unwrap()
        );
        assert_eq!(a.nearest_approach_distance(&b).unwrap(), 2.0);
    }

    #[test]
    fn nearest_approach_instant_and_shortest_line() {
        let a = tp("[Point(0 0)@2020-01-01, Point(10 0)@2020-01-05]");
        let b = tp("[Point(10 2)@2020-01-01, Point(0 2)@2020-01-05]");
        let nai = a.nearest_approach_instant(&b).unwrap().unwrap();
        assert_eq!(
            nai.timestamp(),
            crate::utils::parse_timestamp("2020-01-03").unwrap()
        );
        let line = a.shortest_line(&b).unwrap().unwrap();
        assert_eq!(line.geom_type(), "LineString");
    }

    #[test]
    fn tdwithin_the_seed_scenario() {
        // A point moving along the x axis, tested against a fixed point at
        // (5, 1) with distance 2: within while x ∈ [5 − √3, 5 + √3].
        let t = tp("[Point(0 0)@2020-01-01, Point(10 0)@2020-01-11]");
        let fixed = GeomPoint::new(5.0, 1.0);
        let within = t
            .tdwithin_point(&fixed, 2.0, &CancelToken::new())
            .unwrap()
            .unwrap();
        let spans = within.at_value(&true).unwrap().time();
        assert_eq!(spans.num_spans(), 1);
        let span = spans.start_span();
        // x(t) covers one unit per day from 01-01.
        let enter = crate::utils::time_ratio(
            span.lower(),
            crate::utils::parse_timestamp("2020-01-01").unwrap(),
            crate::utils::parse_timestamp("2020-01-11").unwrap(),
        ) * 10.0;
        let leave = crate::utils::time_ratio(
            span.upper(),
            crate::utils::parse_timestamp("2020-01-01").unwrap(),
            crate::utils::parse_timestamp("2020-01-11").unwrap(),
        ) * 10.0;
        let sqrt3 = 3.0f64.sqrt();
        assert!((enter - (5.0 - sqrt3)).abs() < 1e-6, "enter at x={enter}");
        assert!((leave - (5.0 + sqrt3)).abs() < 1e-6, "leave at x={leave}");
    }

    #[test]
    fn tdwithin_parallel_equal_speed_is_constant() {
        let a = tp("[Point(0 0)@2020-01-01, Point(10 0)@2020-01-05]");
        let b = tp("[Point(0 1)@2020-01-01, Point(10 1)@2020-01-05]");
        let within = a.tdwithin(&b, 2.0, &CancelToken::new()).unwrap().unwrap();
        assert!(within.always_eq(&true));
        let far = a.tdwithin(&b, 0.5, &CancelToken::new()).unwrap().unwrap();
        assert!(far.always_eq(&false));
    }

    #[test]
    fn simple_split_on_a_self_crossing_path() {
        // A bowtie: the fourth segment crosses the first.
        let t = tp(
            "[Point(0 0)@2020-01-01, Point(10 0)@2020-01-02, Point(10 10)@2020-01-03, \
             Point(5 -5)@2020-01-04]",
        );
        assert!(!t.is_simple());
        let fragments = t.make_simple(&CancelToken::new()).unwrap();
        assert_eq!(fragments.len(), 2);
        let straight = tp("[Point(0 0)@2020-01-01, Point(10 0)@2020-01-02]");
        assert!(straight.is_simple());
    }

    #[test]
    fn cancellation_aborts_the_scan() {
        let token = CancelToken::new();
        token.cancel();
        let t = tp(
            "[Point(0 0)@2020-01-01, Point(10 0)@2020-01-02, Point(10 10)@2020-01-03, \
             Point(5 -5)@2020-01-04]",
        );
        assert_eq!(t.make_simple(&token).unwrap_err(), Error::Cancelled);
    }

    #[test]
    fn azimuth_of_a_northbound_leg_is_zero() {
        let t = tp("[Point(0 0)@2020-01-01, Point(0 5)@2020-01-02]");
        assert_eq!(t.direction(), Some(0.0));
        let east = tp("[Point(0 0)@2020-01-01, Point(5 0)@2020-01-02]");
        assert_eq!(east.direction(), Some(std::f64::consts::FRAC_PI_2));
    }

    #[test]
    fn twcentroid_of_a_constant_speed_leg() {
        let t = tp("[Point(0 0)@2020-01-01, Point(10 0)@2020-01-02]");
        let c = t.twcentroid();
        assert!((c.x - 5.0).abs() < EPSILON);
        assert_eq!(c.y, 0.0);
    }

    #[test]
    fn geography_distance_uses_meters() {
        let t: Temporal<GeogPoint> =
            "[Point(2.3522 48.8566)@2020-01-01, Point(2.3522 48.8566)@2020-01-02]"
                .parse()
                .unwrap();
        let london = GeogPoint::new(-0.1276, 51.5072);
        let d = t.tdistance_to_point(&london);
        assert!((d.start_value() - 343_000.0).abs() < 5_000.0);
    }
}
