//! Geometry collaborator: the base point types of the spatial temporals and
//! a thin wrapper over the georust stack exposing the fixed set of
//! primitives the engine calls.
//!
//! The engine never assumes sub-epsilon precision from the library; the
//! shared tolerance of [`crate::num`] compensates at every decision point.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Contains, EuclideanDistance, HaversineDistance, Intersects};
use geo_types::{Coord, Line, LineString, MultiLineString, Point as GtPoint};

use crate::boxes::STBox;
use crate::collections::datetime::TsTzSpan;
use crate::errors::{Error, ParseError};
use crate::num::{float_eq, EPSILON};

/// A 2D or 3D point in a planar (projected) coordinate system.
#[derive(Clone, Copy, PartialEq)]
pub struct GeomPoint {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub srid: i32,
}

impl GeomPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            srid: 0,
        }
    }

    pub fn new_z(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z: Some(z),
            srid: 0,
        }
    }

    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = srid;
        self
    }

    pub fn has_z(&self) -> bool {
        self.z.is_some()
    }

    pub(crate) fn gt_point(&self) -> GtPoint<f64> {
        GtPoint::new(self.x, self.y)
    }

    pub(crate) fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }

    /// Planar Euclidean distance, using the z axis when both points carry it.
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        match (self.z, other.z) {
            (Some(za), Some(zb)) => (dx * dx + dy * dy + (za - zb) * (za - zb)).sqrt(),
            _ => (dx * dx + dy * dy).sqrt(),
        }
    }

    /// Linear interpolation between two points at `ratio` in `[0, 1]`.
    pub(crate) fn lerp(&self, other: &Self, ratio: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * ratio,
            y: self.y + (other.y - self.y) * ratio,
            z: match (self.z, other.z) {
                (Some(a), Some(b)) => Some(a + (b - a) * ratio),
                _ => None,
            },
            srid: self.srid,
        }
    }

    /// Position of `self` on the segment `[start, end]` as a ratio, or
    /// `None` when the point does not lie on the segment within the shared
    /// tolerance. Zero-length segments locate at 0 when the points match.
    pub(crate) fn locate_on_segment(start: &Self, end: &Self, value: &Self) -> Option<f64> {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let dz = match (start.z, end.z) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        };
        let len2 = dx * dx + dy * dy + dz * dz;
        if len2 < EPSILON {
            return if start.distance(value) < EPSILON {
                Some(0.0)
            } else {
                None
            };
        }
        let vx = value.x - start.x;
        let vy = value.y - start.y;
        let vz = match (start.z, value.z) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        };
        let ratio = (vx * dx + vy * dy + vz * dz) / len2;
        if !(-EPSILON..=1.0 + EPSILON).contains(&ratio) {
            return None;
        }
        let ratio = ratio.clamp(0.0, 1.0);
        let projected = start.lerp(end, ratio);
        if projected.distance(value) < EPSILON {
            Some(ratio)
        } else {
            None
        }
    }
}

impl fmt::Display for GeomPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.srid != 0 {
            write!(f, "SRID={};", self.srid)?;
        }
        match self.z {
            Some(z) => write!(f, "POINT Z ({} {} {})", self.x, self.y, z),
            None => write!(f, "POINT({} {})", self.x, self.y),
        }
    }
}

impl fmt::Debug for GeomPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for GeomPoint {
    type Err = ParseError;

    /// Parses `POINT(x y)`, `POINT Z (x y z)` and the `SRID=n;`-prefixed
    /// forms, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rest = s.trim();
        let mut srid = 0;
        if let Some(tail) = rest.strip_prefix("SRID=") {
            let (num, tail) = tail
                .split_once(';')
                .ok_or_else(|| ParseError(format!("missing ';' after SRID: {s}")))?;
            srid = num
                .trim()
                .parse()
                .map_err(|_| ParseError(format!("invalid SRID '{num}'")))?;
            rest = tail.trim_start();
        }
        let upper = rest.to_ascii_uppercase();
        if !upper.starts_with("POINT") {
            return Err(ParseError(format!("expected a point literal: {s}")));
        }
        let open = rest
            .find('(')
            .ok_or_else(|| ParseError(format!("missing '(' in point: {s}")))?;
        let inner = rest[open + 1..]
            .trim_end()
            .strip_suffix(')')
            .ok_or_else(|| ParseError(format!("missing ')' in point: {s}")))?;
        let coords: Result<Vec<f64>, _> = inner
            .split_whitespace()
            .map(|n| {
                n.parse::<f64>()
                    .map_err(|_| ParseError(format!("cannot parse coordinate '{n}'")))
            })
            .collect();
        match coords?.as_slice() {
            [x, y] => Ok(GeomPoint::new(*x, *y).with_srid(srid)),
            [x, y, z] => Ok(GeomPoint::new_z(*x, *y, *z).with_srid(srid)),
            _ => Err(ParseError(format!("a point requires 2 or 3 coordinates: {s}"))),
        }
    }
}

impl Hash for GeomPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.x.to_bits());
        state.write_u64(self.y.to_bits());
        if let Some(z) = self.z {
            state.write_u64(z.to_bits());
        }
        state.write_i32(self.srid);
    }
}

/// A point on the spherical Earth: coordinates are lon/lat degrees and the
/// distance metric is the haversine great-circle distance in meters.
#[derive(Clone, Copy, PartialEq)]
pub struct GeogPoint(pub GeomPoint);

impl GeogPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self(GeomPoint::new(lon, lat))
    }

    pub fn with_srid(self, srid: i32) -> Self {
        Self(self.0.with_srid(srid))
    }

    /// Great-circle distance in meters; a z component adds vertically.
    pub fn distance(&self, other: &Self) -> f64 {
        let horizontal = self.0.gt_point().haversine_distance(&other.0.gt_point());
        match (self.0.z, other.0.z) {
            (Some(a), Some(b)) => (horizontal * horizontal + (a - b) * (a - b)).sqrt(),
            _ => horizontal,
        }
    }
}

impl fmt::Display for GeogPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for GeogPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for GeogPoint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GeomPoint::from_str(s).map(GeogPoint)
    }
}

impl Hash for GeogPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// An opaque 2D geometry handle with an SRID, wrapping the georust geometry
/// model. The engine only calls the fixed primitive set below.
#[derive(Clone, PartialEq, Debug)]
pub struct Geometry {
    inner: geo_types::Geometry<f64>,
    srid: i32,
}

impl Geometry {
    pub fn new(inner: geo_types::Geometry<f64>, srid: i32) -> Self {
        Self { inner, srid }
    }

    /// Parses WKT, honoring an optional `SRID=n;` prefix.
    pub fn from_wkt(s: &str) -> Result<Self, Error> {
        use wkt::TryFromWkt;
        let mut rest = s.trim();
        let mut srid = 0;
        if let Some(tail) = rest.strip_prefix("SRID=") {
            let (num, tail) = tail
                .split_once(';')
                .ok_or(Error::InvalidArg("missing ';' after SRID"))?;
            srid = num
                .trim()
                .parse()
                .map_err(|_| Error::InvalidArg("invalid SRID"))?;
            rest = tail.trim_start();
        }
        let inner = geo_types::Geometry::try_from_wkt_str(rest)
            .map_err(|e| Error::Parse(format!("invalid WKT: {e}")))?;
        Ok(Self { inner, srid })
    }

    pub fn to_wkt(&self) -> String {
        use wkt::ToWkt;
        if self.srid != 0 {
            format!("SRID={};{}", self.srid, self.inner.wkt_string())
        } else {
            self.inner.wkt_string()
        }
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    pub fn inner(&self) -> &geo_types::Geometry<f64> {
        &self.inner
    }

    pub fn geom_type(&self) -> &'static str {
        match &self.inner {
            geo_types::Geometry::Point(_) => "Point",
            geo_types::Geometry::Line(_) => "Line",
            geo_types::Geometry::LineString(_) => "LineString",
            geo_types::Geometry::Polygon(_) => "Polygon",
            geo_types::Geometry::MultiPoint(_) => "MultiPoint",
            geo_types::Geometry::MultiLineString(_) => "MultiLineString",
            geo_types::Geometry::MultiPolygon(_) => "MultiPolygon",
            geo_types::Geometry::GeometryCollection(_) => "GeometryCollection",
            geo_types::Geometry::Rect(_) => "Rect",
            geo_types::Geometry::Triangle(_) => "Triangle",
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.inner {
            geo_types::Geometry::LineString(ls) => ls.0.is_empty(),
            geo_types::Geometry::Polygon(p) => p.exterior().0.is_empty(),
            geo_types::Geometry::MultiPoint(mp) => mp.0.is_empty(),
            geo_types::Geometry::MultiLineString(mls) => mls.0.is_empty(),
            geo_types::Geometry::MultiPolygon(mp) => mp.0.is_empty(),
            geo_types::Geometry::GeometryCollection(gc) => gc.0.is_empty(),
            _ => false,
        }
    }

    pub(crate) fn check_srid(&self, srid: i32) -> Result<(), Error> {
        if self.srid != 0 && srid != 0 && self.srid != srid {
            return Err(Error::MixedDimensions("geometry SRID differs from operand"));
        }
        Ok(())
    }

    /// 2D intersection test against a single point.
    pub fn intersects_point(&self, p: &GeomPoint) -> bool {
        self.inner.intersects(&p.gt_point())
    }

    /// Point-in-interior test (boundary excluded).
    pub fn contains_point(&self, p: &GeomPoint) -> bool {
        self.inner.contains(&p.gt_point())
    }

    /// 2D intersection test against another geometry.
    pub fn intersects(&self, other: &Geometry) -> bool {
        self.inner.intersects(&other.inner)
    }

    /// Minimum 2D distance from a point.
    pub fn distance_to_point(&self, p: &GeomPoint) -> f64 {
        distance_point_geometry(&p.gt_point(), &self.inner)
    }

    /// Minimum 2D distance from a segment.
    pub fn distance_to_segment(&self, start: &GeomPoint, end: &GeomPoint) -> f64 {
        let line = Line::new(start.coord(), end.coord());
        if self.inner.intersects(&line) {
            return 0.0;
        }
        distance_line_geometry(&line, &self.inner)
    }

    /// Whether the point is within `d` of the geometry.
    pub fn dwithin_point(&self, p: &GeomPoint, d: f64) -> bool {
        self.distance_to_point(p) <= d + EPSILON
    }

    /// Clips a polyline to the geometry: the sub-lines inside (or outside
    /// with `invert`) an areal geometry. Returns `None` for geometries with
    /// no interior, for which restriction reduces to isolated crossings.
    pub fn clip_lines(
        &self,
        lines: &MultiLineString<f64>,
        invert: bool,
    ) -> Option<MultiLineString<f64>> {
        use geo::BooleanOps;
        match &self.inner {
            geo_types::Geometry::Polygon(p) => Some(p.clip(lines, invert)),
            geo_types::Geometry::MultiPolygon(mp) => Some(mp.clip(lines, invert)),
            geo_types::Geometry::Rect(r) => Some(r.to_polygon().clip(lines, invert)),
            geo_types::Geometry::Triangle(t) => Some(t.to_polygon().clip(lines, invert)),
            _ => None,
        }
    }

    /// Fraction of the line's length at which `p` projects, for line
    /// geometries.
    pub fn line_locate_point(&self, p: &GeomPoint) -> Option<f64> {
        use geo::LineLocatePoint;
        match &self.inner {
            geo_types::Geometry::Line(line) => line.line_locate_point(&p.gt_point()),
            geo_types::Geometry::LineString(ls) => ls.line_locate_point(&p.gt_point()),
            _ => None,
        }
    }

    /// Point at `fraction` of the line's length, for line geometries.
    pub fn line_interpolate_point(&self, fraction: f64) -> Option<GeomPoint> {
        use geo::LineInterpolatePoint;
        let point = match &self.inner {
            geo_types::Geometry::Line(line) => line.line_interpolate_point(fraction),
            geo_types::Geometry::LineString(ls) => ls.line_interpolate_point(fraction),
            _ => None,
        }?;
        Some(GeomPoint::new(point.x(), point.y()).with_srid(self.srid))
    }

    /// Sub-line between two length fractions of a line string.
    pub fn line_substring(&self, start: f64, end: f64) -> Option<Geometry> {
        use geo::{EuclideanLength, LineInterpolatePoint};
        let ls = match &self.inner {
            geo_types::Geometry::LineString(ls) => ls.clone(),
            geo_types::Geometry::Line(line) => LineString::from(vec![line.start, line.end]),
            _ => return None,
        };
        let (start, end) = (start.clamp(0.0, 1.0), end.clamp(0.0, 1.0));
        if end <= start {
            return None;
        }
        let total = ls.euclidean_length();
        if total < EPSILON {
            return None;
        }
        let first = ls.line_interpolate_point(start)?;
        let last = ls.line_interpolate_point(end)?;
        let mut coords = vec![first.0];
        let mut walked = 0.0;
        for segment in ls.lines() {
            let length = segment.euclidean_length();
            let fraction = (walked + length) / total;
            if fraction > start + EPSILON && fraction < end - EPSILON {
                coords.push(segment.end);
            }
            walked += length;
        }
        coords.push(last.0);
        Some(Geometry::new(
            geo_types::Geometry::LineString(LineString::new(coords)),
            self.srid,
        ))
    }

    /// Intersection points between a segment and the geometry's
    /// point/line-work, for restriction against non-areal geometries.
    pub fn segment_intersection_points(
        &self,
        start: &GeomPoint,
        end: &GeomPoint,
    ) -> Vec<GeomPoint> {
        let segment = Line::new(start.coord(), end.coord());
        let mut points = Vec::new();
        collect_segment_intersections(&segment, &self.inner, start.srid, &mut points);
        points
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wkt())
    }
}

impl FromStr for Geometry {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wkt(s).map_err(ParseError::from)
    }
}

fn distance_point_geometry(p: &GtPoint<f64>, g: &geo_types::Geometry<f64>) -> f64 {
    match g {
        geo_types::Geometry::Point(other) => p.euclidean_distance(other),
        geo_types::Geometry::Line(line) => p.euclidean_distance(line),
        geo_types::Geometry::LineString(ls) => p.euclidean_distance(ls),
        geo_types::Geometry::Polygon(poly) => p.euclidean_distance(poly),
        geo_types::Geometry::MultiPoint(mp) => fold_min(mp.0.iter().map(|q| p.euclidean_distance(q))),
        geo_types::Geometry::MultiLineString(mls) => {
            fold_min(mls.0.iter().map(|ls| p.euclidean_distance(ls)))
        }
        geo_types::Geometry::MultiPolygon(mp) => {
            fold_min(mp.0.iter().map(|poly| p.euclidean_distance(poly)))
        }
        geo_types::Geometry::Rect(r) => p.euclidean_distance(&r.to_polygon()),
        geo_types::Geometry::Triangle(t) => p.euclidean_distance(&t.to_polygon()),
        geo_types::Geometry::GeometryCollection(gc) => {
            fold_min(gc.0.iter().map(|g| distance_point_geometry(p, g)))
        }
    }
}

fn distance_line_geometry(line: &Line<f64>, g: &geo_types::Geometry<f64>) -> f64 {
    match g {
        geo_types::Geometry::Point(p) => p.euclidean_distance(line),
        geo_types::Geometry::Line(other) => line.euclidean_distance(other),
        geo_types::Geometry::LineString(ls) => {
            fold_min(ls.lines().map(|seg| line.euclidean_distance(&seg)))
        }
        geo_types::Geometry::Polygon(poly) => {
            if poly.intersects(line) {
                0.0
            } else {
                fold_min(rings(poly).flat_map(|ring| {
                    ring.lines().map(|seg| line.euclidean_distance(&seg)).collect::<Vec<_>>()
                }))
            }
        }
        geo_types::Geometry::MultiPoint(mp) => {
            fold_min(mp.0.iter().map(|p| p.euclidean_distance(line)))
        }
        geo_types::Geometry::MultiLineString(mls) => fold_min(
            mls.0
                .iter()
                .flat_map(|ls| ls.lines().collect::<Vec<_>>())
                .map(|seg| line.euclidean_distance(&seg)),
        ),
        geo_types::Geometry::MultiPolygon(mp) => fold_min(
            mp.0.iter()
                .map(|poly| distance_line_geometry(line, &geo_types::Geometry::Polygon(poly.clone()))),
        ),
        geo_types::Geometry::Rect(r) => {
            distance_line_geometry(line, &geo_types::Geometry::Polygon(r.to_polygon()))
        }
        geo_types::Geometry::Triangle(t) => {
            distance_line_geometry(line, &geo_types::Geometry::Polygon(t.to_polygon()))
        }
        geo_types::Geometry::GeometryCollection(gc) => {
            fold_min(gc.0.iter().map(|g| distance_line_geometry(line, g)))
        }
    }
}

fn rings(poly: &geo_types::Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(poly.exterior()).chain(poly.interiors().iter())
}

fn fold_min(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::INFINITY, f64::min)
}

fn collect_segment_intersections(
    segment: &Line<f64>,
    g: &geo_types::Geometry<f64>,
    srid: i32,
    out: &mut Vec<GeomPoint>,
) {
    let mut push = |c: Coord<f64>| {
        let p = GeomPoint::new(c.x, c.y).with_srid(srid);
        if !out.iter().any(|q| float_eq(q.x, p.x) && float_eq(q.y, p.y)) {
            out.push(p);
        }
    };
    match g {
        geo_types::Geometry::Point(p) => {
            if segment.intersects(p) {
                push(p.0);
            }
        }
        geo_types::Geometry::MultiPoint(mp) => {
            for p in &mp.0 {
                if segment.intersects(p) {
                    push(p.0);
                }
            }
        }
        geo_types::Geometry::Line(other) => {
            if let Some(hit) = line_intersection(*segment, *other) {
                match hit {
                    LineIntersection::SinglePoint { intersection, .. } => push(intersection),
                    LineIntersection::Collinear { intersection } => {
                        push(intersection.start);
                        push(intersection.end);
                    }
                }
            }
        }
        geo_types::Geometry::LineString(ls) => {
            for other in ls.lines() {
                collect_segment_intersections(segment, &geo_types::Geometry::Line(other), srid, out);
            }
        }
        geo_types::Geometry::MultiLineString(mls) => {
            for ls in &mls.0 {
                collect_segment_intersections(
                    segment,
                    &geo_types::Geometry::LineString(ls.clone()),
                    srid,
                    out,
                );
            }
        }
        geo_types::Geometry::Polygon(poly) => {
            for ring in rings(poly) {
                for other in ring.lines() {
                    collect_segment_intersections(
                        segment,
                        &geo_types::Geometry::Line(other),
                        srid,
                        out,
                    );
                }
            }
        }
        geo_types::Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                collect_segment_intersections(
                    segment,
                    &geo_types::Geometry::Polygon(poly.clone()),
                    srid,
                    out,
                );
            }
        }
        geo_types::Geometry::Rect(r) => collect_segment_intersections(
            segment,
            &geo_types::Geometry::Polygon(r.to_polygon()),
            srid,
            out,
        ),
        geo_types::Geometry::Triangle(t) => collect_segment_intersections(
            segment,
            &geo_types::Geometry::Polygon(t.to_polygon()),
            srid,
            out,
        ),
        geo_types::Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                collect_segment_intersections(segment, g, srid, out);
            }
        }
    }
}

impl From<&GeomPoint> for Geometry {
    fn from(p: &GeomPoint) -> Self {
        Geometry::new(geo_types::Geometry::Point(p.gt_point()), p.srid)
    }
}

impl From<&GeomPoint> for STBox {
    fn from(p: &GeomPoint) -> Self {
        stbox_of_point(p, false, None)
    }
}

impl From<&GeogPoint> for STBox {
    fn from(p: &GeogPoint) -> Self {
        stbox_of_point(&p.0, true, None)
    }
}

/// Two-point line geometry, used by `shortest_line`.
pub(crate) fn make_line(a: &GeomPoint, b: &GeomPoint) -> Geometry {
    Geometry::new(
        geo_types::Geometry::LineString(LineString::from(vec![
            (a.x, a.y),
            (b.x, b.y),
        ])),
        a.srid,
    )
}

/// Bounding box of a single point at a single instant.
pub(crate) fn stbox_of_point(p: &GeomPoint, geodetic: bool, period: Option<TsTzSpan>) -> STBox {
    STBox::new(
        Some((p.x, p.x)),
        Some((p.y, p.y)),
        p.z.map(|z| (z, z)),
        period,
        geodetic,
        p.srid,
    )
    .expect("a point always yields a valid box")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_parse_and_print() {
        let p: GeomPoint = "Point(1 2)".parse().unwrap();
        assert_eq!(p, GeomPoint::new(1.0, 2.0));
        assert_eq!(p.to_string(), "POINT(1 2)");
        let p: GeomPoint = "SRID=4326;POINT Z (1 2 3)".parse().unwrap();
        assert_eq!(p.srid, 4326);
        assert_eq!(p.z, Some(3.0));
        assert_eq!(p.to_string(), "SRID=4326;POINT Z (1 2 3)");
    }

    #[test]
    fn locate_on_segment() {
        let a = GeomPoint::new(0.0, 0.0);
        let b = GeomPoint::new(10.0, 10.0);
        let mid = GeomPoint::new(5.0, 5.0);
        assert_eq!(GeomPoint::locate_on_segment(&a, &b, &mid), Some(0.5));
        let off = GeomPoint::new(5.0, 6.0);
        assert_eq!(GeomPoint::locate_on_segment(&a, &b, &off), None);
        let behind = GeomPoint::new(-1.0, -1.0);
        assert_eq!(GeomPoint::locate_on_segment(&a, &b, &behind), None);
    }

    #[test]
    fn wkt_round_trip() {
        let g = Geometry::from_wkt("POLYGON((3 3,3 7,7 7,7 3,3 3))").unwrap();
        assert_eq!(g.geom_type(), "Polygon");
        let again = Geometry::from_wkt(&g.to_wkt()).unwrap();
        assert_eq!(g, again);
    }

    #[test]
    fn polygon_primitives() {
        let g = Geometry::from_wkt("POLYGON((0 0,0 10,10 10,10 0,0 0))").unwrap();
        assert!(g.intersects_point(&GeomPoint::new(5.0, 5.0)));
        assert!(g.intersects_point(&GeomPoint::new(0.0, 5.0)));
        assert!(!g.contains_point(&GeomPoint::new(0.0, 5.0)));
        assert!(!g.intersects_point(&GeomPoint::new(11.0, 5.0)));
        assert_eq!(g.distance_to_point(&GeomPoint::new(13.0, 4.0)), 3.0);
        assert!(g.dwithin_point(&GeomPoint::new(13.0, 4.0), 3.0));
        assert!(!g.dwithin_point(&GeomPoint::new(13.0, 4.0), 2.0));
    }

    #[test]
    fn segment_crossings_with_a_polygon() {
        let g = Geometry::from_wkt("POLYGON((3 3,3 7,7 7,7 3,3 3))").unwrap();
        let hits =
            g.segment_intersection_points(&GeomPoint::new(0.0, 0.0), &GeomPoint::new(10.0, 10.0));
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().any(|p| float_eq(p.x, 3.0) && float_eq(p.y, 3.0)));
        assert!(hits.iter().any(|p| float_eq(p.x, 7.0) && float_eq(p.y, 7.0)));
    }

    #[test]
    fn line_locate_and_interpolate_are_inverses() {
        let g = Geometry::from_wkt("LINESTRING(0 0, 10 0)").unwrap();
        let mid = GeomPoint::new(5.0, 0.0);
        assert_eq!(g.line_locate_point(&mid), Some(0.5));
        assert_eq!(g.line_interpolate_point(0.5), Some(mid));
        let sub = g.line_substring(0.25, 0.75).unwrap();
        assert_eq!(sub.line_interpolate_point(0.0), Some(GeomPoint::new(2.5, 0.0)));
        assert_eq!(sub.line_interpolate_point(1.0), Some(GeomPoint::new(7.5, 0.0)));
    }

    #[test]
    fn haversine_metric_for_geographies() {
        let paris = GeogPoint::new(2.3522, 48.8566);
        let london = GeogPoint::new(-0.1276, 51.5072);
        let d = paris.distance(&london);
        assert!((d - 343_000.0).abs() < 5_000.0, "distance {d}");
    }
}
