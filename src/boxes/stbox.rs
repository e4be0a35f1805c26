use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::boxes::r#box::BoundingBox;
use crate::collections::datetime::TsTzSpan;
use crate::errors::{Error, ParseError};
use crate::num::round_float;

/// Mean Earth radius in meters, used for metric expansion of geodetic boxes.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Spatio-temporal bounding box: an optional axis-aligned xy(z) extent plus
/// an optional time span, tagged with the SRID and a geodetic flag.
///
/// Invariants: `xmin <= xmax` on every spatial axis, the x and y axes are
/// present together, z requires xy, and at least one of space and time is
/// present. Binary operations over two boxes with a spatial extent require
/// the same SRID and the same geodetic interpretation.
///
/// ## Example
/// ```
/// # use tempora::boxes::STBox;
/// # use std::str::FromStr;
/// let stbox = STBox::from_str("STBOX ZT(((1, 2, 3), (4, 5, 6)), [2001-01-01, 2001-01-02])").unwrap();
/// assert!(stbox.has_x() && stbox.has_z() && stbox.has_t());
/// ```
#[derive(Clone, PartialEq)]
pub struct STBox {
    x: Option<(f64, f64)>,
    y: Option<(f64, f64)>,
    z: Option<(f64, f64)>,
    period: Option<TsTzSpan>,
    geodetic: bool,
    srid: i32,
}

fn axis_overlaps(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

fn axis_contains(outer: (f64, f64), inner: (f64, f64)) -> bool {
    outer.0 <= inner.0 && inner.1 <= outer.1
}

fn axis_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    if axis_overlaps(a, b) {
        0.0
    } else if a.1 < b.0 {
        b.0 - a.1
    } else {
        a.0 - b.1
    }
}

impl STBox {
    pub fn new(
        x: Option<(f64, f64)>,
        y: Option<(f64, f64)>,
        z: Option<(f64, f64)>,
        period: Option<TsTzSpan>,
        geodetic: bool,
        srid: i32,
    ) -> Result<Self, Error> {
        if x.is_some() != y.is_some() {
            return Err(Error::InvalidArg("the x and y axes must come together"));
        }
        if z.is_some() && x.is_none() {
            return Err(Error::InvalidArg("a z axis requires the xy axes"));
        }
        if x.is_none() && period.is_none() {
            return Err(Error::InvalidArg(
                "a spatio-temporal box requires a spatial or a time axis",
            ));
        }
        if geodetic && x.is_none() {
            return Err(Error::InvalidArg("a geodetic box requires the xy axes"));
        }
        for axis in [x, y, z].into_iter().flatten() {
            if !(axis.0.is_finite() && axis.1.is_finite()) {
                return Err(Error::InvalidArg("box bounds must be finite"));
            }
            if axis.0 > axis.1 {
                return Err(Error::InvalidArg("box minimum exceeds maximum"));
            }
        }
        Ok(Self {
            x,
            y,
            z,
            period,
            geodetic,
            srid,
        })
    }

    pub fn from_time(t: DateTime<Utc>) -> Self {
        Self {
            x: None,
            y: None,
            z: None,
            period: Some(TsTzSpan::singleton(t).expect("valid timestamp")),
            geodetic: false,
            srid: 0,
        }
    }

    pub fn from_tstzspan(period: TsTzSpan) -> Self {
        Self {
            x: None,
            y: None,
            z: None,
            period: Some(period),
            geodetic: false,
            srid: 0,
        }
    }

    // ------------------------- Accessors -------------------------------------

    pub fn has_x(&self) -> bool {
        self.x.is_some()
    }

    pub fn has_z(&self) -> bool {
        self.z.is_some()
    }

    pub fn has_t(&self) -> bool {
        self.period.is_some()
    }

    pub fn is_geodetic(&self) -> bool {
        self.geodetic
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    pub fn with_srid(&self, srid: i32) -> Self {
        Self { srid, ..*self }
    }

    pub fn xmin(&self) -> Option<f64> {
        self.x.map(|a| a.0)
    }

    pub fn xmax(&self) -> Option<f64> {
        self.x.map(|a| a.1)
    }

    pub fn ymin(&self) -> Option<f64> {
        self.y.map(|a| a.0)
    }

    pub fn ymax(&self) -> Option<f64> {
        self.y.map(|a| a.1)
    }

    pub fn zmin(&self) -> Option<f64> {
        self.z.map(|a| a.0)
    }

    pub fn zmax(&self) -> Option<f64> {
        self.z.map(|a| a.1)
    }

    pub fn tmin(&self) -> Option<DateTime<Utc>> {
        self.period.map(|p| p.lower())
    }

    pub fn tmax(&self) -> Option<DateTime<Utc>> {
        self.period.map(|p| p.upper())
    }

    pub fn is_tmin_inclusive(&self) -> Option<bool> {
        self.period.map(|p| p.is_lower_inclusive())
    }

    pub fn is_tmax_inclusive(&self) -> Option<bool> {
        self.period.map(|p| p.is_upper_inclusive())
    }

    pub fn tstzspan(&self) -> Option<TsTzSpan> {
        self.period
    }

    fn spatial_axes(&self) -> impl Iterator<Item = (f64, f64)> {
        [self.x, self.y, self.z].into_iter().flatten()
    }

    /// SRID and geodetic compatibility check for binary spatial operations.
    fn check_compatible(&self, other: &Self) -> Result<(), Error> {
        if self.has_x() && other.has_x() {
            if self.srid != other.srid {
                return Err(Error::MixedDimensions("boxes have different SRIDs"));
            }
            if self.geodetic != other.geodetic {
                return Err(Error::MixedDimensions(
                    "geodetic and planar boxes cannot be combined",
                ));
            }
        }
        Ok(())
    }

    // ------------------------- Topological operations ------------------------

    pub fn contains_stbox(&self, other: &Self) -> Result<bool, Error> {
        self.check_compatible(other)?;
        let space_ok = match (self.x, other.x) {
            (Some(_), Some(_)) => {
                self.spatial_axes()
                    .zip(other.spatial_axes())
                    .all(|(a, b)| axis_contains(a, b))
                    && self.has_z() == other.has_z()
            }
            (None, Some(_)) => false,
            _ => true,
        };
        let time_ok = match (self.period, other.period) {
            (Some(a), Some(b)) => a.contains_span(&b),
            (None, Some(_)) => false,
            _ => true,
        };
        Ok(space_ok && time_ok)
    }

    pub fn is_contained_in_stbox(&self, other: &Self) -> Result<bool, Error> {
        other.contains_stbox(self)
    }

    pub fn overlaps_stbox(&self, other: &Self) -> Result<bool, Error> {
        self.check_compatible(other)?;
        let mut common = false;
        if self.has_x() && other.has_x() {
            if !self
                .spatial_axes()
                .zip(other.spatial_axes())
                .all(|(a, b)| axis_overlaps(a, b))
            {
                return Ok(false);
            }
            common = true;
        }
        if let (Some(a), Some(b)) = (self.period, other.period) {
            if !a.overlaps_span(&b) {
                return Ok(false);
            }
            common = true;
        }
        Ok(common)
    }

    /// Equal on the axes common to both boxes.
    pub fn same_stbox(&self, other: &Self) -> Result<bool, Error> {
        self.check_compatible(other)?;
        let mut common = false;
        if self.has_x() && other.has_x() {
            if self.x != other.x || self.y != other.y || self.z != other.z {
                return Ok(false);
            }
            common = true;
        }
        if let (Some(a), Some(b)) = (self.period, other.period) {
            if a != b {
                return Ok(false);
            }
            common = true;
        }
        Ok(common)
    }

    /// The boxes touch: the closed extents intersect while the interiors do
    /// not on at least one axis.
    pub fn is_adjacent_stbox(&self, other: &Self) -> Result<bool, Error> {
        self.check_compatible(other)?;
        let mut touching = false;
        if self.has_x() && other.has_x() {
            for (a, b) in self.spatial_axes().zip(other.spatial_axes()) {
                if !axis_overlaps(a, b) {
                    return Ok(false);
                }
                touching |= a.1 == b.0 || b.1 == a.0;
            }
        }
        if let (Some(a), Some(b)) = (self.period, other.period) {
            if !a.overlaps_span(&b) && !a.is_adjacent_span(&b) {
                return Ok(false);
            }
            touching |= a.is_adjacent_span(&b)
                || (a.upper() == b.lower() || b.upper() == a.lower());
        }
        Ok(touching)
    }

    // ------------------------- Position operations ---------------------------

    fn spatial_pair(
        &self,
        other: &Self,
        axis: fn(&Self) -> Option<(f64, f64)>,
        what: &'static str,
    ) -> Result<((f64, f64), (f64, f64)), Error> {
        self.check_compatible(other)?;
        match (axis(self), axis(other)) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(Error::InvalidArg(what)),
        }
    }

    /// Strictly left of `other` on the x axis.
    pub fn is_left(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.spatial_pair(other, |s| s.x, "both boxes must have an x axis")?;
        Ok(a.1 < b.0)
    }

    pub fn is_over_or_left(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.spatial_pair(other, |s| s.x, "both boxes must have an x axis")?;
        Ok(a.1 <= b.1)
    }

    pub fn is_right(&self, other: &Self) -> Result<bool, Error> {
        other.is_left(self)
    }

    pub fn is_over_or_right(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.spatial_pair(other, |s| s.x, "both boxes must have an x axis")?;
        Ok(a.0 >= b.0)
    }

    /// Strictly below `other` on the y axis.
    pub fn is_below(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.spatial_pair(other, |s| s.y, "both boxes must have a y axis")?;
        Ok(a.1 < b.0)
    }

    pub fn is_over_or_below(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.spatial_pair(other, |s| s.y, "both boxes must have a y axis")?;
        Ok(a.1 <= b.1)
    }

    pub fn is_above(&self, other: &Self) -> Result<bool, Error> {
        other.is_below(self)
    }

    pub fn is_over_or_above(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.spatial_pair(other, |s| s.y, "both boxes must have a y axis")?;
        Ok(a.0 >= b.0)
    }

    /// Strictly in front of `other` on the z axis.
    pub fn is_front(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.spatial_pair(other, |s| s.z, "both boxes must have a z axis")?;
        Ok(a.1 < b.0)
    }

    pub fn is_over_or_front(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.spatial_pair(other, |s| s.z, "both boxes must have a z axis")?;
        Ok(a.1 <= b.1)
    }

    pub fn is_back(&self, other: &Self) -> Result<bool, Error> {
        other.is_front(self)
    }

    pub fn is_over_or_back(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.spatial_pair(other, |s| s.z, "both boxes must have a z axis")?;
        Ok(a.0 >= b.0)
    }

    fn time_pair(&self, other: &Self) -> Result<(TsTzSpan, TsTzSpan), Error> {
        match (self.period, other.period) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(Error::InvalidArg("both boxes must have a time axis")),
        }
    }

    pub fn is_before(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.time_pair(other)?;
        Ok(a.is_left_span(&b))
    }

    pub fn is_over_or_before(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.time_pair(other)?;
        Ok(a.is_over_or_left_span(&b))
    }

    pub fn is_after(&self, other: &Self) -> Result<bool, Error> {
        other.is_before(self)
    }

    pub fn is_over_or_after(&self, other: &Self) -> Result<bool, Error> {
        let (a, b) = self.time_pair(other)?;
        Ok(a.is_over_or_right_span(&b))
    }

    // ------------------------- Set operations --------------------------------

    /// Union over the axes common to both boxes; strict mode requires them
    /// to intersect.
    pub fn union(&self, other: &Self, strict: bool) -> Result<Self, Error> {
        self.check_compatible(other)?;
        if strict && !self.overlaps_stbox(other)? {
            return Err(Error::NotContiguous);
        }
        let hull = |a: Option<(f64, f64)>, b: Option<(f64, f64)>| match (a, b) {
            (Some(a), Some(b)) => Some((a.0.min(b.0), a.1.max(b.1))),
            _ => None,
        };
        let period = match (self.period, other.period) {
            (Some(a), Some(b)) => Some(a.hull(&b)),
            _ => None,
        };
        Self::new(
            hull(self.x, other.x),
            hull(self.y, other.y),
            hull(self.z, other.z),
            period,
            self.geodetic,
            self.srid,
        )
    }

    pub fn intersection(&self, other: &Self) -> Result<Option<Self>, Error> {
        if !self.overlaps_stbox(other)? {
            return Ok(None);
        }
        let meet = |a: Option<(f64, f64)>, b: Option<(f64, f64)>| match (a, b) {
            (Some(a), Some(b)) => Some((a.0.max(b.0), a.1.min(b.1))),
            _ => None,
        };
        let period = match (self.period, other.period) {
            (Some(a), Some(b)) => match a.intersection(&b) {
                Some(p) => Some(p),
                None => return Ok(None),
            },
            _ => None,
        };
        Ok(Self::new(
            meet(self.x, other.x),
            meet(self.y, other.y),
            meet(self.z, other.z),
            period,
            self.geodetic,
            self.srid,
        )
        .ok())
    }

    // ------------------------- Transformations -------------------------------

    /// Inflates the spatial axes by `d` on every side. Geodetic boxes expand
    /// metrically: `d` is in meters and is converted to angular degrees,
    /// widening the longitude axis by the highest-latitude scale factor.
    pub fn expand_space(&self, d: f64) -> Result<Self, Error> {
        if !self.has_x() {
            return Err(Error::InvalidArg("the box has no spatial axis to expand"));
        }
        let (dx, dy) = if self.geodetic {
            let degrees = d / EARTH_RADIUS_M * 180.0 / std::f64::consts::PI;
            let (ymin, ymax) = self.y.expect("xy axes come together");
            let max_lat = ymin.abs().max(ymax.abs()).min(89.5);
            (degrees / max_lat.to_radians().cos(), degrees)
        } else {
            (d, d)
        };
        let expand = |axis: Option<(f64, f64)>, by: f64| axis.map(|(lo, hi)| (lo - by, hi + by));
        Self::new(
            expand(self.x, dx),
            expand(self.y, dy),
            expand(self.z, d),
            self.period,
            self.geodetic,
            self.srid,
        )
    }

    pub fn expand_time(&self, delta: TimeDelta) -> Result<Self, Error> {
        let period = self
            .period
            .ok_or(Error::InvalidArg("the box has no time axis to expand"))?;
        let expanded = TsTzSpan::new(
            period.lower() - delta,
            period.upper() + delta,
            period.is_lower_inclusive(),
            period.is_upper_inclusive(),
        )?;
        Self::new(
            self.x,
            self.y,
            self.z,
            Some(expanded),
            self.geodetic,
            self.srid,
        )
    }

    pub fn shift_scale_time(&self, delta: Option<TimeDelta>, width: Option<TimeDelta>) -> Self {
        Self {
            period: self.period.map(|p| p.shift_scale(delta, width)),
            ..*self
        }
    }

    /// Rounds the spatial coordinates to `max_decimals` decimal places.
    pub fn round(&self, max_decimals: i32) -> Self {
        let round_axis =
            |axis: Option<(f64, f64)>| axis.map(|(lo, hi)| (round_float(lo, max_decimals), round_float(hi, max_decimals)));
        Self {
            x: round_axis(self.x),
            y: round_axis(self.y),
            z: round_axis(self.z),
            ..*self
        }
    }

    // ------------------------- Distance operations ----------------------------

    /// Nearest approach distance between the spatial extents: 0 when the
    /// boxes fully intersect, infinity when their time axes are disjoint.
    pub fn nearest_approach_distance(&self, other: &Self) -> Result<f64, Error> {
        self.check_compatible(other)?;
        if !(self.has_x() && other.has_x()) {
            return Err(Error::InvalidArg("both boxes must have a spatial axis"));
        }
        if let (Some(pa), Some(pb)) = (self.period, other.period) {
            if !pa.overlaps_span(&pb) {
                return Ok(f64::INFINITY);
            }
        }
        let squared: f64 = self
            .spatial_axes()
            .zip(other.spatial_axes())
            .map(|(a, b)| axis_distance(a, b).powi(2))
            .sum();
        Ok(squared.sqrt())
    }
}

impl BoundingBox for STBox {
    fn period(&self) -> Option<TsTzSpan> {
        self.period
    }

    fn with_period(self, period: TsTzSpan) -> Self {
        Self {
            period: Some(period),
            ..self
        }
    }

    fn extend(&mut self, other: &Self) {
        debug_assert_eq!(self.has_x(), other.has_x());
        let hull = |a: Option<(f64, f64)>, b: Option<(f64, f64)>| match (a, b) {
            (Some(a), Some(b)) => Some((a.0.min(b.0), a.1.max(b.1))),
            (a, b) => a.or(b),
        };
        self.x = hull(self.x, other.x);
        self.y = hull(self.y, other.y);
        self.z = hull(self.z, other.z);
        self.period = match (self.period, other.period) {
            (Some(a), Some(b)) => Some(a.hull(&b)),
            (a, b) => a.or(b),
        };
    }

    fn overlaps_box(&self, other: &Self) -> bool {
        self.overlaps_stbox(other).unwrap_or(false)
    }
}

impl fmt::Display for STBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.srid != 0 {
            write!(f, "SRID={};", self.srid)?;
        }
        f.write_str(if self.geodetic { "GEODSTBOX" } else { "STBOX" })?;
        let axes = match (self.has_x(), self.has_z(), self.has_t()) {
            (true, false, false) => " X",
            (true, true, false) => " Z",
            (true, false, true) => " XT",
            (true, true, true) => " ZT",
            (false, _, true) => " T",
            (false, _, false) => unreachable!("construction requires an axis"),
        };
        f.write_str(axes)?;
        f.write_str("(")?;
        if let (Some((xmin, xmax)), Some((ymin, ymax))) = (self.x, self.y) {
            f.write_str("((")?;
            write!(f, "{xmin}, {ymin}")?;
            if let Some((zmin, _)) = self.z {
                write!(f, ", {zmin}")?;
            }
            write!(f, "), ({xmax}, {ymax}")?;
            if let Some((_, zmax)) = self.z {
                write!(f, ", {zmax}")?;
            }
            f.write_str("))")?;
            if self.period.is_some() {
                f.write_str(", ")?;
            }
        }
        if let Some(p) = self.period {
            write!(f, "{p}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for STBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for STBox {
    type Err = ParseError;

    /// Parses an `STBox` from its textual representation.
    ///
    /// ## Example
    /// ```
    /// # use tempora::boxes::STBox;
    /// let a: STBox = "STBOX XT(((1, 2), (3, 4)), [2001-01-01, 2001-01-02])".parse().unwrap();
    /// assert_eq!(a.xmin(), Some(1.0));
    /// let b: STBox = "SRID=4326;GEODSTBOX X(((1, 2), (3, 4)))".parse().unwrap();
    /// assert_eq!(b.srid(), 4326);
    /// assert!(b.is_geodetic());
    /// ```
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
        let geodetic = upper.starts_with("GEODSTBOX");
        let prefix_len = if geodetic {
            "GEODSTBOX".len()
        } else if upper.starts_with("STBOX") {
            "STBOX".len()
        } else {
            return Err(ParseError(format!(
                "spatio-temporal box must start with STBOX or GEODSTBOX: {s}"
            )));
        };
        let rest = rest[prefix_len..].trim_start();
        let (axes, rest) = rest
            .split_once('(')
            .ok_or_else(|| ParseError(format!("missing '(' in spatio-temporal box: {s}")))?;
        let inner = rest
            .trim_end()
            .strip_suffix(')')
            .ok_or_else(|| ParseError(format!("missing ')' in spatio-temporal box: {s}")))?;
        let axes = axes.trim().to_ascii_uppercase();
        let has_z = axes.contains('Z');
        let has_t = axes.contains('T');
        let has_x = axes.contains('X') || has_z;

        let mut space = None;
        let mut time_text = inner.trim();
        if has_x {
            let coords_end = find_balanced(inner).ok_or_else(|| {
                ParseError(format!("unbalanced coordinate list in box: {s}"))
            })?;
            let coords = &inner[..coords_end];
            space = Some(parse_corners(coords, has_z)?);
            time_text = inner[coords_end..].trim_start().trim_start_matches(',').trim();
        }
        let period = if has_t {
            if time_text.is_empty() {
                return Err(ParseError(format!("missing time span in box: {s}")));
            }
            Some(time_text.parse()?)
        } else {
            None
        };
        let (x, y, z) = match space {
            Some(((xmin, ymin, zmin), (xmax, ymax, zmax))) => (
                Some((xmin, xmax)),
                Some((ymin, ymax)),
                zmin.zip(zmax).map(|(lo, hi)| (lo, hi)),
            ),
            None => (None, None, None),
        };
        STBox::new(x, y, z, period, geodetic, srid).map_err(ParseError::from)
    }
}

/// Byte offset just past the first balanced parenthesized group of `s`,
/// which must start at a '('.
fn find_balanced(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

type Corner = (f64, f64, Option<f64>);

/// Parses `((xmin, ymin[, zmin]), (xmax, ymax[, zmax]))`.
fn parse_corners(s: &str, has_z: bool) -> Result<(Corner, Corner), ParseError> {
    let inner = s
        .trim()
        .strip_prefix('(')
        .and_then(|r| r.trim_end().strip_suffix(')'))
        .ok_or_else(|| ParseError(format!("malformed corner list '{s}'")))?;
    let mut corners = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                corners.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    corners.push(&inner[start..]);
    if corners.len() != 2 {
        return Err(ParseError(format!("a box requires two corners: '{s}'")));
    }
    let parse_corner = |c: &str| -> Result<Corner, ParseError> {
        let c = c
            .trim()
            .strip_prefix('(')
            .and_then(|r| r.trim_end().strip_suffix(')'))
            .ok_or_else(|| ParseError(format!("malformed corner '{c}'")))?;
        let nums: Result<Vec<f64>, _> = c
            .split(',')
            .map(|n| {
                n.trim()
                    .parse::<f64>()
                    .map_err(|_| ParseError(format!("cannot parse coordinate '{}'", n.trim())))
            })
            .collect();
        let nums = nums?;
        match (nums.as_slice(), has_z) {
            ([x, y], false) => Ok((*x, *y, None)),
            ([x, y, z], true) => Ok((*x, *y, Some(*z))),
            _ => Err(ParseError(format!(
                "corner '{c}' does not match the declared dimensionality"
            ))),
        }
    };
    Ok((parse_corner(corners[0])?, parse_corner(corners[1])?))
}

impl Hash for STBox {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for axis in [self.x, self.y, self.z].into_iter().flatten() {
            state.write_u64(axis.0.to_bits());
            state.write_u64(axis.1.to_bits());
        }
        self.period.hash(state);
        self.geodetic.hash(state);
        self.srid.hash(state);
    }
}

impl From<&STBox> for Option<TsTzSpan> {
    fn from(stbox: &STBox) -> Self {
        stbox.tstzspan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stbox(s: &str) -> STBox {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_print_round_trip() {
        for text in [
            "STBOX XT(((1, 2), (3, 4)), [2001-01-01 00:00:00+00, 2001-01-02 00:00:00+00])",
            "STBOX ZT(((1, 2, 3), (4, 5, 6)), [2001-01-01 00:00:00+00, 2001-01-02 00:00:00+00])",
            "STBOX T([2001-01-01 00:00:00+00, 2001-01-02 00:00:00+00])",
            "SRID=4326;GEODSTBOX X(((1, 2), (3, 4)))",
        ] {
            assert_eq!(stbox(text).to_string(), text);
        }
    }

    #[test]
    fn srid_mismatch_is_an_error() {
        let a = stbox("SRID=4326;STBOX X(((0, 0), (1, 1)))");
        let b = stbox("SRID=3857;STBOX X(((0, 0), (1, 1)))");
        assert_eq!(
            a.overlaps_stbox(&b).unwrap_err(),
            Error::MixedDimensions("boxes have different SRIDs")
        );
    }

    #[test]
    fn containment_requires_matching_dimensionality() {
        let flat = stbox("STBOX X(((0, 0), (10, 10)))");
        let tall = stbox("STBOX Z(((0, 0, 0), (10, 10, 10)))");
        assert!(!flat.contains_stbox(&tall).unwrap());
        assert!(flat
            .contains_stbox(&stbox("STBOX X(((1, 1), (2, 2)))"))
            .unwrap());
    }

    #[test]
    fn overlap_needs_every_common_axis() {
        let a = stbox("STBOX XT(((0, 0), (2, 2)), [2020-01-01, 2020-01-05])");
        let b = stbox("STBOX XT(((1, 1), (3, 3)), [2020-02-01, 2020-02-05])");
        // Spatial axes overlap but time is disjoint.
        assert!(!a.overlaps_stbox(&b).unwrap());
        let c = stbox("STBOX XT(((1, 1), (3, 3)), [2020-01-02, 2020-01-03])");
        assert!(a.overlaps_stbox(&c).unwrap());
    }

    #[test]
    fn positional_predicates() {
        let a = stbox("STBOX X(((0, 0), (1, 1)))");
        let b = stbox("STBOX X(((2, 2), (3, 3)))");
        assert!(a.is_left(&b).unwrap());
        assert!(a.is_below(&b).unwrap());
        assert!(b.is_right(&a).unwrap());
        assert!(b.is_above(&a).unwrap());
        assert!(a.is_over_or_left(&b).unwrap());
        assert!(a.is_front(&b).is_err());
    }

    #[test]
    fn nad_on_boxes() {
        let a = stbox("STBOX X(((0, 0), (1, 1)))");
        let b = stbox("STBOX X(((4, 5), (6, 7)))");
        assert_eq!(a.nearest_approach_distance(&b).unwrap(), 5.0);
        let c = stbox("STBOX XT(((0, 0), (1, 1)), [2020-01-01, 2020-01-02])");
        let d = stbox("STBOX XT(((4, 5), (6, 7)), [2021-01-01, 2021-01-02])");
        assert_eq!(c.nearest_approach_distance(&d).unwrap(), f64::INFINITY);
    }

    #[test]
    fn planar_expansion() {
        let a = stbox("STBOX X(((0, 0), (1, 1)))").expand_space(1.0).unwrap();
        assert_eq!(a.xmin(), Some(-1.0));
        assert_eq!(a.ymax(), Some(2.0));
    }

    #[test]
    fn geodetic_expansion_is_metric() {
        let b = stbox("SRID=4326;GEODSTBOX X(((10, 60), (11, 61)))")
            .expand_space(111_000.0)
            .unwrap();
        // One degree of latitude is roughly 111 km.
        assert!((b.ymin().unwrap() - 59.0).abs() < 0.05);
        // Longitude widens faster at 61° latitude.
        assert!(b.xmin().unwrap() < 10.0 - 1.5);
    }
}
