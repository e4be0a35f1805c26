//! Capability traits of the base types a temporal value can range over.
//!
//! Every concrete base type (`bool`, `i32`, `f64`, `String`, and the point
//! types behind the `geo` feature) declares its equality, optional total
//! order, linear-interpolation capability, distance metric and bounding-box
//! kind through [`TBaseType`]; the engine is generic over it.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hasher;

use chrono::{DateTime, Utc};

use crate::boxes::r#box::BoundingBox;
use crate::boxes::TBox;
use crate::collections::datetime::TsTzSpan;
use crate::errors::{Error, ParseError};
use crate::io::wkb::{WkbReader, WkbWriter};
use crate::num::{float_eq, EPSILON};

/// Tag identifying a temporal base type in the binary frame and in error
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TempType {
    Bool,
    Int,
    Float,
    Text,
    GeomPoint,
    GeogPoint,
}

impl TempType {
    pub fn name(&self) -> &'static str {
        match self {
            TempType::Bool => "tbool",
            TempType::Int => "tint",
            TempType::Float => "tfloat",
            TempType::Text => "ttext",
            TempType::GeomPoint => "tgeompoint",
            TempType::GeogPoint => "tgeogpoint",
        }
    }
}

/// Base-type capabilities the temporal engine is parametric over.
///
/// The interpolation-related methods default to step semantics: a segment's
/// value is its start value, nothing crosses anything, and "collinear"
/// degenerates to equality with the predecessor, which is exactly the
/// normalization rule step sequences need.
pub trait TBaseType: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Bounding-box kind cached by the composite subtypes.
    type Bbox: BoundingBox;

    /// Whether the type supports linear interpolation.
    const CONTINUOUS: bool;

    const TEMP_TYPE: TempType;

    /// Bounding box of a single sample.
    fn instant_bbox(value: &Self, t: DateTime<Utc>) -> Self::Bbox;

    /// Equality under the shared tolerance.
    fn eq_base(a: &Self, b: &Self) -> bool {
        a == b
    }

    /// Distance between two values, for types with a metric.
    fn base_distance(_a: &Self, _b: &Self) -> Option<f64> {
        None
    }

    /// Value at `ratio` along the segment from `start` to `end`.
    fn interpolate(start: &Self, _end: &Self, _ratio: f64) -> Self {
        start.clone()
    }

    /// Ratio in `[0, 1]` at which the linear segment passes through
    /// `value`, or `None` when it does not.
    fn locate(_start: &Self, _end: &Self, _value: &Self) -> Option<f64> {
        None
    }

    /// Ratio strictly inside `(0, 1)` at which two synchronized linear
    /// segments coincide, or `None`. Parallel segments yield `None`; the
    /// caller handles the all-equal case through [`TBaseType::eq_base`].
    fn intersection_segments(_s1: &Self, _e1: &Self, _s2: &Self, _e2: &Self) -> Option<f64> {
        None
    }

    /// Whether `mid` is redundant between `start` and `end`: within the
    /// shared tolerance of the interpolation at `ratio`. With the default
    /// step interpolation this is equality with `start`.
    fn collinear(start: &Self, mid: &Self, end: &Self, ratio: f64) -> bool {
        Self::eq_base(&Self::interpolate(start, end, ratio), mid)
    }

    /// SRID of spatial values; 0 elsewhere.
    fn srid(&self) -> i32 {
        0
    }

    /// Whether the value carries a z coordinate.
    fn has_z(&self) -> bool {
        false
    }

    /// Dimensionality/SRID compatibility of two values combined in one
    /// temporal value or one binary operation.
    fn check_compatible(_a: &Self, _b: &Self) -> Result<(), Error> {
        Ok(())
    }

    fn format_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn parse_value(s: &str) -> Result<Self, ParseError>;

    fn write_wkb(&self, out: &mut WkbWriter);
    fn read_wkb(reader: &mut WkbReader<'_>) -> Result<Self, Error>;

    fn hash_value<H: Hasher>(&self, state: &mut H);
}

/// Base types with a total order, unlocking `min_value`/`max_value` and the
/// ordered restriction and comparison operators.
pub trait TOrderedType: TBaseType {
    fn cmp_base(a: &Self, b: &Self) -> Ordering;
}

impl TBaseType for bool {
    type Bbox = TsTzSpan;

    const CONTINUOUS: bool = false;
    const TEMP_TYPE: TempType = TempType::Bool;

    fn instant_bbox(_value: &Self, t: DateTime<Utc>) -> TsTzSpan {
        TsTzSpan::singleton(t).expect("valid timestamp")
    }

    fn format_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if *self { "t" } else { "f" })
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "t" | "true" => Ok(true),
            "f" | "false" => Ok(false),
            other => Err(ParseError(format!("cannot parse boolean '{other}'"))),
        }
    }

    fn write_wkb(&self, out: &mut WkbWriter) {
        out.write_u8(*self as u8);
    }

    fn read_wkb(reader: &mut WkbReader<'_>) -> Result<Self, Error> {
        Ok(reader.read_u8()? != 0)
    }

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        state.write_u8(*self as u8);
    }
}

impl TOrderedType for bool {
    fn cmp_base(a: &Self, b: &Self) -> Ordering {
        a.cmp(b)
    }
}

impl TBaseType for i32 {
    type Bbox = TBox;

    const CONTINUOUS: bool = false;
    const TEMP_TYPE: TempType = TempType::Int;

    fn instant_bbox(value: &Self, t: DateTime<Utc>) -> TBox {
        TBox::from_value_time(*value as f64, t)
    }

    fn base_distance(a: &Self, b: &Self) -> Option<f64> {
        Some((a - b).abs() as f64)
    }

    fn format_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        s.trim()
            .parse()
            .map_err(|_| ParseError(format!("cannot parse integer '{}'", s.trim())))
    }

    fn write_wkb(&self, out: &mut WkbWriter) {
        out.write_i32(*self);
    }

    fn read_wkb(reader: &mut WkbReader<'_>) -> Result<Self, Error> {
        reader.read_i32()
    }

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        state.write_i32(*self);
    }
}

impl TOrderedType for i32 {
    fn cmp_base(a: &Self, b: &Self) -> Ordering {
        a.cmp(b)
    }
}

impl TBaseType for f64 {
    type Bbox = TBox;

    const CONTINUOUS: bool = true;
    const TEMP_TYPE: TempType = TempType::Float;

    fn instant_bbox(value: &Self, t: DateTime<Utc>) -> TBox {
        TBox::from_value_time(*value, t)
    }

    fn eq_base(a: &Self, b: &Self) -> bool {
        float_eq(*a, *b)
    }

    fn base_distance(a: &Self, b: &Self) -> Option<f64> {
        Some((a - b).abs())
    }

    fn interpolate(start: &Self, end: &Self, ratio: f64) -> Self {
        start + (end - start) * ratio
    }

    fn locate(start: &Self, end: &Self, value: &Self) -> Option<f64> {
        let slope = end - start;
        if slope.abs() < EPSILON {
            return if float_eq(*start, *value) {
                Some(0.0)
            } else {
                None
            };
        }
        let ratio = (value - start) / slope;
        (-EPSILON..=1.0 + EPSILON)
            .contains(&ratio)
            .then(|| ratio.clamp(0.0, 1.0))
    }

    fn intersection_segments(s1: &Self, e1: &Self, s2: &Self, e2: &Self) -> Option<f64> {
        let relative_slope = (e1 - s1) - (e2 - s2);
        if relative_slope.abs() < EPSILON {
            return None;
        }
        let ratio = (s2 - s1) / relative_slope;
        (ratio > EPSILON && ratio < 1.0 - EPSILON).then_some(ratio)
    }

    fn format_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        s.trim()
            .parse()
            .map_err(|_| ParseError(format!("cannot parse float '{}'", s.trim())))
    }

    fn write_wkb(&self, out: &mut WkbWriter) {
        out.write_f64(*self);
    }

    fn read_wkb(reader: &mut WkbReader<'_>) -> Result<Self, Error> {
        reader.read_f64()
    }

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.to_bits());
    }
}

impl TOrderedType for f64 {
    fn cmp_base(a: &Self, b: &Self) -> Ordering {
        a.total_cmp(b)
    }
}

impl TBaseType for String {
    type Bbox = TsTzSpan;

    const CONTINUOUS: bool = false;
    const TEMP_TYPE: TempType = TempType::Text;

    fn instant_bbox(_value: &Self, t: DateTime<Utc>) -> TsTzSpan {
        TsTzSpan::singleton(t).expect("valid timestamp")
    }

    fn format_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        let s = s.trim();
        if let Some(unquoted) = s.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
            Ok(unquoted.to_owned())
        } else {
            Ok(s.to_owned())
        }
    }

    fn write_wkb(&self, out: &mut WkbWriter) {
        out.write_bytes(self.as_bytes());
    }

    fn read_wkb(reader: &mut WkbReader<'_>) -> Result<Self, Error> {
        let bytes = reader.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| Error::Parse("invalid UTF-8 in text value".into()))
    }

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        state.write(self.as_bytes());
        state.write_u8(0xff);
    }
}

impl TOrderedType for String {
    fn cmp_base(a: &Self, b: &Self) -> Ordering {
        a.cmp(b)
    }
}
