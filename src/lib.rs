//! Temporal value algebra: time-indexed values over booleans, numbers, text
//! and 2D/3D points, with spans and span sets, multi-dimensional bounding
//! boxes, an at/minus restriction engine that synthesizes linear crossings,
//! lifted pointwise operators, temporal distance and within-distance, and a
//! quad-tree index over span and box keys.
//!
//! Values are immutable: every operation returns a new value. Restrictions
//! over an empty or non-matching domain return `None`; malformed inputs and
//! incompatible operands surface as [`errors::Error`].
//!
//! ```
//! use tempora::{TFloat, Temporal};
//!
//! let t: TFloat = "[1@2020-01-01, 3@2020-01-03]".parse().unwrap();
//! let at_two = t.at_value(&2.0).unwrap();
//! assert_eq!(at_two.start_timestamp(), t.timestamp_n(0).unwrap() + chrono::TimeDelta::days(1));
//! ```

use bitmask_enum::bitmask;

pub mod boxes;
pub mod collections;
pub mod errors;
#[cfg(feature = "geo")]
pub mod geom;
pub mod index;
pub mod io;
pub mod num;
pub mod temporal;

mod utils;

pub use boxes::{BoundingBox, STBox, TBox};
pub use collections::base::{Collection, Span, SpanSet};
pub use collections::datetime::{TsTzSpan, TsTzSpanSet};
pub use collections::number::{FloatSpan, FloatSpanSet, IntSpan, IntSpanSet};
pub use errors::{CancelToken, Error, ParseError};
#[cfg(feature = "geo")]
pub use geom::{GeogPoint, GeomPoint, Geometry};
pub use index::{QuadTree, QuadTreeKey, Strategy};
pub use temporal::{
    OrderedTemporal, TBaseType, TBool, TFloat, TInstant, TInstantSet, TInt, TInterpolation,
    TOrderedType, TSequence, TSequenceSet, TText, TempType, Temporal,
};
#[cfg(feature = "geo")]
pub use temporal::{TGeogPoint, TGeomPoint, TPointTrait, TPointType};

/// Header flag bits of a temporal value: base-type dimensionality and
/// interpolation capability, as reported by [`Temporal::flags`].
#[bitmask(u16)]
pub enum TemporalFlags {
    /// The base type supports linear interpolation.
    Continuous = 1,
    /// The base type is point-like and carries spatial coordinates.
    Spatial = 2,
    /// Coordinates live on the sphere rather than a plane.
    Geodetic = 4,
    /// The value's samples carry a z coordinate.
    HasZ = 8,
    /// The subtype caches a bounding box (every subtype but instants).
    HasBBox = 16,
}
