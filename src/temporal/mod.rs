mod interpolation;
pub use interpolation::TInterpolation;

pub mod base;
pub use base::{TBaseType, TOrderedType, TempType};

pub mod lifting;
pub mod segment;

mod compops;

pub mod number;
pub use number::tfloat::*;
pub use number::tint::*;
pub use number::tnumber::TNumberType;

#[cfg(feature = "geo")]
pub mod point;
#[cfg(feature = "geo")]
pub use point::tgeogpoint::*;
#[cfg(feature = "geo")]
pub use point::tgeompoint::*;
#[cfg(feature = "geo")]
pub use point::tpoint::{TPointTrait, TPointType};

mod tbool;
pub use tbool::*;

#[allow(clippy::module_inception)]
mod temporal;
pub use temporal::{OrderedTemporal, Temporal};

mod tinstant;
pub use tinstant::TInstant;

mod tinstant_set;
pub use tinstant_set::TInstantSet;

mod tsequence;
pub use tsequence::TSequence;

mod tsequence_set;
pub use tsequence_set::TSequenceSet;

mod ttext;
pub use ttext::*;
