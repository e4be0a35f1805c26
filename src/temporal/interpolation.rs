use std::fmt;
use std::str::FromStr;

use crate::errors::ParseError;

/// Rule for reconstructing a value at an un-sampled timestamp within a
/// temporal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TInterpolation {
    /// Undefined between samples; the interpolation of instant sets.
    Discrete,
    /// Left-continuous: a sample's value holds until the next sample.
    Stepwise,
    /// Linear in the base type between consecutive samples.
    Linear,
}

impl FromStr for TInterpolation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "discrete" => Ok(TInterpolation::Discrete),
            "linear" => Ok(TInterpolation::Linear),
            "stepwise" | "step" => Ok(TInterpolation::Stepwise),
            _ => Err(ParseError(format!("unknown interpolation '{s}'"))),
        }
    }
}

impl fmt::Display for TInterpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TInterpolation::Discrete => f.write_str("Discrete"),
            TInterpolation::Stepwise => f.write_str("Step"),
            TInterpolation::Linear => f.write_str("Linear"),
        }
    }
}
