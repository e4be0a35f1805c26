use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Errors surfaced by fallible public operations.
///
/// Restrictions over an empty or non-matching domain are *not* errors: they
/// return `None` through the operation's normal channel. Internally
/// inconsistent values observed after construction are programmer errors and
/// panic instead of being reported here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// NULL / empty / malformed input at the public boundary.
    #[error("invalid argument: {0}")]
    InvalidArg(&'static str),

    /// 2D mixed with 3D, geodetic with planar, or mismatched SRIDs.
    #[error("mixed dimensions: {0}")]
    MixedDimensions(&'static str),

    /// Binary operation across incompatible temporal base types.
    #[error("operand types are not compatible: {0}")]
    TypeMismatch(&'static str),

    /// Union of disjoint spans requested in strict mode.
    #[error("result of union is not contiguous")]
    NotContiguous,

    /// Cooperative cancellation observed mid-operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Integer span construction that would wrap.
    #[error("integer overflow in span bound canonicalization")]
    Overflow,

    /// Text, WKB or MF-JSON input that does not parse.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Error type of every `FromStr` implementation in the crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(pub String);

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e.0)
    }
}

impl From<Error> for ParseError {
    fn from(e: Error) -> Self {
        ParseError(e.to_string())
    }
}

/// Cooperative cancellation flag checked once per outer loop by operations
/// that may run in O(n·m), such as geometry restriction over sequence sets
/// and trajectory simplification.
///
/// Cloning shares the flag, so a host may hand the same token to many
/// operations and cancel them all at once.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; in-flight operations fail with
    /// [`Error::Cancelled`] at their next check point.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<(), Error> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_trips_once_set() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert_eq!(token.check(), Err(Error::Cancelled));
        assert!(token.clone().is_cancelled());
    }
}
