//! Floating-point kernel shared by the segment solvers: the tolerance used
//! by every turning-point comparison, the quadratic root finder, and the
//! rounding utilities.

/// Tolerance below which two floats are considered equal.
///
/// The same constant is the "zero distance" threshold of the segment kernel;
/// all turning-point logic must compare through [`float_eq`] rather than
/// introducing private tolerances.
pub const EPSILON: f64 = 1e-12;

/// Returns whether `a` and `b` differ by less than [`EPSILON`].
#[inline]
pub fn float_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Roots of `a·x² + b·x + c = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuadraticRoots {
    None,
    One(f64),
    /// Both roots, ordered `x1 <= x2`.
    Two(f64, f64),
}

/// Solves `a·x² + b·x + c = 0`.
///
/// When the discriminant is positive, one root is computed with the standard
/// formula and the other with the Viète rearrangement `2c / (-b ∓ √Δ)`, so
/// that the root closer to zero never suffers catastrophic cancellation
/// between `-b` and `√Δ`.
///
/// A degenerate `a == 0` input falls back to the linear solve; `a == b == 0`
/// yields no roots.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> QuadraticRoots {
    if a == 0.0 {
        if b == 0.0 {
            return QuadraticRoots::None;
        }
        return QuadraticRoots::One(-c / b);
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return QuadraticRoots::None;
    }
    if discriminant == 0.0 {
        return QuadraticRoots::One(-b / (2.0 * a));
    }
    let sqrt_d = discriminant.sqrt();
    let (x1, x2) = if b >= 0.0 {
        ((-b - sqrt_d) / (2.0 * a), (2.0 * c) / (-b - sqrt_d))
    } else {
        ((2.0 * c) / (-b + sqrt_d), (-b + sqrt_d) / (2.0 * a))
    };
    if x1 <= x2 {
        QuadraticRoots::Two(x1, x2)
    } else {
        QuadraticRoots::Two(x2, x1)
    }
}

/// Rounds `x` half-away-from-zero to `digits` decimal places.
///
/// Idempotent: a value already at the target precision is returned bit-exact.
pub fn round_float(x: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    let scaled = x * factor;
    if scaled == scaled.trunc() {
        return x;
    }
    let rounded = if scaled >= 0.0 {
        (scaled + 0.5).floor()
    } else {
        (scaled - 0.5).ceil()
    };
    rounded / factor
}
