use crate::temporal::temporal::Temporal;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;

use super::tfloat::TFloat;

/// A temporal integer; always step-interpolated.
///
/// ## Example
/// ```
/// # use tempora::TInt;
/// let t: TInt = "{1@2020-01-01, 2@2020-01-02}".parse().unwrap();
/// assert_eq!(t.values(), vec![1, 2]);
/// ```
pub type TInt = Temporal<i32>;
pub type TIntInst = TInstant<i32>;
pub type TIntSeq = TSequence<i32>;
pub type TIntSeqSet = TSequenceSet<i32>;

impl TInt {
    /// Widens to a temporal float, keeping the step interpolation.
    pub fn to_tfloat(&self) -> TFloat {
        self.map_base(&|v| *v as f64)
    }
}

impl TFloat {
    /// Truncates to a temporal integer; linear sequences degrade to step.
    pub fn to_tint(&self) -> TInt {
        self.map_base(&|v| *v as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::interpolation::TInterpolation;

    #[test]
    fn instant_tint() {
        let string = "1@2018-01-01 08:00:00+00";
        let result: TInt = string.parse().unwrap();
        assert_eq!(format!("{result:?}"), format!("Instant({string})"));
    }

    #[test]
    fn sequences_of_ints_are_stepwise() {
        let t: TInt = "[1@2020-01-01, 2@2020-01-02]".parse().unwrap();
        assert_eq!(t.interpolation(), TInterpolation::Stepwise);
        assert!(matches!(t, Temporal::Sequence(_)));
        // Linear interpolation is rejected for integers.
        assert!("Interp=Linear;[1@2020-01-01, 2@2020-01-02]".parse::<TInt>().is_err());
    }

    #[test]
    fn widening_keeps_the_step_semantics() {
        let t: TInt = "[1@2020-01-01, 2@2020-01-02]".parse().unwrap();
        let f = t.to_tfloat();
        assert_eq!(f.interpolation(), TInterpolation::Stepwise);
        assert_eq!(f.values(), vec![1.0, 2.0]);
    }
}
