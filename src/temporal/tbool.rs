use crate::collections::datetime::TsTzSpanSet;
use crate::temporal::lifting::{lift_temporal_base, lift_temporal_temporal, LiftedBinOp};
use crate::temporal::temporal::Temporal;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;

/// A temporal boolean, the result type of the temporal comparison and
/// predicate operators; always step-interpolated.
///
/// ## Example
/// ```
/// # use tempora::TBool;
/// let t: TBool = "[t@2020-01-01, f@2020-01-02]".parse().unwrap();
/// assert!(t.start_value());
/// ```
pub type TBool = Temporal<bool>;
pub type TBoolInst = TInstant<bool>;
pub type TBoolSeq = TSequence<bool>;
pub type TBoolSeqSet = TSequenceSet<bool>;

struct BoolOp(fn(bool, bool) -> bool);

impl LiftedBinOp<bool, bool> for BoolOp {
    type Out = bool;

    fn apply(&self, a: &bool, b: &bool) -> bool {
        (self.0)(*a, *b)
    }
}

impl TBool {
    pub fn temporal_and(&self, other: &TBool) -> Option<TBool> {
        lift_temporal_temporal(&BoolOp(|a, b| a && b), self, other)
    }

    pub fn temporal_or(&self, other: &TBool) -> Option<TBool> {
        lift_temporal_temporal(&BoolOp(|a, b| a || b), self, other)
    }

    pub fn temporal_not(&self) -> TBool {
        self.map_base(&|v| !v)
    }

    pub fn and_value(&self, value: bool) -> TBool {
        lift_temporal_base(&BoolOp(|a, b| a && b), self, &value)
            .expect("a unary lift covers the whole domain")
    }

    pub fn or_value(&self, value: bool) -> TBool {
        lift_temporal_base(&BoolOp(|a, b| a || b), self, &value)
            .expect("a unary lift covers the whole domain")
    }

    /// The time during which the value is true, or `None` when it never is.
    pub fn when_true(&self) -> Option<TsTzSpanSet> {
        self.at_value(&true).map(|at| at.time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_tbool() {
        let string = "t@2018-01-01 08:00:00+00";
        let result: TBool = string.parse().unwrap();
        assert_eq!(format!("{result:?}"), format!("Instant({string})"));
    }

    #[test]
    fn sequence_tbool() {
        let string = "[t@2018-01-01 08:00:00+00, f@2018-01-02 08:00:00+00]";
        let result: TBool = string.parse().unwrap();
        assert_eq!(format!("{result:?}"), format!("Sequence({string})"));
    }

    #[test]
    fn boolean_algebra_synchronizes() {
        let a: TBool = "[t@2020-01-01, f@2020-01-03, f@2020-01-05]".parse().unwrap();
        let b: TBool = "[t@2020-01-02, t@2020-01-04]".parse().unwrap();
        let and = a.temporal_and(&b).unwrap();
        // Synchronized over [01-02, 01-04]: a is true until 01-03.
        assert_eq!(
            and.value_at_timestamp(crate::utils::parse_timestamp("2020-01-02 12:00:00").unwrap(), true),
            Some(true)
        );
        assert_eq!(
            and.value_at_timestamp(crate::utils::parse_timestamp("2020-01-03 12:00:00").unwrap(), true),
            Some(false)
        );
    }

    #[test]
    fn when_true_projects_the_true_spans() {
        let t: TBool = "[t@2020-01-01, f@2020-01-03, t@2020-01-05]".parse().unwrap();
        let spans = t.when_true().unwrap();
        assert_eq!(spans.num_spans(), 2);
        assert!(!spans.start_span().is_upper_inclusive());
    }

    #[test]
    fn negation_flips_values_in_place() {
        let t: TBool = "{t@2020-01-01, f@2020-01-02}".parse().unwrap();
        assert_eq!(t.temporal_not().values(), vec![false, true]);
    }
}
