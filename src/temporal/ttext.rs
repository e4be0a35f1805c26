use crate::temporal::lifting::{lift_temporal_base, lift_temporal_temporal, LiftedBinOp};
use crate::temporal::temporal::Temporal;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;

/// A temporal text value; always step-interpolated, ordered
/// lexicographically.
///
/// ## Example
/// ```
/// # use tempora::TText;
/// let t: TText = "\"hello\"@2020-01-01".parse().unwrap();
/// assert_eq!(t.start_value(), "hello");
/// ```
pub type TText = Temporal<String>;
pub type TTextInst = TInstant<String>;
pub type TTextSeq = TSequence<String>;
pub type TTextSeqSet = TSequenceSet<String>;

struct Concat;

impl LiftedBinOp<String, String> for Concat {
    type Out = String;

    fn apply(&self, a: &String, b: &String) -> String {
        format!("{a}{b}")
    }
}

impl TText {
    /// Pointwise concatenation over the synchronized domain.
    pub fn concat(&self, other: &TText) -> Option<TText> {
        lift_temporal_temporal(&Concat, self, other)
    }

    /// Appends a constant suffix to every sample.
    pub fn concat_value(&self, suffix: &str) -> TText {
        lift_temporal_base(&Concat, self, &suffix.to_owned())
            .expect("a unary lift covers the whole domain")
    }

    pub fn uppercase(&self) -> TText {
        self.map_base(&|v| v.to_uppercase())
    }

    pub fn lowercase(&self) -> TText {
        self.map_base(&|v| v.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_ttext() {
        let string = "\"text\"@2018-01-01 08:00:00+00";
        let result: TText = string.parse().unwrap();
        assert_eq!(format!("{result:?}"), format!("Instant({string})"));
    }

    #[test]
    fn sequence_ttext() {
        let string = "[\"text\"@2018-01-01 08:00:00+00]";
        let result: TText = string.parse().unwrap();
        assert_eq!(format!("{result:?}"), format!("Sequence({string})"));
    }

    #[test]
    fn sequence_set_ttext() {
        let string = "{[\"text\"@2018-01-01 08:00:00+00]}";
        let result: TText = string.parse().unwrap();
        assert_eq!(format!("{result:?}"), format!("SequenceSet({string})"));
    }

    #[test]
    fn concatenation_synchronizes() {
        let a: TText = "{\"a\"@2020-01-01, \"b\"@2020-01-02}".parse().unwrap();
        let b: TText = "{\"x\"@2020-01-01, \"y\"@2020-01-03}".parse().unwrap();
        let joined = a.concat(&b).unwrap();
        assert_eq!(joined.values(), vec!["ax".to_owned()]);
        assert_eq!(a.concat_value("!").values(), vec!["a!", "b!"]);
    }

    #[test]
    fn case_mapping_preserves_time() {
        let t: TText = "[\"Ab\"@2020-01-01, \"cD\"@2020-01-02]".parse().unwrap();
        assert_eq!(t.uppercase().values(), vec!["AB", "CD"]);
        assert_eq!(t.lowercase().time(), t.time());
    }
}
