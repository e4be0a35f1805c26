use crate::num::round_float;
use crate::temporal::temporal::{OrderedTemporal, Temporal};
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;

/// A temporal float, linear-capable.
///
/// ## Example
/// ```
/// # use tempora::TFloat;
/// let t: TFloat = "[1.5@2020-01-01, 2.5@2020-01-02]".parse().unwrap();
/// assert_eq!(t.start_value(), 1.5);
/// ```
pub type TFloat = Temporal<f64>;
pub type TFloatInst = TInstant<f64>;
pub type TFloatSeq = TSequence<f64>;
pub type TFloatSeqSet = TSequenceSet<f64>;

impl TFloat {
    /// Rounds every sample to `max_decimals` decimal places.
    pub fn round(&self, max_decimals: i32) -> TFloat {
        self.map_base(&|v| round_float(*v, max_decimals))
    }

    /// Converts radian samples to degrees.
    pub fn to_degrees(&self) -> TFloat {
        self.map_base(&|v| v.to_degrees())
    }

    /// Converts degree samples to radians.
    pub fn to_radians(&self) -> TFloat {
        self.map_base(&|v| v.to_radians())
    }

    /// Shifts the value dimension by `shift` and/or rescales it so the
    /// value range has width `width`, anchored at the minimum.
    pub fn shift_scale_value(&self, shift: Option<f64>, width: Option<f64>) -> TFloat {
        let min = self.min_value();
        let old_width = self.max_value() - min;
        let ratio = match width {
            Some(w) if old_width > 0.0 => w / old_width,
            _ => 1.0,
        };
        let delta = shift.unwrap_or(0.0);
        self.map_base(&move |v| min + delta + (v - min) * ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_tfloat() {
        let string = "1.5@2018-01-01 08:00:00+00";
        let result: TFloat = string.parse().unwrap();
        assert_eq!(format!("{result:?}"), format!("Instant({string})"));
    }

    #[test]
    fn sequence_tfloat() {
        let string = "[1.5@2018-01-01 08:00:00+00, 2.5@2018-01-02 08:00:00+00]";
        let result: TFloat = string.parse().unwrap();
        assert_eq!(format!("{result:?}"), format!("Sequence({string})"));
    }

    #[test]
    fn sequence_set_tfloat() {
        let string =
            "{[1@2018-01-01 08:00:00+00], [2@2018-01-02 08:00:00+00, 3@2018-01-03 08:00:00+00]}";
        let result: TFloat = string.parse().unwrap();
        assert_eq!(format!("{result:?}"), format!("SequenceSet({string})"));
    }

    #[test]
    fn rounding_preserves_shape() {
        let t: TFloat = "[1.23456@2020-01-01, 2.7@2020-01-02]".parse().unwrap();
        let rounded = t.round(2);
        assert_eq!(rounded.values(), vec![1.23, 2.7]);
        assert_eq!(rounded.time(), t.time());
    }

    #[test]
    fn shift_scale_value_remaps_the_range() {
        let t: TFloat = "[0@2020-01-01, 10@2020-01-02]".parse().unwrap();
        let scaled = t.shift_scale_value(Some(100.0), Some(1.0));
        assert_eq!(scaled.min_value(), 100.0);
        assert_eq!(scaled.max_value(), 101.0);
    }
}
