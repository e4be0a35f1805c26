pub mod tgeogpoint;
pub mod tgeompoint;
pub mod tpoint;

pub use tgeogpoint::{TGeogPoint, TGeogPointInst, TGeogPointSeq, TGeogPointSeqSet};
pub use tgeompoint::{TGeomPoint, TGeomPointInst, TGeomPointSeq, TGeomPointSeqSet};
pub use tpoint::{TPointTrait, TPointType};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_tgeompoint() {
        let string = "POINT(0 0)@2018-01-01 08:00:00+00";
        let result: TGeomPoint = string.parse().unwrap();
        assert_eq!(format!("{result:?}"), format!("Instant({string})"));
    }

    #[test]
    fn sequence_tgeompoint() {
        let string = "[POINT(0 0)@2018-01-01 08:00:00+00]";
        let result: TGeomPoint = string.parse().unwrap();
        assert_eq!(format!("{result:?}"), format!("Sequence({string})"));
    }

    #[test]
    fn sequence_set_tgeogpoint() {
        let string = "{[POINT(0 0)@2018-01-01 08:00:00+00]}";
        let result: TGeogPoint = string.parse().unwrap();
        assert_eq!(format!("{result:?}"), format!("SequenceSet({string})"));
    }
}
