use crate::boxes::STBox;
use crate::errors::Error;
use crate::geom::GeogPoint;
use crate::temporal::point::tpoint::TPointTrait;
use crate::temporal::temporal::Temporal;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;

/// A temporal geographic point: coordinates are lon/lat degrees on the
/// sphere and distances are great-circle meters.
///
/// ## Example
/// ```
/// # use tempora::TGeogPoint;
/// let t: TGeogPoint = "Point(2.35 48.85)@2020-01-01".parse().unwrap();
/// assert_eq!(t.start_value().0.y, 48.85);
/// ```
pub type TGeogPoint = Temporal<GeogPoint>;
pub type TGeogPointInst = TInstant<GeogPoint>;
pub type TGeogPointSeq = TSequence<GeogPoint>;
pub type TGeogPointSeqSet = TSequenceSet<GeogPoint>;

impl TGeogPoint {
    /// Restriction to a geodetic spatio-temporal box: the time axis first,
    /// then the lon/lat extent sample-wise.
    pub fn at_stbox(&self, stbox: &STBox) -> Result<Option<TGeogPoint>, Error> {
        if stbox.has_x() && !stbox.is_geodetic() {
            return Err(Error::MixedDimensions(
                "a geographic point cannot be restricted to a planar box",
            ));
        }
        let mut result = self.clone();
        if let Some(period) = stbox.tstzspan() {
            match result.at_tstzspan(&period) {
                Some(r) => result = r,
                None => return Ok(None),
            }
        }
        if let (Some(xmin), Some(xmax), Some(ymin), Some(ymax)) =
            (stbox.xmin(), stbox.xmax(), stbox.ymin(), stbox.ymax())
        {
            // Latitude and longitude are restricted independently: a
            // lon/lat rectangle on the sphere.
            let x_keep = self.x().at_span(&(xmin..=xmax).into());
            let y_keep = self.y().at_span(&(ymin..=ymax).into());
            result = match (x_keep, y_keep) {
                (Some(x), Some(y)) => {
                    let Some(keep) = x.time().intersection(&y.time()) else {
                        return Ok(None);
                    };
                    match result.at_time_set(&keep) {
                        Some(r) => r,
                        None => return Ok(None),
                    }
                }
                _ => return Ok(None),
            };
        }
        Ok(Some(result))
    }
}
