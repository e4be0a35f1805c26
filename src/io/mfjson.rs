//! MF-JSON (Moving Features JSON) representation of temporal points:
//! `type`, `crs`, `coordinates` (or `sequences`), `datetimes`,
//! `interpolation` and an optional `bbox`. The reader accepts everything
//! the writer emits.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::errors::Error;
use crate::temporal::point::tpoint::TPointType;
use crate::temporal::{TInstant, TInstantSet, TInterpolation, TSequence, TSequenceSet, Temporal};

fn coords_json<B: TPointType>(value: &B) -> Value {
    let (x, y, z) = value.coords();
    match z {
        Some(z) => json!([x, y, z]),
        None => json!([x, y]),
    }
}

fn datetime_json(t: DateTime<Utc>) -> Value {
    Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn instants_json<B: TPointType>(instants: &[TInstant<B>]) -> (Value, Value) {
    let coords: Vec<Value> = instants.iter().map(|i| coords_json(i.value())).collect();
    let times: Vec<Value> = instants.iter().map(|i| datetime_json(i.timestamp())).collect();
    (Value::Array(coords), Value::Array(times))
}

fn sequence_json<B: TPointType>(seq: &TSequence<B>) -> Value {
    let (coordinates, datetimes) = instants_json(seq.instants());
    json!({
        "coordinates": coordinates,
        "datetimes": datetimes,
        "lower_inc": seq.is_lower_inclusive(),
        "upper_inc": seq.is_upper_inclusive(),
    })
}

impl<B: TPointType> Temporal<B> {
    /// Renders the moving point as MF-JSON. `with_bbox` adds the spatial
    /// extent and time period; `srs` overrides the `crs` name derived from
    /// the SRID.
    pub fn as_mfjson(&self, with_bbox: bool, srs: Option<&str>) -> String {
        use crate::temporal::point::tpoint::TPointTrait;

        let mut root = Map::new();
        root.insert("type".into(), json!("MovingPoint"));
        let srid = TPointTrait::srid(self);
        let crs_name = srs
            .map(str::to_owned)
            .or_else(|| (srid != 0).then(|| format!("EPSG:{srid}")));
        if let Some(name) = crs_name {
            root.insert(
                "crs".into(),
                json!({"type": "Name", "properties": {"name": name}}),
            );
        }
        match self {
            Temporal::Instant(i) => {
                root.insert("coordinates".into(), coords_json(i.value()));
                root.insert("datetimes".into(), datetime_json(i.timestamp()));
                root.insert("interpolation".into(), json!("None"));
            }
            Temporal::InstantSet(s) => {
                let (coordinates, datetimes) = instants_json(s.instants());
                root.insert("coordinates".into(), coordinates);
                root.insert("datetimes".into(), datetimes);
                root.insert("interpolation".into(), json!("Discrete"));
            }
            Temporal::Sequence(s) => {
                let seq = sequence_json(s);
                for (k, v) in seq.as_object().expect("sequence object").iter() {
                    root.insert(k.clone(), v.clone());
                }
                root.insert("interpolation".into(), json!(interp_name(s.interpolation())));
            }
            Temporal::SequenceSet(s) => {
                let sequences: Vec<Value> = s.sequences().iter().map(sequence_json).collect();
                root.insert("sequences".into(), Value::Array(sequences));
                root.insert("interpolation".into(), json!(interp_name(s.interpolation())));
            }
        }
        if with_bbox {
            let bbox = self.bounding_box();
            if let (Some(xmin), Some(ymin), Some(xmax), Some(ymax)) =
                (bbox.xmin(), bbox.ymin(), bbox.xmax(), bbox.ymax())
            {
                root.insert("bbox".into(), json!([[xmin, ymin], [xmax, ymax]]));
            }
            if let Some(period) = bbox.tstzspan() {
                root.insert(
                    "period".into(),
                    json!({
                        "begin": datetime_json(period.lower()),
                        "end": datetime_json(period.upper()),
                        "lower_inc": period.is_lower_inclusive(),
                        "upper_inc": period.is_upper_inclusive(),
                    }),
                );
            }
        }
        Value::Object(root).to_string()
    }

    /// Parses the MF-JSON form produced by [`Self::as_mfjson`].
    pub fn from_mfjson(s: &str) -> Result<Self, Error> {
        let root: Value =
            serde_json::from_str(s).map_err(|e| Error::Parse(format!("invalid MF-JSON: {e}")))?;
        let obj = root
            .as_object()
            .ok_or_else(|| Error::Parse("MF-JSON root must be an object".into()))?;
        if obj.get("type").and_then(Value::as_str) != Some("MovingPoint") {
            return Err(Error::Parse("MF-JSON type must be MovingPoint".into()));
        }
        let srid = obj
            .get("crs")
            .and_then(|crs| crs.pointer("/properties/name"))
            .and_then(Value::as_str)
            .and_then(|name| name.strip_prefix("EPSG:"))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0);
        let interpolation = obj
            .get("interpolation")
            .and_then(Value::as_str)
            .unwrap_or("None");
        if let Some(sequences) = obj.get("sequences") {
            let interp = parse_interp(interpolation)?;
            let list = sequences
                .as_array()
                .ok_or_else(|| Error::Parse("sequences must be an array".into()))?;
            let mut parsed = Vec::with_capacity(list.len());
            for seq in list {
                parsed.push(parse_sequence::<B>(seq, srid, interp)?);
            }
            return Ok(Temporal::SequenceSet(TSequenceSet::make(parsed, false)?));
        }
        match interpolation {
            "None" => {
                let value = parse_point::<B>(
                    obj.get("coordinates")
                        .ok_or_else(|| Error::Parse("missing coordinates".into()))?,
                    srid,
                )?;
                let t = parse_datetime(
                    obj.get("datetimes")
                        .ok_or_else(|| Error::Parse("missing datetimes".into()))?,
                )?;
                Ok(Temporal::Instant(TInstant::new(value, t)))
            }
            "Discrete" => {
                let instants = parse_instants::<B>(obj, srid)?;
                Ok(Temporal::InstantSet(TInstantSet::new(instants)?))
            }
            name => {
                let interp = parse_interp(name)?;
                Ok(Temporal::Sequence(parse_sequence::<B>(&root, srid, interp)?))
            }
        }
    }
}

fn interp_name(interp: TInterpolation) -> &'static str {
    match interp {
        TInterpolation::Discrete => "Discrete",
        TInterpolation::Stepwise => "Step",
        TInterpolation::Linear => "Linear",
    }
}

fn parse_interp(name: &str) -> Result<TInterpolation, Error> {
    match name {
        "Linear" => Ok(TInterpolation::Linear),
        "Step" | "Stepwise" => Ok(TInterpolation::Stepwise),
        other => Err(Error::Parse(format!("unsupported interpolation '{other}'"))),
    }
}

fn parse_point<B: TPointType>(value: &Value, srid: i32) -> Result<B, Error> {
    let nums = value
        .as_array()
        .ok_or_else(|| Error::Parse("coordinates must be arrays".into()))?;
    let coords: Vec<f64> = nums
        .iter()
        .map(|n| {
            n.as_f64()
                .ok_or_else(|| Error::Parse("coordinates must be numbers".into()))
        })
        .collect::<Result<_, _>>()?;
    match coords.as_slice() {
        [x, y] => Ok(B::make_point(*x, *y, None, srid)),
        [x, y, z] => Ok(B::make_point(*x, *y, Some(*z), srid)),
        _ => Err(Error::Parse("a position requires 2 or 3 coordinates".into())),
    }
}

fn parse_datetime(value: &Value) -> Result<DateTime<Utc>, Error> {
    let s = value
        .as_str()
        .ok_or_else(|| Error::Parse("datetimes must be strings".into()))?;
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("invalid datetime '{s}': {e}")))
}

fn parse_instants<B: TPointType>(
    obj: &Map<String, Value>,
    srid: i32,
) -> Result<Vec<TInstant<B>>, Error> {
    let coords = obj
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Parse("missing coordinates".into()))?;
    let times = obj
        .get("datetimes")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Parse("missing datetimes".into()))?;
    if coords.len() != times.len() {
        return Err(Error::Parse(
            "coordinates and datetimes must have the same length".into(),
        ));
    }
    coords
        .iter()
        .zip(times)
        .map(|(c, t)| Ok(TInstant::new(parse_point::<B>(c, srid)?, parse_datetime(t)?)))
        .collect()
}

fn parse_sequence<B: TPointType>(
    value: &Value,
    srid: i32,
    interp: TInterpolation,
) -> Result<TSequence<B>, Error> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::Parse("a sequence must be an object".into()))?;
    let instants = parse_instants::<B>(obj, srid)?;
    let lower_inc = obj.get("lower_inc").and_then(Value::as_bool).unwrap_or(true);
    let upper_inc = obj.get("upper_inc").and_then(Value::as_bool).unwrap_or(true);
    TSequence::make(instants, lower_inc, upper_inc, interp, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::TGeomPoint;

    #[test]
    fn round_trips_every_subtype() {
        for text in [
            "Point(1 2)@2020-01-01",
            "{Point(1 2)@2020-01-01, Point(3 4)@2020-01-02}",
            "[Point(1 2)@2020-01-01, Point(3 4)@2020-01-02)",
            "{[Point(1 2)@2020-01-01, Point(3 4)@2020-01-02), [Point(9 9)@2020-01-05]}",
        ] {
            let t: TGeomPoint = text.parse().unwrap();
            let json = t.as_mfjson(true, None);
            let back = TGeomPoint::from_mfjson(&json).unwrap();
            assert_eq!(back, t, "{text}");
        }
    }

    #[test]
    fn emits_the_standard_fields() {
        let t: TGeomPoint = "SRID=4326;Point(1 2)@2020-01-01".parse().unwrap();
        let json: Value = serde_json::from_str(&t.as_mfjson(false, Some("EPSG:4326"))).unwrap();
        assert_eq!(json["type"], "MovingPoint");
        assert_eq!(json["interpolation"], "None");
        assert_eq!(json.pointer("/crs/properties/name").unwrap(), "EPSG:4326");
        assert_eq!(json["coordinates"][0], 1.0);
    }

    #[test]
    fn bbox_carries_extent_and_period() {
        let t: TGeomPoint = "[Point(0 0)@2020-01-01, Point(10 5)@2020-01-02]".parse().unwrap();
        let json: Value = serde_json::from_str(&t.as_mfjson(true, None)).unwrap();
        assert_eq!(json["bbox"][0][0], 0.0);
        assert_eq!(json["bbox"][1][1], 5.0);
        assert!(json["period"]["lower_inc"].as_bool().unwrap());
    }
}
