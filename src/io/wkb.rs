//! Versioned binary frames (WKB) for spans, span sets, bounding boxes and
//! temporal values, plus the uppercase-hex HexWKB rendering.
//!
//! Frame layout: an endianness byte (`0x01` little, `0x00` big), a format
//! version byte, a `u16` type tag, a `u16` flag word, then the payload. The
//! flag word records interpolation, dimensionality, geodetic interpretation
//! and whether a bounding-box blob (length-prefixed) precedes the payload.
//! Every writer round-trips through its reader.

use crate::errors::Error;

pub(crate) const WKB_VERSION: u8 = 1;

/// Little-endian accumulating writer.
#[derive(Default)]
pub struct WkbWriter {
    buf: Vec<u8>,
}

impl WkbWriter {
    pub fn new() -> Self {
        let mut w = Self { buf: Vec::new() };
        w.write_u8(0x01);
        w.write_u8(WKB_VERSION);
        w
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Length-prefixed byte string.
    pub fn write_bytes(&mut self, v: &[u8]) {
        self.write_u32(v.len() as u32);
        self.buf.extend_from_slice(v);
    }
}

/// Endianness-aware frame reader.
pub struct WkbReader<'a> {
    data: &'a [u8],
    pos: usize,
    big_endian: bool,
}

impl<'a> WkbReader<'a> {
    /// Consumes the endianness and version bytes.
    pub fn new(data: &'a [u8]) -> Result<Self, Error> {
        let mut reader = Self {
            data,
            pos: 0,
            big_endian: false,
        };
        let endian = reader.read_u8()?;
        reader.big_endian = match endian {
            0x00 => true,
            0x01 => false,
            other => {
                return Err(Error::Parse(format!(
                    "invalid endianness byte 0x{other:02x}"
                )))
            }
        };
        let version = reader.read_u8()?;
        if version != WKB_VERSION {
            return Err(Error::Parse(format!("unsupported frame version {version}")));
        }
        Ok(reader)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.pos + n > self.data.len() {
            return Err(Error::Parse("truncated binary frame".into()));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos == self.data.len()
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        let b: [u8; 2] = self.take(2)?.try_into().expect("sized take");
        Ok(if self.big_endian {
            u16::from_be_bytes(b)
        } else {
            u16::from_le_bytes(b)
        })
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        let b: [u8; 4] = self.take(4)?.try_into().expect("sized take");
        Ok(if self.big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64, Error> {
        let b: [u8; 8] = self.take(8)?.try_into().expect("sized take");
        Ok(if self.big_endian {
            i64::from_be_bytes(b)
        } else {
            i64::from_le_bytes(b)
        })
    }

    pub fn read_f64(&mut self) -> Result<f64, Error> {
        let b: [u8; 8] = self.take(8)?.try_into().expect("sized take");
        Ok(if self.big_endian {
            f64::from_be_bytes(b)
        } else {
            f64::from_le_bytes(b)
        })
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>, Error> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }
}

/// HexWKB is the uppercase hex rendering of a WKB frame, with no whitespace.
pub fn to_hex(wkb: &[u8]) -> String {
    hex::encode_upper(wkb)
}

pub fn from_hex(s: &str) -> Result<Vec<u8>, Error> {
    hex::decode(s.trim()).map_err(|e| Error::Parse(format!("invalid hex: {e}")))
}

// ------------------------- Frame codecs --------------------------------------

use chrono::{DateTime, Utc};

use crate::boxes::{STBox, TBox};
use crate::collections::base::{Span, SpanSet, SpanType};
use crate::collections::datetime::TsTzSpan;
use crate::temporal::{
    TBaseType, TInstant, TInstantSet, TInterpolation, TSequence, TSequenceSet, TempType, Temporal,
};
use crate::utils::{from_micros, to_micros};

const TAG_SPAN_INT: u16 = 0x10;
const TAG_SPAN_FLOAT: u16 = 0x11;
const TAG_SPAN_TSTZ: u16 = 0x12;
const TAG_SPANSET_BASE: u16 = 0x20;
const TAG_TBOX: u16 = 0x30;
const TAG_STBOX: u16 = 0x31;
const TAG_TEMPORAL_BASE: u16 = 0x40;

/// Span element types the binary frame understands.
pub trait WkbSpanElement: SpanType {
    const SPAN_TAG: u16;
    fn write_element(v: Self, w: &mut WkbWriter);
    fn read_element(r: &mut WkbReader<'_>) -> Result<Self, Error>;
}

impl WkbSpanElement for i32 {
    const SPAN_TAG: u16 = TAG_SPAN_INT;

    fn write_element(v: Self, w: &mut WkbWriter) {
        w.write_i32(v);
    }

    fn read_element(r: &mut WkbReader<'_>) -> Result<Self, Error> {
        r.read_i32()
    }
}

impl WkbSpanElement for f64 {
    const SPAN_TAG: u16 = TAG_SPAN_FLOAT;

    fn write_element(v: Self, w: &mut WkbWriter) {
        w.write_f64(v);
    }

    fn read_element(r: &mut WkbReader<'_>) -> Result<Self, Error> {
        r.read_f64()
    }
}

impl WkbSpanElement for DateTime<Utc> {
    const SPAN_TAG: u16 = TAG_SPAN_TSTZ;

    fn write_element(v: Self, w: &mut WkbWriter) {
        w.write_i64(to_micros(&v));
    }

    fn read_element(r: &mut WkbReader<'_>) -> Result<Self, Error> {
        Ok(from_micros(r.read_i64()?))
    }
}

fn bound_flags(lower_inc: bool, upper_inc: bool) -> u8 {
    lower_inc as u8 | (upper_inc as u8) << 1
}

fn write_span_payload<T: WkbSpanElement>(span: &Span<T>, w: &mut WkbWriter) {
    w.write_u8(bound_flags(span.is_lower_inclusive(), span.is_upper_inclusive()));
    T::write_element(span.lower(), w);
    T::write_element(span.upper(), w);
}

fn read_span_payload<T: WkbSpanElement>(r: &mut WkbReader<'_>) -> Result<Span<T>, Error> {
    let flags = r.read_u8()?;
    let lower = T::read_element(r)?;
    let upper = T::read_element(r)?;
    // Discrete spans were canonicalized before writing, and the canonical
    // form is a fixed point of canonicalization.
    Span::new(lower, upper, flags & 1 != 0, flags & 2 != 0)
}

impl<T: WkbSpanElement> Span<T> {
    pub fn as_wkb(&self) -> Vec<u8> {
        let mut w = WkbWriter::new();
        w.write_u16(T::SPAN_TAG);
        w.write_u16(0);
        write_span_payload(self, &mut w);
        w.into_bytes()
    }

    pub fn from_wkb(data: &[u8]) -> Result<Self, Error> {
        let mut r = WkbReader::new(data)?;
        let tag = r.read_u16()?;
        if tag != T::SPAN_TAG {
            return Err(Error::TypeMismatch("frame does not hold a span of this type"));
        }
        let _flags = r.read_u16()?;
        read_span_payload(&mut r)
    }

    pub fn as_hexwkb(&self) -> String {
        to_hex(&self.as_wkb())
    }

    pub fn from_hexwkb(s: &str) -> Result<Self, Error> {
        Self::from_wkb(&from_hex(s)?)
    }
}

impl<T: WkbSpanElement> SpanSet<T> {
    pub fn as_wkb(&self) -> Vec<u8> {
        let mut w = WkbWriter::new();
        w.write_u16(TAG_SPANSET_BASE | T::SPAN_TAG);
        w.write_u16(0);
        w.write_u32(self.num_spans() as u32);
        for span in self.iter() {
            write_span_payload(span, &mut w);
        }
        w.into_bytes()
    }

    pub fn from_wkb(data: &[u8]) -> Result<Self, Error> {
        let mut r = WkbReader::new(data)?;
        let tag = r.read_u16()?;
        if tag != TAG_SPANSET_BASE | T::SPAN_TAG {
            return Err(Error::TypeMismatch(
                "frame does not hold a span set of this type",
            ));
        }
        let _flags = r.read_u16()?;
        let n = r.read_u32()? as usize;
        let mut spans = Vec::with_capacity(n);
        for _ in 0..n {
            spans.push(read_span_payload(&mut r)?);
        }
        SpanSet::new(spans)
    }

    pub fn as_hexwkb(&self) -> String {
        to_hex(&self.as_wkb())
    }

    pub fn from_hexwkb(s: &str) -> Result<Self, Error> {
        Self::from_wkb(&from_hex(s)?)
    }
}

impl TBox {
    pub fn as_wkb(&self) -> Vec<u8> {
        let mut w = WkbWriter::new();
        w.write_u16(TAG_TBOX);
        w.write_u16(self.has_x() as u16 | (self.has_t() as u16) << 1);
        if let Some(span) = self.span() {
            write_span_payload(&span, &mut w);
        }
        if let Some(period) = self.tstzspan() {
            write_span_payload(&period, &mut w);
        }
        w.into_bytes()
    }

    pub fn from_wkb(data: &[u8]) -> Result<Self, Error> {
        let mut r = WkbReader::new(data)?;
        if r.read_u16()? != TAG_TBOX {
            return Err(Error::TypeMismatch("frame does not hold a temporal box"));
        }
        let flags = r.read_u16()?;
        let span = if flags & 1 != 0 {
            Some(read_span_payload(&mut r)?)
        } else {
            None
        };
        let period = if flags & 2 != 0 {
            Some(read_span_payload(&mut r)?)
        } else {
            None
        };
        TBox::new(span, period)
    }

    pub fn as_hexwkb(&self) -> String {
        to_hex(&self.as_wkb())
    }

    pub fn from_hexwkb(s: &str) -> Result<Self, Error> {
        Self::from_wkb(&from_hex(s)?)
    }
}

impl STBox {
    pub fn as_wkb(&self) -> Vec<u8> {
        let mut w = WkbWriter::new();
        w.write_u16(TAG_STBOX);
        let flags = self.has_x() as u16
            | (self.has_z() as u16) << 1
            | (self.has_t() as u16) << 2
            | (self.is_geodetic() as u16) << 3;
        w.write_u16(flags);
        w.write_i32(self.srid());
        if self.has_x() {
            w.write_f64(self.xmin().expect("x axis present"));
            w.write_f64(self.xmax().expect("x axis present"));
            w.write_f64(self.ymin().expect("xy axes come together"));
            w.write_f64(self.ymax().expect("xy axes come together"));
        }
        if self.has_z() {
            w.write_f64(self.zmin().expect("z axis present"));
            w.write_f64(self.zmax().expect("z axis present"));
        }
        if let Some(period) = self.tstzspan() {
            write_span_payload(&period, &mut w);
        }
        w.into_bytes()
    }

    pub fn from_wkb(data: &[u8]) -> Result<Self, Error> {
        let mut r = WkbReader::new(data)?;
        if r.read_u16()? != TAG_STBOX {
            return Err(Error::TypeMismatch(
                "frame does not hold a spatio-temporal box",
            ));
        }
        let flags = r.read_u16()?;
        let srid = r.read_i32()?;
        let (mut x, mut y, mut z) = (None, None, None);
        if flags & 1 != 0 {
            let xmin = r.read_f64()?;
            let xmax = r.read_f64()?;
            let ymin = r.read_f64()?;
            let ymax = r.read_f64()?;
            x = Some((xmin, xmax));
            y = Some((ymin, ymax));
        }
        if flags & 2 != 0 {
            z = Some((r.read_f64()?, r.read_f64()?));
        }
        let period: Option<TsTzSpan> = if flags & 4 != 0 {
            Some(read_span_payload(&mut r)?)
        } else {
            None
        };
        STBox::new(x, y, z, period, flags & 8 != 0, srid)
    }

    pub fn as_hexwkb(&self) -> String {
        to_hex(&self.as_wkb())
    }

    pub fn from_hexwkb(s: &str) -> Result<Self, Error> {
        Self::from_wkb(&from_hex(s)?)
    }
}

fn temp_type_code(t: TempType) -> u16 {
    match t {
        TempType::Bool => 0,
        TempType::Int => 1,
        TempType::Float => 2,
        TempType::Text => 3,
        TempType::GeomPoint => 4,
        TempType::GeogPoint => 5,
    }
}

fn interp_code(interp: TInterpolation) -> u16 {
    match interp {
        TInterpolation::Discrete => 0,
        TInterpolation::Stepwise => 1,
        TInterpolation::Linear => 2,
    }
}

fn interp_from_code(code: u16) -> Result<TInterpolation, Error> {
    match code {
        0 => Ok(TInterpolation::Discrete),
        1 => Ok(TInterpolation::Stepwise),
        2 => Ok(TInterpolation::Linear),
        _ => Err(Error::Parse("invalid interpolation code".into())),
    }
}

fn write_instant<B: TBaseType>(instant: &TInstant<B>, w: &mut WkbWriter) {
    instant.value().write_wkb(w);
    w.write_i64(to_micros(&instant.timestamp()));
}

fn read_instant<B: TBaseType>(r: &mut WkbReader<'_>) -> Result<TInstant<B>, Error> {
    let value = B::read_wkb(r)?;
    let t = from_micros(r.read_i64()?);
    Ok(TInstant::new(value, t))
}

fn write_instant_list<B: TBaseType>(instants: &[TInstant<B>], w: &mut WkbWriter) {
    w.write_u32(instants.len() as u32);
    for instant in instants {
        write_instant(instant, w);
    }
}

fn read_instant_list<B: TBaseType>(r: &mut WkbReader<'_>) -> Result<Vec<TInstant<B>>, Error> {
    let n = r.read_u32()? as usize;
    let mut instants = Vec::with_capacity(n);
    for _ in 0..n {
        instants.push(read_instant(r)?);
    }
    Ok(instants)
}

impl<B: TBaseType> Temporal<B> {
    /// Serializes the value into its versioned binary frame: tag, flag
    /// word (subtype, interpolation), an optional length-prefixed
    /// bounding-box blob, and the packed instant payload. The cached box is
    /// recomputed on read, so the writer leaves the blob empty.
    pub fn as_wkb(&self) -> Vec<u8> {
        let mut w = WkbWriter::new();
        w.write_u16(TAG_TEMPORAL_BASE | temp_type_code(B::TEMP_TYPE));
        let subtype = match self {
            Temporal::Instant(_) => 0u16,
            Temporal::InstantSet(_) => 1,
            Temporal::Sequence(_) => 2,
            Temporal::SequenceSet(_) => 3,
        };
        let flags = subtype | interp_code(self.interpolation()) << 2;
        w.write_u16(flags);
        // No bounding-box blob; readers honor the flag byte either way.
        w.write_u8(0);
        match self {
            Temporal::Instant(i) => write_instant(i, &mut w),
            Temporal::InstantSet(s) => write_instant_list(s.instants(), &mut w),
            Temporal::Sequence(s) => {
                w.write_u8(bound_flags(s.is_lower_inclusive(), s.is_upper_inclusive()));
                write_instant_list(s.instants(), &mut w);
            }
            Temporal::SequenceSet(s) => {
                w.write_u32(s.num_sequences() as u32);
                for seq in s.sequences() {
                    w.write_u8(bound_flags(seq.is_lower_inclusive(), seq.is_upper_inclusive()));
                    write_instant_list(seq.instants(), &mut w);
                }
            }
        }
        w.into_bytes()
    }

    pub fn from_wkb(data: &[u8]) -> Result<Self, Error> {
        let mut r = WkbReader::new(data)?;
        let tag = r.read_u16()?;
        if tag != TAG_TEMPORAL_BASE | temp_type_code(B::TEMP_TYPE) {
            return Err(Error::TypeMismatch(
                "frame does not hold a temporal value of this type",
            ));
        }
        let flags = r.read_u16()?;
        let interp = interp_from_code((flags >> 2) & 0x3)?;
        if r.read_u8()? != 0 {
            // Skip the bounding-box blob; the cache is rebuilt below.
            let len = r.read_u32()? as usize;
            for _ in 0..len {
                r.read_u8()?;
            }
        }
        match flags & 0x3 {
            0 => Ok(Temporal::Instant(read_instant(&mut r)?)),
            1 => Ok(Temporal::InstantSet(TInstantSet::new(read_instant_list(
                &mut r,
            )?)?)),
            2 => {
                let bounds = r.read_u8()?;
                let instants = read_instant_list(&mut r)?;
                Ok(Temporal::Sequence(TSequence::make(
                    instants,
                    bounds & 1 != 0,
                    bounds & 2 != 0,
                    interp,
                    false,
                )?))
            }
            3 => {
                let nseq = r.read_u32()? as usize;
                let mut sequences = Vec::with_capacity(nseq);
                for _ in 0..nseq {
                    let bounds = r.read_u8()?;
                    let instants = read_instant_list(&mut r)?;
                    sequences.push(TSequence::make(
                        instants,
                        bounds & 1 != 0,
                        bounds & 2 != 0,
                        interp,
                        false,
                    )?);
                }
                Ok(Temporal::SequenceSet(TSequenceSet::make(sequences, false)?))
            }
            _ => unreachable!("two-bit subtype"),
        }
    }

    /// Uppercase hex of the binary frame, with no whitespace.
    pub fn as_hexwkb(&self) -> String {
        to_hex(&self.as_wkb())
    }

    pub fn from_hexwkb(s: &str) -> Result<Self, Error> {
        Self::from_wkb(&from_hex(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::number::{FloatSpan, FloatSpanSet, IntSpan};
    use crate::temporal::{TFloat, TInt, TText};

    #[test]
    fn span_round_trip() {
        let span: FloatSpan = "(1.5, 8]".parse().unwrap();
        assert_eq!(FloatSpan::from_wkb(&span.as_wkb()).unwrap(), span);
        let int_span: IntSpan = (1..9).into();
        assert_eq!(IntSpan::from_hexwkb(&int_span.as_hexwkb()).unwrap(), int_span);
    }

    #[test]
    fn hexwkb_is_uppercase_hex() {
        let span: FloatSpan = (1.0..2.0).into();
        let hex = span.as_hexwkb();
        assert!(hex.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_eq!(hex, hex.trim());
    }

    #[test]
    fn span_set_round_trip() {
        let set: FloatSpanSet = "{[1, 3), [5, 7]}".parse().unwrap();
        assert_eq!(FloatSpanSet::from_wkb(&set.as_wkb()).unwrap(), set);
    }

    #[test]
    fn box_round_trips() {
        let tbox: TBox = "TBOX XT([0, 10), [2020-06-01, 2020-06-05])".parse().unwrap();
        assert_eq!(TBox::from_wkb(&tbox.as_wkb()).unwrap(), tbox);
        let stbox: STBox = "SRID=4326;GEODSTBOX X(((1, 2), (3, 4)))".parse().unwrap();
        assert_eq!(STBox::from_hexwkb(&stbox.as_hexwkb()).unwrap(), stbox);
    }

    #[test]
    fn temporal_round_trips_every_subtype() {
        for text in [
            "1.5@2020-01-01",
            "{1@2020-01-01, 2@2020-01-02}",
            "[1@2020-01-01, 3@2020-01-03]",
            "Interp=Step;[1@2020-01-01, 3@2020-01-03)",
            "{[1@2020-01-01, 3@2020-01-03), [5@2020-01-05, 6@2020-01-06]}",
        ] {
            let t: TFloat = text.parse().unwrap();
            assert_eq!(TFloat::from_wkb(&t.as_wkb()).unwrap(), t, "{text}");
            assert_eq!(TFloat::from_hexwkb(&t.as_hexwkb()).unwrap(), t, "{text}");
        }
    }

    #[test]
    fn type_tags_are_checked() {
        let t: TInt = "1@2020-01-01".parse().unwrap();
        assert!(TFloat::from_wkb(&t.as_wkb()).is_err());
        let text: TText = "\"a\"@2020-01-01".parse().unwrap();
        assert_eq!(TText::from_wkb(&text.as_wkb()).unwrap(), text);
    }

    #[test]
    fn truncated_frames_are_rejected() {
        let t: TFloat = "[1@2020-01-01, 3@2020-01-03]".parse().unwrap();
        let wkb = t.as_wkb();
        assert!(TFloat::from_wkb(&wkb[..wkb.len() - 4]).is_err());
        assert!(TFloat::from_hexwkb("ZZZZ").is_err());
    }
}
