use bytes::BufMut;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use tracing::trace;

use crate::bigint::magnitude_le;
use crate::compress::{deflate, Compression};
use crate::constants::*;
use crate::error::{Error, FormatError, Result};
use crate::term::Term;
use crate::text::{TextEncoding, UnicodeType};
use crate::types::encode_binary;
use crate::Encode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// With `None`, text goes out as a list of code points.
    pub encoding: Option<TextEncoding>,
    pub unicode_type: UnicodeType,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            encoding: Some(TextEncoding::Utf8),
            unicode_type: UnicodeType::Binary,
        }
    }
}

impl EncoderConfig {
    pub fn with_encoding(mut self, encoding: Option<TextEncoding>) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_unicode_type(mut self, unicode_type: UnicodeType) -> Self {
        self.unicode_type = unicode_type;
        self
    }
}

/// Serializes [`Term`]s into external term format buffers.
#[derive(Debug, Clone, Default)]
pub struct TermEncoder {
    config: EncoderConfig,
}

impl TermEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn encode(&self, term: &Term) -> Result<Vec<u8>> {
        self.encode_with(term, Compression::None)
    }

    /// Encodes `term`, wrapping it in a zlib stream when that makes the output smaller.
    pub fn encode_with(&self, term: &Term, compression: impl Into<Compression>) -> Result<Vec<u8>> {
        let compression = compression.into();
        if let Compression::Level(level) = compression {
            Compression::level(level)?;
        }

        let mut buf = Vec::with_capacity(64);
        buf.put_u8(FORMAT_VERSION);
        self.encode_part(term, &mut buf)?;

        let Compression::Level(level) = compression else {
            trace!(len = buf.len(), "encode");
            return Ok(buf);
        };

        let payload = &buf[1..];
        let size = u32::try_from(payload.len()).map_err(|_| FormatError::FieldTooLarge {
            kind: "compressed term",
            len: payload.len(),
            max: u32::MAX as usize,
        })?;
        let z = deflate(payload, level)?;
        if 1 + 1 + 4 + z.len() >= buf.len() {
            trace!(len = buf.len(), zlib = z.len(), "encode, compression dropped");
            return Ok(buf);
        }

        let mut out = Vec::with_capacity(1 + 1 + 4 + z.len());
        out.put_u8(FORMAT_VERSION);
        out.put_u8(COMPRESSED);
        out.put_u32(size);
        out.put_slice(&z);
        trace!(len = out.len(), uncompressed = buf.len(), "encode, compressed");
        Ok(out)
    }

    /// Writes `term` without the version byte.
    pub fn encode_part<B: BufMut>(&self, term: &Term, buf: &mut B) -> Result<()> {
        match term {
            Term::Bool(true) => put_atom_ext(buf, "true"),
            Term::Bool(false) => put_atom_ext(buf, "false"),
            Term::None => put_atom_ext(buf, "none"),
            Term::Integer(n) => put_integer(buf, n)?,
            Term::Float(v) => {
                if !v.is_finite() {
                    return Err(Error::unsupported(term));
                }
                buf.put_u8(NEW_FLOAT_EXT);
                buf.put_f64(*v);
            }
            Term::Atom(v) => v.encode(buf)?,
            Term::Binary(v) => v.encode(buf)?,
            Term::String(s) => self.put_text(buf, s)?,
            Term::List(elems) => {
                if elems.is_empty() {
                    buf.put_u8(NIL_EXT);
                    return Ok(());
                }
                buf.put_u8(LIST_EXT);
                buf.put_u32(count(elems.len(), "list")?);
                for e in elems {
                    self.encode_part(e, buf)?;
                }
                buf.put_u8(NIL_EXT);
            }
            Term::Tuple(elems) => {
                if elems.len() <= u8::MAX as usize {
                    buf.put_u8(SMALL_TUPLE_EXT);
                    buf.put_u8(elems.len() as u8);
                } else {
                    buf.put_u8(LARGE_TUPLE_EXT);
                    buf.put_u32(count(elems.len(), "tuple")?);
                }
                for e in elems {
                    self.encode_part(e, buf)?;
                }
            }
            Term::Pid(v) => v.encode(buf)?,
            Term::Port(v) => v.encode(buf)?,
            Term::Reference(v) => v.encode(buf)?,
            Term::Export(v) => v.encode(buf)?,
        }
        Ok(())
    }

    fn put_text<B: BufMut>(&self, buf: &mut B, s: &str) -> Result<()> {
        let Some(encoding) = self.config.encoding else {
            let chars = s.chars().count();
            if chars == 0 {
                buf.put_u8(NIL_EXT);
                return Ok(());
            }
            buf.put_u8(LIST_EXT);
            buf.put_u32(count(chars, "string")?);
            for c in s.chars() {
                put_integer(buf, &BigInt::from(u32::from(c)))?;
            }
            buf.put_u8(NIL_EXT);
            return Ok(());
        };

        let bytes = encoding.encode(s)?;
        match self.config.unicode_type {
            UnicodeType::Binary => encode_binary(&bytes, buf),
            UnicodeType::Str => {
                if bytes.len() > MAX_STRING_EXT_LEN {
                    return Err(FormatError::FieldTooLarge {
                        kind: "string",
                        len: bytes.len(),
                        max: MAX_STRING_EXT_LEN,
                    }
                    .into());
                }
                buf.put_u8(STRING_EXT);
                buf.put_u16(bytes.len() as u16);
                buf.put_slice(&bytes);
                Ok(())
            }
        }
    }
}

fn put_atom_ext<B: BufMut>(buf: &mut B, name: &str) {
    buf.put_u8(ATOM_EXT);
    buf.put_u16(name.len() as u16);
    buf.put_slice(name.as_bytes());
}

fn put_integer<B: BufMut>(buf: &mut B, n: &BigInt) -> Result<()> {
    if let Some(v) = n.to_u8() {
        buf.put_u8(SMALL_INTEGER_EXT);
        buf.put_u8(v);
        return Ok(());
    }
    if let Some(v) = n.to_i32() {
        buf.put_u8(INTEGER_EXT);
        buf.put_i32(v);
        return Ok(());
    }

    let (sign, digits) = magnitude_le(n);
    if digits.len() <= u8::MAX as usize {
        buf.put_u8(SMALL_BIG_EXT);
        buf.put_u8(digits.len() as u8);
    } else {
        buf.put_u8(LARGE_BIG_EXT);
        buf.put_u32(count(digits.len(), "integer")?);
    }
    buf.put_u8(sign.into());
    buf.put_slice(&digits);
    Ok(())
}

fn count(len: usize, kind: &'static str) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        FormatError::FieldTooLarge {
            kind,
            len,
            max: u32::MAX as usize,
        }
        .into()
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decode::TermDecoder;
    use crate::types::*;
    use crate::ErrorKind;

    fn encode(t: &Term) -> Vec<u8> {
        TermEncoder::default().encode(t).unwrap()
    }

    #[test]
    fn ok_tuple() {
        let t = Term::tuple([Term::atom("ok"), Term::from(42)]);
        assert_eq!(encode(&t), b"\x83h\x02d\x00\x02oka*".to_vec());
    }

    #[test]
    fn integer_boundaries() {
        assert_eq!(encode(&Term::from(0)), vec![131, 97, 0]);
        assert_eq!(encode(&Term::from(255)), vec![131, 97, 255]);
        assert_eq!(encode(&Term::from(256)), vec![131, 98, 0, 0, 1, 0]);
        assert_eq!(encode(&Term::from(-1)), vec![131, 98, 255, 255, 255, 255]);
        assert_eq!(
            encode(&Term::from(2147483647)),
            vec![131, 98, 127, 255, 255, 255]
        );
        assert_eq!(
            encode(&Term::from(2147483648_i64)),
            vec![131, 110, 4, 0, 0, 0, 0, 128]
        );
        assert_eq!(
            encode(&Term::from(-2147483649_i64)),
            vec![131, 110, 4, 1, 1, 0, 0, 128]
        );
    }

    #[test]
    fn large_big() {
        // 255 magnitude bytes still fit SMALL_BIG_EXT, 256 need LARGE_BIG_EXT
        let n = (BigInt::from(1) << (255 * 8_usize)) - 1;
        let buf = encode(&Term::Integer(n));
        assert_eq!(&buf[..4], &[131, 110, 255, 0]);
        assert_eq!(buf.len(), 4 + 255);

        let n = BigInt::from(1) << (255 * 8_usize);
        let buf = encode(&Term::Integer(-n));
        assert_eq!(&buf[..7], &[131, 111, 0, 0, 1, 0, 1]);
        assert_eq!(buf.len(), 7 + 256);
    }

    #[test]
    fn tuple_boundaries() {
        let small = Term::tuple(std::iter::repeat(Term::nil()).take(255));
        assert_eq!(&encode(&small)[..3], &[131, 104, 255]);
        let large = Term::tuple(std::iter::repeat(Term::nil()).take(256));
        assert_eq!(&encode(&large)[..6], &[131, 105, 0, 0, 1, 0]);
    }

    #[test]
    fn reserved_atoms() {
        assert_eq!(encode(&Term::Bool(true)), b"\x83d\x00\x04true".to_vec());
        assert_eq!(encode(&Term::Bool(false)), b"\x83d\x00\x05false".to_vec());
        assert_eq!(encode(&Term::None), b"\x83d\x00\x04none".to_vec());
        // an atom spelled like a boolean is the same bytes on the wire
        assert_eq!(encode(&Term::atom("true")), encode(&Term::Bool(true)));
    }

    #[test]
    fn floats() {
        assert_eq!(
            encode(&Term::Float(std::f64::consts::PI)),
            vec![131, 70, 64, 9, 33, 251, 84, 68, 45, 24]
        );
        let err = TermEncoder::default()
            .encode(&Term::Float(f64::NAN))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn lists() {
        assert_eq!(encode(&Term::nil()), vec![131, 106]);
        assert_eq!(
            encode(&Term::list([Term::from(1), Term::from(2)])),
            vec![131, 108, 0, 0, 0, 2, 97, 1, 97, 2, 106]
        );
    }

    #[test]
    fn text() {
        let t = Term::from("hé");

        assert_eq!(encode(&t), vec![131, 109, 0, 0, 0, 3, b'h', 0xc3, 0xa9]);

        let str_enc =
            TermEncoder::new(EncoderConfig::default().with_unicode_type(UnicodeType::Str));
        assert_eq!(
            str_enc.encode(&t).unwrap(),
            vec![131, 107, 0, 3, b'h', 0xc3, 0xa9]
        );

        let latin1 = TermEncoder::new(
            EncoderConfig::default()
                .with_encoding(Some(TextEncoding::Latin1))
                .with_unicode_type(UnicodeType::Str),
        );
        assert_eq!(latin1.encode(&t).unwrap(), vec![131, 107, 0, 2, b'h', 0xe9]);

        let codepoints = TermEncoder::new(EncoderConfig::default().with_encoding(None));
        assert_eq!(
            codepoints.encode(&Term::from("hλ")).unwrap(),
            vec![131, 108, 0, 0, 0, 2, 97, 104, 98, 0, 0, 3, 187, 106]
        );
        assert_eq!(codepoints.encode(&Term::from("")).unwrap(), vec![131, 106]);

        let long = Term::String("x".repeat(MAX_STRING_EXT_LEN + 1));
        assert!(matches!(
            str_enc.encode(&long),
            Err(Error::Format(FormatError::FieldTooLarge { kind: "string", .. }))
        ));
    }

    #[test]
    fn compression() {
        let enc = TermEncoder::default();
        let big = Term::list(std::iter::repeat(Term::atom("hello")).take(1000));
        let plain = enc.encode(&big).unwrap();
        let packed = enc.encode_with(&big, true).unwrap();
        assert_eq!(&packed[..2], &[131, 80]);
        assert_eq!(
            u32::from_be_bytes([packed[2], packed[3], packed[4], packed[5]]) as usize,
            plain.len() - 1
        );
        assert!(packed.len() < plain.len());
        assert_eq!(TermDecoder::default().decode(&packed).unwrap(), big);

        // the zlib header alone outweighs a tiny term
        let small = Term::from(1);
        assert_eq!(
            enc.encode_with(&small, Compression::Level(9)).unwrap(),
            enc.encode(&small).unwrap()
        );
        assert_eq!(enc.encode_with(&big, false).unwrap(), plain);
    }

    #[test]
    fn bad_compression_level() {
        let err = TermEncoder::default()
            .encode_with(&Term::from(1), Compression::Level(10))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn identifiers_inline_atoms() {
        let r = Term::Reference(Reference {
            node: Atom::new("n"),
            id: vec![1],
            creation: 0,
        });
        assert_eq!(
            encode(&r),
            vec![131, 114, 0, 1, 100, 0, 1, b'n', 0, 0, 0, 0, 1]
        );
    }
}
