use bytes::Buf;
use num_bigint::BigInt;
use tracing::{debug, trace};

use crate::bigint::{from_magnitude_le, Sign};
use crate::compress::inflate;
use crate::constants::*;
use crate::error::{FormatError, Result};
use crate::term::Term;
use crate::text::{latin1_to_string, TextEncoding};
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Applied to `STRING_EXT` payloads. With `None`, or when the bytes do not decode,
    /// strings come back as lists of integers.
    pub encoding: Option<TextEncoding>,
    /// Deepest container nesting accepted before the input is rejected.
    pub max_depth: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            encoding: None,
            max_depth: 512,
        }
    }
}

impl DecoderConfig {
    pub fn with_encoding(mut self, encoding: Option<TextEncoding>) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Bounds checked cursor over the input.
struct Reader<'a> {
    total: usize,
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8], offset: usize) -> Result<Self> {
        if offset > buf.len() {
            return Err(FormatError::OutOfBounds {
                needed: offset,
                remaining: buf.len(),
            }
            .into());
        }
        Ok(Reader {
            total: buf.len(),
            rest: &buf[offset..],
        })
    }

    fn offset(&self) -> usize {
        self.total - self.rest.len()
    }

    fn remaining(&self) -> usize {
        self.rest.len()
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.rest.len() < n {
            return Err(FormatError::OutOfBounds {
                needed: n,
                remaining: self.rest.len(),
            }
            .into());
        }
        Ok(())
    }

    fn peek(&self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.rest[0])
    }

    fn u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.rest.get_u8())
    }

    fn u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.rest.get_u16())
    }

    fn u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.rest.get_u32())
    }

    fn i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.rest.get_i32())
    }

    fn f64(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.rest.get_f64())
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let (head, tail) = self.rest.split_at(n);
        self.rest = tail;
        Ok(head)
    }

    fn rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.rest)
    }
}

/// Parses external term format buffers into [`Term`]s.
///
/// The decoder holds only its configuration and can be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct TermDecoder {
    config: DecoderConfig,
}

impl TermDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes a buffer starting with the version byte. Bytes after the first term are ignored,
    /// use [`TermDecoder::decode_part`] to find out where the term ended.
    pub fn decode(&self, buf: &[u8]) -> Result<Term> {
        self.decode_prefix(buf).map(|(term, _)| term)
    }

    /// Like [`TermDecoder::decode`], also returning how many bytes of `buf`, version byte
    /// included, the term took up.
    pub fn decode_prefix(&self, buf: &[u8]) -> Result<(Term, usize)> {
        trace!(len = buf.len(), "decode");
        let version = *buf.first().ok_or(FormatError::Empty)?;
        if version != FORMAT_VERSION {
            return Err(FormatError::BadVersion {
                expected: FORMAT_VERSION,
                found: version,
            }
            .into());
        }
        self.decode_part(buf, 1)
            .inspect_err(|e| debug!(error = %e, "decode failed"))
    }

    /// Decodes the term whose tag byte sits at `offset`, returning it with the offset just
    /// past its encoding. A compressed term consumes the rest of the buffer.
    pub fn decode_part(&self, buf: &[u8], offset: usize) -> Result<(Term, usize)> {
        let mut r = Reader::new(buf, offset)?;
        let term = self.term(&mut r, 0)?;
        Ok((term, r.offset()))
    }

    fn term(&self, r: &mut Reader<'_>, depth: usize) -> Result<Term> {
        if depth > self.config.max_depth {
            return Err(FormatError::TooDeep(self.config.max_depth).into());
        }

        let tag = r.u8()?;
        let term = match tag {
            SMALL_INTEGER_EXT => Term::Integer(BigInt::from(r.u8()?)),
            INTEGER_EXT => Term::Integer(BigInt::from(r.i32()?)),
            FLOAT_EXT => Term::Float(legacy_float(r.bytes(31)?)?),
            NEW_FLOAT_EXT => Term::Float(r.f64()?),
            ATOM_EXT | SMALL_ATOM_EXT | ATOM_UTF8_EXT | SMALL_ATOM_UTF8_EXT => {
                convert_atom(atom_body(r, tag)?)
            }
            SMALL_TUPLE_EXT => {
                let arity = r.u8()? as usize;
                Term::Tuple(self.elements(r, arity, depth)?)
            }
            LARGE_TUPLE_EXT => {
                let arity = r.u32()? as usize;
                Term::Tuple(self.elements(r, arity, depth)?)
            }
            NIL_EXT => Term::nil(),
            STRING_EXT => {
                let len = r.u16()? as usize;
                self.string(r.bytes(len)?)
            }
            LIST_EXT => {
                let len = r.u32()? as usize;
                let elems = self.elements(r, len, depth)?;
                let tail = self.term(r, depth + 1)?;
                if !tail.is_nil() {
                    return Err(FormatError::NonEmptyTail.into());
                }
                Term::List(elems)
            }
            BINARY_EXT => {
                let len = r.u32()? as usize;
                Term::Binary(Binary(r.bytes(len)?.to_vec()))
            }
            SMALL_BIG_EXT => {
                let n = r.u8()? as usize;
                Term::Integer(bigint(r, n)?)
            }
            LARGE_BIG_EXT => {
                let n = r.u32()? as usize;
                Term::Integer(bigint(r, n)?)
            }
            REFERENCE_EXT => {
                let node = self.atom_field(r, depth, "REFERENCE_EXT")?;
                let id = r.u32()?;
                let creation = r.u8()? as u32;
                Term::Reference(Reference {
                    node,
                    id: vec![id],
                    creation,
                })
            }
            NEW_REFERENCE_EXT | NEWER_REFERENCE_EXT => {
                let (max, context) = if tag == NEW_REFERENCE_EXT {
                    (MAX_REFERENCE_WORDS, "NEW_REFERENCE_EXT")
                } else {
                    (MAX_NEWER_REFERENCE_WORDS, "NEWER_REFERENCE_EXT")
                };
                let count = r.u16()? as usize;
                if count == 0 || count > max {
                    return Err(FormatError::ReferenceWords { tag, count, max }.into());
                }
                let node = self.atom_field(r, depth, context)?;
                let creation = if tag == NEW_REFERENCE_EXT {
                    r.u8()? as u32
                } else {
                    r.u32()?
                };
                let id = (0..count).map(|_| r.u32()).collect::<Result<Vec<_>>>()?;
                Term::Reference(Reference { node, id, creation })
            }
            PORT_EXT | NEW_PORT_EXT => {
                let node = self.atom_field(r, depth, "PORT_EXT")?;
                let id = r.u32()?;
                let creation = if tag == PORT_EXT {
                    r.u8()? as u32
                } else {
                    r.u32()?
                };
                Term::Port(Port { node, id, creation })
            }
            PID_EXT | NEW_PID_EXT => {
                let node = self.atom_field(r, depth, "PID_EXT")?;
                let id = r.u32()?;
                let serial = r.u32()?;
                let creation = if tag == PID_EXT {
                    r.u8()? as u32
                } else {
                    r.u32()?
                };
                Term::Pid(Pid {
                    node,
                    id,
                    serial,
                    creation,
                })
            }
            EXPORT_EXT => {
                let module = self.atom_field(r, depth, "EXPORT_EXT")?;
                let function = self.atom_field(r, depth, "EXPORT_EXT")?;
                let found = r.u8()?;
                if found != SMALL_INTEGER_EXT {
                    return Err(FormatError::ExpectedSmallInteger {
                        context: "EXPORT_EXT",
                        found: tag_name(found).to_string(),
                    }
                    .into());
                }
                let arity = r.u8()?;
                Term::Export(Export {
                    module,
                    function,
                    arity,
                })
            }
            COMPRESSED => {
                if depth > 0 {
                    return Err(FormatError::NestedCompression.into());
                }
                let size = r.u32()? as usize;
                let inflated = inflate(r.rest(), size)?;
                let mut inner = Reader::new(&inflated, 0)?;
                if inner.peek()? == COMPRESSED {
                    return Err(FormatError::NestedCompression.into());
                }
                self.term(&mut inner, depth + 1)?
            }
            NEW_FUN_EXT | FUN_EXT | BIT_BINARY_EXT => {
                return Err(FormatError::UnsupportedTag(tag).into())
            }
            _ => return Err(FormatError::UnknownTag(tag).into()),
        };

        Ok(term)
    }

    fn elements(&self, r: &mut Reader<'_>, count: usize, depth: usize) -> Result<Vec<Term>> {
        // every element takes at least one byte, so the remaining input bounds the allocation
        let mut elems = Vec::with_capacity(count.min(r.remaining()));
        for _ in 0..count {
            elems.push(self.term(r, depth + 1)?);
        }
        Ok(elems)
    }

    fn string(&self, bytes: &[u8]) -> Term {
        self.config
            .encoding
            .and_then(|enc| enc.decode(bytes))
            .map(Term::String)
            .unwrap_or_else(|| Term::list(bytes.iter().map(|b| Term::from(*b))))
    }

    /// Node, module and function positions. Reserved names stay atoms here.
    fn atom_field(&self, r: &mut Reader<'_>, depth: usize, context: &'static str) -> Result<Atom> {
        let tag = r.peek()?;
        if matches!(
            tag,
            ATOM_EXT | SMALL_ATOM_EXT | ATOM_UTF8_EXT | SMALL_ATOM_UTF8_EXT
        ) {
            r.u8()?;
            return Ok(Atom(atom_body(r, tag)?));
        }
        let found = self.term(r, depth + 1)?;
        Err(FormatError::ExpectedAtom {
            context,
            found: found.to_string(),
        }
        .into())
    }
}

fn atom_body(r: &mut Reader<'_>, tag: u8) -> Result<String> {
    let len = match tag {
        ATOM_EXT | ATOM_UTF8_EXT => r.u16()? as usize,
        _ => r.u8()? as usize,
    };
    let name = r.bytes(len)?;
    match tag {
        ATOM_UTF8_EXT | SMALL_ATOM_UTF8_EXT => std::str::from_utf8(name)
            .map(str::to_owned)
            .map_err(|_| FormatError::InvalidUtf8Atom.into()),
        _ => Ok(latin1_to_string(name)),
    }
}

fn convert_atom(name: String) -> Term {
    match name.as_str() {
        "true" => Term::Bool(true),
        "false" => Term::Bool(false),
        "none" => Term::None,
        _ => Term::Atom(Atom(name)),
    }
}

fn bigint(r: &mut Reader<'_>, n: usize) -> Result<BigInt> {
    let sign = Sign::from(r.u8()?);
    Ok(from_magnitude_le(sign, r.bytes(n)?))
}

// "%.20e" padded with NULs
fn legacy_float(raw: &[u8]) -> Result<f64> {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    let text = String::from_utf8_lossy(&raw[..end]);
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(FormatError::InvalidFloat(text.to_string()).into()),
    }
}
