use std::fmt;

use bytes::BufMut;

use crate::constants::*;
use crate::error::{Error, FormatError, Result};
use crate::Encode;

///
/// 1	2	Len
/// 100	Len	AtomName
///
/// Names made only of Latin-1 characters go out as `ATOM_EXT`, anything else as `ATOM_UTF8_EXT`.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(pub String);

impl Atom {
    pub fn new(name: impl Into<String>) -> Self {
        Atom(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Encode for Atom {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let latin1 = self.0.chars().all(|c| u32::from(c) <= 0xff);
        let (tag, len) = if latin1 {
            (ATOM_EXT, self.0.chars().count())
        } else {
            (ATOM_UTF8_EXT, self.0.len())
        };
        if len > MAX_ATOM_LEN {
            return Err(FormatError::FieldTooLarge {
                kind: "atom",
                len,
                max: MAX_ATOM_LEN,
            }
            .into());
        }
        buf.put_u8(tag);
        buf.put_u16(len as u16);
        if latin1 {
            self.0.chars().for_each(|c| buf.put_u8(u32::from(c) as u8));
        } else {
            buf.put_slice(self.0.as_bytes());
        }
        Ok(())
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom(value.to_string())
    }
}

impl From<String> for Atom {
    fn from(value: String) -> Self {
        Atom(value)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

///
/// 1	4	Len
/// 109	Len	Data
///
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Binary(pub Vec<u8>);

impl Binary {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Encode for Binary {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        encode_binary(&self.0, buf)
    }
}

pub(crate) fn encode_binary<B: BufMut>(data: &[u8], buf: &mut B) -> Result<()> {
    if data.len() > MAX_BINARY_LEN {
        return Err(FormatError::FieldTooLarge {
            kind: "binary",
            len: data.len(),
            max: MAX_BINARY_LEN,
        }
        .into());
    }
    buf.put_u8(BINARY_EXT);
    buf.put_u32(data.len() as u32);
    buf.put_slice(data);
    Ok(())
}

impl From<Vec<u8>> for Binary {
    fn from(value: Vec<u8>) -> Self {
        Binary(value)
    }
}

impl From<&[u8]> for Binary {
    fn from(value: &[u8]) -> Self {
        Binary(value.to_vec())
    }
}

///
/// 1	N	    4	4	    1
/// 103	Node	ID	Serial	Creation
///
/// 1	N	    4	4	    4
/// 88	Node	ID	Serial	Creation
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pid {
    pub node: Atom,
    pub id: u32,
    pub serial: u32,
    pub creation: u32,
}

impl Encode for Pid {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let legacy = self.creation <= u8::MAX as u32;
        buf.put_u8(if legacy { PID_EXT } else { NEW_PID_EXT });
        self.node.encode(buf)?;
        buf.put_u32(self.id);
        buf.put_u32(self.serial);
        put_creation(buf, self.creation, legacy);
        Ok(())
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#Pid<{}.{}.{}>", self.node, self.id, self.serial)
    }
}

///
/// 1	N	 4	1
/// 102	Node ID	Creation
///
/// 1	N	    4	 4
/// 89	Node    ID	 Creation
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Port {
    pub node: Atom,
    pub id: u32,
    pub creation: u32,
}

impl Encode for Port {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let legacy = self.creation <= u8::MAX as u32;
        buf.put_u8(if legacy { PORT_EXT } else { NEW_PORT_EXT });
        self.node.encode(buf)?;
        buf.put_u32(self.id);
        put_creation(buf, self.creation, legacy);
        Ok(())
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#Port<{}.{}>", self.node, self.id)
    }
}

///
/// 1	2	N	    1	        N'
/// 114	Len	Node	Creation	ID ...
///
/// 1	2	N	    4	        N'
/// 90	Len	Node	Creation	ID ...
///
/// `REFERENCE_EXT` (a single id word) is accepted on decode only.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub node: Atom,
    pub id: Vec<u32>,
    pub creation: u32,
}

impl Encode for Reference {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        if self.id.is_empty() || self.id.len() > MAX_NEWER_REFERENCE_WORDS {
            return Err(Error::unsupported(self));
        }
        let legacy = self.creation <= u8::MAX as u32 && self.id.len() <= MAX_REFERENCE_WORDS;
        buf.put_u8(if legacy {
            NEW_REFERENCE_EXT
        } else {
            NEWER_REFERENCE_EXT
        });
        buf.put_u16(self.id.len() as u16);
        self.node.encode(buf)?;
        put_creation(buf, self.creation, legacy);
        self.id.iter().for_each(|w| buf.put_u32(*w));
        Ok(())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#Ref<{}", self.node)?;
        for w in &self.id {
            write!(f, ".{}", w)?;
        }
        f.write_str(">")
    }
}

///
/// 1	N1	    N2	        N3
/// 113	Module	Function	Arity
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Export {
    pub module: Atom,
    pub function: Atom,
    pub arity: u8,
}

impl Encode for Export {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        buf.put_u8(EXPORT_EXT);
        self.module.encode(buf)?;
        self.function.encode(buf)?;
        buf.put_u8(SMALL_INTEGER_EXT);
        buf.put_u8(self.arity);
        Ok(())
    }
}

impl fmt::Display for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fun {}:{}/{}", self.module, self.function, self.arity)
    }
}

fn put_creation<B: BufMut>(buf: &mut B, creation: u32, legacy: bool) {
    if legacy {
        buf.put_u8(creation as u8);
    } else {
        buf.put_u32(creation);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn bytes_of<T: Encode>(t: &T) -> Vec<u8> {
        let mut buf: Vec<u8> = vec![];
        t.encode(&mut buf).unwrap();
        buf
    }

    #[test]
    fn atom() {
        assert_eq!(bytes_of(&Atom::new("ok")), vec![100, 0, 2, b'o', b'k']);
        // latin-1 names are written one byte per char
        assert_eq!(bytes_of(&Atom::new("é")), vec![100, 0, 1, 233]);
        assert_eq!(
            bytes_of(&Atom::new("λ")),
            vec![118, 0, 2, 0xce, 0xbb]
        );

        let long = Atom::new("a".repeat(MAX_ATOM_LEN + 1));
        let err = long.encode(&mut Vec::<u8>::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::FieldTooLarge { kind: "atom", .. })
        ));
    }

    #[test]
    fn pid() {
        let pid = Pid {
            node: Atom::new("a@b"),
            id: 11,
            serial: 12,
            creation: 3,
        };
        assert_eq!(
            bytes_of(&pid),
            vec![103, 100, 0, 3, 97, 64, 98, 0, 0, 0, 11, 0, 0, 0, 12, 3]
        );

        let pid = Pid {
            creation: 0x0100_0000,
            ..pid
        };
        assert_eq!(
            bytes_of(&pid),
            vec![88, 100, 0, 3, 97, 64, 98, 0, 0, 0, 11, 0, 0, 0, 12, 1, 0, 0, 0]
        );
    }

    #[test]
    fn port() {
        let port = Port {
            node: Atom::new("n"),
            id: 7,
            creation: 1,
        };
        assert_eq!(bytes_of(&port), vec![102, 100, 0, 1, b'n', 0, 0, 0, 7, 1]);
        assert_eq!(port.to_string(), "#Port<n.7>");
    }

    #[test]
    fn reference() {
        let r = Reference {
            node: Atom::new("n"),
            id: vec![1, 2, 3],
            creation: 2,
        };
        assert_eq!(
            bytes_of(&r),
            vec![114, 0, 3, 100, 0, 1, b'n', 2, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3]
        );
        assert_eq!(r.to_string(), "#Ref<n.1.2.3>");

        let r = Reference {
            id: vec![1, 2, 3, 4, 5],
            ..r
        };
        assert_eq!(bytes_of(&r)[0], NEWER_REFERENCE_EXT);

        let empty = Reference {
            id: vec![],
            ..r
        };
        assert!(matches!(
            empty.encode(&mut Vec::<u8>::new()),
            Err(Error::UnsupportedValue(_))
        ));
    }

    #[test]
    fn export() {
        let e = Export {
            module: Atom::new("lists"),
            function: Atom::new("map"),
            arity: 2,
        };
        let mut expect = vec![113, 100, 0, 5];
        expect.extend_from_slice(b"lists");
        expect.extend_from_slice(&[100, 0, 3]);
        expect.extend_from_slice(b"map");
        expect.extend_from_slice(&[97, 2]);
        assert_eq!(bytes_of(&e), expect);
        assert_eq!(e.to_string(), "fun lists:map/2");
    }
}
