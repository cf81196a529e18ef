//! Erlang external term format codec.
//!
//! ```
//! use etf::{decode, encode, Term};
//!
//! let t = Term::tuple([Term::atom("ok"), Term::from(42)]);
//! let bytes = encode(&t).unwrap();
//! assert_eq!(bytes, b"\x83h\x02d\x00\x02oka*");
//! assert_eq!(decode(&bytes).unwrap(), t);
//! ```

pub mod bigint;
pub mod compress;
pub mod constants;
pub mod de;
pub mod decode;
pub mod encode;
mod error;
pub mod ser;
pub mod term;
pub mod text;
pub mod types;

pub use compress::Compression;
pub use de::{from_term, Deserializer};
pub use decode::{DecoderConfig, TermDecoder};
pub use encode::{EncoderConfig, TermEncoder};
pub use error::{Error, ErrorKind, FormatError, Result};
pub use ser::{to_term, Serializer};
pub use term::Term;
pub use text::{TextEncoding, UnicodeType};
pub use types::{Atom, Binary, Export, Pid, Port, Reference};

/// Writes the wire form of a value, without the version byte.
pub trait Encode {
    fn encode<B: bytes::BufMut>(&self, buf: &mut B) -> Result<()>;
}

impl Encode for Term {
    fn encode<B: bytes::BufMut>(&self, buf: &mut B) -> Result<()> {
        TermEncoder::default().encode_part(self, buf)
    }
}

pub fn encode(term: &Term) -> Result<Vec<u8>> {
    TermEncoder::default().encode(term)
}

pub fn encode_compressed(term: &Term, compression: impl Into<Compression>) -> Result<Vec<u8>> {
    TermEncoder::default().encode_with(term, compression)
}

pub fn decode(buf: &[u8]) -> Result<Term> {
    TermDecoder::default().decode(buf)
}

#[cfg(test)]
mod test {
    use num_bigint::BigInt;

    use super::*;

    fn roundtrip(t: Term) {
        let enc = encode(&t).unwrap();
        assert_eq!(decode(&enc).unwrap(), t, "{:?}", enc);
        let packed = encode_compressed(&t, true).unwrap();
        assert_eq!(decode(&packed).unwrap(), t);
    }

    fn node() -> Atom {
        Atom::new("erl@localhost")
    }

    #[test]
    fn roundtrip_scalars() {
        roundtrip(Term::Bool(true));
        roundtrip(Term::Bool(false));
        roundtrip(Term::None);
        for n in [0_i64, 255, 256, -1, 2147483647, 2147483648, -2147483648, -2147483649] {
            roundtrip(Term::from(n));
        }
        roundtrip(Term::Integer(BigInt::from(3).pow(190)));
        roundtrip(Term::Integer(-(BigInt::from(1) << 300_usize)));
        roundtrip(Term::Integer(BigInt::from(7) << 4000_usize));
        for v in [0.0, -0.0, -12.75, 1e-300, 5e-324, 1.7976931348623157e308] {
            roundtrip(Term::Float(v));
        }
    }

    #[test]
    fn roundtrip_atoms_and_binaries() {
        roundtrip(Term::atom("ok"));
        roundtrip(Term::atom(""));
        roundtrip(Term::atom("Ωmega"));
        roundtrip(Term::Binary(Binary::default()));
        roundtrip(Term::Binary(Binary((0..70000).map(|i| i as u8).collect())));
    }

    #[test]
    fn roundtrip_containers() {
        roundtrip(Term::nil());
        roundtrip(Term::tuple([]));
        roundtrip(Term::list([Term::tuple([Term::list([
            Term::from(1),
            Term::atom("a"),
        ])])]));
        roundtrip(Term::tuple((0..300).map(Term::from)));
        roundtrip(Term::list((0..1000).map(|i| Term::from(i % 7))));
    }

    #[test]
    fn roundtrip_identifiers() {
        roundtrip(Term::Pid(Pid {
            node: node(),
            id: 38,
            serial: 0,
            creation: 3,
        }));
        roundtrip(Term::Pid(Pid {
            node: node(),
            id: u32::MAX,
            serial: 7,
            creation: 1_700_000_000,
        }));
        roundtrip(Term::Port(Port {
            node: node(),
            id: 5,
            creation: 1,
        }));
        roundtrip(Term::Reference(Reference {
            node: node(),
            id: vec![1, 2, 3],
            creation: 1,
        }));
        roundtrip(Term::Reference(Reference {
            node: node(),
            id: vec![4],
            creation: 0,
        }));
        roundtrip(Term::Reference(Reference {
            node: node(),
            id: vec![1, 2, 3, 4, 5],
            creation: 77,
        }));
        roundtrip(Term::Export(Export {
            module: Atom::new("lists"),
            function: Atom::new("reverse"),
            arity: 1,
        }));
    }

    #[test]
    fn term_encode_trait() {
        let mut buf: Vec<u8> = vec![];
        Term::atom("ok").encode(&mut buf).unwrap();
        assert_eq!(buf, vec![100, 0, 2, b'o', b'k']);
    }

    #[test]
    fn shared_between_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TermDecoder>();
        assert_send_sync::<TermEncoder>();

        let dec = TermDecoder::default();
        let enc = TermEncoder::default();
        std::thread::scope(|s| {
            for i in 0..4 {
                let (dec, enc) = (&dec, &enc);
                s.spawn(move || {
                    let t = Term::tuple([Term::from(i), Term::atom("w")]);
                    assert_eq!(dec.decode(&enc.encode(&t).unwrap()).unwrap(), t);
                });
            }
        });
    }
}
