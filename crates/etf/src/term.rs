use std::fmt;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::error::Error;
use crate::types::*;

/// A decoded term, or a term about to be encoded.
///
/// `Bool` and `None` travel as the atoms `true`, `false` and `none`. Decoding any of those
/// three atoms yields `Bool`/`None`, so `Term::Atom(Atom::new("true"))` comes back as
/// `Term::Bool(true)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Bool(bool),
    None,
    Integer(BigInt),
    Float(f64),
    Atom(Atom),
    Binary(Binary),
    String(String),
    List(Vec<Term>),
    Tuple(Vec<Term>),
    Pid(Pid),
    Port(Port),
    Reference(Reference),
    Export(Export),
}

impl Term {
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(Atom(name.into()))
    }

    pub fn tuple<I: IntoIterator<Item = Term>>(elems: I) -> Self {
        Term::Tuple(elems.into_iter().collect())
    }

    pub fn list<I: IntoIterator<Item = Term>>(elems: I) -> Self {
        Term::List(elems.into_iter().collect())
    }

    pub fn nil() -> Self {
        Term::List(vec![])
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Term::List(v) if v.is_empty())
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Term::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<&BigInt> {
        match self {
            Term::Integer(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_integer().and_then(ToPrimitive::to_i64)
    }

    pub fn as_tuple(&self) -> Option<&[Term]> {
        match self {
            Term::Tuple(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Term]> {
        match self {
            Term::List(v) => Some(v),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Term::Bool(_) => "boolean",
            Term::None => "none",
            Term::Integer(_) => "integer",
            Term::Float(_) => "float",
            Term::Atom(_) => "atom",
            Term::Binary(_) => "binary",
            Term::String(_) => "string",
            Term::List(_) => "list",
            Term::Tuple(_) => "tuple",
            Term::Pid(_) => "pid",
            Term::Port(_) => "port",
            Term::Reference(_) => "reference",
            Term::Export(_) => "export",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, elems: &[Term]) -> fmt::Result {
            for (i, e) in elems.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", e)?;
            }
            Ok(())
        }

        match self {
            Term::Bool(b) => write!(f, "{}", b),
            Term::None => f.write_str("none"),
            Term::Integer(n) => write!(f, "{}", n),
            Term::Float(v) => write!(f, "{:?}", v),
            Term::Atom(a) => write!(f, "{}", a),
            Term::Binary(b) => write!(f, "<<{:?}>>", b.0),
            Term::String(s) => write!(f, "{:?}", s),
            Term::List(v) => {
                f.write_str("[")?;
                join(f, v)?;
                f.write_str("]")
            }
            Term::Tuple(v) => {
                f.write_str("{")?;
                join(f, v)?;
                f.write_str("}")
            }
            Term::Pid(v) => write!(f, "{}", v),
            Term::Port(v) => write!(f, "{}", v),
            Term::Reference(v) => write!(f, "{}", v),
            Term::Export(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! impl_from_into_term {
    ($($t:ident),+) => {
        $(
            impl From<$t> for Term {
                fn from(value: $t) -> Self {
                    Term::$t(value)
                }
            }

            impl TryFrom<Term> for $t {
                type Error = Error;

                fn try_from(value: Term) -> Result<Self, Self::Error> {
                    if let Term::$t(v) = value {
                        Ok(v)
                    } else {
                        Err(Error::Conversion(stringify!($t)))
                    }
                }
            }

            impl TryFrom<&Term> for $t {
                type Error = Error;

                fn try_from(value: &Term) -> Result<Self, Self::Error> {
                    if let Term::$t(v) = value {
                        Ok(v.clone())
                    } else {
                        Err(Error::Conversion(stringify!($t)))
                    }
                }
            }
        )*
    };
}

impl_from_into_term!(Atom, Binary, Pid, Port, Reference, Export);

macro_rules! impl_from_int {
    ($($t:ty),+) => {
        $(
            impl From<$t> for Term {
                fn from(value: $t) -> Self {
                    Term::Integer(BigInt::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl From<BigInt> for Term {
    fn from(value: BigInt) -> Self {
        Term::Integer(value)
    }
}

impl From<bool> for Term {
    fn from(value: bool) -> Self {
        Term::Bool(value)
    }
}

impl From<f64> for Term {
    fn from(value: f64) -> Self {
        Term::Float(value)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::String(value.to_string())
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Term::String(value)
    }
}

impl From<Vec<Term>> for Term {
    fn from(value: Vec<Term>) -> Self {
        Term::List(value)
    }
}

impl<T: Into<Term>> From<Option<T>> for Term {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Term::None)
    }
}

impl TryFrom<Term> for BigInt {
    type Error = Error;

    fn try_from(value: Term) -> Result<Self, Self::Error> {
        match value {
            Term::Integer(n) => Ok(n),
            _ => Err(Error::Conversion("BigInt")),
        }
    }
}

impl TryFrom<&Term> for i64 {
    type Error = Error;

    fn try_from(value: &Term) -> Result<Self, Self::Error> {
        value.as_i64().ok_or(Error::Conversion("i64"))
    }
}

impl TryFrom<&Term> for bool {
    type Error = Error;

    fn try_from(value: &Term) -> Result<Self, Self::Error> {
        match value {
            Term::Bool(b) => Ok(*b),
            _ => Err(Error::Conversion("bool")),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conversions() {
        let pid = Pid {
            node: Atom::new("nonode@nohost"),
            id: 1,
            serial: 0,
            creation: 0,
        };
        let t = Term::from(pid.clone());
        assert_eq!(Pid::try_from(&t).unwrap(), pid);
        assert!(matches!(Port::try_from(t), Err(Error::Conversion("Port"))));

        assert_eq!(Term::from(42_u8), Term::Integer(BigInt::from(42)));
        assert_eq!(Term::from(None::<i32>), Term::None);
        assert_eq!(i64::try_from(&Term::from(-7_i32)).unwrap(), -7);
        assert!(bool::try_from(&Term::atom("true")).is_err());
    }

    #[test]
    fn nil() {
        assert!(Term::nil().is_nil());
        assert!(Term::list([]).is_nil());
        assert!(!Term::tuple([]).is_nil());
        assert!(!Term::list([Term::from(1)]).is_nil());
    }

    #[test]
    fn display() {
        let t = Term::tuple([
            Term::atom("ok"),
            Term::list([Term::from(1), Term::from(2.5)]),
            Term::from("hi"),
        ]);
        assert_eq!(t.to_string(), "{ok,[1,2.5],\"hi\"}");
    }
}
