use std::fmt::Display;

use serde::{de, ser};

use crate::constants::tag_name;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// The value has no wire representation.
    #[error("unable to serialize {0}")]
    UnsupportedValue(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cannot convert term into {0}")]
    Conversion(&'static str),

    #[error("{0}")]
    Serde(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    UnsupportedValue,
    Configuration,
    Conversion,
    Serde,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Format(_) => ErrorKind::Format,
            Error::UnsupportedValue(_) => ErrorKind::UnsupportedValue,
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Conversion(_) => ErrorKind::Conversion,
            Error::Serde(_) => ErrorKind::Serde,
        }
    }

    pub fn unsupported<T: std::fmt::Debug + ?Sized>(value: &T) -> Self {
        Error::UnsupportedValue(format!("{:?}", value))
    }
}

/// Malformed or unrecognized input, and values too large for their length field.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("bad version number, expected {expected} found {found}")]
    BadVersion { expected: u8, found: u8 },

    #[error("empty buffer")]
    Empty,

    #[error("unknown term type {0}")]
    UnknownTag(u8),

    #[error("unsupported term type {}", tag_name(*.0))]
    UnsupportedTag(u8),

    #[error("out of bounds: needed {needed} bytes, {remaining} remaining")]
    OutOfBounds { needed: usize, remaining: usize },

    #[error("expected atom while parsing {context}, found {found}")]
    ExpectedAtom {
        context: &'static str,
        found: String,
    },

    #[error("expected small integer while parsing {context}, found {found}")]
    ExpectedSmallInteger {
        context: &'static str,
        found: String,
    },

    #[error("lists with non empty tails are not supported")]
    NonEmptyTail,

    #[error("invalid float string {0:?}")]
    InvalidFloat(String),

    #[error("atom is not valid utf-8")]
    InvalidUtf8Atom,

    #[error("term nesting exceeds {0} levels")]
    TooDeep(usize),

    #[error("{kind} of {len} bytes exceeds the limit of {max}")]
    FieldTooLarge {
        kind: &'static str,
        len: usize,
        max: usize,
    },

    #[error("zlib: {0}")]
    Zlib(#[source] std::io::Error),

    #[error("compressed term declared {expected} bytes but inflated to {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("compressed term inside a compressed term")]
    NestedCompression,

    #[error("{} carries {count} id words, expected 1 to {max}", tag_name(*.tag))]
    ReferenceWords { tag: u8, count: usize, max: usize },
}

impl ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Serde(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Serde(msg.to_string())
    }
}
