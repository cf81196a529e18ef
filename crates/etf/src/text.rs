use std::str::FromStr;

use crate::error::{Error, Result};

/// Character encoding applied to text values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl TextEncoding {
    pub fn encode(&self, s: &str) -> Result<Vec<u8>> {
        match self {
            TextEncoding::Utf8 => Ok(s.as_bytes().to_vec()),
            TextEncoding::Latin1 => s
                .chars()
                .map(|c| u8::try_from(u32::from(c)).map_err(|_| Error::unsupported(s)))
                .collect(),
        }
    }

    /// `None` when the bytes are not valid in this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            TextEncoding::Latin1 => Some(latin1_to_string(bytes)),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            _ => Err(Error::Configuration(format!("unknown text encoding {}", s))),
        }
    }
}

/// Wire representation chosen for encoded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnicodeType {
    /// `BINARY_EXT`
    #[default]
    Binary,
    /// `STRING_EXT`
    Str,
}

impl FromStr for UnicodeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "binary" => Ok(UnicodeType::Binary),
            "str" => Ok(UnicodeType::Str),
            _ => Err(Error::Configuration(format!(
                "unknown unicode encoding type {}",
                s
            ))),
        }
    }
}

pub(crate) fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}
