//! zlib streams carried by the `COMPRESSED` wrapper.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{Error, FormatError, Result};

/// Whether, and how hard, to compress an encoded term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    /// zlib level, 0 through 9.
    Level(u32),
}

impl Compression {
    pub const DEFAULT_LEVEL: u32 = 6;

    pub fn level(level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::Configuration(format!(
                "compression level must be between 0 and 9, got {}",
                level
            )));
        }
        Ok(Compression::Level(level))
    }
}

impl From<bool> for Compression {
    fn from(value: bool) -> Self {
        if value {
            Compression::Level(Self::DEFAULT_LEVEL)
        } else {
            Compression::None
        }
    }
}

pub fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut enc = ZlibEncoder::new(
        Vec::with_capacity(data.len() / 2),
        flate2::Compression::new(level),
    );
    enc.write_all(data).map_err(FormatError::Zlib)?;
    Ok(enc.finish().map_err(FormatError::Zlib)?)
}

/// Inflates `data`, which must expand to exactly `expected_len` bytes.
pub fn inflate(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len.min(data.len().saturating_mul(8)));
    // one byte past the declared size is enough to tell that the stream lied
    ZlibDecoder::new(data)
        .take(expected_len as u64 + 1)
        .read_to_end(&mut out)
        .map_err(FormatError::Zlib)?;
    if out.len() != expected_len {
        return Err(FormatError::SizeMismatch {
            expected: expected_len,
            actual: out.len(),
        }
        .into());
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn roundtrip() {
        let data = vec![7_u8; 4096];
        let z = deflate(&data, 6).unwrap();
        assert!(z.len() < data.len());
        assert_eq!(z[0], 0x78);
        assert_eq!(inflate(&z, data.len()).unwrap(), data);
    }

    #[test]
    fn size_mismatch() {
        let z = deflate(b"hello world", 9).unwrap();
        assert!(matches!(
            inflate(&z, 5),
            Err(Error::Format(FormatError::SizeMismatch { expected: 5, .. }))
        ));
        assert!(matches!(
            inflate(&z, 100),
            Err(Error::Format(FormatError::SizeMismatch { actual: 11, .. }))
        ));
    }

    #[test]
    fn garbage() {
        assert!(matches!(
            inflate(&[1, 2, 3, 4], 4),
            Err(Error::Format(FormatError::Zlib(_)))
        ));
    }

    #[test]
    fn levels() {
        assert_eq!(Compression::from(true), Compression::Level(6));
        assert_eq!(Compression::from(false), Compression::None);
        assert_eq!(Compression::level(0).unwrap(), Compression::Level(0));
        assert_eq!(
            Compression::level(10).unwrap_err().kind(),
            ErrorKind::Configuration
        );
    }
}
