//! Sign + little-endian magnitude conversions shared by `SMALL_BIG_EXT` and `LARGE_BIG_EXT`.

use num_bigint::BigInt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
}

// Any nonzero sign byte means negative.
impl From<u8> for Sign {
    fn from(value: u8) -> Self {
        match value {
            0 => Sign::Positive,
            _ => Sign::Negative,
        }
    }
}

impl From<Sign> for u8 {
    fn from(value: Sign) -> Self {
        match value {
            Sign::Positive => 0,
            Sign::Negative => 1,
        }
    }
}

impl From<Sign> for num_bigint::Sign {
    fn from(value: Sign) -> Self {
        match value {
            Sign::Positive => Self::Plus,
            Sign::Negative => Self::Minus,
        }
    }
}

/// Splits `n` into its sign and magnitude bytes, least significant first.
/// Zero has an empty magnitude.
pub fn magnitude_le(n: &BigInt) -> (Sign, Vec<u8>) {
    let (sign, mut bytes) = n.to_bytes_le();
    let sign = match sign {
        num_bigint::Sign::Minus => Sign::Negative,
        _ => Sign::Positive,
    };
    if bytes.iter().all(|b| *b == 0) {
        bytes.clear();
    }
    (sign, bytes)
}

pub fn from_magnitude_le(sign: Sign, digits: &[u8]) -> BigInt {
    BigInt::from_bytes_le(sign.into(), digits)
}
