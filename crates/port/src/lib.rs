//! `{packet, 4}` framing for talking to an Erlang port over a byte stream.
//!
//! Each frame is a 4-byte big-endian length followed by that many bytes, which for
//! [`TermCodec`] hold one external-format term.

mod codec;
mod error;
mod packet;

pub use codec::TermCodec;
pub use error::{Error, Result};
pub use packet::{read_packet, write_packet, PacketCodec, DEFAULT_MAX_FRAME_LEN, HEADER_LEN};
