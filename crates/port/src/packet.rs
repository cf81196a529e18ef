use std::io::{self, Read, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::error::{Error, Result};

pub const HEADER_LEN: usize = 4;

pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Splits a stream into `{packet, 4}` frames.
///
/// A header announcing more than `max_frame_len` bytes fails the stream before any of
/// the body is buffered.
#[derive(Debug, Clone, Copy)]
pub struct PacketCodec {
    max_frame_len: usize,
}

impl PacketCodec {
    pub fn new(max_frame_len: usize) -> Self {
        PacketCodec {
            max_frame_len: max_frame_len.min(u32::MAX as usize),
        }
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    fn check(&self, len: usize) -> Result<()> {
        if len > self.max_frame_len {
            return Err(Error::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }
        Ok(())
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        PacketCodec::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl Decoder for PacketCodec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let len = BigEndian::read_u32(&src[..HEADER_LEN]) as usize;
        self.check(len)?;

        if src.len() < HEADER_LEN + len {
            src.reserve(HEADER_LEN + len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let frame = src.split_to(len).freeze();
        debug!(len, "read frame");
        Ok(Some(frame))
    }
}

impl Encoder<Bytes> for PacketCodec {
    type Error = Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        self.check(item.len())?;
        dst.reserve(HEADER_LEN + item.len());
        dst.put_u32(item.len() as u32);
        dst.extend_from_slice(&item);
        debug!(len = item.len(), "wrote frame");
        Ok(())
    }
}

impl PacketCodec {
    /// Reads one frame from a blocking reader.
    ///
    /// Returns `None` when the stream ends cleanly before a header.
    pub fn read_from<R: Read>(&self, r: &mut R) -> Result<Option<Vec<u8>>> {
        let mut header = [0; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            match r.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let len = BigEndian::read_u32(&header) as usize;
        self.check(len)?;

        let mut buf = vec![0; len];
        r.read_exact(&mut buf)?;
        debug!(len, "read frame");
        Ok(Some(buf))
    }

    pub fn write_to<W: Write>(&self, w: &mut W, data: &[u8]) -> Result<()> {
        self.check(data.len())?;
        w.write_u32::<BigEndian>(data.len() as u32)?;
        w.write_all(data)?;
        w.flush()?;
        debug!(len = data.len(), "wrote frame");
        Ok(())
    }
}

/// [`PacketCodec::read_from`] with the default frame limit.
pub fn read_packet<R: Read>(r: &mut R) -> Result<Option<Vec<u8>>> {
    PacketCodec::default().read_from(r)
}

/// [`PacketCodec::write_to`] with the default frame limit.
pub fn write_packet<W: Write>(w: &mut W, data: &[u8]) -> Result<()> {
    PacketCodec::default().write_to(w, data)
}
