use bytes::{Bytes, BytesMut};
use etf::{Compression, Term, TermDecoder, TermEncoder};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::error::{Error, Result};
use crate::packet::PacketCodec;

/// One term per `{packet, 4}` frame.
///
/// A frame whose payload fails to decode is returned as [`Error::Etf`], and one with bytes
/// left over after its term as [`Error::TrailingBytes`]. The stream should be dropped after
/// either.
#[derive(Debug, Clone, Default)]
pub struct TermCodec {
    packet: PacketCodec,
    decoder: TermDecoder,
    encoder: TermEncoder,
    compression: Compression,
}

impl TermCodec {
    pub fn new(packet: PacketCodec, decoder: TermDecoder, encoder: TermEncoder) -> Self {
        TermCodec {
            packet,
            decoder,
            encoder,
            compression: Compression::None,
        }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn decoder(&self) -> &TermDecoder {
        &self.decoder
    }

    pub fn encoder(&self) -> &TermEncoder {
        &self.encoder
    }
}

impl Decoder for TermCodec {
    type Item = Term;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let frame = match self.packet.decode(src)? {
            Some(frame) => frame,
            None => return Ok(None),
        };
        let (term, used) = self.decoder.decode_prefix(&frame)?;
        if used != frame.len() {
            return Err(Error::TrailingBytes {
                used,
                len: frame.len(),
            });
        }
        debug!(%term, "received term");
        Ok(Some(term))
    }
}

impl Encoder<Term> for TermCodec {
    type Error = Error;

    fn encode(&mut self, item: Term, dst: &mut BytesMut) -> Result<()> {
        <Self as Encoder<&Term>>::encode(self, &item, dst)
    }
}

impl Encoder<&Term> for TermCodec {
    type Error = Error;

    fn encode(&mut self, item: &Term, dst: &mut BytesMut) -> Result<()> {
        let payload = self.encoder.encode_with(item, self.compression)?;
        debug!(term = %item, len = payload.len(), "sending term");
        self.packet.encode(Bytes::from(payload), dst)
    }
}

#[cfg(test)]
mod test {
    use futures::{SinkExt, StreamExt};
    use tokio::io::duplex;
    use tokio_util::codec::Framed;

    use super::*;
    use etf::{Atom, Binary, DecoderConfig, EncoderConfig, TextEncoding, UnicodeType};

    #[tokio::test]
    async fn exchange_terms() {
        let (a, b) = duplex(1024);
        let mut left = Framed::new(a, TermCodec::default());
        let mut right = Framed::new(b, TermCodec::default());

        let ping = Term::tuple([Term::atom("ping"), Term::from(1), Term::from("body")]);
        left.send(ping).await.unwrap();
        left.send(Term::nil()).await.unwrap();

        // the default encoder sends text as a binary
        let got = right.next().await.unwrap().unwrap();
        assert_eq!(
            got,
            Term::tuple([
                Term::atom("ping"),
                Term::from(1),
                Term::Binary(Binary(b"body".to_vec()))
            ])
        );
        assert_eq!(right.next().await.unwrap().unwrap(), Term::nil());

        drop(left);
        assert!(right.next().await.is_none());
    }

    #[tokio::test]
    async fn compressed_and_large() {
        let (a, b) = duplex(512);
        let codec = TermCodec::default().with_compression(Compression::from(true));
        let mut left = Framed::new(a, codec);
        let mut right = Framed::new(b, TermCodec::default());

        let big = Term::list((0..5000).map(|i| Term::from(i % 10)));
        let writer = tokio::spawn(async move {
            left.send(&big).await.unwrap();
            big
        });
        let got = right.next().await.unwrap().unwrap();
        assert_eq!(got, writer.await.unwrap());
    }

    #[tokio::test]
    async fn latin1_strings() {
        let (a, b) = duplex(1024);
        let enc = TermEncoder::new(
            EncoderConfig::default()
                .with_encoding(Some(TextEncoding::Latin1))
                .with_unicode_type(UnicodeType::Str),
        );
        let dec =
            TermDecoder::new(DecoderConfig::default().with_encoding(Some(TextEncoding::Latin1)));
        let mut left = Framed::new(
            a,
            TermCodec::new(PacketCodec::default(), dec.clone(), enc),
        );
        let mut right = Framed::new(
            b,
            TermCodec::new(PacketCodec::default(), dec, TermEncoder::default()),
        );

        left.send(Term::from("café")).await.unwrap();
        assert_eq!(right.next().await.unwrap().unwrap(), Term::from("café"));
        right.send(Term::atom("done")).await.unwrap();
        assert_eq!(
            left.next().await.unwrap().unwrap(),
            Term::Atom(Atom::new("done"))
        );
    }

    #[tokio::test]
    async fn bad_payload_is_fatal() {
        let (mut a, b) = duplex(64);
        let mut right = Framed::new(b, TermCodec::default());

        tokio::io::AsyncWriteExt::write_all(&mut a, &[0, 0, 0, 2, 131, 255])
            .await
            .unwrap();
        let err = right.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Etf(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn trailing_bytes_in_frame() {
        let (mut a, b) = duplex(64);
        let mut right = Framed::new(b, TermCodec::default());

        tokio::io::AsyncWriteExt::write_all(&mut a, &[0, 0, 0, 4, 131, 97, 1, 0])
            .await
            .unwrap();
        let err = right.next().await.unwrap().unwrap_err();
        assert!(
            matches!(err, Error::TrailingBytes { used: 3, len: 4 }),
            "{:?}",
            err
        );
    }

    #[tokio::test]
    async fn oversized_frame() {
        let (mut a, b) = duplex(64);
        let codec = TermCodec::new(
            PacketCodec::new(8),
            TermDecoder::default(),
            TermEncoder::default(),
        );
        let mut right = Framed::new(b, codec);

        tokio::io::AsyncWriteExt::write_all(&mut a, &[0, 0, 1, 0])
            .await
            .unwrap();
        let err = right.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge { len: 256, max: 8 }));
    }
}
