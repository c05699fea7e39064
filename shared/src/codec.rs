//! Length-prefixed bincode framing for [`Envelope`]s over a byte stream.

use crate::{Envelope, MAX_FRAME_LENGTH};
use bytes::{Bytes, BytesMut};
use std::io;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed envelope: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Each frame is a 4-byte big-endian length followed by one bincode-encoded
/// envelope. The same codec is used on both ends of a connection.
#[derive(Debug)]
pub struct EnvelopeCodec {
    frames: LengthDelimitedCodec,
}

impl EnvelopeCodec {
    pub fn new() -> Self {
        Self {
            frames: LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_LENGTH)
                .new_codec(),
        }
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Envelope>, CodecError> {
        match self.frames.decode(src)? {
            Some(frame) => Ok(Some(bincode::deserialize(&frame)?)),
            None => Ok(None),
        }
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = CodecError;

    fn encode(&mut self, envelope: Envelope, dst: &mut BytesMut) -> Result<(), CodecError> {
        let data = bincode::serialize(&envelope)?;
        self.frames.encode(Bytes::from(data), dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageKind;
    use futures::{SinkExt, StreamExt};
    use tokio::io::AsyncWriteExt;
    use tokio_util::codec::{FramedRead, FramedWrite};

    #[test]
    fn test_decode_waits_for_full_frame() {
        let mut codec = EnvelopeCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(Envelope::chat("alice", "hello"), &mut buf)
            .unwrap();

        let mut partial = buf.split_to(buf.len() - 2);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.unsplit(buf);
        let decoded = codec.decode(&mut partial).unwrap().unwrap();
        assert_eq!(decoded.payload, "hello");
        assert!(partial.is_empty());
    }

    #[test]
    fn test_decode_back_to_back_frames() {
        let mut codec = EnvelopeCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Envelope::auth("a", "tok"), &mut buf).unwrap();
        codec.encode(Envelope::chat("a", "one"), &mut buf).unwrap();

        let first = codec.decode(&mut buf).unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.kind, MessageKind::Auth);
        assert_eq!(second.payload, "one");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_rejects_garbage_frame() {
        let mut codec = EnvelopeCodec::new();
        let mut buf = BytesMut::new();
        // Valid length prefix, but the body is not an envelope.
        buf.extend_from_slice(&[0, 0, 0, 4, 0xff, 0xff, 0xff, 0xff]);

        match codec.decode(&mut buf) {
            Err(CodecError::Serialization(_)) => {}
            other => panic!("expected serialization error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_oversized_frame() {
        let mut codec = EnvelopeCodec::new();
        let mut buf = BytesMut::new();
        let len = (MAX_FRAME_LENGTH as u32) + 1;
        buf.extend_from_slice(&len.to_be_bytes());

        assert!(matches!(codec.decode(&mut buf), Err(CodecError::Io(_))));
    }

    #[tokio::test]
    async fn test_framed_stream_end_and_truncation() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = FramedWrite::new(client, EnvelopeCodec::new());
        let mut reader = FramedRead::new(server, EnvelopeCodec::new());

        writer.send(Envelope::chat("a", "hi")).await.unwrap();
        let received = reader.next().await.unwrap().unwrap();
        assert_eq!(received.payload, "hi");

        // A half-written frame followed by EOF is an error, not a clean end.
        let mut raw = writer.into_inner();
        raw.write_all(&[0, 0, 0, 9, 1]).await.unwrap();
        drop(raw);

        assert!(reader.next().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_framed_clean_end() {
        let (client, server) = tokio::io::duplex(64);
        let mut reader = FramedRead::new(server, EnvelopeCodec::new());
        drop(client);
        assert!(reader.next().await.is_none());
    }
}
