//! Frame codec for [`RawMessage`]s.

use std::io;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::protocol::{
    message::{checksum, constants::*, MessageHeader, RawMessage},
    payload::codec::Codec,
};

/// Splits a byte stream into frames of `magic | code | body_length | checksum | body` and back.
pub struct MessageCodec {
    codec: LengthDelimitedCodec,
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self {
            codec: LengthDelimitedCodec::builder()
                .length_field_offset(5)
                .length_field_length(4)
                // The frame is the whole header followed by the body.
                .length_adjustment(HEADER_LEN as isize)
                .little_endian()
                .num_skip(0)
                .max_frame_length(MAX_MESSAGE_LEN)
                .new_codec(),
        }
    }
}

impl Decoder for MessageCodec {
    type Item = RawMessage;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut bytes = if let Some(bytes) = self.codec.decode(src)? {
            bytes
        } else {
            return Ok(None);
        };

        let header = MessageHeader::decode(&mut bytes)?;
        if header.magic != MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected network magic: {:02x?}", header.magic),
            ));
        }

        let payload = bytes.freeze();
        if checksum(&payload) != header.checksum {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad checksum for message code {:#04x}", header.code),
            ));
        }

        Ok(Some(RawMessage::new(header.code, payload)))
    }
}

impl Encoder<RawMessage> for MessageCodec {
    type Error = io::Error;

    fn encode(&mut self, message: RawMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if message.payload.len() > MAX_MESSAGE_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("message body exceeds {} bytes", MAX_MESSAGE_LEN),
            ));
        }

        let header = MessageHeader::new(message.code, &message.payload);
        dst.reserve(HEADER_LEN + message.payload.len());
        header.encode(dst)?;
        dst.put_slice(&message.payload);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn framed(message: RawMessage) -> BytesMut {
        let mut buffer = BytesMut::new();
        MessageCodec::default().encode(message, &mut buffer).unwrap();
        buffer
    }

    #[test]
    fn frame_round_trip() {
        let message = RawMessage::new(TRANSACTIONS_CODE, Bytes::from_static(b"\x01\x02\xaa\xbb"));
        let mut buffer = framed(message.clone());
        assert_eq!(buffer.len(), HEADER_LEN + 4);

        let decoded = MessageCodec::default().decode(&mut buffer).unwrap();
        assert_eq!(decoded, Some(message));
        assert!(buffer.is_empty());
    }

    #[test]
    fn back_to_back_frames_split_cleanly() {
        let first = RawMessage::new(STATUS_CODE, Bytes::from_static(&[1; 30]));
        let second = RawMessage::new(NEW_BLOCK_HASHES_CODE, Bytes::from_static(&[2, 3]));

        let mut buffer = framed(first.clone());
        buffer.unsplit(framed(second.clone()));

        let mut codec = MessageCodec::default();
        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(first));
        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(second));
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let mut buffer = framed(RawMessage::new(STATUS_CODE, Bytes::from_static(&[9; 20])));
        let mut tail = buffer.split_off(HEADER_LEN + 3);

        let mut codec = MessageCodec::default();
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);

        buffer.unsplit(tail.split());
        assert!(codec.decode(&mut buffer).unwrap().is_some());
    }

    #[test]
    fn corrupted_body_fails_checksum() {
        let mut buffer = framed(RawMessage::new(STATUS_CODE, Bytes::from_static(&[1, 2, 3])));
        let last = buffer.len() - 1;
        buffer[last] ^= 0xff;

        let err = MessageCodec::default().decode(&mut buffer).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn foreign_magic_is_rejected() {
        let mut buffer = framed(RawMessage::new(STATUS_CODE, Bytes::new()));
        buffer[0] = 0x00;

        assert!(MessageCodec::default().decode(&mut buffer).is_err());
    }

    #[test]
    fn random_bytes_never_panic() {
        use rand::{thread_rng, Rng, RngCore};

        let mut rng = thread_rng();
        for _ in 0..1000 {
            let mut bytes = vec![0u8; rng.gen_range(0..256)];
            rng.fill_bytes(&mut bytes);

            let mut buffer = BytesMut::from(&bytes[..]);
            let _ = MessageCodec::default().decode(&mut buffer);
        }
    }

    #[test]
    fn random_payloads_decode_or_fail_cleanly() {
        use rand::{thread_rng, Rng, RngCore};

        use crate::protocol::message::Message;

        let mut rng = thread_rng();
        for _ in 0..1000 {
            let mut payload = vec![0u8; rng.gen_range(0..128)];
            rng.fill_bytes(&mut payload);
            let code = rng.gen_range(STATUS_CODE..=NEW_BLOCK_CODE);

            let mut buffer = framed(RawMessage::new(code, Bytes::from(payload)));
            let raw = MessageCodec::default().decode(&mut buffer).unwrap().unwrap();
            let _ = Message::decode(&raw);
        }
    }
}
