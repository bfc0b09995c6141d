//! High level APIs and types for network messages.

pub mod channel;
pub mod codec;
pub mod constants;

use std::{fmt, io};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::protocol::{
    message::constants::*,
    payload::{
        block::{Body, Header, HeaderQuery, NewBlock},
        codec::Codec,
        Hash, NewBlockHashes, Status, Transaction,
    },
};

/// The header of a network frame.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// The network identifier.
    pub magic: [u8; 4],
    /// The message code, identifies the type of message being sent.
    pub code: u8,
    /// The length of the message's body.
    pub body_length: u32,
    /// The checksum of the encoded message body.
    pub checksum: u32,
}

impl Codec for MessageHeader {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        buffer.put_slice(&self.magic);
        buffer.put_u8(self.code);
        buffer.put_u32_le(self.body_length);
        buffer.put_u32_le(self.checksum);

        Ok(())
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        if bytes.remaining() < HEADER_LEN {
            return Err(io::ErrorKind::InvalidData.into());
        }

        let mut magic = [0u8; 4];
        bytes.copy_to_slice(&mut magic);

        Ok(MessageHeader {
            magic,
            code: bytes.get_u8(),
            body_length: bytes.get_u32_le(),
            checksum: bytes.get_u32_le(),
        })
    }
}

impl MessageHeader {
    /// Returns a `MessageHeader` constructed from the message body.
    pub fn new(code: u8, body: &[u8]) -> Self {
        MessageHeader {
            magic: MAGIC,
            code,
            body_length: body.len() as u32,
            checksum: checksum(body),
        }
    }
}

/// A message as carried by a [`MessageChannel`](channel::MessageChannel): a code and its still
/// encoded payload.
#[derive(Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub code: u8,
    pub payload: Bytes,
}

impl RawMessage {
    pub fn new(code: u8, payload: Bytes) -> Self {
        Self { code, payload }
    }

    /// Encodes `payload` and tags it with `code`.
    pub fn encode<T: Codec>(code: u8, payload: &T) -> io::Result<Self> {
        let mut buffer = BytesMut::new();
        payload.encode(&mut buffer)?;

        Ok(Self::new(code, buffer.freeze()))
    }
}

impl fmt::Debug for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawMessage")
            .field("code", &format_args!("{:#04x}", self.code))
            .field("len", &self.payload.len())
            .finish()
    }
}

/// A network message.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Message {
    Status(Status),
    NewBlockHashes(NewBlockHashes),
    Transactions(Vec<Transaction>),
    GetBlockHeaders(HeaderQuery),
    BlockHeaders(Vec<Header>),
    GetBlockBodies(Vec<Hash>),
    BlockBodies(Vec<Body>),
    NewBlock(Box<NewBlock>),
}

impl Message {
    pub fn code(&self) -> u8 {
        match self {
            Self::Status(_) => STATUS_CODE,
            Self::NewBlockHashes(_) => NEW_BLOCK_HASHES_CODE,
            Self::Transactions(_) => TRANSACTIONS_CODE,
            Self::GetBlockHeaders(_) => GET_BLOCK_HEADERS_CODE,
            Self::BlockHeaders(_) => BLOCK_HEADERS_CODE,
            Self::GetBlockBodies(_) => GET_BLOCK_BODIES_CODE,
            Self::BlockBodies(_) => BLOCK_BODIES_CODE,
            Self::NewBlock(_) => NEW_BLOCK_CODE,
        }
    }

    /// Encodes the message payload and tags it with the message code.
    pub fn to_raw(&self) -> io::Result<RawMessage> {
        let code = self.code();
        match self {
            Self::Status(status) => RawMessage::encode(code, status),
            Self::NewBlockHashes(hashes) => RawMessage::encode(code, hashes),
            Self::Transactions(txs) => RawMessage::encode(code, txs),
            Self::GetBlockHeaders(query) => RawMessage::encode(code, query),
            Self::BlockHeaders(headers) => RawMessage::encode(code, headers),
            Self::GetBlockBodies(hashes) => RawMessage::encode(code, hashes),
            Self::BlockBodies(bodies) => RawMessage::encode(code, bodies),
            Self::NewBlock(new_block) => RawMessage::encode(code, new_block.as_ref()),
        }
    }

    /// Decodes a raw message into a typed one.
    pub fn decode(raw: &RawMessage) -> io::Result<Self> {
        let mut bytes = &raw.payload[..];
        let message = match raw.code {
            STATUS_CODE => Self::Status(Status::decode(&mut bytes)?),
            NEW_BLOCK_HASHES_CODE => Self::NewBlockHashes(NewBlockHashes::decode(&mut bytes)?),
            TRANSACTIONS_CODE => Self::Transactions(Vec::decode(&mut bytes)?),
            GET_BLOCK_HEADERS_CODE => Self::GetBlockHeaders(HeaderQuery::decode(&mut bytes)?),
            BLOCK_HEADERS_CODE => Self::BlockHeaders(Vec::decode(&mut bytes)?),
            GET_BLOCK_BODIES_CODE => Self::GetBlockBodies(Vec::decode(&mut bytes)?),
            BLOCK_BODIES_CODE => Self::BlockBodies(Vec::decode(&mut bytes)?),
            NEW_BLOCK_CODE => Self::NewBlock(Box::new(NewBlock::decode(&mut bytes)?)),
            code => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Unknown message code: {:#04x}", code),
                ))
            }
        };

        Ok(message)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Status(_) => f.write_str("Status"),
            Message::NewBlockHashes(hashes) => {
                f.write_fmt(format_args!("NewBlockHashes({})", hashes.0.len()))
            }
            Message::Transactions(txs) => f.write_fmt(format_args!("Transactions({})", txs.len())),
            Message::GetBlockHeaders(_) => f.write_str("GetBlockHeaders"),
            Message::BlockHeaders(headers) => {
                f.write_fmt(format_args!("BlockHeaders({})", headers.len()))
            }
            Message::GetBlockBodies(hashes) => {
                f.write_fmt(format_args!("GetBlockBodies({})", hashes.len()))
            }
            Message::BlockBodies(bodies) => {
                f.write_fmt(format_args!("BlockBodies({})", bodies.len()))
            }
            Message::NewBlock(new_block) => {
                f.write_fmt(format_args!("NewBlock({})", new_block.block.number()))
            }
        }
    }
}

pub(crate) fn checksum(bytes: &[u8]) -> u32 {
    let hash = Hash::double_sha256(bytes);

    let mut checksum = [0u8; 4];
    checksum.copy_from_slice(&hash.as_bytes()[0..4]);

    u32::from_le_bytes(checksum)
}
