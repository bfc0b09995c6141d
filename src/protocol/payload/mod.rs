//! Payload types and primitive encodings.

use std::{fmt, io, ops::Deref};

use bytes::{Buf, BufMut};
use serde::{de, Deserialize, Deserializer};
use sha2::{Digest, Sha256};

pub mod announce;
pub mod block;
pub mod codec;
pub mod status;
pub mod tx;

pub use announce::{BlockHashNumber, NewBlockHashes};
pub use block::{Block, Body, HashOrNumber, Header, HeaderQuery, NewBlock};
pub use status::Status;
pub use tx::Transaction;

use codec::Codec;

/// A 32-byte content hash.
#[derive(Default, PartialEq, Eq, Hash, Copy, Clone, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Creates a [`Hash`] instance.
    pub fn new(hash: [u8; 32]) -> Self {
        Hash(hash)
    }

    /// Returns a [`Hash`] with only `0` bytes.
    pub fn zeroed() -> Self {
        Self([0; 32])
    }

    /// Hashes `bytes` with double SHA-256.
    pub fn double_sha256(bytes: &[u8]) -> Self {
        let first = Sha256::digest(bytes);
        let second = Sha256::digest(first);

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&second);

        Self(hash)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Codec for Hash {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        buffer.put_slice(&self.0);

        Ok(())
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        Ok(Self(read_n_bytes(bytes)?))
    }
}

/// A variable length integer, the "CompactSize" encoding used for list and byte string lengths.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct VarInt(pub usize);

impl Deref for VarInt {
    type Target = usize;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Codec for VarInt {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        // length of the payload to be written.
        let l = self.0;
        match l {
            0x0000_0000..=0x0000_00fc => {
                buffer.put_u8(l as u8);
            }
            0x0000_00fd..=0x0000_ffff => {
                buffer.put_u8(0xfd);
                buffer.put_u16_le(l as u16);
            }
            0x0001_0000..=0xffff_ffff => {
                buffer.put_u8(0xfe);
                buffer.put_u32_le(l as u32);
            }
            _ => {
                buffer.put_u8(0xff);
                buffer.put_u64_le(l as u64);
            }
        };

        Ok(())
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        let flag = u8::from_le_bytes(read_n_bytes(bytes)?);

        let len = match flag {
            len @ 0x00..=0xfc => len as u64,
            0xfd => u16::from_le_bytes(read_n_bytes(bytes)?) as u64,
            0xfe => u32::from_le_bytes(read_n_bytes(bytes)?) as u64,
            0xff => u64::from_le_bytes(read_n_bytes(bytes)?),
        };

        let len = usize::try_from(len).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "length prefix overflows usize")
        })?;

        Ok(VarInt(len))
    }
}

/// A length-prefixed byte string.
#[derive(Default, PartialEq, Eq, Clone)]
pub struct VarBytes(pub Vec<u8>);

impl fmt::Debug for VarBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl Codec for VarBytes {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        VarInt(self.0.len()).encode(buffer)?;
        buffer.put_slice(&self.0);

        Ok(())
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        let len = *VarInt::decode(bytes)?;
        if bytes.remaining() < len {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }

        let mut buffer = vec![0u8; len];
        bytes.copy_to_slice(&mut buffer);

        Ok(Self(buffer))
    }
}

/// Deserializes a hex string (with or without the `0x` prefix) into raw bytes.
pub(crate) fn deserialize_hex<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(deserializer)?;
    hex::decode(s.trim_start_matches("0x")).map_err(de::Error::custom)
}

pub(crate) fn read_n_bytes<const N: usize, B: Buf>(bytes: &mut B) -> io::Result<[u8; N]> {
    if bytes.remaining() < N {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }

    let mut buffer = [0u8; N];
    bytes.copy_to_slice(&mut buffer);

    Ok(buffer)
}
