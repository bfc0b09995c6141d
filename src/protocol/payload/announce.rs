//! Block hash announcements.

use std::io;

use bytes::{Buf, BufMut};

use crate::protocol::payload::{codec::Codec, read_n_bytes, Hash};

/// A single announced block.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct BlockHashNumber {
    pub hash: Hash,
    pub number: u64,
}

impl Codec for BlockHashNumber {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        self.hash.encode(buffer)?;
        buffer.put_u64_le(self.number);

        Ok(())
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        let hash = Hash::decode(bytes)?;
        let number = u64::from_le_bytes(read_n_bytes(bytes)?);

        Ok(Self { hash, number })
    }
}

/// The blocks a peer announces as newly available.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct NewBlockHashes(pub Vec<BlockHashNumber>);

impl NewBlockHashes {
    pub fn new(announced: Vec<BlockHashNumber>) -> Self {
        Self(announced)
    }
}

impl Codec for NewBlockHashes {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        self.0.encode(buffer)
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        Ok(Self(Vec::decode(bytes)?))
    }
}
