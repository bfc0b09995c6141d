//! Status payload, exchanged once when a session starts.

use std::io;

use bytes::{Buf, BufMut};

use crate::protocol::payload::{codec::Codec, read_n_bytes, Hash};

/// A status payload.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Status {
    /// The protocol version of the sender.
    pub protocol_version: u32,
    /// The network the sender is on.
    pub network_id: u64,
    /// The total difficulty of the sender's best chain.
    pub total_difficulty: u128,
    /// The hash of the sender's best block.
    pub head: Hash,
    /// The genesis hash of the sender's chain.
    pub genesis: Hash,
}

impl Codec for Status {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        buffer.put_u32_le(self.protocol_version);
        buffer.put_u64_le(self.network_id);
        buffer.put_u128_le(self.total_difficulty);
        self.head.encode(buffer)?;
        self.genesis.encode(buffer)
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        let protocol_version = u32::from_le_bytes(read_n_bytes(bytes)?);
        let network_id = u64::from_le_bytes(read_n_bytes(bytes)?);
        let total_difficulty = u128::from_le_bytes(read_n_bytes(bytes)?);
        let head = Hash::decode(bytes)?;
        let genesis = Hash::decode(bytes)?;

        Ok(Self {
            protocol_version,
            network_id,
            total_difficulty,
            head,
            genesis,
        })
    }
}
