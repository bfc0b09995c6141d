//! Read access to the chain a session serves.

mod memory;

use std::sync::Arc;

use bytes::Bytes;

pub use memory::{encode_chain, generate_blocks, ChainError, MemoryChain};

use crate::protocol::{
    message::constants::PROTOCOL_VERSION,
    payload::{Hash, Header, Status},
};

/// What a peer needs to know about our chain to accept us: exchanged in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainIdentity {
    pub network_id: u64,
    pub genesis: Hash,
    pub head: Hash,
    pub total_difficulty: u128,
}

impl ChainIdentity {
    /// The status announcing this chain to a peer.
    pub fn status(&self) -> Status {
        Status {
            protocol_version: PROTOCOL_VERSION,
            network_id: self.network_id,
            total_difficulty: self.total_difficulty,
            head: self.head,
            genesis: self.genesis,
        }
    }
}

/// Header and body lookups backing the query responders.
///
/// Lookups return `None` for anything the chain doesn't hold, a miss is never an error.
pub trait ChainAccessor: Send + Sync {
    fn header_by_hash(&self, hash: &Hash) -> Option<&Header>;

    fn header_by_number(&self, number: u64) -> Option<&Header>;

    /// The encoded body of the block with the given hash.
    fn body_encoded(&self, hash: &Hash) -> Option<Bytes>;

    /// Height of the current best block.
    fn current_head_height(&self) -> u64;

    fn identity(&self) -> ChainIdentity;
}

impl<T: ChainAccessor + ?Sized> ChainAccessor for Arc<T> {
    fn header_by_hash(&self, hash: &Hash) -> Option<&Header> {
        (**self).header_by_hash(hash)
    }

    fn header_by_number(&self, number: u64) -> Option<&Header> {
        (**self).header_by_number(number)
    }

    fn body_encoded(&self, hash: &Hash) -> Option<Bytes> {
        (**self).body_encoded(hash)
    }

    fn current_head_height(&self) -> u64 {
        (**self).current_head_height()
    }

    fn identity(&self) -> ChainIdentity {
        (**self).identity()
    }
}
