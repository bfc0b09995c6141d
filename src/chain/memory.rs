use std::{collections::HashMap, fmt, fs, io, path::Path};

use bytes::{Buf, Bytes};
use tracing::*;

use crate::{
    chain::{ChainAccessor, ChainIdentity},
    protocol::payload::{codec::Codec, Block, Hash, Header, Transaction},
};

/// An [`Error`](std::error::Error) type for loading a [`MemoryChain`].
#[derive(Debug)]
pub enum ChainError {
    /// The chain file couldn't be read or decoded.
    Io(io::Error),
    /// No blocks were supplied, a chain needs at least its genesis.
    Empty,
    /// A block appeared at the wrong height.
    NotContiguous { expected: u64, found: u64 },
    /// A block doesn't link to the block before it.
    ParentMismatch { number: u64 },
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::Io(err) => write!(f, "couldn't load chain: {}", err),
            ChainError::Empty => f.write_str("chain has no genesis block"),
            ChainError::NotContiguous { expected, found } => {
                write!(f, "expected block {}, found block {}", expected, found)
            }
            ChainError::ParentMismatch { number } => {
                write!(f, "block {} doesn't extend its parent", number)
            }
        }
    }
}

impl std::error::Error for ChainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChainError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ChainError {
    fn from(err: io::Error) -> Self {
        ChainError::Io(err)
    }
}

/// A fully in-memory chain, indexed by hash and by number.
#[derive(Debug)]
pub struct MemoryChain {
    network_id: u64,
    /// Headers by number, genesis first.
    headers: Vec<Header>,
    numbers: HashMap<Hash, u64>,
    bodies: HashMap<Hash, Bytes>,
    total_difficulty: u128,
}

impl MemoryChain {
    /// Builds the chain from `blocks`, which must start at genesis and link up one by one.
    pub fn from_blocks(network_id: u64, blocks: Vec<Block>) -> Result<Self, ChainError> {
        if blocks.is_empty() {
            return Err(ChainError::Empty);
        }

        let mut chain = Self {
            network_id,
            headers: Vec::with_capacity(blocks.len()),
            numbers: HashMap::with_capacity(blocks.len()),
            bodies: HashMap::with_capacity(blocks.len()),
            total_difficulty: 0,
        };

        for block in blocks {
            let expected = chain.headers.len() as u64;
            if block.number() != expected {
                return Err(ChainError::NotContiguous {
                    expected,
                    found: block.number(),
                });
            }

            if let Some(parent) = chain.headers.last() {
                if block.header.parent_hash != parent.hash() {
                    return Err(ChainError::ParentMismatch {
                        number: block.number(),
                    });
                }
            }

            let hash = block.hash();
            chain.numbers.insert(hash, block.number());
            chain.bodies.insert(hash, block.body.encoded()?);
            chain.total_difficulty += block.header.difficulty as u128;
            chain.headers.push(block.header);
        }

        debug!(
            "loaded chain with {} blocks, head {}",
            chain.headers.len(),
            chain.head().hash()
        );

        Ok(chain)
    }

    /// Decodes a chain export: encoded blocks back to back, genesis first.
    pub fn from_bytes(network_id: u64, mut bytes: &[u8]) -> Result<Self, ChainError> {
        let mut blocks = Vec::new();
        while bytes.has_remaining() {
            blocks.push(Block::decode(&mut bytes)?);
        }

        Self::from_blocks(network_id, blocks)
    }

    /// Reads a chain export from `path`.
    pub fn load<P: AsRef<Path>>(network_id: u64, path: P) -> Result<Self, ChainError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(network_id, &bytes)
    }

    /// The best block's header.
    pub fn head(&self) -> &Header {
        // `from_blocks` refuses empty chains.
        &self.headers[self.headers.len() - 1]
    }
}

impl ChainAccessor for MemoryChain {
    fn header_by_hash(&self, hash: &Hash) -> Option<&Header> {
        let number = self.numbers.get(hash)?;
        self.headers.get(*number as usize)
    }

    fn header_by_number(&self, number: u64) -> Option<&Header> {
        usize::try_from(number)
            .ok()
            .and_then(|index| self.headers.get(index))
    }

    fn body_encoded(&self, hash: &Hash) -> Option<Bytes> {
        self.bodies.get(hash).cloned()
    }

    fn current_head_height(&self) -> u64 {
        self.head().number
    }

    fn identity(&self) -> ChainIdentity {
        ChainIdentity {
            network_id: self.network_id,
            genesis: self.headers[0].hash(),
            head: self.head().hash(),
            total_difficulty: self.total_difficulty,
        }
    }
}

/// Generates `len` linked blocks, genesis included, each non-genesis block carrying one
/// transaction derived from its height.
pub fn generate_blocks(len: usize) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::with_capacity(len);
    for number in 0..len {
        let block = match blocks.last() {
            None => Block::genesis(b"bazooka".to_vec()),
            Some(parent) => {
                let tx = Transaction::new((number as u64).to_le_bytes().to_vec());
                Block::child_of(&parent.header, vec![tx], Vec::new())
            }
        };
        blocks.push(block);
    }

    blocks
}

/// Encodes `blocks` in the format read by [`MemoryChain::from_bytes`].
pub fn encode_chain(blocks: &[Block]) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    for block in blocks {
        block.encode(&mut buffer)?;
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const NETWORK_ID: u64 = 1337;

    #[test]
    fn lookups_by_hash_and_number_agree() {
        let blocks = generate_blocks(8);
        let chain = MemoryChain::from_blocks(NETWORK_ID, blocks.clone()).unwrap();

        assert_eq!(chain.current_head_height(), 7);
        for block in &blocks {
            let by_hash = chain.header_by_hash(&block.hash()).unwrap();
            let by_number = chain.header_by_number(block.number()).unwrap();
            assert_eq!(by_hash, by_number);
            assert_eq!(
                chain.body_encoded(&block.hash()).unwrap(),
                block.body.encoded().unwrap()
            );
        }
        assert!(chain.header_by_number(8).is_none());
        assert!(chain.header_by_hash(&Hash::zeroed()).is_none());
    }

    #[test]
    fn identity_reflects_genesis_and_head() {
        let blocks = generate_blocks(3);
        let chain = MemoryChain::from_blocks(NETWORK_ID, blocks.clone()).unwrap();
        let identity = chain.identity();

        assert_eq!(identity.network_id, NETWORK_ID);
        assert_eq!(identity.genesis, blocks[0].hash());
        assert_eq!(identity.head, blocks[2].hash());
        assert_eq!(identity.total_difficulty, 3);
    }

    #[test]
    fn chain_export_loads_back() {
        let blocks = generate_blocks(5);
        let bytes = encode_chain(&blocks).unwrap();

        let chain = MemoryChain::from_bytes(NETWORK_ID, &bytes).unwrap();
        assert_eq!(chain.head(), &blocks[4].header);
    }

    #[test]
    fn rejects_gaps_and_broken_links() {
        let mut blocks = generate_blocks(4);
        blocks.remove(2);
        assert_matches!(
            MemoryChain::from_blocks(NETWORK_ID, blocks),
            Err(ChainError::NotContiguous {
                expected: 2,
                found: 3
            })
        );

        let mut blocks = generate_blocks(3);
        blocks[2].header.parent_hash = Hash::zeroed();
        assert_matches!(
            MemoryChain::from_blocks(NETWORK_ID, blocks),
            Err(ChainError::ParentMismatch { number: 2 })
        );

        assert_matches!(
            MemoryChain::from_blocks(NETWORK_ID, Vec::new()),
            Err(ChainError::Empty)
        );
    }

    #[test]
    fn truncated_export_is_an_io_error() {
        let bytes = encode_chain(&generate_blocks(2)).unwrap();
        assert_matches!(
            MemoryChain::from_bytes(NETWORK_ID, &bytes[..bytes.len() - 1]),
            Err(ChainError::Io(_))
        );
    }
}
