//! Block, header and header query types.

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::protocol::payload::{codec::Codec, read_n_bytes, Hash, Transaction, VarBytes};

/// A block header.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Header {
    pub parent_hash: Hash,
    pub number: u64,
    pub timestamp: u64,
    pub difficulty: u64,
    /// Commitment to the transactions of the block body.
    pub tx_root: Hash,
    pub extra_data: VarBytes,
}

impl Header {
    /// Calculates the double Sha256 hash of the encoded header.
    pub fn hash(&self) -> Hash {
        let mut buffer = Vec::new();
        // Encoding into a `Vec` can't fail.
        let _ = self.encode(&mut buffer);

        Hash::double_sha256(&buffer)
    }
}

impl Codec for Header {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        self.parent_hash.encode(buffer)?;
        buffer.put_u64_le(self.number);
        buffer.put_u64_le(self.timestamp);
        buffer.put_u64_le(self.difficulty);
        self.tx_root.encode(buffer)?;
        self.extra_data.encode(buffer)
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        let parent_hash = Hash::decode(bytes)?;
        let number = u64::from_le_bytes(read_n_bytes(bytes)?);
        let timestamp = u64::from_le_bytes(read_n_bytes(bytes)?);
        let difficulty = u64::from_le_bytes(read_n_bytes(bytes)?);
        let tx_root = Hash::decode(bytes)?;
        let extra_data = VarBytes::decode(bytes)?;

        Ok(Self {
            parent_hash,
            number,
            timestamp,
            difficulty,
            tx_root,
            extra_data,
        })
    }
}

/// The transaction payload of a block.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Body {
    pub transactions: Vec<Transaction>,
}

impl Body {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// The root committed to by the header: the double Sha256 over all transaction hashes.
    pub fn tx_root(&self) -> Hash {
        let mut buffer = Vec::with_capacity(self.transactions.len() * 32);
        for tx in &self.transactions {
            buffer.extend_from_slice(tx.hash().as_bytes());
        }

        Hash::double_sha256(&buffer)
    }

    /// Returns the wire encoding of this body.
    pub fn encoded(&self) -> io::Result<Bytes> {
        let mut buffer = BytesMut::new();
        self.encode(&mut buffer)?;

        Ok(buffer.freeze())
    }
}

impl Codec for Body {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        self.transactions.encode(buffer)
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        Ok(Self::new(Vec::decode(bytes)?))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Block {
    pub header: Header,
    pub body: Body,
}

impl Block {
    /// Creates the genesis block, `extra_data` distinguishes otherwise identical chains.
    pub fn genesis(extra_data: Vec<u8>) -> Self {
        let body = Body::default();
        let header = Header {
            parent_hash: Hash::zeroed(),
            number: 0,
            timestamp: 0,
            difficulty: 1,
            tx_root: body.tx_root(),
            extra_data: VarBytes(extra_data),
        };

        Self { header, body }
    }

    /// Creates a block extending `parent` with the given transactions.
    pub fn child_of(parent: &Header, transactions: Vec<Transaction>, extra_data: Vec<u8>) -> Self {
        let body = Body::new(transactions);
        let header = Header {
            parent_hash: parent.hash(),
            number: parent.number.saturating_add(1),
            timestamp: parent.timestamp.saturating_add(1),
            difficulty: parent.difficulty,
            tx_root: body.tx_root(),
            extra_data: VarBytes(extra_data),
        };

        Self { header, body }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }
}

impl Codec for Block {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        self.header.encode(buffer)?;
        self.body.encode(buffer)
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        let header = Header::decode(bytes)?;
        let body = Body::decode(bytes)?;

        Ok(Self { header, body })
    }
}

/// The starting point of a [`HeaderQuery`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HashOrNumber {
    Hash(Hash),
    Number(u64),
}

impl Codec for HashOrNumber {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        match self {
            Self::Hash(hash) => {
                buffer.put_u8(0);
                hash.encode(buffer)
            }
            Self::Number(number) => {
                buffer.put_u8(1);
                buffer.put_u64_le(*number);
                Ok(())
            }
        }
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        match u8::from_le_bytes(read_n_bytes(bytes)?) {
            0 => Ok(Self::Hash(Hash::decode(bytes)?)),
            1 => Ok(Self::Number(u64::from_le_bytes(read_n_bytes(bytes)?))),
            tag => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid origin tag: {}", tag),
            )),
        }
    }
}

/// A request for `amount` headers starting at `origin`, `skip` headers apart.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct HeaderQuery {
    pub origin: HashOrNumber,
    pub amount: u64,
    pub skip: u64,
    pub reverse: bool,
}

impl HeaderQuery {
    pub fn by_number(number: u64, amount: u64, skip: u64) -> Self {
        Self {
            origin: HashOrNumber::Number(number),
            amount,
            skip,
            reverse: false,
        }
    }

    pub fn by_hash(hash: Hash, amount: u64, skip: u64) -> Self {
        Self {
            origin: HashOrNumber::Hash(hash),
            amount,
            skip,
            reverse: false,
        }
    }
}

impl Codec for HeaderQuery {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        self.origin.encode(buffer)?;
        buffer.put_u64_le(self.amount);
        buffer.put_u64_le(self.skip);
        buffer.put_u8(self.reverse as u8);

        Ok(())
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        let origin = HashOrNumber::decode(bytes)?;
        let amount = u64::from_le_bytes(read_n_bytes(bytes)?);
        let skip = u64::from_le_bytes(read_n_bytes(bytes)?);
        let reverse = u8::from_le_bytes(read_n_bytes(bytes)?) != 0;

        Ok(Self {
            origin,
            amount,
            skip,
            reverse,
        })
    }
}

/// A block announcement carrying the sender's claimed total difficulty.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NewBlock {
    pub block: Block,
    pub total_difficulty: u128,
}

impl Codec for NewBlock {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        self.block.encode(buffer)?;
        buffer.put_u128_le(self.total_difficulty);

        Ok(())
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        let block = Block::decode(bytes)?;
        let total_difficulty = u128::from_le_bytes(read_n_bytes(bytes)?);

        Ok(Self {
            block,
            total_difficulty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_links_to_parent() {
        let genesis = Block::genesis(b"bazooka".to_vec());
        let child = Block::child_of(&genesis.header, vec![Transaction::new(vec![1, 2, 3])], vec![]);

        assert_eq!(child.header.parent_hash, genesis.hash());
        assert_eq!(child.number(), 1);
        assert_eq!(child.header.tx_root, child.body.tx_root());
    }

    #[test]
    fn child_of_the_last_height_saturates() {
        let parent = Header {
            number: u64::MAX,
            timestamp: u64::MAX,
            ..Default::default()
        };
        let child = Block::child_of(&parent, vec![], vec![]);

        assert_eq!(child.header.timestamp, u64::MAX);
        assert_eq!(child.number(), u64::MAX);
        assert_eq!(child.header.parent_hash, parent.hash());
    }

    #[test]
    fn genesis_extra_data_changes_the_hash() {
        assert_ne!(
            Block::genesis(b"a".to_vec()).hash(),
            Block::genesis(b"b".to_vec()).hash()
        );
    }

    #[test]
    fn unknown_origin_tag_is_rejected() {
        let mut buffer = vec![2u8];
        buffer.extend_from_slice(&[0; 17]);

        let err = HeaderQuery::decode(&mut &buffer[..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn reverse_flag_is_preserved() {
        let query = HeaderQuery {
            reverse: true,
            ..HeaderQuery::by_number(7, 2, 0)
        };
        let mut buffer = Vec::new();
        query.encode(&mut buffer).unwrap();

        assert_eq!(HeaderQuery::decode(&mut &buffer[..]).unwrap(), query);
    }
}
