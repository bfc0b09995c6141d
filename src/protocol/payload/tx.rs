//! Transaction types.

use std::{fmt, io};

use bytes::{Buf, BufMut};

use crate::protocol::payload::{codec::Codec, Hash, VarBytes};

/// A signed transaction, carried as opaque bytes.
///
/// Transactions are never validated here, the target node decides what to make of them.
#[derive(PartialEq, Eq, Clone, Default)]
pub struct Transaction(VarBytes);

impl Transaction {
    pub fn new(payload: Vec<u8>) -> Self {
        Self(VarBytes(payload))
    }

    pub fn payload(&self) -> &[u8] {
        &self.0 .0
    }

    /// Calculates the double Sha256 hash of the transaction payload.
    pub fn hash(&self) -> Hash {
        Hash::double_sha256(self.payload())
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("hash", &self.hash())
            .field("len", &self.payload().len())
            .finish()
    }
}

impl Codec for Transaction {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        self.0.encode(buffer)
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self> {
        Ok(Self(VarBytes::decode(bytes)?))
    }
}
