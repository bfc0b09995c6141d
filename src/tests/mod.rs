//! Session tests, driven through an in-memory channel or a synthetic target over a duplex stream.


use std::{
    collections::{BTreeMap, VecDeque},
    io,
};

use bytes::Bytes;

use crate::{
    chain::{generate_blocks, ChainAccessor, ChainIdentity, MemoryChain},
    protocol::{
        message::{channel::MessageChannel, Message, RawMessage},
        payload::{BlockHashNumber, Hash, Header, NewBlockHashes},
    },
    session::{observer::RecordingObserver, Action, ActionSource, Session},
};

pub(crate) const NETWORK_ID: u64 = 1337;

/// A chain of `len` generated blocks, heights `0..len`.
pub(crate) fn test_chain(len: usize) -> MemoryChain {
    MemoryChain::from_blocks(NETWORK_ID, generate_blocks(len)).unwrap()
}

pub(crate) fn no_actions() -> VecDeque<Action> {
    VecDeque::new()
}

/// A session reporting to a [`RecordingObserver`], returned alongside it.
pub(crate) fn recorded_session<C: ChainAccessor, A: ActionSource>(
    chain: C,
    actions: A,
) -> (Session<C, A, RecordingObserver>, RecordingObserver) {
    let observer = RecordingObserver::default();
    (Session::with_observer(chain, actions, observer.clone()), observer)
}

/// An announcement of the given blocks.
pub(crate) fn announce(blocks: &[(u64, Hash)]) -> Message {
    Message::NewBlockHashes(NewBlockHashes::new(
        blocks
            .iter()
            .map(|&(number, hash)| BlockHashNumber { hash, number })
            .collect(),
    ))
}

/// An announcement of `chain`'s head.
pub(crate) fn announce_head<C: ChainAccessor>(chain: &C) -> Message {
    let identity = chain.identity();
    announce(&[(chain.current_head_height(), identity.head)])
}

/// A [`MessageChannel`] replaying queued inbound messages and recording what is written.
///
/// Reading past the queue fails like a closed connection.
#[derive(Default)]
pub(crate) struct MockChannel {
    inbound: VecDeque<RawMessage>,
    pub sent: Vec<RawMessage>,
    pub closed: bool,
    /// Writes fail once this many messages were sent.
    pub write_limit: Option<usize>,
}

impl MockChannel {
    pub fn with_inbound(messages: Vec<Message>) -> Self {
        let mut channel = Self::default();
        for message in messages {
            channel.push(message);
        }
        channel
    }

    pub fn push(&mut self, message: Message) {
        self.inbound.push_back(message.to_raw().unwrap());
    }

    pub fn push_raw(&mut self, message: RawMessage) {
        self.inbound.push_back(message);
    }

    /// Inbound messages the session never read.
    pub fn unread(&self) -> usize {
        self.inbound.len()
    }

    /// Everything written so far, decoded.
    pub fn sent_messages(&self) -> Vec<Message> {
        self.sent
            .iter()
            .map(|raw| Message::decode(raw).unwrap())
            .collect()
    }
}

#[async_trait::async_trait]
impl MessageChannel for MockChannel {
    async fn read_message(&mut self) -> io::Result<RawMessage> {
        self.inbound
            .pop_front()
            .ok_or_else(|| io::ErrorKind::UnexpectedEof.into())
    }

    async fn write_message(&mut self, message: RawMessage) -> io::Result<()> {
        let limit_reached = self
            .write_limit
            .map_or(false, |limit| self.sent.len() >= limit);
        if self.closed || limit_reached {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.sent.push(message);
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// A chain with holes: only some heights have a header, none have a body.
pub(crate) struct SparseChain {
    headers: BTreeMap<u64, Header>,
    head: u64,
}

impl SparseChain {
    pub fn new(heights: &[u64], head: u64) -> Self {
        let headers = heights
            .iter()
            .map(|&number| {
                (
                    number,
                    Header {
                        number,
                        ..Default::default()
                    },
                )
            })
            .collect();

        Self { headers, head }
    }
}

impl ChainAccessor for SparseChain {
    fn header_by_hash(&self, hash: &Hash) -> Option<&Header> {
        self.headers.values().find(|header| header.hash() == *hash)
    }

    fn header_by_number(&self, number: u64) -> Option<&Header> {
        self.headers.get(&number)
    }

    fn body_encoded(&self, _hash: &Hash) -> Option<Bytes> {
        None
    }

    fn current_head_height(&self) -> u64 {
        self.head
    }

    fn identity(&self) -> ChainIdentity {
        let hash_at = |number| {
            self.headers
                .get(&number)
                .map(Header::hash)
                .unwrap_or_default()
        };

        ChainIdentity {
            network_id: NETWORK_ID,
            genesis: hash_at(0),
            head: hash_at(self.head),
            total_difficulty: self.headers.len() as u128,
        }
    }
}
