//! Structured session events and their consumers.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tracing::*;

use crate::{
    protocol::payload::{Hash, Status},
    session::Phase,
};

/// Everything observable about a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The control loop moved to another phase.
    PhaseChanged(Phase),
    HandshakeCompleted { peer: Status },
    HandshakeFailed { cause: String },
    HeadersServed { origin: u64, amount: u64, skip: u64, served: usize },
    BodiesServed { requested: usize, served: usize, bytes: usize },
    /// An inbound message nobody handles, it was dropped.
    UnknownMessage { code: u8 },
    /// The peer announced our head: it considers itself synced with us.
    SyncComplete { height: u64, hash: Hash },
    ActionExecuted(ExecutedAction),
}

/// The observable effect of one attack action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutedAction {
    Transactions { count: usize },
    Block { number: u64, hash: Hash, total_difficulty: u128 },
    Sleep(Duration),
    Terminate,
}

/// Receives every [`SessionEvent`] in the order the session produces them.
pub trait SessionObserver: Send + Sync {
    fn on_event(&self, event: &SessionEvent);
}

/// Logs events with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::PhaseChanged(phase) => debug!("session phase: {:?}", phase),
            SessionEvent::HandshakeCompleted { peer } => info!(
                "handshake completed, peer head {} (td {})",
                peer.head, peer.total_difficulty
            ),
            SessionEvent::HandshakeFailed { cause } => error!("handshake failed: {}", cause),
            SessionEvent::HeadersServed {
                origin,
                amount,
                skip,
                served,
            } => trace!(
                "GetBlockHeaders origin={} amount={} skip={}: served {}",
                origin,
                amount,
                skip,
                served
            ),
            SessionEvent::BodiesServed {
                requested,
                served,
                bytes,
            } => trace!(
                "GetBlockBodies for {} hashes: served {} ({} bytes)",
                requested,
                served,
                bytes
            ),
            SessionEvent::UnknownMessage { code } => {
                trace!("unrecognized message code {:#04x}, ignoring", code)
            }
            SessionEvent::SyncComplete { height, hash } => {
                info!("peer synced to our head {} ({})", height, hash)
            }
            SessionEvent::ActionExecuted(action) => match action {
                ExecutedAction::Transactions { count } => {
                    info!("sent new transaction msg, txs={}", count)
                }
                ExecutedAction::Block {
                    number,
                    hash,
                    total_difficulty,
                } => info!(
                    "sent new block msg, height={} hash={} td={}",
                    number, hash, total_difficulty
                ),
                ExecutedAction::Sleep(duration) => info!("slept for {:?}", duration),
                ExecutedAction::Terminate => info!("terminating"),
            },
        }
    }
}

/// Keeps every event in memory, clones share the same record.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl RecordingObserver {
    /// Returns a copy of the events recorded so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_event(&self, event: &SessionEvent) {
        self.events.lock().push(event.clone());
    }
}
