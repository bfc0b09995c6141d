//! The per-connection control loop.
//!
//! A session opens with a status handshake, then plays a well-behaved peer answering the
//! target's header and body queries until the target announces our head block. From then on
//! inbound traffic is ignored and the session executes attack [`Action`]s, one at a time, until
//! one of them terminates it.

mod action;
mod error;
mod handshake;
pub mod observer;
mod responder;

use std::time::Duration;

use tracing::*;

pub use action::{Action, ActionSource};
pub use error::{HandshakeError, SessionError};

use crate::{
    chain::ChainAccessor,
    protocol::message::{channel::MessageChannel, constants::*, RawMessage},
    session::observer::{SessionEvent, SessionObserver, TracingObserver},
};

/// Total difficulty declared with crafted blocks unless an action says otherwise.
pub const DEFAULT_DECLARED_DIFFICULTY: u128 = 1000;
/// How long the peer gets to answer our status.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// The phases of a session, in the only order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Handshaking,
    Syncing,
    Attacking,
    Done,
    Failed,
}

/// How a session ended, when it didn't fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A [`Action::Terminate`] was executed.
    ///
    /// **The embedding process is expected to exit**: the script asked for it and no later
    /// session can pick up where this one left off.
    TerminateProcess,
    /// The action queue was closed without a terminate action.
    ActionsExhausted,
}

/// Tunables of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Total difficulty declared with [`Action::SendBlock`] when the action carries none.
    pub declared_difficulty: u128,
    pub handshake_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            declared_difficulty: DEFAULT_DECLARED_DIFFICULTY,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// A scripted session against a single peer.
pub struct Session<C, A, O = TracingObserver> {
    chain: C,
    actions: A,
    observer: O,
    config: SessionConfig,
    phase: Phase,
    sync_complete: bool,
}

impl<C, A> Session<C, A>
where
    C: ChainAccessor,
    A: ActionSource,
{
    /// Creates a session serving `chain` and attacking with `actions`, logging through `tracing`.
    pub fn new(chain: C, actions: A) -> Self {
        Self::with_observer(chain, actions, TracingObserver)
    }
}

impl<C, A, O> Session<C, A, O>
where
    C: ChainAccessor,
    A: ActionSource,
    O: SessionObserver,
{
    /// Creates a session reporting its events to `observer`.
    pub fn with_observer(chain: C, actions: A, observer: O) -> Self {
        Self {
            chain,
            actions,
            observer,
            config: SessionConfig::default(),
            phase: Phase::Handshaking,
            sync_complete: false,
        }
    }

    /// Sets the session's [`SessionConfig`].
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the session over `channel` until it terminates or fails.
    ///
    /// The channel is closed and dropped whatever the result.
    pub async fn run<Ch: MessageChannel>(
        mut self,
        mut channel: Ch,
    ) -> Result<SessionOutcome, SessionError> {
        let result = self.drive(&mut channel).await;

        match &result {
            Ok(outcome) => {
                debug!("session ended: {:?}", outcome);
                self.enter(Phase::Done);
            }
            Err(err) => {
                if let SessionError::Handshake(cause) = err {
                    self.observer.on_event(&SessionEvent::HandshakeFailed {
                        cause: cause.to_string(),
                    });
                }
                self.enter(Phase::Failed);
            }
        }

        if let Err(err) = channel.close().await {
            debug!("couldn't close the channel cleanly: {}", err);
        }

        result
    }

    async fn drive<Ch: MessageChannel>(
        &mut self,
        channel: &mut Ch,
    ) -> Result<SessionOutcome, SessionError> {
        self.observer.on_event(&SessionEvent::PhaseChanged(self.phase));
        let peer =
            handshake::exchange_status(channel, &self.chain, self.config.handshake_timeout).await?;
        self.observer.on_event(&SessionEvent::HandshakeCompleted { peer });

        self.enter(Phase::Syncing);
        while !self.sync_complete {
            let message = channel
                .read_message()
                .await
                .map_err(SessionError::Receive)?;
            self.dispatch(message, channel).await?;
        }

        self.enter(Phase::Attacking);
        loop {
            let action = match self.actions.next_action().await {
                Some(action) => action,
                None => return Ok(SessionOutcome::ActionsExhausted),
            };

            let executed = action::execute(
                action,
                channel,
                &self.observer,
                self.config.declared_difficulty,
            )
            .await?;

            if let Some(outcome) = executed {
                return Ok(outcome);
            }
        }
    }

    /// Routes an inbound message to its responder while syncing.
    async fn dispatch<Ch: MessageChannel>(
        &mut self,
        message: RawMessage,
        channel: &mut Ch,
    ) -> Result<(), SessionError> {
        match message.code {
            GET_BLOCK_HEADERS_CODE => {
                responder::serve_headers(channel, &self.chain, &self.observer, &message).await
            }
            GET_BLOCK_BODIES_CODE => {
                responder::serve_bodies(channel, &self.chain, &self.observer, &message).await
            }
            NEW_BLOCK_HASHES_CODE => {
                self.sync_complete = responder::track_sync(
                    &self.chain,
                    &self.observer,
                    &message,
                    self.sync_complete,
                )?;
                Ok(())
            }
            code => {
                self.observer.on_event(&SessionEvent::UnknownMessage { code });
                Ok(())
            }
        }
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.observer.on_event(&SessionEvent::PhaseChanged(phase));
    }
}
