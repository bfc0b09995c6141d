//! Dials the target and hands the connection to a [`Session`].

use std::{fmt, io, time::Duration};

use tokio::{net::TcpStream, time::timeout};
use tokio_util::codec::Framed;
use tracing::*;

use crate::{
    chain::ChainAccessor,
    protocol::message::{channel::framed, codec::MessageCodec},
    session::{observer::SessionObserver, ActionSource, Session, SessionError, SessionOutcome},
    setup::identity::NodeAddr,
};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors while bootstrapping the connection or running the session over it.
#[derive(Debug)]
pub enum BootstrapError {
    Connect(io::Error),
    Session(SessionError),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Connect(err) => write!(f, "couldn't connect to the target: {}", err),
            BootstrapError::Session(err) => write!(f, "session failed: {}", err),
        }
    }
}

impl std::error::Error for BootstrapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BootstrapError::Connect(err) => Some(err),
            BootstrapError::Session(err) => Some(err),
        }
    }
}

impl From<SessionError> for BootstrapError {
    fn from(err: SessionError) -> Self {
        BootstrapError::Session(err)
    }
}

/// A single outbound connection to the target node.
#[derive(Debug, Clone, Copy)]
pub struct PeerBootstrap {
    target: NodeAddr,
    connect_timeout: Duration,
}

impl PeerBootstrap {
    pub fn new(target: NodeAddr) -> Self {
        Self {
            target,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn target(&self) -> &NodeAddr {
        &self.target
    }

    /// Opens the framed connection to the target.
    pub async fn connect(&self) -> io::Result<Framed<TcpStream, MessageCodec>> {
        let stream = timeout(self.connect_timeout, TcpStream::connect(self.target.addr))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connection timed out"))??;
        stream.set_nodelay(true)?;

        debug!("connected to {}", self.target);

        Ok(framed(stream))
    }

    /// Connects to the target and runs `session` over the connection.
    pub async fn run<C, A, O>(
        &self,
        session: Session<C, A, O>,
    ) -> Result<SessionOutcome, BootstrapError>
    where
        C: ChainAccessor,
        A: ActionSource,
        O: SessionObserver,
    {
        info!("attacking {}", self.target);
        let channel = self.connect().await.map_err(BootstrapError::Connect)?;

        Ok(session.run(channel).await?)
    }
}
