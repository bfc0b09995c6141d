use std::{fmt, io, time::Duration};

use crate::protocol::payload::Hash;

/// An [`Error`](std::error::Error) type for the [`Status`](crate::protocol::payload::Status)
/// exchange that opens every session.
#[derive(Debug)]
pub enum HandshakeError {
    /// The channel failed while exchanging statuses.
    Io(io::Error),
    /// The peer didn't reply within the handshake timeout.
    Timeout(Duration),
    /// The peer replied with something other than a status.
    UnexpectedMessage(u8),
    /// The peer's status couldn't be decoded.
    Decode(io::Error),
    ProtocolVersionMismatch { ours: u32, theirs: u32 },
    NetworkMismatch { ours: u64, theirs: u64 },
    GenesisMismatch { ours: Hash, theirs: Hash },
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::Io(err) => write!(f, "{}", err),
            HandshakeError::Timeout(duration) => {
                write!(f, "no status after {0:.3}s", duration.as_secs_f64())
            }
            HandshakeError::UnexpectedMessage(code) => {
                write!(f, "expected status, got message code {:#04x}", code)
            }
            HandshakeError::Decode(err) => write!(f, "malformed status: {}", err),
            HandshakeError::ProtocolVersionMismatch { ours, theirs } => {
                write!(f, "protocol version mismatch: {} (ours) != {}", ours, theirs)
            }
            HandshakeError::NetworkMismatch { ours, theirs } => {
                write!(f, "network id mismatch: {} (ours) != {}", ours, theirs)
            }
            HandshakeError::GenesisMismatch { ours, theirs } => {
                write!(f, "genesis mismatch: {} (ours) != {}", ours, theirs)
            }
        }
    }
}

impl std::error::Error for HandshakeError {}

impl From<io::Error> for HandshakeError {
    fn from(err: io::Error) -> Self {
        HandshakeError::Io(err)
    }
}

/// Errors that end a session. None of them are retried.
#[derive(Debug)]
pub enum SessionError {
    Handshake(HandshakeError),
    /// The connection failed while waiting for the next message.
    Receive(io::Error),
    /// An inbound payload was malformed.
    Decode { code: u8, source: io::Error },
    /// The peer asked for headers in descending order.
    ReverseNotSupported,
    /// A header query started from a hash the chain doesn't know.
    UnknownHash(Hash),
    /// A message couldn't be encoded or written.
    Send { code: u8, source: io::Error },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Handshake(err) => write!(f, "handshake failed: {}", err),
            SessionError::Receive(err) => {
                write!(f, "failed to receive message from peer: {}", err)
            }
            SessionError::Decode { code, source } => {
                write!(f, "failed to decode message {:#04x}: {}", code, source)
            }
            SessionError::ReverseNotSupported => f.write_str("reverse not supported"),
            SessionError::UnknownHash(hash) => {
                write!(f, "could not find header with hash {}", hash)
            }
            SessionError::Send { code, source } => {
                write!(f, "failed to send message {:#04x}: {}", code, source)
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Handshake(err) => Some(err),
            SessionError::Receive(err) => Some(err),
            SessionError::Decode { source, .. } | SessionError::Send { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<HandshakeError> for SessionError {
    fn from(err: HandshakeError) -> Self {
        SessionError::Handshake(err)
    }
}
