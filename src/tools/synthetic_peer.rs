//! A scripted stand-in for the target node.
//!
//! [`SyntheticPeer`] plays the other end of a session: it answers the status handshake, sends
//! whatever queries and announcements a test wants and decodes what the session sends back.

use std::{io, time::Duration};

use futures_util::{sink::SinkExt, TryStreamExt};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    time::timeout,
};
use tokio_util::codec::Framed;
use tracing::*;

use crate::protocol::{
    message::{channel::framed, codec::MessageCodec, constants::STATUS_CODE, Message, RawMessage},
    payload::{codec::Codec, Status},
};

/// The target side of a session, over any byte stream.
pub struct SyntheticPeer<T> {
    stream: Framed<T, MessageCodec>,
}

impl<T> SyntheticPeer<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: T) -> Self {
        Self {
            stream: framed(stream),
        }
    }

    /// Waits for the session's status and replies with `ours`.
    ///
    /// Returns the session's status.
    pub async fn handshake(&mut self, ours: Status) -> io::Result<Status> {
        let theirs = self.recv_raw().await?;
        if theirs.code != STATUS_CODE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected status, got message code {:#04x}", theirs.code),
            ));
        }
        let theirs = Status::decode(&mut &theirs.payload[..])?;

        self.send_raw(RawMessage::encode(STATUS_CODE, &ours)?).await?;

        Ok(theirs)
    }

    pub async fn send(&mut self, message: Message) -> io::Result<()> {
        trace!("synthetic peer sending {}", message);
        self.send_raw(message.to_raw()?).await
    }

    pub async fn send_raw(&mut self, message: RawMessage) -> io::Result<()> {
        self.stream.send(message).await
    }

    /// Waits for the next message and decodes it.
    pub async fn recv(&mut self) -> io::Result<Message> {
        let raw = self.recv_raw().await?;
        let message = Message::decode(&raw)?;
        trace!("synthetic peer received {}", message);

        Ok(message)
    }

    pub async fn recv_raw(&mut self) -> io::Result<RawMessage> {
        match self.stream.try_next().await? {
            Some(message) => Ok(message),
            None => Err(io::ErrorKind::UnexpectedEof.into()),
        }
    }

    /// Like [`recv`](Self::recv), giving up after `duration`.
    pub async fn recv_timeout(&mut self, duration: Duration) -> io::Result<Message> {
        match timeout(duration, self.recv()).await {
            Ok(result) => result,
            Err(_) => Err(io::ErrorKind::TimedOut.into()),
        }
    }

    /// Checks that nothing arrives within `duration`.
    ///
    /// A closed connection counts as silence.
    pub async fn expect_silence(&mut self, duration: Duration) -> io::Result<()> {
        match timeout(duration, self.recv_raw()).await {
            Err(_) => Ok(()),
            Ok(Err(err)) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(()),
            Ok(Err(err)) => Err(err),
            Ok(Ok(message)) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected {:?}", message),
            )),
        }
    }

    /// Waits for the session to close the connection, skipping anything sent before that.
    pub async fn wait_for_disconnect(&mut self, duration: Duration) -> io::Result<()> {
        let drain = async {
            loop {
                match self.stream.try_next().await {
                    Ok(Some(_)) => continue,
                    Ok(None) => return Ok(()),
                    Err(err) => return Err(err),
                }
            }
        };

        timeout(duration, drain)
            .await
            .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))?
    }
}
