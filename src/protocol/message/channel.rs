//! The duplex message stream a session runs over.

use std::io;

use futures_util::{sink::SinkExt, TryStreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::protocol::message::{codec::MessageCodec, RawMessage};

/// A duplex, message oriented connection to a single peer.
///
/// Both operations wait until they complete, a session only ever has one of them in flight.
#[async_trait::async_trait]
pub trait MessageChannel: Send {
    /// Waits for the next message from the peer.
    async fn read_message(&mut self) -> io::Result<RawMessage>;

    /// Sends one message to the peer, returning once it has been flushed.
    async fn write_message(&mut self, message: RawMessage) -> io::Result<()>;

    /// Releases the connection.
    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl<'a, Ch: MessageChannel + ?Sized> MessageChannel for &'a mut Ch {
    async fn read_message(&mut self) -> io::Result<RawMessage> {
        (**self).read_message().await
    }

    async fn write_message(&mut self, message: RawMessage) -> io::Result<()> {
        (**self).write_message(message).await
    }

    async fn close(&mut self) -> io::Result<()> {
        (**self).close().await
    }
}

#[async_trait::async_trait]
impl<T> MessageChannel for Framed<T, MessageCodec>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_message(&mut self) -> io::Result<RawMessage> {
        match self.try_next().await? {
            Some(message) => Ok(message),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by peer",
            )),
        }
    }

    async fn write_message(&mut self, message: RawMessage) -> io::Result<()> {
        self.send(message).await
    }

    async fn close(&mut self) -> io::Result<()> {
        SinkExt::<RawMessage>::close(self).await
    }
}

/// Wraps `stream` in the message framing.
pub fn framed<T: AsyncRead + AsyncWrite>(stream: T) -> Framed<T, MessageCodec> {
    Framed::new(stream, MessageCodec::default())
}
