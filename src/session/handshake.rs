use std::{io, time::Duration};

use tokio::time::timeout;

use crate::{
    chain::ChainAccessor,
    protocol::{
        message::{channel::MessageChannel, constants::*, RawMessage},
        payload::{codec::Codec, Status},
    },
    session::HandshakeError,
};

/// Sends our [`Status`], waits for the peer's and checks that both sides are on the same chain.
///
/// Returns the peer's status.
pub(super) async fn exchange_status<Ch, C>(
    channel: &mut Ch,
    chain: &C,
    deadline: Duration,
) -> Result<Status, HandshakeError>
where
    Ch: MessageChannel,
    C: ChainAccessor,
{
    let ours = chain.identity().status();

    let exchange = async {
        channel
            .write_message(RawMessage::encode(STATUS_CODE, &ours)?)
            .await?;

        let reply = channel.read_message().await?;
        Ok::<_, io::Error>(reply)
    };

    let reply = timeout(deadline, exchange)
        .await
        .map_err(|_| HandshakeError::Timeout(deadline))??;

    if reply.code != STATUS_CODE {
        return Err(HandshakeError::UnexpectedMessage(reply.code));
    }

    let theirs = Status::decode(&mut &reply.payload[..]).map_err(HandshakeError::Decode)?;

    if theirs.protocol_version != ours.protocol_version {
        return Err(HandshakeError::ProtocolVersionMismatch {
            ours: ours.protocol_version,
            theirs: theirs.protocol_version,
        });
    }
    if theirs.network_id != ours.network_id {
        return Err(HandshakeError::NetworkMismatch {
            ours: ours.network_id,
            theirs: theirs.network_id,
        });
    }
    if theirs.genesis != ours.genesis {
        return Err(HandshakeError::GenesisMismatch {
            ours: ours.genesis,
            theirs: theirs.genesis,
        });
    }

    Ok(theirs)
}
