//! Answers to the peer's chain-sync queries, and the sync tracker.

use std::io;

use bytes::BytesMut;

use crate::{
    chain::ChainAccessor,
    protocol::{
        message::{channel::MessageChannel, constants::*, RawMessage},
        payload::{
            codec::{encode_borrowed_list, encode_raw_list, Codec, ListDecoder},
            Hash, HashOrNumber, Header, HeaderQuery, NewBlockHashes,
        },
    },
    session::{
        observer::{SessionEvent, SessionObserver},
        SessionError,
    },
};

/// Serves a "get block headers" request.
pub(super) async fn serve_headers<Ch, C, O>(
    channel: &mut Ch,
    chain: &C,
    observer: &O,
    message: &RawMessage,
) -> Result<(), SessionError>
where
    Ch: MessageChannel,
    C: ChainAccessor,
    O: SessionObserver,
{
    let query = HeaderQuery::decode(&mut &message.payload[..]).map_err(|source| {
        SessionError::Decode {
            code: message.code,
            source,
        }
    })?;

    let (start, headers) = collect_headers(chain, query)?;

    let mut payload = BytesMut::new();
    encode_borrowed_list(&headers, &mut payload).map_err(|source| SessionError::Send {
        code: BLOCK_HEADERS_CODE,
        source,
    })?;

    observer.on_event(&SessionEvent::HeadersServed {
        origin: start,
        amount: query.amount,
        skip: query.skip,
        served: headers.len(),
    });

    send_raw(channel, RawMessage::new(BLOCK_HEADERS_CODE, payload.freeze())).await
}

/// Resolves the query origin to a height and walks the chain from there.
///
/// Returns the resolved starting height alongside the headers found. Heights without a header
/// are skipped, the head plays no part: the chain may hold headers past it.
pub(super) fn collect_headers<C: ChainAccessor>(
    chain: &C,
    query: HeaderQuery,
) -> Result<(u64, Vec<&Header>), SessionError> {
    if query.reverse {
        return Err(SessionError::ReverseNotSupported);
    }

    let start = match query.origin {
        HashOrNumber::Number(number) => number,
        HashOrNumber::Hash(hash) => match chain.header_by_hash(&hash) {
            Some(header) => header.number,
            None => return Err(SessionError::UnknownHash(hash)),
        },
    };

    let step = query.skip.saturating_add(1);

    let mut headers = Vec::new();
    let mut number = start;
    for _ in 0..query.amount {
        if let Some(header) = chain.header_by_number(number) {
            headers.push(header);
        }

        number = match number.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }

    Ok((start, headers))
}

/// Serves a "get block bodies" request, hashes are decoded one by one from the list.
pub(super) async fn serve_bodies<Ch, C, O>(
    channel: &mut Ch,
    chain: &C,
    observer: &O,
    message: &RawMessage,
) -> Result<(), SessionError>
where
    Ch: MessageChannel,
    C: ChainAccessor,
    O: SessionObserver,
{
    let decode_error = |source: io::Error| SessionError::Decode {
        code: message.code,
        source,
    };

    let mut bytes = &message.payload[..];
    let mut hashes = ListDecoder::new(&mut bytes).map_err(decode_error)?;

    let mut requested = 0;
    let mut total_bytes = 0;
    let mut bodies = Vec::new();
    while let Some(hash) = hashes.next_item::<Hash>().map_err(decode_error)? {
        requested += 1;

        match chain.body_encoded(&hash) {
            Some(body) if !body.is_empty() => {
                total_bytes += body.len();
                bodies.push(body);
            }
            _ => {}
        }
    }

    let mut payload = BytesMut::new();
    encode_raw_list(&bodies, &mut payload).map_err(|source| SessionError::Send {
        code: BLOCK_BODIES_CODE,
        source,
    })?;

    observer.on_event(&SessionEvent::BodiesServed {
        requested,
        served: bodies.len(),
        bytes: total_bytes,
    });

    send_raw(channel, RawMessage::new(BLOCK_BODIES_CODE, payload.freeze())).await
}

/// Checks a block announcement against our head.
///
/// Returns the new sync status, once complete it stays complete. Scanning stops at the first
/// announced block whose height is our head height.
pub(super) fn track_sync<C, O>(
    chain: &C,
    observer: &O,
    message: &RawMessage,
    sync_complete: bool,
) -> Result<bool, SessionError>
where
    C: ChainAccessor,
    O: SessionObserver,
{
    let announced = NewBlockHashes::decode(&mut &message.payload[..]).map_err(|source| {
        SessionError::Decode {
            code: message.code,
            source,
        }
    })?;

    if sync_complete {
        return Ok(true);
    }

    let head = chain.current_head_height();
    match announced.0.iter().find(|entry| entry.number == head) {
        Some(entry) => {
            observer.on_event(&SessionEvent::SyncComplete {
                height: head,
                hash: entry.hash,
            });
            Ok(true)
        }
        None => Ok(false),
    }
}

pub(super) async fn send_raw<Ch: MessageChannel>(
    channel: &mut Ch,
    message: RawMessage,
) -> Result<(), SessionError> {
    let code = message.code;
    channel
        .write_message(message)
        .await
        .map_err(|source| SessionError::Send { code, source })
}

/// Encodes `payload` and sends it tagged with `code`.
pub(super) async fn send<Ch: MessageChannel, T: Codec>(
    channel: &mut Ch,
    code: u8,
    payload: &T,
) -> Result<(), SessionError> {
    let message =
        RawMessage::encode(code, payload).map_err(|source| SessionError::Send { code, source })?;

    send_raw(channel, message).await
}
