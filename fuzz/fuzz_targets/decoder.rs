#![no_main]
use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;
use ziggurat_bazooka::protocol::message::{codec::MessageCodec, Message};

fuzz_target!(|data: &[u8]| {
    let mut codec = MessageCodec::default();
    let mut buffer = BytesMut::from(data);
    while let Ok(Some(raw)) = codec.decode(&mut buffer) {
        let _ = Message::decode(&raw);
    }
});
