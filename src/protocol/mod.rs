//! Wire types: message framing, codes and payloads.

pub mod message;
pub mod payload;
