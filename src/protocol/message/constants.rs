// Message dimensions.
pub const HEADER_LEN: usize = 13;
pub const MAX_MESSAGE_LEN: usize = 10 * 1024 * 1024;

// Network version identifier.
pub const MAGIC: [u8; 4] = [0xba, 0x20, 0x0c, 0xa0];

// The only protocol version spoken.
pub const PROTOCOL_VERSION: u32 = 64;

// Message codes.
pub const STATUS_CODE: u8 = 0x00;
pub const NEW_BLOCK_HASHES_CODE: u8 = 0x01;
pub const TRANSACTIONS_CODE: u8 = 0x02;
pub const GET_BLOCK_HEADERS_CODE: u8 = 0x03;
pub const BLOCK_HEADERS_CODE: u8 = 0x04;
pub const GET_BLOCK_BODIES_CODE: u8 = 0x05;
pub const BLOCK_BODIES_CODE: u8 = 0x06;
pub const NEW_BLOCK_CODE: u8 = 0x07;
