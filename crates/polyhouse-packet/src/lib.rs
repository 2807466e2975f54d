//! PolyHouse LoRa packet encoding and decoding.
//!
//! Frames exchanged between the gateway and its nodes are ASCII text so they
//! survive the transceiver's string-oriented send path. Header fields are
//! packed as uppercase hex, the node identifier and payload travel verbatim.
//!
//! ## Frame Format
//!
//! | Field          | Wire size (chars) | Encoding                              |
//! |----------------|-------------------|---------------------------------------|
//! | start marker   | 2                 | hex of [`START_MARKER`]               |
//! | node id        | 4                 | literal decimal digits                |
//! | op code        | 2                 | hex of the [`OpCode`] ordinal         |
//! | data kind      | 2                 | hex of the [`DataKind`] ordinal       |
//! | payload length | 4                 | hex of a `u16`, low byte first        |
//! | payload        | N                 | literal bytes                         |
//! | end marker     | 2                 | hex of [`END_MARKER`]                 |
//!
//! There is no integrity check. A corrupted payload inside a well-formed frame
//! decodes successfully.

mod codec;
mod error;
mod types;

pub use codec::*;
pub use error::*;
pub use types::*;

/// Sentinel opening every frame.
pub const START_MARKER: u8 = 0x10;

/// Sentinel closing every frame.
pub const END_MARKER: u8 = 0x16;

/// Number of characters in a node identifier.
pub const ID_LENGTH: usize = 4;

/// Wire width of one hex-encoded byte.
pub const HEX_BYTE_LEN: usize = 2;

/// Wire length of everything before the payload.
pub const HEADER_LEN: usize = HEX_BYTE_LEN + ID_LENGTH + HEX_BYTE_LEN * 2 + HEX_BYTE_LEN * 2;

/// Largest payload the length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;
