//! Frame encoding and decoding.
//!
//! Fields are packed directly from the typed header; the ASCII-hex form only
//! exists in the output buffer.

use crate::{
    DataKind, MarkerField, Message, MessageHeader, NodeId, OpCode, PacketError, END_MARKER,
    HEADER_LEN, HEX_BYTE_LEN, ID_LENGTH, MAX_PAYLOAD_LEN, START_MARKER,
};

// Field offsets within a frame.
const ID_OFFSET: usize = HEX_BYTE_LEN;
const OP_CODE_OFFSET: usize = ID_OFFSET + ID_LENGTH;
const DATA_KIND_OFFSET: usize = OP_CODE_OFFSET + HEX_BYTE_LEN;
const LENGTH_OFFSET: usize = DATA_KIND_OFFSET + HEX_BYTE_LEN;

/// Total wire length of a frame carrying `payload_len` bytes.
pub fn frame_len(payload_len: usize) -> usize {
    HEADER_LEN + payload_len + HEX_BYTE_LEN
}

// ============================================================================
// Encoding Functions
// ============================================================================

/// Encode a frame from its parts.
pub fn encode_message(
    id: &NodeId,
    op_code: OpCode,
    data_kind: DataKind,
    payload: &[u8],
) -> Result<Vec<u8>, PacketError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(PacketError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }
    let length = payload.len() as u16;

    let mut buf = Vec::with_capacity(frame_len(payload.len()));
    push_hex(&mut buf, &[START_MARKER]);
    buf.extend_from_slice(id.as_bytes());
    push_hex(&mut buf, &[op_code.to_byte()]);
    push_hex(&mut buf, &[data_kind.to_byte()]);
    push_hex(&mut buf, &length.to_le_bytes());
    buf.extend_from_slice(payload);
    push_hex(&mut buf, &[END_MARKER]);
    Ok(buf)
}

/// Encode a decoded message back to its wire form.
pub fn encode(message: &Message) -> Result<Vec<u8>, PacketError> {
    let header = &message.header;
    if header.payload_length as usize != message.payload.len() {
        return Err(PacketError::LengthMismatch {
            declared: header.payload_length,
            actual: message.payload.len(),
        });
    }
    encode_message(&header.node_id, header.op_code, header.data_kind, &message.payload)
}

fn push_hex(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(hex::encode_upper(bytes).as_bytes());
}

// ============================================================================
// Decoding Functions
// ============================================================================

/// Check whether `raw` begins with the hex-encoded start marker.
///
/// Intended as a cheap filter in a receive loop before a full decode.
pub fn is_start_marker_present(raw: &[u8]) -> bool {
    matches!(read_hex_byte(raw, 0), Ok(START_MARKER))
}

/// Parse only the fixed-width header of a frame.
pub fn decode_header(raw: &[u8]) -> Result<MessageHeader, PacketError> {
    if raw.len() < HEX_BYTE_LEN {
        return Err(PacketError::Truncated {
            needed: HEX_BYTE_LEN,
            actual: raw.len(),
        });
    }
    if !is_start_marker_present(raw) {
        return Err(PacketError::framing(MarkerField::Start, &raw[..HEX_BYTE_LEN]));
    }
    if raw.len() < HEADER_LEN {
        return Err(PacketError::Truncated {
            needed: HEADER_LEN,
            actual: raw.len(),
        });
    }

    let node_id = NodeId::from_bytes(&raw[ID_OFFSET..OP_CODE_OFFSET])?;
    let op_code = OpCode::try_from(read_hex_byte(raw, OP_CODE_OFFSET)?)?;
    let data_kind = DataKind::try_from(read_hex_byte(raw, DATA_KIND_OFFSET)?)?;
    let length_lo = read_hex_byte(raw, LENGTH_OFFSET)?;
    let length_hi = read_hex_byte(raw, LENGTH_OFFSET + HEX_BYTE_LEN)?;

    Ok(MessageHeader {
        node_id,
        op_code,
        data_kind,
        payload_length: u16::from_le_bytes([length_lo, length_hi]),
    })
}

/// Decode a complete frame.
///
/// Bytes after the end marker are ignored.
pub fn decode_message(raw: &[u8]) -> Result<Message, PacketError> {
    let header = decode_header(raw)?;
    let payload_len = header.payload_length as usize;

    let needed = frame_len(payload_len);
    if raw.len() < needed {
        return Err(PacketError::Truncated {
            needed,
            actual: raw.len(),
        });
    }

    let end_offset = HEADER_LEN + payload_len;
    if !matches!(read_hex_byte(raw, end_offset), Ok(END_MARKER)) {
        return Err(PacketError::framing(
            MarkerField::End,
            &raw[end_offset..end_offset + HEX_BYTE_LEN],
        ));
    }

    Ok(Message {
        header,
        payload: raw[HEADER_LEN..end_offset].to_vec(),
    })
}

fn read_hex_byte(raw: &[u8], offset: usize) -> Result<u8, PacketError> {
    let field = raw
        .get(offset..offset + HEX_BYTE_LEN)
        .ok_or(PacketError::Truncated {
            needed: offset + HEX_BYTE_LEN,
            actual: raw.len(),
        })?;
    let mut out = [0u8; 1];
    hex::decode_to_slice(field, &mut out).map_err(|_| PacketError::InvalidHex { offset })?;
    Ok(out[0])
}

impl Message {
    /// Encode this message to its wire form.
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        encode(self)
    }

    /// Decode a message from a received buffer.
    pub fn decode(raw: &[u8]) -> Result<Self, PacketError> {
        decode_message(raw)
    }
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn node_id() -> impl Strategy<Value = NodeId> {
        "[0-9]{4}".prop_map(|s| s.parse().unwrap())
    }

    fn message(max_payload: usize) -> impl Strategy<Value = Message> {
        (
            node_id(),
            prop::sample::select(OpCode::ALL.to_vec()),
            prop::sample::select(DataKind::ALL.to_vec()),
            prop::collection::vec(any::<u8>(), 0..=max_payload),
        )
            .prop_map(|(id, op, kind, payload)| Message::new(id, op, kind, payload).unwrap())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn message_roundtrip(msg in message(8192)) {
            let frame = msg.encode().unwrap();
            prop_assert_eq!(frame.len(), frame_len(msg.payload.len()));
            prop_assert_eq!(Message::decode(&frame).unwrap(), msg);
        }

        #[test]
        fn header_hex_is_uppercase(msg in message(64)) {
            let frame = msg.encode().unwrap();
            let header = &frame[..HEADER_LEN];
            prop_assert!(!header.iter().any(u8::is_ascii_lowercase));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn strict_prefixes_are_truncated(msg in message(1024)) {
            let frame = msg.encode().unwrap();
            for len in 0..frame.len() {
                let err = decode_message(&frame[..len]).unwrap_err();
                prop_assert!(err.is_truncated(), "prefix {} gave {:?}", len, err);
            }
        }
    }
}
