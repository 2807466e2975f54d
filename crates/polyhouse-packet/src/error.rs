//! Error types for polyhouse-packet.

use thiserror::Error;

/// Which sentinel field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerField {
    /// Leading start marker.
    Start,
    /// Trailing end marker.
    End,
}

impl std::fmt::Display for MarkerField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerField::Start => f.write_str("start"),
            MarkerField::End => f.write_str("end"),
        }
    }
}

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// Start or end marker did not match its sentinel.
    ///
    /// `found` holds the raw field bytes as received (lossy UTF-8).
    #[error("Framing error: {field} marker mismatch (found {found:?})")]
    Framing {
        /// The marker that failed.
        field: MarkerField,
        /// Raw characters found in place of the marker.
        found: String,
    },

    /// Buffer shorter than the frame implied by its header.
    #[error("Truncated frame: need {needed} bytes, have {actual}")]
    Truncated {
        /// Bytes required to finish parsing.
        needed: usize,
        /// Bytes available.
        actual: usize,
    },

    /// A hex-encoded header field contained non-hex characters.
    #[error("Invalid hex field at offset {offset}")]
    InvalidHex {
        /// Byte offset of the field.
        offset: usize,
    },

    /// Op code ordinal outside the known catalog.
    #[error("Unknown op code: 0x{0:02X}")]
    UnknownOpCode(u8),

    /// Data kind ordinal outside the known catalog.
    #[error("Unknown data kind: 0x{0:02X}")]
    UnknownDataKind(u8),

    /// Identifier is not exactly four decimal digits.
    #[error("Invalid node id {0:?}: expected 4 decimal digits")]
    InvalidNodeId(String),

    /// Payload does not fit the 16-bit length field.
    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Actual size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Header length disagrees with the payload carried alongside it.
    #[error("Length mismatch: header declares {declared}, payload has {actual}")]
    LengthMismatch {
        /// Length stored in the header.
        declared: u16,
        /// Length of the payload.
        actual: usize,
    },
}

impl PacketError {
    /// Short label for the error class, suitable for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PacketError::Framing { .. } => "framing",
            PacketError::Truncated { .. } => "truncated",
            PacketError::InvalidHex { .. } => "invalid_hex",
            PacketError::UnknownOpCode(_) => "unknown_op_code",
            PacketError::UnknownDataKind(_) => "unknown_data_kind",
            PacketError::InvalidNodeId(_) => "invalid_node_id",
            PacketError::PayloadTooLarge { .. } => "payload_too_large",
            PacketError::LengthMismatch { .. } => "length_mismatch",
        }
    }

    /// Create a framing error from the raw marker bytes.
    pub fn framing(field: MarkerField, raw: &[u8]) -> Self {
        PacketError::Framing {
            field,
            found: String::from_utf8_lossy(raw).into_owned(),
        }
    }

    /// Whether this is a start/end marker mismatch.
    pub fn is_framing(&self) -> bool {
        matches!(self, PacketError::Framing { .. })
    }

    /// Whether the buffer ended before the frame did.
    pub fn is_truncated(&self) -> bool {
        matches!(self, PacketError::Truncated { .. })
    }
}
