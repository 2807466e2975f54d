//! Message and header types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{PacketError, ID_LENGTH, MAX_PAYLOAD_LEN};

// ============================================================================
// Node Identifier
// ============================================================================

/// Four-digit identifier of a gateway or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId([u8; ID_LENGTH]);

impl NodeId {
    /// Build an identifier from raw wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() != ID_LENGTH || !bytes.iter().all(u8::is_ascii_digit) {
            return Err(PacketError::InvalidNodeId(
                String::from_utf8_lossy(bytes).into_owned(),
            ));
        }
        let mut id = [0u8; ID_LENGTH];
        id.copy_from_slice(bytes);
        Ok(NodeId(id))
    }

    /// The identifier as wire bytes.
    pub fn as_bytes(&self) -> &[u8; ID_LENGTH] {
        &self.0
    }

    /// The identifier as text.
    pub fn as_str(&self) -> &str {
        // Only ASCII digits are ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl FromStr for NodeId {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeId::from_bytes(s.as_bytes())
    }
}

impl TryFrom<String> for NodeId {
    type Error = PacketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.as_str().to_string()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Op Codes
// ============================================================================

/// Purpose of a message. Ordinals are the wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    /// Gateway announces itself and its configuration.
    #[serde(rename = "GATEWAY_INIT")]
    GatewayInit = 0,
    /// Node advertises its identity and type.
    #[serde(rename = "NODE_INIT")]
    NodeInit = 1,
    /// Gateway accepted the node.
    #[serde(rename = "INIT_SUCCESS")]
    InitSuccess = 2,
    /// Gateway instructs an actuator.
    #[serde(rename = "COMMAND")]
    Command = 3,
    /// Node reports the outcome of a command.
    #[serde(rename = "COMMAND_EXEC")]
    CommandExec = 4,
    /// Gateway asks for a sensor reading.
    #[serde(rename = "SENSOR_DATA_REQ")]
    SensorDataReq = 5,
    /// Node delivers a sensor reading.
    #[serde(rename = "SENSOR_DATA")]
    SensorData = 6,
    /// Acknowledgement.
    #[serde(rename = "ACK")]
    Ack = 7,
}

impl OpCode {
    /// Every op code in ordinal order.
    pub const ALL: [OpCode; 8] = [
        OpCode::GatewayInit,
        OpCode::NodeInit,
        OpCode::InitSuccess,
        OpCode::Command,
        OpCode::CommandExec,
        OpCode::SensorDataReq,
        OpCode::SensorData,
        OpCode::Ack,
    ];

    /// Wire ordinal.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Protocol name of the op code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OpCode::GatewayInit => "GATEWAY_INIT",
            OpCode::NodeInit => "NODE_INIT",
            OpCode::InitSuccess => "INIT_SUCCESS",
            OpCode::Command => "COMMAND",
            OpCode::CommandExec => "COMMAND_EXEC",
            OpCode::SensorDataReq => "SENSOR_DATA_REQ",
            OpCode::SensorData => "SENSOR_DATA",
            OpCode::Ack => "ACK",
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = PacketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        OpCode::ALL
            .get(value as usize)
            .copied()
            .ok_or(PacketError::UnknownOpCode(value))
    }
}

impl FromStr for OpCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpCode::ALL
            .iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown op code: {s}"))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Data Kinds
// ============================================================================

/// Semantic category of a payload. Ordinals are the wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataKind {
    /// Temperature sensor.
    #[serde(rename = "TEMP_S")]
    Temperature = 0,
    /// Light sensor.
    #[serde(rename = "LIGHT_S")]
    Light = 1,
    /// Soil moisture sensor.
    #[serde(rename = "MOISTURE_S")]
    Moisture = 2,
    /// PIR motion sensor.
    #[serde(rename = "PIR_S")]
    Motion = 3,
    /// First actuator channel.
    #[serde(rename = "AC1")]
    Actuator1 = 4,
    /// Second actuator channel.
    #[serde(rename = "AC2")]
    Actuator2 = 5,
    /// Not applicable.
    #[serde(rename = "NO_HEADER")]
    NoHeader = 6,
}

impl DataKind {
    /// Every data kind in ordinal order.
    pub const ALL: [DataKind; 7] = [
        DataKind::Temperature,
        DataKind::Light,
        DataKind::Moisture,
        DataKind::Motion,
        DataKind::Actuator1,
        DataKind::Actuator2,
        DataKind::NoHeader,
    ];

    /// Wire ordinal.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Protocol name of the data kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataKind::Temperature => "TEMP_S",
            DataKind::Light => "LIGHT_S",
            DataKind::Moisture => "MOISTURE_S",
            DataKind::Motion => "PIR_S",
            DataKind::Actuator1 => "AC1",
            DataKind::Actuator2 => "AC2",
            DataKind::NoHeader => "NO_HEADER",
        }
    }

    /// Whether this tag names a sensor.
    pub fn is_sensor(&self) -> bool {
        matches!(
            self,
            DataKind::Temperature | DataKind::Light | DataKind::Moisture | DataKind::Motion
        )
    }

    /// Whether this tag names an actuator.
    pub fn is_actuator(&self) -> bool {
        matches!(self, DataKind::Actuator1 | DataKind::Actuator2)
    }
}

impl TryFrom<u8> for DataKind {
    type Error = PacketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DataKind::ALL
            .get(value as usize)
            .copied()
            .ok_or(PacketError::UnknownDataKind(value))
    }
}

impl FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataKind::ALL
            .iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown data kind: {s}"))
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Fixed-width fields that precede the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Origin or target of the message.
    pub node_id: NodeId,
    /// Purpose of the message.
    pub op_code: OpCode,
    /// Category of the payload.
    pub data_kind: DataKind,
    /// Number of payload bytes.
    pub payload_length: u16,
}

/// A complete decoded frame.
///
/// The start and end markers are constants and are not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Header fields.
    pub header: MessageHeader,
    /// Payload bytes, exactly `header.payload_length` long.
    pub payload: Vec<u8>,
}

impl Message {
    /// Create a message, deriving the length field from the payload.
    pub fn new(
        node_id: NodeId,
        op_code: OpCode,
        data_kind: DataKind,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Self, PacketError> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(PacketError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }
        Ok(Message {
            header: MessageHeader {
                node_id,
                op_code,
                data_kind,
                payload_length: payload.len() as u16,
            },
            payload,
        })
    }

    /// Origin or target of the message.
    pub fn node_id(&self) -> NodeId {
        self.header.node_id
    }

    /// Purpose of the message.
    pub fn op_code(&self) -> OpCode {
        self.header.op_code
    }

    /// Category of the payload.
    pub fn data_kind(&self) -> DataKind {
        self.header.data_kind
    }

    /// Payload rendered as text, replacing invalid UTF-8.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}
