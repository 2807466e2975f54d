//! Error types for polyhouse-node.

use polyhouse_packet::{DataKind, NodeId, OpCode, PacketError};
use thiserror::Error;

use crate::config::Role;
use crate::session::Mode;

/// Reasons the session refused a message or could not act.
///
/// None of these are fatal; the session keeps its previous state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Message did not come from the configured gateway.
    #[error("gateway id mismatch: expected {expected}, got {found}")]
    GatewayMismatch { expected: NodeId, found: NodeId },

    /// Op code is not handled in the current mode.
    #[error("op code {op_code} not expected in mode {mode}")]
    UnexpectedOpCode { mode: Mode, op_code: OpCode },

    /// Op code is only meaningful for the other role.
    #[error("op code {op_code} not valid for {role} node")]
    RoleMismatch { role: Role, op_code: OpCode },

    /// Message names a sensor or actuator this node does not have.
    #[error("data kind {kind} not configured on this node")]
    UnsupportedDataKind { kind: DataKind },

    /// Peripheral read or actuation failed.
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// Outgoing message could not be built.
    #[error(transparent)]
    Packet(#[from] PacketError),
}

impl SessionError {
    /// Short label for the error class, suitable for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::GatewayMismatch { .. } => "gateway_mismatch",
            SessionError::UnexpectedOpCode { .. } => "unexpected_op_code",
            SessionError::RoleMismatch { .. } => "role_mismatch",
            SessionError::UnsupportedDataKind { .. } => "unsupported_data_kind",
            SessionError::Hardware(_) => "hardware",
            SessionError::Packet(_) => "packet",
        }
    }
}

/// Failures reported by sensor or actuator hardware.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardwareError {
    /// No device of this kind is attached.
    #[error("no device attached for {0}")]
    Unavailable(DataKind),

    /// The device was present but the operation failed.
    #[error("device {kind} failed: {message}")]
    Failed { kind: DataKind, message: String },
}

/// Failures reported by the radio driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadioError {
    /// The peer end of the link is gone.
    #[error("radio link disconnected")]
    Disconnected,

    /// Driver-level transmit failure.
    #[error("radio transmit failed: {0}")]
    Transmit(String),
}

/// Errors loading or validating node configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid YAML for this schema.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The config parsed but breaks a consistency rule.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that stop a control loop step.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The radio refused a frame.
    #[error(transparent)]
    Radio(#[from] RadioError),

    /// An outgoing message could not be framed.
    #[error(transparent)]
    Packet(#[from] PacketError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        let err = SessionError::GatewayMismatch {
            expected: "2000".parse().unwrap(),
            found: "2001".parse().unwrap(),
        };
        assert_eq!(err.to_string(), "gateway id mismatch: expected 2000, got 2001");
        assert_eq!(err.kind(), "gateway_mismatch");

        let err = SessionError::UnexpectedOpCode {
            mode: Mode::Initializing,
            op_code: OpCode::Ack,
        };
        assert_eq!(err.to_string(), "op code ACK not expected in mode INITIALIZING");
    }

    #[test]
    fn test_hardware_error_converts() {
        let err: SessionError = HardwareError::Unavailable(DataKind::Light).into();
        assert_eq!(err.kind(), "hardware");
        assert!(err.to_string().contains("LIGHT_S"));
    }
}
