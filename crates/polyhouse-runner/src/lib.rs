//! Simulation harness for PolyHouse nodes.
//!
//! Pairs a [`NodeController`](polyhouse_node::NodeController) with a
//! [`ScriptedGateway`] over an in-memory radio link and steps both in lockstep.
//! Sensor values come from [`SimulatedPeripherals`], seeded so that runs are
//! reproducible.

pub mod gateway;
pub mod link;
pub mod peripherals;
pub mod simulation;

pub use gateway::{GatewayStats, GatewayTarget, ScriptedGateway};
pub use link::RadioChannels;
pub use peripherals::SimulatedPeripherals;
pub use simulation::{run_simulation, SimulationOptions, SimulationStats};

use polyhouse_node::{ConfigError, NodeError, RadioError};
use polyhouse_packet::PacketError;
use thiserror::Error;

/// Errors that can stop a simulation or CLI command.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The node control loop failed.
    #[error("node error: {0}")]
    Node(#[from] NodeError),

    /// The node configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A frame could not be encoded or decoded.
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    /// The gateway end of the link failed to send.
    #[error("radio error: {0}")]
    Radio(#[from] RadioError),

    /// Output could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
