//! Node configuration.
//!
//! Loaded once at startup and never changed afterwards.
//!
//! ```yaml
//! node_id: "1101"
//! gateway_id: "2000"
//! role: sensor
//! announcement: TempSensor Node
//! sensors: [TEMP_S]
//! broadcast_interval_ticks: 10
//! ```

use std::fmt;
use std::path::Path;

use polyhouse_packet::{DataKind, NodeId};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of ticks between identity announcements.
pub const DEFAULT_BROADCAST_INTERVAL_TICKS: u32 = 10;

/// What a node does once it is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Reports sensor readings on request.
    Sensor,
    /// Executes gateway commands.
    Actuator,
}

impl Role {
    /// Lowercase name of the role.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Sensor => "sensor",
            Role::Actuator => "actuator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and capabilities of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This node's identifier.
    pub node_id: NodeId,
    /// The only gateway this node will listen to.
    pub gateway_id: NodeId,
    /// Sensor or actuator.
    pub role: Role,
    /// Text carried in `NODE_INIT` announcements.
    #[serde(default = "default_announcement")]
    pub announcement: String,
    /// Attached sensors. The first is reported when a request names none.
    #[serde(default)]
    pub sensors: Vec<DataKind>,
    /// Attached actuators.
    #[serde(default)]
    pub actuators: Vec<DataKind>,
    /// Ticks between `NODE_INIT` announcements while broadcasting.
    #[serde(default = "default_broadcast_interval")]
    pub broadcast_interval_ticks: u32,
}

fn default_announcement() -> String {
    "PolyHouse Node".to_string()
}

fn default_broadcast_interval() -> u32 {
    DEFAULT_BROADCAST_INTERVAL_TICKS
}

impl NodeConfig {
    /// Configuration for a sensor node with the given sensors.
    pub fn sensor(node_id: NodeId, gateway_id: NodeId, sensors: Vec<DataKind>) -> Self {
        NodeConfig {
            node_id,
            gateway_id,
            role: Role::Sensor,
            announcement: default_announcement(),
            sensors,
            actuators: Vec::new(),
            broadcast_interval_ticks: DEFAULT_BROADCAST_INTERVAL_TICKS,
        }
    }

    /// Configuration for an actuator node with the given actuators.
    pub fn actuator(node_id: NodeId, gateway_id: NodeId, actuators: Vec<DataKind>) -> Self {
        NodeConfig {
            node_id,
            gateway_id,
            role: Role::Actuator,
            announcement: default_announcement(),
            sensors: Vec::new(),
            actuators,
            broadcast_interval_ticks: DEFAULT_BROADCAST_INTERVAL_TICKS,
        }
    }

    /// Set the announcement text.
    pub fn with_announcement(mut self, announcement: impl Into<String>) -> Self {
        self.announcement = announcement.into();
        self
    }

    /// Set the broadcast interval.
    pub fn with_broadcast_interval(mut self, ticks: u32) -> Self {
        self.broadcast_interval_ticks = ticks;
        self
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Check that the role, device lists and timing are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast_interval_ticks == 0 {
            return Err(ConfigError::Invalid(
                "broadcast_interval_ticks must be greater than zero".to_string(),
            ));
        }
        if let Some(kind) = self.sensors.iter().find(|k| !k.is_sensor()) {
            return Err(ConfigError::Invalid(format!("{kind} is not a sensor kind")));
        }
        if let Some(kind) = self.actuators.iter().find(|k| !k.is_actuator()) {
            return Err(ConfigError::Invalid(format!("{kind} is not an actuator kind")));
        }
        match self.role {
            Role::Sensor if self.sensors.is_empty() => Err(ConfigError::Invalid(
                "sensor node needs at least one sensor".to_string(),
            )),
            Role::Actuator if self.actuators.is_empty() => Err(ConfigError::Invalid(
                "actuator node needs at least one actuator".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Sensor reported when a request does not name one.
    pub fn primary_sensor(&self) -> Option<DataKind> {
        self.sensors.first().copied()
    }
}
