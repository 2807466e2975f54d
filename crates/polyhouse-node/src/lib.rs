//! PolyHouse node session logic.
//!
//! A node walks through a small lifecycle driven by frames from its gateway:
//!
//! 1. **Initializing**: wait for `GATEWAY_INIT` from the configured gateway.
//! 2. **Broadcasting**: announce identity with `NODE_INIT` at a fixed interval
//!    until the gateway answers `INIT_SUCCESS`.
//! 3. **Active**: serve the gateway according to the node role. Sensor nodes
//!    pass through **SensorReporting** to answer `SENSOR_DATA_REQ`; actuator
//!    nodes move to **Actuating** on their first `COMMAND`.
//!
//! [`NodeSession`] is the pure state machine. [`NodeController`] wraps it with
//! a radio link and peripherals to form the device control loop.

pub mod config;
pub mod controller;
pub mod error;
pub mod hardware;
pub mod session;

pub use config::{NodeConfig, Role};
pub use controller::{ControllerStats, NodeController, StepReport};
pub use error::{ConfigError, HardwareError, NodeError, RadioError, SessionError};
pub use hardware::{Peripherals, RadioLink};
pub use session::{Mode, NodeSession};
