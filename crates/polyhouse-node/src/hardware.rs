//! Interfaces to the device's radio and attached peripherals.
//!
//! Real drivers live outside this crate; the runner provides in-memory
//! implementations for simulation and tests.

use polyhouse_packet::DataKind;

use crate::error::{HardwareError, RadioError};

/// A half-duplex radio that carries whole frames.
pub trait RadioLink {
    /// Transmit one encoded frame.
    fn send(&mut self, frame: &[u8]) -> Result<(), RadioError>;

    /// Return the next complete received buffer, if any. Must not block.
    fn try_recv(&mut self) -> Option<Vec<u8>>;
}

/// Sensors and actuators attached to the node.
pub trait Peripherals {
    /// Read the current value of a sensor as text.
    fn read(&mut self, kind: DataKind) -> Result<String, HardwareError>;

    /// Apply a command to an actuator and describe the outcome.
    fn apply(&mut self, kind: DataKind, command: &[u8]) -> Result<String, HardwareError>;
}

impl<T: RadioLink + ?Sized> RadioLink for &mut T {
    fn send(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        (**self).send(frame)
    }

    fn try_recv(&mut self) -> Option<Vec<u8>> {
        (**self).try_recv()
    }
}

impl<T: Peripherals + ?Sized> Peripherals for &mut T {
    fn read(&mut self, kind: DataKind) -> Result<String, HardwareError> {
        (**self).read(kind)
    }

    fn apply(&mut self, kind: DataKind, command: &[u8]) -> Result<String, HardwareError> {
        (**self).apply(kind, command)
    }
}
