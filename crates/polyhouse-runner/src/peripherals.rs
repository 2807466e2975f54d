//! Simulated sensors and actuators.

use std::collections::BTreeMap;

use polyhouse_node::{HardwareError, NodeConfig, Peripherals};
use polyhouse_packet::DataKind;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded stand-in for a node's attached hardware.
#[derive(Debug, Clone)]
pub struct SimulatedPeripherals {
    rng: ChaCha8Rng,
    sensors: Vec<DataKind>,
    actuators: BTreeMap<DataKind, String>,
}

impl SimulatedPeripherals {
    /// Attach the given devices.
    pub fn new(sensors: Vec<DataKind>, actuators: Vec<DataKind>, seed: u64) -> Self {
        SimulatedPeripherals {
            rng: ChaCha8Rng::seed_from_u64(seed),
            sensors,
            actuators: actuators
                .into_iter()
                .map(|kind| (kind, "OFF".to_string()))
                .collect(),
        }
    }

    /// Attach the devices listed in a node configuration.
    pub fn for_config(config: &NodeConfig, seed: u64) -> Self {
        Self::new(config.sensors.clone(), config.actuators.clone(), seed)
    }

    /// Last command applied to an actuator.
    pub fn actuator_state(&self, kind: DataKind) -> Option<&str> {
        self.actuators.get(&kind).map(String::as_str)
    }
}

impl Peripherals for SimulatedPeripherals {
    fn read(&mut self, kind: DataKind) -> Result<String, HardwareError> {
        if !self.sensors.contains(&kind) {
            return Err(HardwareError::Unavailable(kind));
        }
        let value = match kind {
            DataKind::Temperature => format!("{:.1}", self.rng.gen_range(18.0..30.0)),
            DataKind::Light => format!("{}", self.rng.gen_range(0u32..1000)),
            DataKind::Moisture => format!("{:.0}", self.rng.gen_range(20.0..80.0)),
            DataKind::Motion => (if self.rng.gen_bool(0.2) { "1" } else { "0" }).to_string(),
            other => return Err(HardwareError::Unavailable(other)),
        };
        Ok(value)
    }

    fn apply(&mut self, kind: DataKind, command: &[u8]) -> Result<String, HardwareError> {
        let command = std::str::from_utf8(command).map_err(|_| HardwareError::Failed {
            kind,
            message: "command is not valid UTF-8".to_string(),
        })?;
        let state = self
            .actuators
            .get_mut(&kind)
            .ok_or(HardwareError::Unavailable(kind))?;
        *state = command.to_string();
        Ok(format!("{kind}:{command}:OK"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings_are_seeded() {
        let sensors = vec![DataKind::Temperature, DataKind::Light];
        let mut a = SimulatedPeripherals::new(sensors.clone(), vec![], 7);
        let mut b = SimulatedPeripherals::new(sensors, vec![], 7);
        for _ in 0..10 {
            assert_eq!(a.read(DataKind::Temperature), b.read(DataKind::Temperature));
            assert_eq!(a.read(DataKind::Light), b.read(DataKind::Light));
        }
    }

    #[test]
    fn test_temperature_format() {
        let mut hw = SimulatedPeripherals::new(vec![DataKind::Temperature], vec![], 1);
        let reading = hw.read(DataKind::Temperature).unwrap();
        let value: f64 = reading.parse().unwrap();
        assert!((18.0..30.0).contains(&value));
        assert_eq!(reading.split('.').nth(1).map(str::len), Some(1));
    }

    #[test]
    fn test_missing_devices_unavailable() {
        let mut hw = SimulatedPeripherals::new(vec![DataKind::Light], vec![DataKind::Actuator1], 1);
        assert_eq!(
            hw.read(DataKind::Motion),
            Err(HardwareError::Unavailable(DataKind::Motion))
        );
        assert_eq!(
            hw.apply(DataKind::Actuator2, b"ON"),
            Err(HardwareError::Unavailable(DataKind::Actuator2))
        );
    }

    #[test]
    fn test_apply_records_state() {
        let mut hw = SimulatedPeripherals::new(vec![], vec![DataKind::Actuator1], 1);
        assert_eq!(hw.actuator_state(DataKind::Actuator1), Some("OFF"));
        assert_eq!(hw.apply(DataKind::Actuator1, b"ON").unwrap(), "AC1:ON:OK");
        assert_eq!(hw.actuator_state(DataKind::Actuator1), Some("ON"));
    }

    #[test]
    fn test_actuator_channels_tracked_independently() {
        let mut hw =
            SimulatedPeripherals::new(vec![], vec![DataKind::Actuator2, DataKind::Actuator1], 1);
        hw.apply(DataKind::Actuator2, b"ON").unwrap();
        assert_eq!(hw.actuator_state(DataKind::Actuator1), Some("OFF"));
        assert_eq!(hw.actuator_state(DataKind::Actuator2), Some("ON"));
        assert_eq!(hw.actuator_state(DataKind::Temperature), None);
    }
}
