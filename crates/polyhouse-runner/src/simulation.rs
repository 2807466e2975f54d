//! Lockstep simulation of one node and its gateway.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use polyhouse_node::{ControllerStats, Mode, NodeConfig, NodeController, Role};
use polyhouse_packet::{DataKind, OpCode};
use tracing::{debug, info};

use crate::gateway::{GatewayStats, GatewayTarget, ScriptedGateway};
use crate::link::RadioChannels;
use crate::peripherals::SimulatedPeripherals;
use crate::RunnerError;

/// Knobs for [`run_simulation`].
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Number of control-loop ticks to run.
    pub ticks: u64,
    /// Seed for simulated sensor readings.
    pub seed: u64,
    /// Ticks the gateway waits between requests.
    pub request_interval_ticks: u32,
    /// Wall-clock pacing per tick. `None` runs as fast as possible.
    pub tick_duration: Option<Duration>,
    /// Set to stop the run early.
    pub stop: Option<Arc<AtomicBool>>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        SimulationOptions {
            ticks: 100,
            seed: 1,
            request_interval_ticks: 5,
            tick_duration: None,
            stop: None,
        }
    }
}

/// Outcome of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationStats {
    /// Ticks actually executed.
    pub ticks_run: u64,
    /// Node mode when the run ended.
    pub final_mode: Mode,
    /// Node-side counters.
    pub node: ControllerStats,
    /// Gateway-side counters.
    pub gateway: GatewayStats,
    /// Sensor readings delivered to the gateway.
    pub readings: Vec<(DataKind, String)>,
    /// Command outcomes delivered to the gateway.
    pub command_results: Vec<String>,
}

/// Run a node against a scripted gateway over an in-memory link.
pub fn run_simulation(
    config: NodeConfig,
    options: &SimulationOptions,
) -> Result<SimulationStats, RunnerError> {
    config.validate()?;

    let (node_link, gateway_link) = RadioChannels::new_pair();
    let target = match config.role {
        Role::Sensor => GatewayTarget::Sensors(config.sensors.clone()),
        Role::Actuator => GatewayTarget::Actuators(config.actuators.clone()),
    };
    let mut gateway = ScriptedGateway::new(
        config.gateway_id,
        gateway_link,
        target,
        options.request_interval_ticks,
    );
    let peripherals = SimulatedPeripherals::for_config(&config, options.seed);

    info!(
        node = %config.node_id,
        gateway = %config.gateway_id,
        role = %config.role,
        ticks = options.ticks,
        "starting simulation"
    );
    let mut node = NodeController::new(config, node_link, peripherals);

    let mut ticks_run = 0;
    for tick in 0..options.ticks {
        if let Some(stop) = &options.stop {
            if stop.load(Ordering::SeqCst) {
                info!(tick, "stop requested");
                break;
            }
        }

        gateway.step()?;
        let report = node.step()?;
        if !report.sent.is_empty() {
            debug!(tick, mode = %node.session().mode(), sent = report.sent.len(), "node transmitted");
        }
        ticks_run += 1;

        if let Some(duration) = options.tick_duration {
            std::thread::sleep(duration);
        }
    }

    let readings = gateway
        .received()
        .iter()
        .filter(|m| m.op_code() == OpCode::SensorData)
        .map(|m| (m.data_kind(), m.payload_text()))
        .collect();
    let command_results = gateway
        .received()
        .iter()
        .filter(|m| m.op_code() == OpCode::CommandExec)
        .map(|m| m.payload_text())
        .collect();

    let stats = SimulationStats {
        ticks_run,
        final_mode: node.session().mode(),
        node: node.stats().clone(),
        gateway: gateway.stats().clone(),
        readings,
        command_results,
    };
    info!(
        ticks = stats.ticks_run,
        mode = %stats.final_mode,
        frames_sent = stats.node.frames_sent,
        frames_received = stats.node.frames_received,
        "simulation finished"
    );
    Ok(stats)
}
