//! Node session state machine.
//!
//! The session is purely reactive: [`NodeSession::update`] consumes one
//! decoded message and [`NodeSession::tick`] runs the periodic work of the
//! current mode. Neither blocks, and neither keeps a queue. Any output is an
//! unencoded [`Message`] for the caller to frame and transmit.

use std::fmt;

use polyhouse_packet::{DataKind, Message, OpCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::{NodeConfig, Role};
use crate::error::SessionError;
use crate::hardware::Peripherals;

/// Position of a node in its operational lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// Waiting for the gateway to introduce itself.
    Initializing,
    /// Announcing identity until the gateway accepts the node.
    Broadcasting,
    /// Accepted and waiting for gateway instructions.
    Active,
    /// A sensor reading is due on the next tick.
    SensorReporting,
    /// Executing gateway commands.
    Actuating,
}

impl Mode {
    /// Protocol name of the mode.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Mode::Initializing => "INITIALIZING",
            Mode::Broadcasting => "BROADCASTING",
            Mode::Active => "ACTIVE",
            Mode::SensorReporting => "SENSOR_REPORTING",
            Mode::Actuating => "ACTUATING",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of one node.
#[derive(Debug, Clone)]
pub struct NodeSession {
    config: NodeConfig,
    mode: Mode,
    gateway_id_confirmed: bool,
    pending_report: Option<DataKind>,
    ticks_since_announce: u32,
}

impl NodeSession {
    /// Start a session in [`Mode::Initializing`].
    pub fn new(config: NodeConfig) -> Self {
        NodeSession {
            config,
            mode: Mode::Initializing,
            gateway_id_confirmed: false,
            pending_report: None,
            ticks_since_announce: 0,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Configured role.
    pub fn role(&self) -> Role {
        self.config.role
    }

    /// Whether a `GATEWAY_INIT` from the configured gateway has been seen.
    pub fn gateway_id_confirmed(&self) -> bool {
        self.gateway_id_confirmed
    }

    /// Node configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Sensor that will be read on the next tick, if a report is due.
    pub fn pending_report(&self) -> Option<DataKind> {
        self.pending_report
    }

    /// Apply one decoded message from the gateway.
    ///
    /// On `Err` the session is left exactly as it was.
    pub fn update<P: Peripherals>(
        &mut self,
        message: &Message,
        peripherals: &mut P,
    ) -> Result<Option<Message>, SessionError> {
        let header = &message.header;
        if header.node_id != self.config.gateway_id {
            return Err(SessionError::GatewayMismatch {
                expected: self.config.gateway_id,
                found: header.node_id,
            });
        }

        trace!(
            node = %self.config.node_id,
            mode = %self.mode,
            op_code = %header.op_code,
            "handling message"
        );

        match (self.mode, header.op_code) {
            (Mode::Initializing, OpCode::GatewayInit) => {
                if !self.gateway_id_confirmed {
                    info!(
                        node = %self.config.node_id,
                        gateway = %header.node_id,
                        config = %message.payload_text(),
                        "gateway confirmed"
                    );
                }
                self.gateway_id_confirmed = true;
                Ok(None)
            }
            (Mode::Broadcasting, OpCode::InitSuccess) => {
                self.transition(Mode::Active);
                Ok(None)
            }
            (Mode::Active, OpCode::SensorDataReq) => {
                self.require_role(Role::Sensor, header.op_code)?;
                let kind = self.requested_sensor(header.data_kind)?;
                self.pending_report = Some(kind);
                self.transition(Mode::SensorReporting);
                Ok(None)
            }
            (Mode::Active | Mode::Actuating, OpCode::Ack) => {
                debug!(node = %self.config.node_id, "acknowledged by gateway");
                Ok(None)
            }
            (Mode::Active | Mode::Actuating, OpCode::Command) => {
                self.require_role(Role::Actuator, header.op_code)?;
                let kind = header.data_kind;
                if !self.config.actuators.contains(&kind) {
                    return Err(SessionError::UnsupportedDataKind { kind });
                }
                let outcome = peripherals.apply(kind, &message.payload)?;
                let reply = Message::new(self.config.node_id, OpCode::CommandExec, kind, outcome)?;
                self.transition(Mode::Actuating);
                Ok(Some(reply))
            }
            (mode, op_code) => Err(SessionError::UnexpectedOpCode { mode, op_code }),
        }
    }

    /// Run the periodic action of the current mode.
    pub fn tick<P: Peripherals>(
        &mut self,
        peripherals: &mut P,
    ) -> Result<Option<Message>, SessionError> {
        match self.mode {
            Mode::Initializing if self.gateway_id_confirmed => {
                self.transition(Mode::Broadcasting);
                self.ticks_since_announce = 0;
                self.announcement().map(Some)
            }
            Mode::Initializing => Ok(None),
            Mode::Broadcasting => {
                self.ticks_since_announce += 1;
                if self.ticks_since_announce < self.config.broadcast_interval_ticks {
                    return Ok(None);
                }
                self.ticks_since_announce = 0;
                self.announcement().map(Some)
            }
            Mode::SensorReporting => {
                // The report is attempted once; a failed read still returns to Active.
                self.transition(Mode::Active);
                let kind = self
                    .pending_report
                    .take()
                    .or_else(|| self.config.primary_sensor())
                    .ok_or(SessionError::UnsupportedDataKind {
                        kind: DataKind::NoHeader,
                    })?;
                let reading = peripherals.read(kind)?;
                debug!(node = %self.config.node_id, %kind, %reading, "sensor reading");
                Ok(Some(Message::new(
                    self.config.node_id,
                    OpCode::SensorData,
                    kind,
                    reading,
                )?))
            }
            Mode::Active | Mode::Actuating => Ok(None),
        }
    }

    fn announcement(&self) -> Result<Message, SessionError> {
        debug!(node = %self.config.node_id, "broadcasting identity");
        Ok(Message::new(
            self.config.node_id,
            OpCode::NodeInit,
            DataKind::NoHeader,
            self.config.announcement.as_bytes(),
        )?)
    }

    fn require_role(&self, role: Role, op_code: OpCode) -> Result<(), SessionError> {
        if self.config.role == role {
            Ok(())
        } else {
            Err(SessionError::RoleMismatch {
                role: self.config.role,
                op_code,
            })
        }
    }

    fn requested_sensor(&self, kind: DataKind) -> Result<DataKind, SessionError> {
        match kind {
            DataKind::NoHeader => self
                .config
                .primary_sensor()
                .ok_or(SessionError::UnsupportedDataKind { kind }),
            kind if self.config.sensors.contains(&kind) => Ok(kind),
            kind => Err(SessionError::UnsupportedDataKind { kind }),
        }
    }

    fn transition(&mut self, next: Mode) {
        if self.mode != next {
            info!(node = %self.config.node_id, from = %self.mode, to = %next, "mode transition");
            self.mode = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HardwareError;
    use polyhouse_packet::NodeId;

    const GATEWAY: &str = "2000";
    const NODE: &str = "1101";

    #[derive(Default)]
    struct FakePeripherals {
        reads: Vec<DataKind>,
        commands: Vec<(DataKind, Vec<u8>)>,
        fail: bool,
    }

    impl Peripherals for FakePeripherals {
        fn read(&mut self, kind: DataKind) -> Result<String, HardwareError> {
            if self.fail {
                return Err(HardwareError::Unavailable(kind));
            }
            self.reads.push(kind);
            Ok("23.5".to_string())
        }

        fn apply(&mut self, kind: DataKind, command: &[u8]) -> Result<String, HardwareError> {
            if self.fail {
                return Err(HardwareError::Unavailable(kind));
            }
            self.commands.push((kind, command.to_vec()));
            Ok(format!("{kind}:{}:OK", String::from_utf8_lossy(command)))
        }
    }

    fn id(s: &str) -> NodeId {
        s.parse().unwrap()
    }

    fn sensor_session() -> NodeSession {
        let config = NodeConfig::sensor(id(NODE), id(GATEWAY), vec![DataKind::Temperature, DataKind::Light])
            .with_announcement("TempSensor Node");
        NodeSession::new(config)
    }

    fn actuator_session() -> NodeSession {
        NodeSession::new(NodeConfig::actuator(id("1201"), id(GATEWAY), vec![DataKind::Actuator1]))
    }

    fn from_gateway(op: OpCode, kind: DataKind, payload: &str) -> Message {
        Message::new(id(GATEWAY), op, kind, payload).unwrap()
    }

    /// Drive a session from Initializing to Active.
    fn activate(session: &mut NodeSession, hw: &mut FakePeripherals) {
        session
            .update(&from_gateway(OpCode::GatewayInit, DataKind::NoHeader, ""), hw)
            .unwrap();
        session.tick(hw).unwrap();
        session
            .update(&from_gateway(OpCode::InitSuccess, DataKind::NoHeader, ""), hw)
            .unwrap();
        assert_eq!(session.mode(), Mode::Active);
    }

    #[test]
    fn test_new_session_initializing() {
        let session = sensor_session();
        assert_eq!(session.mode(), Mode::Initializing);
        assert!(!session.gateway_id_confirmed());
        assert_eq!(session.role(), Role::Sensor);
    }

    #[test]
    fn test_gateway_init_then_tick_broadcasts() {
        let mut session = sensor_session();
        let mut hw = FakePeripherals::default();

        let out = session
            .update(&from_gateway(OpCode::GatewayInit, DataKind::NoHeader, "cfg"), &mut hw)
            .unwrap();
        assert!(out.is_none());
        assert!(session.gateway_id_confirmed());
        assert_eq!(session.mode(), Mode::Initializing);

        let announce = session.tick(&mut hw).unwrap().expect("announcement");
        assert_eq!(session.mode(), Mode::Broadcasting);
        assert_eq!(announce.op_code(), OpCode::NodeInit);
        assert_eq!(announce.node_id(), id(NODE));
        assert_eq!(announce.data_kind(), DataKind::NoHeader);
        assert_eq!(announce.payload_text(), "TempSensor Node");
    }

    #[test]
    fn test_unconfirmed_tick_is_idle() {
        let mut session = sensor_session();
        let mut hw = FakePeripherals::default();
        for _ in 0..50 {
            assert!(session.tick(&mut hw).unwrap().is_none());
        }
        assert_eq!(session.mode(), Mode::Initializing);
    }

    #[test]
    fn test_foreign_gateway_ignored() {
        let mut session = sensor_session();
        let mut hw = FakePeripherals::default();
        let msg = Message::new(id("2001"), OpCode::GatewayInit, DataKind::NoHeader, "").unwrap();

        let err = session.update(&msg, &mut hw).unwrap_err();
        assert!(matches!(err, SessionError::GatewayMismatch { .. }));
        assert!(!session.gateway_id_confirmed());
        assert_eq!(session.mode(), Mode::Initializing);
        assert!(session.tick(&mut hw).unwrap().is_none());
    }

    #[test]
    fn test_broadcast_repeats_at_interval() {
        let mut session = sensor_session();
        let mut hw = FakePeripherals::default();
        session
            .update(&from_gateway(OpCode::GatewayInit, DataKind::NoHeader, ""), &mut hw)
            .unwrap();

        let mut announce_ticks = Vec::new();
        for tick in 0..31 {
            if session.tick(&mut hw).unwrap().is_some() {
                announce_ticks.push(tick);
            }
        }
        assert_eq!(announce_ticks, vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_init_success_activates() {
        let mut session = sensor_session();
        let mut hw = FakePeripherals::default();
        activate(&mut session, &mut hw);
        assert!(session.tick(&mut hw).unwrap().is_none());
    }

    #[test]
    fn test_init_success_while_initializing_rejected() {
        let mut session = sensor_session();
        let mut hw = FakePeripherals::default();
        session
            .update(&from_gateway(OpCode::GatewayInit, DataKind::NoHeader, ""), &mut hw)
            .unwrap();

        let err = session
            .update(&from_gateway(OpCode::InitSuccess, DataKind::NoHeader, ""), &mut hw)
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::UnexpectedOpCode {
                mode: Mode::Initializing,
                op_code: OpCode::InitSuccess
            }
        );
        assert_eq!(session.mode(), Mode::Initializing);
    }

    #[test]
    fn test_sensor_request_reports_on_tick() {
        let mut session = sensor_session();
        let mut hw = FakePeripherals::default();
        activate(&mut session, &mut hw);

        let out = session
            .update(&from_gateway(OpCode::SensorDataReq, DataKind::NoHeader, ""), &mut hw)
            .unwrap();
        assert!(out.is_none());
        assert_eq!(session.mode(), Mode::SensorReporting);
        assert_eq!(session.pending_report(), Some(DataKind::Temperature));

        let report = session.tick(&mut hw).unwrap().expect("sensor data");
        assert_eq!(session.mode(), Mode::Active);
        assert_eq!(report.op_code(), OpCode::SensorData);
        assert_eq!(report.data_kind(), DataKind::Temperature);
        assert_eq!(report.payload_text(), "23.5");
        assert_eq!(hw.reads, vec![DataKind::Temperature]);
    }

    #[test]
    fn test_sensor_request_for_specific_kind() {
        let mut session = sensor_session();
        let mut hw = FakePeripherals::default();
        activate(&mut session, &mut hw);

        session
            .update(&from_gateway(OpCode::SensorDataReq, DataKind::Light, ""), &mut hw)
            .unwrap();
        let report = session.tick(&mut hw).unwrap().unwrap();
        assert_eq!(report.data_kind(), DataKind::Light);

        let err = session
            .update(&from_gateway(OpCode::SensorDataReq, DataKind::Motion, ""), &mut hw)
            .unwrap_err();
        assert_eq!(err, SessionError::UnsupportedDataKind { kind: DataKind::Motion });
        assert_eq!(session.mode(), Mode::Active);
    }

    #[test]
    fn test_failed_read_returns_to_active() {
        let mut session = sensor_session();
        let mut hw = FakePeripherals::default();
        activate(&mut session, &mut hw);
        session
            .update(&from_gateway(OpCode::SensorDataReq, DataKind::NoHeader, ""), &mut hw)
            .unwrap();

        hw.fail = true;
        let err = session.tick(&mut hw).unwrap_err();
        assert_eq!(err.kind(), "hardware");
        assert_eq!(session.mode(), Mode::Active);
        assert_eq!(session.pending_report(), None);
    }

    #[test]
    fn test_ack_is_noop() {
        let mut session = sensor_session();
        let mut hw = FakePeripherals::default();
        activate(&mut session, &mut hw);

        let out = session
            .update(&from_gateway(OpCode::Ack, DataKind::NoHeader, ""), &mut hw)
            .unwrap();
        assert!(out.is_none());
        assert_eq!(session.mode(), Mode::Active);
    }

    #[test]
    fn test_sensor_node_rejects_command() {
        let mut session = sensor_session();
        let mut hw = FakePeripherals::default();
        activate(&mut session, &mut hw);

        let err = session
            .update(&from_gateway(OpCode::Command, DataKind::Actuator1, "ON"), &mut hw)
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::RoleMismatch {
                role: Role::Sensor,
                op_code: OpCode::Command
            }
        );
        assert!(hw.commands.is_empty());
        assert_eq!(session.mode(), Mode::Active);
    }

    #[test]
    fn test_actuator_command_executes() {
        let mut session = actuator_session();
        let mut hw = FakePeripherals::default();
        activate(&mut session, &mut hw);

        let reply = session
            .update(&from_gateway(OpCode::Command, DataKind::Actuator1, "ON"), &mut hw)
            .unwrap()
            .expect("command exec");
        assert_eq!(session.mode(), Mode::Actuating);
        assert_eq!(reply.op_code(), OpCode::CommandExec);
        assert_eq!(reply.node_id(), id("1201"));
        assert_eq!(reply.data_kind(), DataKind::Actuator1);
        assert_eq!(reply.payload_text(), "AC1:ON:OK");

        let reply = session
            .update(&from_gateway(OpCode::Command, DataKind::Actuator1, "OFF"), &mut hw)
            .unwrap();
        assert!(reply.is_some());
        assert_eq!(session.mode(), Mode::Actuating);
        assert_eq!(hw.commands.len(), 2);
    }

    #[test]
    fn test_actuator_rejects_sensor_request_and_unknown_channel() {
        let mut session = actuator_session();
        let mut hw = FakePeripherals::default();
        activate(&mut session, &mut hw);

        let err = session
            .update(&from_gateway(OpCode::SensorDataReq, DataKind::NoHeader, ""), &mut hw)
            .unwrap_err();
        assert_eq!(err.kind(), "role_mismatch");

        let err = session
            .update(&from_gateway(OpCode::Command, DataKind::Actuator2, "ON"), &mut hw)
            .unwrap_err();
        assert_eq!(err, SessionError::UnsupportedDataKind { kind: DataKind::Actuator2 });
        assert_eq!(session.mode(), Mode::Active);
    }

    #[test]
    fn test_failed_actuation_keeps_mode() {
        let mut session = actuator_session();
        let mut hw = FakePeripherals::default();
        activate(&mut session, &mut hw);

        hw.fail = true;
        let err = session
            .update(&from_gateway(OpCode::Command, DataKind::Actuator1, "ON"), &mut hw)
            .unwrap_err();
        assert!(matches!(err, SessionError::Hardware(_)));
        assert_eq!(session.mode(), Mode::Active);
    }

    #[test]
    fn test_deterministic_replay() {
        let script = [
            from_gateway(OpCode::Ack, DataKind::NoHeader, ""),
            from_gateway(OpCode::GatewayInit, DataKind::NoHeader, ""),
            from_gateway(OpCode::InitSuccess, DataKind::NoHeader, ""),
            from_gateway(OpCode::InitSuccess, DataKind::NoHeader, ""),
            from_gateway(OpCode::SensorDataReq, DataKind::NoHeader, ""),
            from_gateway(OpCode::Ack, DataKind::NoHeader, ""),
            from_gateway(OpCode::SensorDataReq, DataKind::Light, ""),
        ];

        let run = || {
            let mut session = sensor_session();
            let mut hw = FakePeripherals::default();
            let mut trace = Vec::new();
            for msg in &script {
                let reply = session.update(msg, &mut hw).map_err(|e| e.kind());
                let ticked = session.tick(&mut hw).map_err(|e| e.kind());
                trace.push((session.mode(), reply, ticked));
            }
            trace
        };

        assert_eq!(run(), run());
    }
}
