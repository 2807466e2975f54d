//! Scripted gateway peer.
//!
//! Plays the gateway side of the handshake and then polls one node at a
//! fixed interval. It speaks the same wire format as the node but makes no
//! routing decisions of its own.

use polyhouse_node::RadioLink;
use polyhouse_packet::{DataKind, Message, NodeId, OpCode};
use tracing::{debug, info, warn};

use crate::link::RadioChannels;
use crate::RunnerError;

/// What the gateway asks of the node once it is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayTarget {
    /// Request readings, cycling through these kinds.
    Sensors(Vec<DataKind>),
    /// Send alternating ON/OFF commands, cycling through these channels.
    Actuators(Vec<DataKind>),
}

/// Counters kept by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Frames pulled from the link.
    pub frames_received: u64,
    /// Frames transmitted.
    pub frames_sent: u64,
    /// Received frames that failed to decode.
    pub decode_errors: u64,
    /// `NODE_INIT` announcements answered with `INIT_SUCCESS`.
    pub nodes_accepted: u64,
    /// `SENSOR_DATA_REQ` and `COMMAND` frames sent.
    pub requests_sent: u64,
    /// `SENSOR_DATA` and `COMMAND_EXEC` frames received.
    pub replies_received: u64,
}

/// Gateway end of a simulated link.
pub struct ScriptedGateway {
    id: NodeId,
    link: RadioChannels,
    target: GatewayTarget,
    greeting: String,
    request_interval_ticks: u32,
    greeted: bool,
    accepted: Option<NodeId>,
    awaiting_reply: bool,
    ticks_since_request: u32,
    request_count: usize,
    received: Vec<Message>,
    stats: GatewayStats,
}

impl ScriptedGateway {
    /// Create a gateway that polls every `request_interval_ticks` ticks.
    pub fn new(
        id: NodeId,
        link: RadioChannels,
        target: GatewayTarget,
        request_interval_ticks: u32,
    ) -> Self {
        ScriptedGateway {
            id,
            link,
            target,
            greeting: "PolyHouse Gateway".to_string(),
            request_interval_ticks: request_interval_ticks.max(1),
            greeted: false,
            accepted: None,
            awaiting_reply: false,
            ticks_since_request: 0,
            request_count: 0,
            received: Vec::new(),
            stats: GatewayStats::default(),
        }
    }

    /// Node that completed the handshake, if any.
    pub fn accepted_node(&self) -> Option<NodeId> {
        self.accepted
    }

    /// Every message decoded from the node, in arrival order.
    pub fn received(&self) -> &[Message] {
        &self.received
    }

    /// Running totals.
    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }

    /// Drain the link, answer what arrived and issue the next request when due.
    pub fn step(&mut self) -> Result<(), RunnerError> {
        if !self.greeted {
            let greeting = self.greeting.clone();
            self.send(OpCode::GatewayInit, DataKind::NoHeader, greeting.as_bytes())?;
            self.greeted = true;
        }

        while let Some(frame) = self.link.try_recv() {
            self.stats.frames_received += 1;
            match Message::decode(&frame) {
                Ok(message) => self.handle(message)?,
                Err(err) => {
                    warn!(gateway = %self.id, error = %err, "discarding frame");
                    self.stats.decode_errors += 1;
                }
            }
        }

        if self.accepted.is_some() && !self.awaiting_reply {
            self.ticks_since_request += 1;
            if self.ticks_since_request >= self.request_interval_ticks {
                self.ticks_since_request = 0;
                self.send_request()?;
            }
        }
        Ok(())
    }

    fn handle(&mut self, message: Message) -> Result<(), RunnerError> {
        debug!(
            gateway = %self.id,
            from = %message.node_id(),
            op_code = %message.op_code(),
            payload = %message.payload_text(),
            "received"
        );
        match message.op_code() {
            OpCode::NodeInit => {
                if self.accepted != Some(message.node_id()) {
                    info!(gateway = %self.id, node = %message.node_id(), announcement = %message.payload_text(), "node joined");
                    self.accepted = Some(message.node_id());
                    self.stats.nodes_accepted += 1;
                }
                self.send(OpCode::InitSuccess, DataKind::NoHeader, b"")?;
            }
            OpCode::SensorData | OpCode::CommandExec => {
                self.stats.replies_received += 1;
                self.awaiting_reply = false;
                self.send(OpCode::Ack, message.data_kind(), b"")?;
            }
            other => debug!(gateway = %self.id, op_code = %other, "ignored"),
        }
        self.received.push(message);
        Ok(())
    }

    fn send_request(&mut self) -> Result<(), RunnerError> {
        let index = self.request_count;
        self.request_count += 1;
        let (op_code, kind, payload): (OpCode, DataKind, &[u8]) = match &self.target {
            GatewayTarget::Sensors(kinds) => (
                OpCode::SensorDataReq,
                cycle(kinds, index).unwrap_or(DataKind::NoHeader),
                &b""[..],
            ),
            GatewayTarget::Actuators(kinds) => (
                OpCode::Command,
                cycle(kinds, index).unwrap_or(DataKind::Actuator1),
                if index % 2 == 0 { &b"ON"[..] } else { &b"OFF"[..] },
            ),
        };
        self.send(op_code, kind, payload)?;
        self.stats.requests_sent += 1;
        self.awaiting_reply = true;
        Ok(())
    }

    fn send(&mut self, op_code: OpCode, kind: DataKind, payload: &[u8]) -> Result<(), RunnerError> {
        let frame = Message::new(self.id, op_code, kind, payload)?.encode()?;
        self.link.send(&frame)?;
        self.stats.frames_sent += 1;
        Ok(())
    }
}

fn cycle(kinds: &[DataKind], index: usize) -> Option<DataKind> {
    if kinds.is_empty() {
        None
    } else {
        Some(kinds[index % kinds.len()])
    }
}
