//! Device control loop.
//!
//! [`NodeController::step`] is one iteration of the node's main loop: poll the
//! radio for at most one frame, decode it, feed it to the session, transmit any
//! reply, then run the session tick. Receive-path failures are logged and
//! counted but never stop the loop; only a failed transmit is returned.

use polyhouse_metrics::{metric_defs, metrics, MetricLabels};
use polyhouse_packet::{
    is_start_marker_present, MarkerField, Message, OpCode, PacketError, HEX_BYTE_LEN,
};
use tracing::{debug, trace, warn};

use crate::config::NodeConfig;
use crate::error::{NodeError, SessionError};
use crate::hardware::{Peripherals, RadioLink};
use crate::session::{Mode, NodeSession};

/// Running totals kept by a controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Loop iterations executed.
    pub steps: u64,
    /// Frames pulled from the radio.
    pub frames_received: u64,
    /// Frames transmitted.
    pub frames_sent: u64,
    /// Received frames that failed to decode.
    pub decode_errors: u64,
    /// Decoded messages or tick actions the session refused.
    pub rejected: u64,
    /// `NODE_INIT` frames sent.
    pub announcements: u64,
    /// `SENSOR_DATA` frames sent.
    pub sensor_reports: u64,
    /// `COMMAND_EXEC` frames sent.
    pub actuator_commands: u64,
}

/// What happened during one [`NodeController::step`].
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    /// Message decoded from the radio, if any.
    pub received: Option<Message>,
    /// Messages transmitted, in order.
    pub sent: Vec<Message>,
    /// Decode failure of the received frame.
    pub decode_error: Option<PacketError>,
    /// Session refusals raised during the step.
    pub rejections: Vec<SessionError>,
}

/// Owns a node session together with its radio and peripherals.
pub struct NodeController<R, P> {
    session: NodeSession,
    radio: R,
    peripherals: P,
    labels: MetricLabels,
    stats: ControllerStats,
}

impl<R: RadioLink, P: Peripherals> NodeController<R, P> {
    /// Create a controller with a fresh session.
    pub fn new(config: NodeConfig, radio: R, peripherals: P) -> Self {
        let labels = MetricLabels::new(config.node_id.as_str(), config.role.as_str());
        NodeController {
            session: NodeSession::new(config),
            radio,
            peripherals,
            labels,
            stats: ControllerStats::default(),
        }
    }

    /// The session state.
    pub fn session(&self) -> &NodeSession {
        &self.session
    }

    /// Running totals.
    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// The attached peripherals.
    pub fn peripherals(&self) -> &P {
        &self.peripherals
    }

    /// Run one loop iteration.
    pub fn step(&mut self) -> Result<StepReport, NodeError> {
        self.stats.steps += 1;
        let mut report = StepReport::default();

        if let Some(frame) = self.radio.try_recv() {
            self.receive(&frame, &mut report)?;
        }

        let before = self.session.mode();
        let ticked = self.session.tick(&mut self.peripherals);
        self.record_transition(before);
        self.dispatch(ticked, &mut report)?;

        Ok(report)
    }

    fn receive(&mut self, frame: &[u8], report: &mut StepReport) -> Result<(), NodeError> {
        self.stats.frames_received += 1;
        metrics::counter!(metric_defs::FRAMES_RX.name, &self.labels.to_labels()).increment(1);

        let decoded = if is_start_marker_present(frame) {
            Message::decode(frame)
        } else {
            trace!(node = %self.labels.node, len = frame.len(), "no start marker");
            let end = frame.len().min(HEX_BYTE_LEN);
            Err(PacketError::framing(MarkerField::Start, &frame[..end]))
        };

        let message = match decoded {
            Ok(message) => message,
            Err(err) => {
                warn!(node = %self.labels.node, error = %err, "discarding frame");
                self.stats.decode_errors += 1;
                let labels = self.labels.with(&[("reason", err.kind().to_string())]);
                metrics::counter!(metric_defs::DECODE_ERRORS.name, &labels).increment(1);
                report.decode_error = Some(err);
                return Ok(());
            }
        };

        debug!(
            node = %self.labels.node,
            from = %message.node_id(),
            op_code = %message.op_code(),
            data_kind = %message.data_kind(),
            "received"
        );

        let before = self.session.mode();
        let outcome = self.session.update(&message, &mut self.peripherals);
        self.record_transition(before);
        report.received = Some(message);
        self.dispatch(outcome, report)
    }

    fn dispatch(
        &mut self,
        outcome: Result<Option<Message>, SessionError>,
        report: &mut StepReport,
    ) -> Result<(), NodeError> {
        match outcome {
            Ok(Some(message)) => self.transmit(message, report),
            Ok(None) => Ok(()),
            Err(err) => {
                warn!(node = %self.labels.node, mode = %self.session.mode(), error = %err, "rejected");
                self.stats.rejected += 1;
                let labels = self.labels.with(&[("reason", err.kind().to_string())]);
                metrics::counter!(metric_defs::MESSAGES_REJECTED.name, &labels).increment(1);
                report.rejections.push(err);
                Ok(())
            }
        }
    }

    fn transmit(&mut self, message: Message, report: &mut StepReport) -> Result<(), NodeError> {
        let frame = message.encode()?;
        self.radio.send(&frame)?;

        debug!(
            node = %self.labels.node,
            op_code = %message.op_code(),
            len = frame.len(),
            "transmitted"
        );
        self.stats.frames_sent += 1;
        let labels = self.labels.with(&[("op_code", message.op_code().to_string())]);
        metrics::counter!(metric_defs::FRAMES_TX.name, &labels).increment(1);
        metrics::histogram!(metric_defs::FRAME_TX_SIZE.name, &self.labels.to_labels())
            .record(frame.len() as f64);

        let kind_labels = self.labels.with(&[("data_kind", message.data_kind().to_string())]);
        match message.op_code() {
            OpCode::NodeInit => {
                self.stats.announcements += 1;
                metrics::counter!(metric_defs::ANNOUNCEMENTS.name, &self.labels.to_labels())
                    .increment(1);
            }
            OpCode::SensorData => {
                self.stats.sensor_reports += 1;
                metrics::counter!(metric_defs::SENSOR_REPORTS.name, &kind_labels).increment(1);
            }
            OpCode::CommandExec => {
                self.stats.actuator_commands += 1;
                metrics::counter!(metric_defs::ACTUATOR_COMMANDS.name, &kind_labels).increment(1);
            }
            _ => {}
        }

        report.sent.push(message);
        Ok(())
    }

    fn record_transition(&self, before: Mode) {
        let after = self.session.mode();
        if before != after {
            let labels = self.labels.with(&[
                ("from", before.to_string()),
                ("to", after.to_string()),
            ]);
            metrics::counter!(metric_defs::MODE_TRANSITIONS.name, &labels).increment(1);
        }
    }
}
