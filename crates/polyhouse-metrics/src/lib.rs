//! Metrics infrastructure for PolyHouse nodes.
//!
//! Every metric the node and runner emit is declared here as a [`Metric`]
//! constant so names, units and label keys live in one place. The `metrics`
//! crate is re-exported; without an installed recorder all emissions are no-ops.
//!
//! # Example
//!
//! ```rust,ignore
//! use polyhouse_metrics::{metric_defs, describe_metrics, MetricLabels};
//!
//! describe_metrics();
//!
//! let labels = MetricLabels::new("1101", "sensor");
//! metrics::counter!(metric_defs::FRAMES_RX.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_histogram, Unit};

/// The kind of metric (counter or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use polyhouse_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const FRAMES: Metric = Metric::counter("polyhouse.example.frames")
///     .with_description("Frames seen")
///     .with_unit(Unit::Count)
///     .with_labels(&["node"]);
///
/// assert_eq!(FRAMES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "polyhouse.radio.frames_rx").
    pub name: &'static str,
    /// The kind of metric (counter, histogram).
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn with_kind(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Counter)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Histogram)
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    ///
    /// This should be called once at startup for each metric.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for PolyHouse nodes.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Standard labels present on all node-scoped metrics.
    pub const STANDARD_LABELS: &[&str] = &["node", "role"];

    // ========================================================================
    // Radio Link
    // ========================================================================

    /// Frames pulled from the radio.
    ///
    /// Labels: node, role
    pub const FRAMES_RX: Metric = Metric::counter("polyhouse.radio.frames_rx")
        .with_description("Frames received from the radio")
        .with_unit(Unit::Count)
        .with_labels(&["node", "role"]);

    /// Frames handed to the radio.
    ///
    /// Labels: node, role, op_code
    pub const FRAMES_TX: Metric = Metric::counter("polyhouse.radio.frames_tx")
        .with_description("Frames transmitted by the node")
        .with_unit(Unit::Count)
        .with_labels(&["node", "role", "op_code"]);

    /// Size of transmitted frames.
    pub const FRAME_TX_SIZE: Metric = Metric::histogram("polyhouse.radio.frame_tx_size_bytes")
        .with_description("Transmitted frame size in bytes")
        .with_unit(Unit::Bytes)
        .with_labels(&["node", "role"]);

    // ========================================================================
    // Codec
    // ========================================================================

    /// Received frames that failed to decode.
    ///
    /// Labels: node, role, reason (framing, truncated, invalid_hex, ...)
    pub const DECODE_ERRORS: Metric = Metric::counter("polyhouse.codec.decode_errors")
        .with_description("Received frames that failed to decode")
        .with_unit(Unit::Count)
        .with_labels(&["node", "role", "reason"]);

    // ========================================================================
    // Session
    // ========================================================================

    /// Decoded messages the session refused.
    ///
    /// Labels: node, role, reason (gateway_mismatch, unexpected_op_code, ...)
    pub const MESSAGES_REJECTED: Metric = Metric::counter("polyhouse.session.rejected")
        .with_description("Decoded messages rejected by the session")
        .with_unit(Unit::Count)
        .with_labels(&["node", "role", "reason"]);

    /// Mode changes.
    ///
    /// Labels: node, role, from, to
    pub const MODE_TRANSITIONS: Metric = Metric::counter("polyhouse.session.transitions")
        .with_description("Session mode transitions")
        .with_unit(Unit::Count)
        .with_labels(&["node", "role", "from", "to"]);

    // ========================================================================
    // Node Activity
    // ========================================================================

    /// NODE_INIT announcements sent.
    pub const ANNOUNCEMENTS: Metric = Metric::counter("polyhouse.node.announcements")
        .with_description("Identity announcements broadcast")
        .with_unit(Unit::Count)
        .with_labels(&["node", "role"]);

    /// SENSOR_DATA reports sent.
    pub const SENSOR_REPORTS: Metric = Metric::counter("polyhouse.node.sensor_reports")
        .with_description("Sensor readings reported to the gateway")
        .with_unit(Unit::Count)
        .with_labels(&["node", "role", "data_kind"]);

    /// COMMAND messages applied.
    pub const ACTUATOR_COMMANDS: Metric = Metric::counter("polyhouse.node.actuator_commands")
        .with_description("Actuator commands executed")
        .with_unit(Unit::Count)
        .with_labels(&["node", "role", "data_kind"]);

    /// All metrics, for bulk registration.
    pub const ALL: &[&Metric] = &[
        &FRAMES_RX,
        &FRAMES_TX,
        &FRAME_TX_SIZE,
        &DECODE_ERRORS,
        &MESSAGES_REJECTED,
        &MODE_TRANSITIONS,
        &ANNOUNCEMENTS,
        &SENSOR_REPORTS,
        &ACTUATOR_COMMANDS,
    ];
}

/// Metric labels identifying a node.
///
/// ```rust
/// use polyhouse_metrics::MetricLabels;
///
/// let labels = MetricLabels::new("1101", "sensor");
/// let extended = labels.with(&[("reason", "framing".to_string())]);
/// assert_eq!(extended.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MetricLabels {
    /// Node identifier.
    pub node: String,
    /// Node role (sensor, actuator).
    pub role: String,
}

impl MetricLabels {
    /// Creates labels for the given node and role.
    pub fn new(node: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            role: role.into(),
        }
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("node", self.node.clone()), ("role", self.role.clone())]
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Registers descriptions for every metric in [`metric_defs::ALL`].
///
/// Call once at startup after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_labels() {
        let labels = MetricLabels::new("1101", "sensor");
        let label_vec = labels.to_labels();

        assert_eq!(label_vec.len(), 2);
        assert!(label_vec.contains(&("node", "1101".to_string())));
        assert!(label_vec.contains(&("role", "sensor".to_string())));
    }

    #[test]
    fn test_with_extra_labels() {
        let labels = MetricLabels::new("1101", "actuator");
        let extended = labels.with(&[("from", "ACTIVE".to_string()), ("to", "ACTUATING".to_string())]);

        assert_eq!(extended.len(), 4);
        assert!(extended.contains(&("to", "ACTUATING".to_string())));
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::FRAMES_RX.name, "polyhouse.radio.frames_rx");
        assert_eq!(metric_defs::FRAMES_RX.kind, MetricKind::Counter);
        assert_eq!(metric_defs::FRAME_TX_SIZE.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::FRAME_TX_SIZE.unit, Some(Unit::Bytes));
        assert_eq!(metric_defs::DECODE_ERRORS.labels, &["node", "role", "reason"]);
    }

    #[test]
    fn test_all_metrics_listed() {
        assert_eq!(metric_defs::ALL.len(), 9);
        for metric in metric_defs::ALL {
            assert!(metric.name.starts_with("polyhouse."));
            assert!(!metric.description.is_empty());
            assert_eq!(&metric.labels[..2], metric_defs::STANDARD_LABELS);
        }
    }

    #[test]
    fn test_metric_minimal() {
        const MINIMAL: Metric = Metric::histogram("minimal");

        assert_eq!(MINIMAL.kind, MetricKind::Histogram);
        assert_eq!(MINIMAL.kind.to_string(), "histogram");
        assert_eq!(MINIMAL.description, "");
        assert_eq!(MINIMAL.unit, None);
        assert_eq!(MINIMAL.labels, &[] as &[&str]);
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
