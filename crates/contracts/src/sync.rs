//! Synchronization engine outputs
//!
//! Snapshots and per-sample results handed to downstream consumers
//! (storage, dashboards, report pipeline). All times are host-relative
//! milliseconds unless noted otherwise.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::SensorKind;

/// Engine-wide synchronization state
///
/// Owned by one engine instance; consumers only ever see copies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Host time captured when the current anchor was established
    pub master_time_base: f64,

    /// Device time paired with `master_time_base`
    pub device_time_base: f64,

    /// Latest in-order device timestamp observed
    pub last_device_time: f64,

    /// Host minus device time at the last anchor
    pub device_time_offset: f64,

    /// Host time of the last anchor (initialization or resync)
    pub last_sync_time: f64,

    /// Estimated clock drift (ms of host time per second, signed)
    pub drift_rate: f64,

    /// Aggregated synchronization quality (0-1)
    pub sync_quality: f64,

    /// Samples processed since initialization
    pub total_packets: u64,

    /// Samples estimated lost from cadence gaps
    pub dropped_packets: u64,

    /// Samples arriving well before their stream cursor
    pub out_of_order_packets: u64,

    /// Autonomous re-anchors performed
    pub resync_count: u64,

    /// Entries currently held in the drift history
    pub drift_samples: usize,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            master_time_base: 0.0,
            device_time_base: 0.0,
            last_device_time: 0.0,
            device_time_offset: 0.0,
            last_sync_time: 0.0,
            drift_rate: 0.0,
            sync_quality: 1.0,
            total_packets: 0,
            dropped_packets: 0,
            out_of_order_packets: 0,
            resync_count: 0,
            drift_samples: 0,
        }
    }
}

impl SyncState {
    /// Fraction of samples estimated lost (0 when nothing was processed)
    pub fn loss_ratio(&self) -> f64 {
        if self.total_packets == 0 {
            0.0
        } else {
            self.dropped_packets as f64 / self.total_packets as f64
        }
    }
}

/// Timing statistics of one sensor stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorTimingInfo {
    /// Nominal spacing derived from the sampling rate (ms), never changes
    pub expected_interval: f64,

    /// Smoothed observed spacing (ms)
    pub actual_interval: f64,

    /// Smoothed absolute deviation from `expected_interval` (ms)
    pub jitter: f64,

    /// Timing reliability derived from jitter (0-1)
    pub reliability: f64,

    /// Intervals folded into the averages
    pub samples: u64,
}

impl SensorTimingInfo {
    /// Fresh statistics for a sensor: nominal interval, no jitter
    pub fn for_sensor(sensor: SensorKind) -> Self {
        let expected = sensor.expected_interval_ms();
        Self {
            expected_interval: expected,
            actual_interval: expected,
            jitter: 0.0,
            reliability: 1.0,
            samples: 0,
        }
    }
}

/// A single anomaly detected while validating a sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimingIssue {
    /// Sample is far behind its stream cursor
    PastTimestamp { delta_ms: f64 },

    /// Sample is far ahead of its stream cursor
    FutureTimestamp { delta_ms: f64 },

    /// Observed interval deviates from the nominal cadence
    CadenceMismatch { interval_ms: f64, expected_ms: f64 },

    /// Accelerometer timestamp snapped onto the nominal grid
    CrackingCorrected { shift_ms: f64 },

    /// Clock drift estimate beyond the acceptable rate
    DriftExceeded { drift_rate: f64 },

    /// Held at the stream's last output after a backwards re-anchoring step
    ResyncHold { held_ms: f64 },

    /// Device timestamp is NaN or infinite; the sample is ignored
    NonFiniteTimestamp,
}

impl TimingIssue {
    /// Stable short label, also the prefix of the `Display` output
    pub const fn label(&self) -> &'static str {
        match self {
            TimingIssue::PastTimestamp { .. } => "past timestamp",
            TimingIssue::FutureTimestamp { .. } => "future timestamp",
            TimingIssue::CadenceMismatch { .. } => "cadence mismatch",
            TimingIssue::CrackingCorrected { .. } => "cracking corrected",
            TimingIssue::DriftExceeded { .. } => "drift exceeded",
            TimingIssue::ResyncHold { .. } => "resync hold",
            TimingIssue::NonFiniteTimestamp => "non-finite timestamp",
        }
    }
}

impl fmt::Display for TimingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TimingIssue::PastTimestamp { delta_ms } => {
                write!(f, "{} ({:.2}ms behind stream)", self.label(), -delta_ms)
            }
            TimingIssue::FutureTimestamp { delta_ms } => {
                write!(f, "{} ({:.2}ms ahead of stream)", self.label(), delta_ms)
            }
            TimingIssue::CadenceMismatch {
                interval_ms,
                expected_ms,
            } => write!(
                f,
                "{} (interval {:.2}ms, expected {:.2}ms)",
                self.label(),
                interval_ms,
                expected_ms
            ),
            TimingIssue::CrackingCorrected { shift_ms } => {
                write!(f, "{} (shifted {:+.2}ms)", self.label(), shift_ms)
            }
            TimingIssue::DriftExceeded { drift_rate } => {
                write!(f, "{} ({:+.2}ms/s)", self.label(), drift_rate)
            }
            TimingIssue::ResyncHold { held_ms } => {
                write!(f, "{} (held {:.2}ms)", self.label(), held_ms)
            }
            TimingIssue::NonFiniteTimestamp => f.write_str(self.label()),
        }
    }
}

/// Per-sample validation result
///
/// Downstream must use `corrected_timestamp` as the authoritative sample
/// time and may discard samples with `is_valid == false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampValidationResult {
    /// Stream the sample belongs to
    pub sensor: SensorKind,

    /// Whether the sample is trustworthy
    pub is_valid: bool,

    /// Device timestamp mapped through the current anchor
    pub normalized_timestamp: f64,

    /// Authoritative host-relative timestamp
    pub corrected_timestamp: f64,

    /// Product of per-check penalties (0-1)
    pub confidence: f64,

    /// Detected anomalies in check order
    pub issues: Vec<TimingIssue>,
}

impl TimestampValidationResult {
    /// Whether an issue with the given label was raised
    pub fn has_issue(&self, label: &str) -> bool {
        self.issues.iter().any(|issue| issue.label() == label)
    }

    /// Human-readable issue descriptions
    pub fn issue_messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Health summary for dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Quality above threshold and no active issues
    pub is_healthy: bool,

    /// Current aggregated quality (0-1)
    pub quality: f64,

    /// Active issues
    pub issues: Vec<String>,

    /// Suggested remedies, one per issue
    pub recommendations: Vec<String>,
}
