//! DiagnosticsSink trait - structured engine diagnostics
//!
//! The engine reports what it detects and does as `SyncEvent`s instead of
//! writing log lines itself. Sinks decide how to surface them.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::{SensorKind, TimingIssue};

/// Why the anchor was re-established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResyncReason {
    /// Periodic refresh after the resync interval elapsed
    Interval,
    /// Drift estimate exceeded the acceptable rate
    Drift,
    /// Requested by the owner of the engine
    Manual,
}

impl ResyncReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            ResyncReason::Interval => "interval",
            ResyncReason::Drift => "drift",
            ResyncReason::Manual => "manual",
        }
    }
}

/// Event emitted by the synchronization engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// First anchor of an epoch established
    Initialized {
        master_time_base: f64,
        device_time_base: f64,
    },

    /// A sample raised an anomaly
    Anomaly {
        sensor: SensorKind,
        issue: TimingIssue,
        confidence: f64,
    },

    /// Anchor re-established
    Resynced {
        reason: ResyncReason,
        drift_rate: f64,
        host_time: f64,
        device_time: f64,
        /// Change of the normalized time of `device_time` caused by the new anchor
        anchor_jump_ms: f64,
    },

    /// Engine returned to the uninitialized state
    Reset,
}

/// Diagnostics consumer
///
/// Called synchronously from the ingestion path, so implementations must
/// not block.
pub trait DiagnosticsSink: Send + Sync {
    /// Sink name (used for logging)
    fn name(&self) -> &str;

    /// Receive one event
    fn emit(&self, event: &SyncEvent);
}

/// Sink that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl DiagnosticsSink for NoopDiagnostics {
    fn name(&self) -> &str {
        "noop"
    }

    fn emit(&self, _event: &SyncEvent) {}
}

/// Sink that keeps every event in memory
///
/// Cloning shares the underlying buffer, so a clone can be handed to the
/// engine while the original is inspected.
#[derive(Debug, Clone, Default)]
pub struct RecordingDiagnostics {
    events: Arc<Mutex<Vec<SyncEvent>>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events received so far
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of resync events received
    pub fn resync_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SyncEvent::Resynced { .. }))
            .count()
    }

    /// Drop recorded events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl DiagnosticsSink for RecordingDiagnostics {
    fn name(&self) -> &str {
        "recording"
    }

    fn emit(&self, event: &SyncEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
