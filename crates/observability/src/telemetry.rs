//! Diagnostics sink backed by tracing and the metrics facade.

use contracts::{DiagnosticsSink, SyncEvent};
use metrics::{counter, gauge};
use tracing::{debug, info, warn};

/// Turns engine events into log lines and counters
///
/// Anomalies are frequent under a lossy link, so they log at debug level
/// and are counted; resyncs and lifecycle changes log at info/warn.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySink {
    session_id: Option<String>,
}

impl TelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a session id to every log line
    pub fn with_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
        }
    }

    fn session(&self) -> &str {
        self.session_id.as_deref().unwrap_or("-")
    }
}

impl DiagnosticsSink for TelemetrySink {
    fn name(&self) -> &str {
        "telemetry"
    }

    fn emit(&self, event: &SyncEvent) {
        match event {
            SyncEvent::Initialized {
                master_time_base,
                device_time_base,
            } => {
                info!(
                    session = self.session(),
                    master_time_base,
                    device_time_base,
                    "time synchronization initialized"
                );
                counter!("biosync_sync_initialized_total").increment(1);
            }
            SyncEvent::Anomaly {
                sensor,
                issue,
                confidence,
            } => {
                debug!(
                    session = self.session(),
                    sensor = %sensor,
                    issue = %issue,
                    confidence,
                    "timing anomaly"
                );
                counter!(
                    "biosync_anomalies_total",
                    "sensor" => sensor.as_str(),
                    "issue" => issue.label()
                )
                .increment(1);
            }
            SyncEvent::Resynced {
                reason,
                drift_rate,
                host_time,
                device_time,
                anchor_jump_ms,
            } => {
                warn!(
                    session = self.session(),
                    reason = reason.as_str(),
                    drift_rate,
                    host_time,
                    device_time,
                    anchor_jump_ms,
                    "time synchronization re-anchored"
                );
                counter!("biosync_resyncs_total", "reason" => reason.as_str()).increment(1);
                gauge!("biosync_last_anchor_jump_ms").set(*anchor_jump_ms);
            }
            SyncEvent::Reset => {
                info!(session = self.session(), "time synchronization reset");
                counter!("biosync_sync_resets_total").increment(1);
            }
        }
    }
}
