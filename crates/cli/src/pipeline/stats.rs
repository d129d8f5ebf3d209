//! Session report.

use std::time::Duration;

use contracts::{SensorTable, SensorTimingInfo, SyncState, SyncStatus};
use ingestion::{MetricsSnapshot, SimulatedSession};
use observability::MetricsSummary;
use serde::Serialize;

/// What the simulator produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationCounts {
    pub generated: u64,
    pub lost_in_transit: u64,
    pub delivered_late: u64,
}

impl From<&SimulatedSession> for SimulationCounts {
    fn from(session: &SimulatedSession) -> Self {
        Self {
            generated: session.total_generated(),
            lost_in_transit: session.total_lost(),
            delivered_late: session.total_delayed(),
        }
    }
}

/// Ingestion channel counters (realtime runs only)
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionCounts {
    pub received: u64,
    pub dropped: u64,
    pub rejected: u64,
}

impl From<MetricsSnapshot> for IngestionCounts {
    fn from(snapshot: MetricsSnapshot) -> Self {
        Self {
            received: snapshot.samples_received,
            dropped: snapshot.samples_dropped,
            rejected: snapshot.samples_rejected,
        }
    }
}

/// Outcome of one simulated session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: String,

    /// `virtual` or `realtime`
    pub mode: &'static str,

    /// Wall time spent
    #[serde(rename = "wall_time_secs", serialize_with = "as_secs")]
    pub wall_time: Duration,

    /// Samples handed to the engine
    pub samples_processed: u64,

    pub simulation: SimulationCounts,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingestion: Option<IngestionCounts>,

    /// Aggregated validation statistics
    pub validation: MetricsSummary,

    /// Final engine state
    pub state: SyncState,

    /// Final health summary
    pub status: SyncStatus,

    /// Final per-sensor timing statistics
    pub timings: SensorTable<SensorTimingInfo>,
}

fn as_secs<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl SessionReport {
    /// Samples per wall second
    pub fn throughput(&self) -> f64 {
        if self.wall_time.as_secs_f64() > 0.0 {
            self.samples_processed as f64 / self.wall_time.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Session {} ({}) ===\n", self.session_id, self.mode);

        println!("Overview");
        println!("  Wall time: {:.2}s", self.wall_time.as_secs_f64());
        println!("  Samples processed: {}", self.samples_processed);
        println!("  Throughput: {:.0} samples/s", self.throughput());
        println!(
            "  Simulated: {} generated, {} lost in transit, {} delivered late",
            self.simulation.generated,
            self.simulation.lost_in_transit,
            self.simulation.delivered_late
        );
        if let Some(ref ingestion) = self.ingestion {
            println!(
                "  Ingestion: {} received, {} dropped, {} rejected",
                ingestion.received, ingestion.dropped, ingestion.rejected
            );
        }

        println!("\n{}", self.validation);

        println!("Sensor timing");
        for (sensor, info) in self.timings.iter() {
            if info.samples == 0 {
                continue;
            }
            println!(
                "  {}: expected {:.2}ms, actual {:.2}ms, jitter {:.2}ms, reliability {:.3}",
                sensor, info.expected_interval, info.actual_interval, info.jitter, info.reliability
            );
        }

        let health = if self.status.is_healthy { "healthy" } else { "degraded" };
        println!("\nHealth: {} (quality {:.3})", health, self.status.quality);
        for (issue, remedy) in self.status.issues.iter().zip(&self.status.recommendations) {
            println!("  - {issue}: {remedy}");
        }

        println!();
    }
}
