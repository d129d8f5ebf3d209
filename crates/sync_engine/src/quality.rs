//! Aggregate sync quality and health reporting.

use contracts::{SensorTable, SensorTimingInfo, SyncState, SyncStatus, TimeSyncConfig};

/// Weight of drift in the quality score (full drift costs 30%)
const DRIFT_WEIGHT: f64 = 0.3;

/// Quality from drift severity, mean sensor reliability and packet loss
pub(crate) fn compute_quality(
    state: &SyncState,
    timings: &SensorTable<SensorTimingInfo>,
    config: &TimeSyncConfig,
) -> f64 {
    let drift_severity = (state.drift_rate.abs() / config.max_acceptable_drift_ms_per_s).min(1.0);
    let drift_factor = 1.0 - drift_severity * DRIFT_WEIGHT;

    let (sum, count) = timings
        .values()
        .fold((0.0, 0usize), |(sum, n), t| (sum + t.reliability, n + 1));
    let reliability = if count == 0 { 1.0 } else { sum / count as f64 };

    let loss_factor = 1.0 - state.loss_ratio();

    (drift_factor * reliability * loss_factor).clamp(0.0, 1.0)
}

/// Health summary with one recommendation per issue
pub(crate) fn build_status(
    state: &SyncState,
    timings: &SensorTable<SensorTimingInfo>,
    config: &TimeSyncConfig,
) -> SyncStatus {
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    for (sensor, info) in timings.iter() {
        if info.reliability < config.min_sensor_reliability {
            issues.push(format!(
                "{sensor} timing unreliable (reliability {:.2}, jitter {:.2}ms)",
                info.reliability, info.jitter
            ));
            recommendations.push(format!(
                "check {sensor} stream for transport congestion or burst delivery"
            ));
        }
    }

    if state.drift_rate.abs() > config.max_acceptable_drift_ms_per_s {
        issues.push(format!(
            "clock drift {:+.2}ms/s exceeds {:.2}ms/s",
            state.drift_rate, config.max_acceptable_drift_ms_per_s
        ));
        recommendations.push(
            "drift triggers automatic resync; persistent drift points at the device clock"
                .to_string(),
        );
    }

    let quality = compute_quality(state, timings, config);
    if quality <= config.healthy_quality_threshold {
        issues.push(format!(
            "sync quality {:.2} at or below {:.2}",
            quality, config.healthy_quality_threshold
        ));
        recommendations.push(format!(
            "inspect sensor reliability and packet loss ({:.1}% lost)",
            state.loss_ratio() * 100.0
        ));
    }

    SyncStatus {
        is_healthy: quality > config.healthy_quality_threshold && issues.is_empty(),
        quality,
        issues,
        recommendations,
    }
}
