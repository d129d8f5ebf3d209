//! Sync engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// How inter-sample intervals are measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalTracking {
    /// Each sensor measures intervals from its own previous sample
    #[default]
    PerSensor,
    /// All sensors share one "previous sample" cursor (legacy behavior:
    /// interleaved streams perturb each other's interval estimates)
    Shared,
}

/// Timestamp synchronization tuning
///
/// Defaults are the production thresholds; every field may be omitted in
/// configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TimeSyncConfig {
    /// Cadence deviation tolerated before flagging a mismatch (ms)
    #[validate(range(exclusive_min = 0.0))]
    pub max_acceptable_jitter_ms: f64,

    /// Drift rate tolerated before flagging and resyncing (ms/s)
    #[validate(range(exclusive_min = 0.0))]
    pub max_acceptable_drift_ms_per_s: f64,

    /// Maximum host time between anchors (ms)
    #[validate(range(exclusive_min = 0.0))]
    pub resync_interval_ms: f64,

    /// Drift history capacity (oldest evicted first)
    #[validate(range(min = 2))]
    pub drift_history_capacity: usize,

    /// Number of most recent drift samples used for the slope
    #[validate(range(min = 2))]
    pub drift_rate_window: usize,

    /// Span of normalized time folded into one drift sample (ms)
    ///
    /// Each drift sample keeps the smallest host-minus-device offset seen
    /// over the period, so per-packet transport delay does not read as
    /// clock drift. `0` records every packet.
    #[validate(range(min = 0.0))]
    pub drift_sample_period_ms: f64,

    /// EMA smoothing factor for interval and jitter
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub smoothing_factor: f64,

    /// Accelerometer deviation, as a fraction of the nominal interval,
    /// above which samples are snapped onto the nominal grid
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub cracking_tolerance: f64,

    /// Quality above which the engine may report healthy
    #[validate(range(min = 0.0, max = 1.0))]
    pub healthy_quality_threshold: f64,

    /// Per-sensor reliability below which an issue is raised
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_sensor_reliability: f64,

    /// Interval cursor mode
    pub interval_tracking: IntervalTracking,
}

impl Default for TimeSyncConfig {
    fn default() -> Self {
        Self {
            max_acceptable_jitter_ms: 10.0,
            max_acceptable_drift_ms_per_s: 5.0,
            resync_interval_ms: 5000.0,
            drift_history_capacity: 100,
            drift_rate_window: 10,
            drift_sample_period_ms: 100.0,
            smoothing_factor: 0.1,
            cracking_tolerance: 0.5,
            healthy_quality_threshold: 0.8,
            min_sensor_reliability: 0.8,
            interval_tracking: IntervalTracking::PerSensor,
        }
    }
}
