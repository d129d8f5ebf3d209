//! Main timestamp synchronization engine.

use std::fmt;
use std::sync::Arc;

use contracts::{
    DiagnosticsSink, NoopDiagnostics, ResyncReason, SensorKind, SensorTable, SensorTimingInfo,
    SyncEvent, SyncState, SyncStatus, TimeSyncConfig, TimestampValidationResult, TimingIssue,
};
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::anchor::TimeAnchor;
use crate::clock::{HostClock, SystemClock};
use crate::drift::{DriftSample, DriftTracker};
use crate::quality::{build_status, compute_quality};
use crate::timing::{IntervalCursors, TimingTracker};
use crate::validator::Validation;

/// Engine lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    /// No anchor yet; the next sample establishes one
    Uninitialized,
    /// Anchored and normalizing
    Running,
}

/// Biosignal timestamp synchronization engine
///
/// Maps device timestamps of the EEG/PPG/ACC streams onto the host clock,
/// validates every sample and keeps the mapping fresh by re-anchoring.
/// One instance per device session; not internally synchronized.
pub struct SyncEngine {
    /// Configuration
    config: TimeSyncConfig,
    /// Host time source
    clock: Arc<dyn HostClock>,
    /// Receives initialization, anomaly, resync and reset events
    diagnostics: Arc<dyn DiagnosticsSink>,
    /// Current anchor, `None` while uninitialized
    anchor: Option<TimeAnchor>,
    /// Counters and anchor mirror
    state: SyncState,
    /// Per-sensor interval statistics
    trackers: SensorTable<TimingTracker>,
    /// Previous-sample cursors
    cursors: IntervalCursors,
    /// Drift history and rate
    drift: DriftTracker,
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("phase", &self.phase())
            .field("clock", &self.clock)
            .field("diagnostics", &self.diagnostics.name())
            .field("state", &self.state)
            .field("drift", &self.drift)
            .finish()
    }
}

impl SyncEngine {
    /// Create an engine reading the system clock
    pub fn new(config: TimeSyncConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create an engine reading the given clock
    pub fn with_clock(config: TimeSyncConfig, clock: Arc<dyn HostClock>) -> Self {
        Self {
            trackers: SensorTable::from_fn(TimingTracker::new),
            cursors: IntervalCursors::new(config.interval_tracking),
            drift: DriftTracker::new(
                config.drift_history_capacity,
                config.drift_rate_window,
                config.drift_sample_period_ms,
            ),
            clock,
            diagnostics: Arc::new(NoopDiagnostics),
            anchor: None,
            state: SyncState::default(),
            config,
        }
    }

    /// Route engine events to `sink`
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn config(&self) -> &TimeSyncConfig {
        &self.config
    }

    pub fn phase(&self) -> EnginePhase {
        if self.anchor.is_some() {
            EnginePhase::Running
        } else {
            EnginePhase::Uninitialized
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.anchor.is_some()
    }

    /// Anchor device time to the current host time
    ///
    /// Returns `false` (and changes nothing) when already initialized or
    /// when `device_timestamp` is not finite.
    #[instrument(level = "debug", name = "sync_engine_initialize", skip(self))]
    pub fn initialize(&mut self, device_timestamp: f64) -> bool {
        if self.anchor.is_some() || !device_timestamp.is_finite() {
            return false;
        }
        self.anchor_at(device_timestamp);
        true
    }

    fn anchor_at(&mut self, device_timestamp: f64) -> TimeAnchor {
        let anchor = TimeAnchor::establish(device_timestamp, self.clock.now_ms());
        self.apply_anchor(anchor);
        self.state.last_device_time = device_timestamp;

        self.diagnostics.emit(&SyncEvent::Initialized {
            master_time_base: anchor.master_time_base,
            device_time_base: anchor.device_time_base,
        });
        anchor
    }

    fn apply_anchor(&mut self, anchor: TimeAnchor) {
        self.anchor = Some(anchor);
        self.state.master_time_base = anchor.master_time_base;
        self.state.device_time_base = anchor.device_time_base;
        self.state.device_time_offset = anchor.offset();
        self.state.last_sync_time = anchor.master_time_base;
    }

    /// Map a device timestamp onto host time without validation
    ///
    /// `None` while uninitialized.
    pub fn normalize(&self, device_timestamp: f64) -> Option<f64> {
        self.anchor.map(|anchor| anchor.normalize(device_timestamp))
    }

    /// Normalize, validate and account for one sample
    ///
    /// The first sample after construction or reset establishes the anchor.
    /// Non-finite timestamps are counted and returned invalid without
    /// touching the anchor, cursors or drift history.
    #[instrument(
        level = "trace",
        name = "sync_engine_normalize",
        skip(self, sensor),
        fields(sensor = %sensor)
    )]
    pub fn normalize_timestamp(
        &mut self,
        device_timestamp: f64,
        sensor: SensorKind,
    ) -> TimestampValidationResult {
        if !device_timestamp.is_finite() {
            return self.reject(device_timestamp, sensor);
        }

        let anchor = match self.anchor {
            Some(anchor) => anchor,
            None => self.anchor_at(device_timestamp),
        };
        let now = self.clock.now_ms();
        self.state.total_packets += 1;

        let normalized = anchor.normalize(device_timestamp);
        let cursor = self.cursors.get(sensor);

        let mut validation = Validation::new(sensor, normalized);
        validation.check_ordering(cursor);
        validation.check_cadence(cursor, &self.config);

        // Late arrivals measure transport delay, not clock drift
        if !validation.is_out_of_order() {
            self.drift.observe(DriftSample {
                time: normalized,
                drift: anchor.drift(now, validation.corrected()),
            });
            self.state.drift_rate = self.drift.rate();
        }
        validation.check_drift(self.state.drift_rate, &self.config);
        validation.hold_at(cursor);

        if validation.is_out_of_order() {
            self.state.out_of_order_packets += 1;
        }
        self.state.dropped_packets += validation.estimated_lost();
        if let Some(interval) = validation.interval() {
            self.trackers[sensor].update(interval, self.config.smoothing_factor);
        }

        let result = validation.finish();
        self.cursors
            .advance(sensor, normalized, result.corrected_timestamp);
        self.state.last_device_time = self.state.last_device_time.max(device_timestamp);

        for issue in &result.issues {
            self.diagnostics.emit(&SyncEvent::Anomaly {
                sensor,
                issue: *issue,
                confidence: result.confidence,
            });
        }
        trace!(
            normalized = result.normalized_timestamp,
            corrected = result.corrected_timestamp,
            confidence = result.confidence,
            valid = result.is_valid,
            "sample normalized"
        );

        self.check_resync_needed(now);
        self.state.sync_quality = compute_quality(&self.state, &self.sensor_timings(), &self.config);

        result
    }

    fn reject(&mut self, device_timestamp: f64, sensor: SensorKind) -> TimestampValidationResult {
        self.state.total_packets += 1;
        let result = Validation::rejected(sensor, device_timestamp);
        self.diagnostics.emit(&SyncEvent::Anomaly {
            sensor,
            issue: TimingIssue::NonFiniteTimestamp,
            confidence: result.confidence,
        });
        self.state.sync_quality = compute_quality(&self.state, &self.sensor_timings(), &self.config);
        result
    }

    /// Re-anchor when the interval elapsed or drift is excessive
    fn check_resync_needed(&mut self, now: f64) -> Option<ResyncReason> {
        let reason = if self.state.drift_rate.abs() > self.config.max_acceptable_drift_ms_per_s {
            ResyncReason::Drift
        } else if now - self.state.last_sync_time > self.config.resync_interval_ms {
            ResyncReason::Interval
        } else {
            return None;
        };
        self.perform_resync(now, reason);
        Some(reason)
    }

    /// Re-anchor immediately
    ///
    /// Returns `false` while uninitialized.
    pub fn force_resync(&mut self) -> bool {
        if self.anchor.is_none() {
            return false;
        }
        let now = self.clock.now_ms();
        self.perform_resync(now, ResyncReason::Manual);
        true
    }

    #[instrument(
        level = "debug",
        name = "sync_engine_resync",
        skip(self, reason),
        fields(reason = reason.as_str())
    )]
    fn perform_resync(&mut self, now: f64, reason: ResyncReason) {
        let Some(previous) = self.anchor else {
            return;
        };
        let device_time = self.state.last_device_time;
        let anchor = TimeAnchor::establish(device_time, now);

        // Keep interval measurement continuous across the new mapping; a
        // backwards jump leaves floors so outputs never step back unflagged
        let jump = anchor.normalize(device_time) - previous.normalize(device_time);
        self.cursors.shift(jump);

        let drift_rate = self.state.drift_rate;
        self.apply_anchor(anchor);
        self.drift.clear();
        self.state.drift_rate = 0.0;
        self.state.resync_count += 1;

        self.diagnostics.emit(&SyncEvent::Resynced {
            reason,
            drift_rate,
            host_time: now,
            device_time,
            anchor_jump_ms: jump,
        });
    }

    /// Snapshot of the synchronization state
    pub fn metrics(&self) -> SyncState {
        SyncState {
            drift_samples: self.drift.len(),
            ..self.state
        }
    }

    /// Snapshot of the per-sensor timing statistics
    pub fn sensor_timings(&self) -> SensorTable<SensorTimingInfo> {
        SensorTable::from_fn(|sensor| self.trackers[sensor].info())
    }

    /// Drift observations since the last anchor, oldest first
    pub fn drift_history(&self) -> Vec<DriftSample> {
        self.drift.samples()
    }

    /// Health summary with issues and recommendations
    pub fn sync_status(&self) -> SyncStatus {
        build_status(&self.state, &self.sensor_timings(), &self.config)
    }

    /// Return to the uninitialized state, discarding all history
    #[instrument(level = "debug", name = "sync_engine_reset", skip(self))]
    pub fn reset(&mut self) {
        self.anchor = None;
        self.state = SyncState::default();
        self.trackers = SensorTable::from_fn(TimingTracker::new);
        self.cursors.clear();
        self.drift.clear();
        self.diagnostics.emit(&SyncEvent::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use contracts::{IntervalTracking, RecordingDiagnostics};

    const HOST_START: f64 = 50_000.0;
    const DEVICE_START: f64 = 1_000.0;

    fn setup_with(config: TimeSyncConfig) -> (SyncEngine, ManualClock, RecordingDiagnostics) {
        let clock = ManualClock::new(HOST_START);
        let sink = RecordingDiagnostics::new();
        let engine = SyncEngine::with_clock(config, Arc::new(clock.clone()))
            .with_diagnostics(Arc::new(sink.clone()));
        (engine, clock, sink)
    }

    fn setup() -> (SyncEngine, ManualClock, RecordingDiagnostics) {
        setup_with(TimeSyncConfig::default())
    }

    /// Feed `count` samples of one sensor at nominal cadence, host clock
    /// advancing by `host_per_device` per device millisecond before every
    /// sample except the anchoring one.
    fn feed(
        engine: &mut SyncEngine,
        clock: &ManualClock,
        sensor: SensorKind,
        start_device: f64,
        count: usize,
        host_per_device: f64,
    ) -> Vec<TimestampValidationResult> {
        let interval = sensor.expected_interval_ms();
        (0..count)
            .map(|i| {
                if engine.is_initialized() {
                    clock.advance(interval * host_per_device);
                }
                engine.normalize_timestamp(start_device + i as f64 * interval, sensor)
            })
            .collect()
    }

    #[test]
    fn test_first_sample_anchors_to_host_time() {
        let (mut engine, _clock, sink) = setup();
        assert_eq!(engine.phase(), EnginePhase::Uninitialized);
        assert!(engine.normalize(DEVICE_START).is_none());

        let result = engine.normalize_timestamp(DEVICE_START, SensorKind::Eeg);
        assert_eq!(result.normalized_timestamp, HOST_START);
        assert_eq!(result.corrected_timestamp, HOST_START);
        assert!(result.is_valid);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(engine.phase(), EnginePhase::Running);

        let state = engine.metrics();
        assert_eq!(state.master_time_base, HOST_START);
        assert_eq!(state.device_time_base, DEVICE_START);
        assert_eq!(state.device_time_offset, HOST_START - DEVICE_START);
        assert_eq!(state.total_packets, 1);
        assert!(matches!(sink.events()[0], SyncEvent::Initialized { .. }));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (mut engine, clock, sink) = setup();
        assert!(engine.initialize(DEVICE_START));
        clock.advance(100.0);
        assert!(!engine.initialize(DEVICE_START + 500.0));
        assert_eq!(engine.metrics().master_time_base, HOST_START);
        assert_eq!(engine.normalize(DEVICE_START + 4.0), Some(HOST_START + 4.0));
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn test_drift_free_stream_is_clean() {
        let (mut engine, clock, sink) = setup();
        let results = feed(&mut engine, &clock, SensorKind::Eeg, DEVICE_START, 500, 1.0);

        assert!(results.iter().all(|r| r.is_valid && r.issues.is_empty()));
        for pair in results.windows(2) {
            assert!(pair[1].corrected_timestamp > pair[0].corrected_timestamp);
        }

        let state = engine.metrics();
        assert!(state.drift_rate.abs() < 1e-6);
        assert_eq!(state.total_packets, 500);
        assert_eq!(state.dropped_packets, 0);
        assert_eq!(state.out_of_order_packets, 0);
        assert!(state.sync_quality > 0.99);
        assert!(engine.sync_status().is_healthy);
        assert_eq!(sink.resync_count(), 0);

        let timing = engine.sensor_timings()[SensorKind::Eeg];
        assert!((timing.actual_interval - 4.0).abs() < 1e-6);
        assert_eq!(timing.expected_interval, 4.0);
    }

    #[test]
    fn test_expected_intervals_never_change() {
        let (mut engine, clock, _sink) = setup();
        for sensor in SensorKind::ALL {
            feed(&mut engine, &clock, sensor, DEVICE_START, 30, 1.3);
        }
        let timings = engine.sensor_timings();
        for (sensor, info) in timings.iter() {
            assert_eq!(info.expected_interval, sensor.expected_interval_ms());
        }
    }

    #[test]
    fn test_past_sample_flagged_and_counted() {
        let (mut engine, clock, sink) = setup_with(TimeSyncConfig {
            drift_sample_period_ms: 0.0,
            ..Default::default()
        });
        let results = feed(&mut engine, &clock, SensorKind::Eeg, DEVICE_START, 50, 1.0);
        let last = results.last().unwrap().normalized_timestamp;

        let late = engine.normalize_timestamp(DEVICE_START + 49.0 * 4.0 - 80.0, SensorKind::Eeg);
        assert!(late.has_issue("past timestamp"));
        assert!(late.confidence <= 0.5);
        assert!(!late.is_valid);
        assert!(late.normalized_timestamp < last);
        assert_eq!(engine.metrics().out_of_order_packets, 1);
        assert!(sink.events().iter().any(|e| matches!(
            e,
            SyncEvent::Anomaly {
                issue: contracts::TimingIssue::PastTimestamp { .. },
                ..
            }
        )));

        // Stream continues from the untouched cursor
        assert_eq!(engine.metrics().drift_samples, 50);
        clock.advance(4.0);
        let next = engine.normalize_timestamp(DEVICE_START + 50.0 * 4.0, SensorKind::Eeg);
        assert!(next.issues.is_empty());
    }

    #[test]
    fn test_acc_cracking_snaps_onto_grid() {
        let (mut engine, clock, sink) = setup();
        let expected = SensorKind::Acc.expected_interval_ms();

        // Emitted on the nominal grid, odd samples stamped 0.8E early:
        // device spacing alternates 0.2E / 1.8E
        let mut corrected = Vec::new();
        for k in 0..41 {
            let nominal = k as f64 * expected;
            let stamp_error = if k % 2 == 1 { 0.8 * expected } else { 0.0 };
            clock.set(HOST_START + nominal);
            let result = engine.normalize_timestamp(DEVICE_START + nominal - stamp_error, SensorKind::Acc);
            if k > 0 {
                assert!(result.has_issue("cracking corrected"), "sample {k}");
                assert!(result.is_valid);
            }
            corrected.push(result.corrected_timestamp);
        }

        for pair in corrected.windows(2) {
            let spacing = pair[1] - pair[0];
            assert!(
                (spacing - expected).abs() < 1e-6,
                "spacing {spacing} not on grid"
            );
        }
        // Snapped timestamps agree with arrival time, so no drift builds up
        assert!(engine.metrics().drift_rate.abs() < 1e-6);
        assert_eq!(sink.resync_count(), 0);
    }

    #[test]
    fn test_drift_triggers_resync_and_recovers() {
        let (mut engine, clock, sink) = setup();
        // Device clock slow by 8ms per second. Drift samples close every
        // 26 EEG packets, so the tenth one lands on packet 259.
        let results = feed(&mut engine, &clock, SensorKind::Eeg, DEVICE_START, 260, 1.008);

        let first_flag = results.iter().position(|r| r.has_issue("drift exceeded"));
        assert_eq!(first_flag, Some(259));
        assert_eq!(sink.resync_count(), 1);
        let state = engine.metrics();
        assert_eq!(state.resync_count, 1);
        assert_eq!(state.drift_rate, 0.0);
        assert_eq!(state.drift_samples, 0);
        assert_eq!(state.last_device_time, DEVICE_START + 1_036.0);
        assert_eq!(state.device_time_base, DEVICE_START + 1_036.0);

        let resync = sink
            .events()
            .into_iter()
            .find_map(|e| match e {
                SyncEvent::Resynced {
                    reason, drift_rate, ..
                } => Some((reason, drift_rate)),
                _ => None,
            })
            .unwrap();
        assert_eq!(resync.0, ResyncReason::Drift);
        assert!((resync.1 - 8.0).abs() < 1e-6);

        // Drift stops: the estimate settles back at zero
        let results = feed(&mut engine, &clock, SensorKind::Eeg, DEVICE_START + 1_040.0, 400, 1.0);
        assert!(engine.metrics().drift_samples >= 10);
        assert!(engine.metrics().drift_rate.abs() < 1e-6);
        assert!(results.iter().all(|r| r.issues.is_empty()));
        assert_eq!(engine.metrics().resync_count, 1);
    }

    #[test]
    fn test_arrival_jitter_is_not_drift() {
        let (mut engine, clock, sink) = setup();
        // Steady device clock, arrivals jittered by up to 1ms either way
        let jitter = [1.0, -1.0, 0.5, -0.5, 0.0, 0.75, -0.75];
        for i in 0..1250 {
            clock.set(HOST_START + i as f64 * 4.0 + jitter[i % jitter.len()]);
            let result = engine.normalize_timestamp(DEVICE_START + i as f64 * 4.0, SensorKind::Eeg);
            assert!(result.issues.is_empty(), "sample {i}: {:?}", result.issues);
        }

        let state = engine.metrics();
        assert!(state.drift_samples >= 40);
        assert!(state.drift_rate.abs() < 1e-6);
        assert_eq!(sink.resync_count(), 0);
    }

    #[test]
    fn test_backwards_resync_never_steps_output_back() {
        let (mut engine, clock, sink) = setup();
        // Device clock fast by 4ms per second: under the drift limit, so
        // only the periodic resync re-anchors, pulling normalized time back
        let results = feed(&mut engine, &clock, SensorKind::Eeg, DEVICE_START, 1_500, 0.996);

        assert_eq!(sink.resync_count(), 1);
        let jump = sink
            .events()
            .into_iter()
            .find_map(|e| match e {
                SyncEvent::Resynced {
                    reason: ResyncReason::Interval,
                    anchor_jump_ms,
                    ..
                } => Some(anchor_jump_ms),
                _ => None,
            })
            .unwrap();
        assert!(jump < -16.0);

        for pair in results.windows(2) {
            assert!(
                pair[1].corrected_timestamp >= pair[0].corrected_timestamp,
                "output stepped back from {} to {}",
                pair[0].corrected_timestamp,
                pair[1].corrected_timestamp
            );
        }

        let held: Vec<_> = results.iter().filter(|r| r.has_issue("resync hold")).collect();
        assert_eq!(held.len(), 5);
        assert!(held.iter().all(|r| r.is_valid));
        assert!(held.iter().all(|r| r.corrected_timestamp > r.normalized_timestamp));
        assert!(!results.iter().any(|r| r.has_issue("drift exceeded")));
        // Normalized time restarts on the new anchor
        let last = results.last().unwrap();
        assert_eq!(last.corrected_timestamp, last.normalized_timestamp);
    }

    #[test]
    fn test_non_finite_timestamp_is_ignored() {
        let (mut engine, clock, sink) = setup();
        let result = engine.normalize_timestamp(f64::NAN, SensorKind::Eeg);
        assert!(!result.is_valid);
        assert!(result.has_issue("non-finite timestamp"));
        assert!(!engine.is_initialized());
        assert!(!engine.initialize(f64::INFINITY));

        feed(&mut engine, &clock, SensorKind::Eeg, DEVICE_START, 20, 1.0);
        let result = engine.normalize_timestamp(f64::INFINITY, SensorKind::Eeg);
        assert!(!result.is_valid);
        let results = feed(&mut engine, &clock, SensorKind::Eeg, DEVICE_START + 80.0, 5, 1.0);
        assert!(results.iter().all(|r| r.issues.is_empty()));
        assert!(results.iter().all(|r| r.corrected_timestamp.is_finite()));

        let state = engine.metrics();
        assert_eq!(state.total_packets, 27);
        assert_eq!(state.master_time_base, HOST_START);
        assert_eq!(state.last_device_time, DEVICE_START + 96.0);
        assert!(engine.drift_history().iter().all(|d| d.drift.is_finite()));
        let rejected = sink
            .events()
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    SyncEvent::Anomaly {
                        issue: TimingIssue::NonFiniteTimestamp,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(rejected, 2);
    }

    #[test]
    fn test_interval_resync() {
        let (mut engine, clock, sink) = setup();
        feed(&mut engine, &clock, SensorKind::Ppg, DEVICE_START, 250, 1.0);
        // 249 * 20ms = 4980ms of host time so far
        assert_eq!(sink.resync_count(), 0);

        feed(&mut engine, &clock, SensorKind::Ppg, DEVICE_START + 250.0 * 20.0, 2, 1.0);
        clock.advance(20.0);
        engine.normalize_timestamp(DEVICE_START + 252.0 * 20.0, SensorKind::Ppg);

        let state = engine.metrics();
        assert_eq!(state.resync_count, 1);
        assert!(state.last_sync_time > HOST_START + 5_000.0);
        assert!(sink.events().iter().any(|e| matches!(
            e,
            SyncEvent::Resynced {
                reason: ResyncReason::Interval,
                ..
            }
        )));
        assert_eq!(state.dropped_packets, 0);
    }

    #[test]
    fn test_loss_estimated_from_gap() {
        let (mut engine, clock, _sink) = setup();
        feed(&mut engine, &clock, SensorKind::Ppg, DEVICE_START, 20, 1.0);
        // Skip 3 samples
        clock.advance(80.0);
        let result = engine.normalize_timestamp(DEVICE_START + 23.0 * 20.0, SensorKind::Ppg);
        assert!(result.has_issue("cadence mismatch"));
        let state = engine.metrics();
        assert_eq!(state.dropped_packets, 3);
        assert!((state.sync_quality - compute_quality(&state, &engine.sensor_timings(), engine.config())).abs() < 1e-12);
        assert!(state.sync_quality < 1.0);
    }

    #[test]
    fn test_reset_matches_fresh_engine() {
        let (mut engine, clock, sink) = setup();
        feed(&mut engine, &clock, SensorKind::Eeg, DEVICE_START, 20, 1.008);
        feed(&mut engine, &clock, SensorKind::Acc, DEVICE_START, 20, 1.0);
        engine.reset();

        let (fresh, _, _) = setup();
        assert_eq!(engine.metrics(), fresh.metrics());
        assert_eq!(engine.sensor_timings(), fresh.sensor_timings());
        assert_eq!(engine.sync_status(), fresh.sync_status());
        assert_eq!(engine.phase(), EnginePhase::Uninitialized);
        assert!(engine.drift_history().is_empty());
        assert!(matches!(sink.events().last(), Some(SyncEvent::Reset)));

        // Next sample anchors again
        clock.advance(1_000.0);
        let result = engine.normalize_timestamp(9_000.0, SensorKind::Ppg);
        assert_eq!(result.normalized_timestamp, clock.now());
        assert!(result.issues.is_empty());
    }

    /// EEG every 4ms with PPG interleaved 2ms after every fifth EEG sample.
    /// Returns the number of issues raised on each stream.
    fn interleave(engine: &mut SyncEngine, clock: &ManualClock, count: usize) -> (usize, usize) {
        let (mut eeg_issues, mut ppg_issues) = (0, 0);
        for i in 0..count {
            let offset = i as f64 * 4.0;
            clock.set(HOST_START + offset);
            eeg_issues += engine
                .normalize_timestamp(DEVICE_START + offset, SensorKind::Eeg)
                .issues
                .len();
            if i % 5 == 0 {
                clock.set(HOST_START + offset + 2.0);
                ppg_issues += engine
                    .normalize_timestamp(DEVICE_START + offset + 2.0, SensorKind::Ppg)
                    .issues
                    .len();
            }
        }
        (eeg_issues, ppg_issues)
    }

    #[test]
    fn test_per_sensor_streams_do_not_interfere() {
        let (mut engine, clock, _sink) = setup();
        assert_eq!(interleave(&mut engine, &clock, 150), (0, 0));
        assert!(engine.sync_status().is_healthy);
        let ppg = engine.sensor_timings()[SensorKind::Ppg];
        assert!((ppg.actual_interval - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_shared_cursor_cross_contaminates() {
        let config = TimeSyncConfig {
            interval_tracking: IntervalTracking::Shared,
            ..Default::default()
        };
        let (mut engine, clock, _sink) = setup_with(config);
        let (_, ppg_issues) = interleave(&mut engine, &clock, 150);
        // PPG intervals are measured from the preceding EEG sample
        assert!(ppg_issues > 0);
        let ppg = engine.sensor_timings()[SensorKind::Ppg];
        assert!(ppg.actual_interval < 20.0);
        assert!(ppg.reliability < 1.0);
    }

    #[test]
    fn test_force_resync() {
        let (mut engine, clock, sink) = setup();
        assert!(!engine.force_resync());
        feed(&mut engine, &clock, SensorKind::Eeg, DEVICE_START, 5, 1.0);
        clock.advance(10.0);
        assert!(engine.force_resync());
        let state = engine.metrics();
        assert_eq!(state.resync_count, 1);
        assert_eq!(state.master_time_base, clock.now());
        assert_eq!(state.device_time_base, DEVICE_START + 16.0);
        assert!(matches!(
            sink.events().last(),
            Some(SyncEvent::Resynced {
                reason: ResyncReason::Manual,
                anchor_jump_ms,
                ..
            }) if (*anchor_jump_ms - 10.0).abs() < 1e-9
        ));

        // Next sample on cadence stays clean thanks to the cursor shift
        let next = engine.normalize_timestamp(DEVICE_START + 20.0, SensorKind::Eeg);
        assert!(next.issues.is_empty());
        assert_eq!(next.normalized_timestamp, clock.now() + 4.0);
    }
}
