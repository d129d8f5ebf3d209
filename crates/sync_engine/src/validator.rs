//! Per-sample timestamp validation.
//!
//! Checks run in a fixed order (ordering, cadence, drift) and each failing
//! check multiplies the confidence by its penalty.

use contracts::{SensorKind, TimeSyncConfig, TimestampValidationResult, TimingIssue};

use crate::timing::StreamCursor;

/// Sample this far behind its cursor, in nominal intervals, is out of order
const PAST_THRESHOLD_INTERVALS: f64 = 2.0;
/// Sample this far ahead of its cursor, in nominal intervals, is suspicious
const FUTURE_THRESHOLD_INTERVALS: f64 = 10.0;
/// Forward gaps longer than this many intervals count as lost samples
const LOSS_THRESHOLD_INTERVALS: f64 = 2.0;

const PAST_PENALTY: f64 = 0.5;
const FUTURE_PENALTY: f64 = 0.7;
const CADENCE_PENALTY: f64 = 0.8;
const DRIFT_PENALTY: f64 = 0.6;

const MIN_VALID_CONFIDENCE: f64 = 0.5;
const MAX_VALID_ISSUES: usize = 3;

/// Validation of one sample in progress
#[derive(Debug, Clone)]
pub(crate) struct Validation {
    sensor: SensorKind,
    expected: f64,
    normalized: f64,
    corrected: f64,
    confidence: f64,
    issues: Vec<TimingIssue>,
    /// Forward interval to the cursor, when there is one
    interval: Option<f64>,
    out_of_order: bool,
    estimated_lost: u64,
}

impl Validation {
    pub fn new(sensor: SensorKind, normalized: f64) -> Self {
        Self {
            sensor,
            expected: sensor.expected_interval_ms(),
            normalized,
            corrected: normalized,
            confidence: 1.0,
            issues: Vec::new(),
            interval: None,
            out_of_order: false,
            estimated_lost: 0,
        }
    }

    /// Result for a device timestamp that cannot be mapped (NaN or infinite)
    pub fn rejected(sensor: SensorKind, device_timestamp: f64) -> TimestampValidationResult {
        TimestampValidationResult {
            sensor,
            is_valid: false,
            normalized_timestamp: device_timestamp,
            corrected_timestamp: device_timestamp,
            confidence: 0.0,
            issues: vec![TimingIssue::NonFiniteTimestamp],
        }
    }

    fn flag(&mut self, issue: TimingIssue, penalty: f64) {
        self.issues.push(issue);
        self.confidence *= penalty;
    }

    /// Compare against the stream cursor for ordering violations
    pub fn check_ordering(&mut self, cursor: Option<StreamCursor>) {
        let Some(cursor) = cursor else {
            return;
        };
        let delta = self.normalized - cursor.last_normalized;

        if delta < -PAST_THRESHOLD_INTERVALS * self.expected {
            self.out_of_order = true;
            self.flag(TimingIssue::PastTimestamp { delta_ms: delta }, PAST_PENALTY);
        } else if delta > FUTURE_THRESHOLD_INTERVALS * self.expected {
            self.flag(TimingIssue::FutureTimestamp { delta_ms: delta }, FUTURE_PENALTY);
        }
    }

    /// Check the forward interval against the nominal cadence
    ///
    /// Accelerometer samples deviating by more than the cracking tolerance
    /// are snapped onto the nominal grid after the last corrected sample.
    pub fn check_cadence(&mut self, cursor: Option<StreamCursor>, config: &TimeSyncConfig) {
        let Some(cursor) = cursor else {
            return;
        };
        let interval = self.normalized - cursor.last_normalized;
        if interval <= 0.0 {
            return;
        }
        self.interval = Some(interval);

        if interval > LOSS_THRESHOLD_INTERVALS * self.expected {
            self.estimated_lost = ((interval / self.expected).round() as u64).saturating_sub(1);
        }

        let deviation = (interval - self.expected).abs();
        if deviation <= config.max_acceptable_jitter_ms {
            return;
        }
        self.flag(
            TimingIssue::CadenceMismatch {
                interval_ms: interval,
                expected_ms: self.expected,
            },
            CADENCE_PENALTY,
        );

        if self.sensor == SensorKind::Acc && deviation > config.cracking_tolerance * self.expected {
            let steps = ((self.normalized - cursor.last_corrected) / self.expected)
                .round()
                .max(1.0);
            self.corrected = cursor.last_corrected + steps * self.expected;
            self.issues.push(TimingIssue::CrackingCorrected {
                shift_ms: self.corrected - self.normalized,
            });
        }
    }

    pub fn check_drift(&mut self, drift_rate: f64, config: &TimeSyncConfig) {
        if drift_rate.abs() > config.max_acceptable_drift_ms_per_s {
            self.flag(TimingIssue::DriftExceeded { drift_rate }, DRIFT_PENALTY);
        }
    }

    /// Keep the output at or above the stream's pre-resync floor
    pub fn hold_at(&mut self, cursor: Option<StreamCursor>) {
        let Some(floor) = cursor.and_then(|cursor| cursor.floor) else {
            return;
        };
        if self.out_of_order || self.corrected >= floor {
            return;
        }
        self.issues.push(TimingIssue::ResyncHold {
            held_ms: floor - self.corrected,
        });
        self.corrected = floor;
    }

    /// Timestamp after grid snapping (normalized when not snapped)
    #[inline]
    pub fn corrected(&self) -> f64 {
        self.corrected
    }

    #[inline]
    pub fn interval(&self) -> Option<f64> {
        self.interval
    }

    #[inline]
    pub fn is_out_of_order(&self) -> bool {
        self.out_of_order
    }

    #[inline]
    pub fn estimated_lost(&self) -> u64 {
        self.estimated_lost
    }

    pub fn finish(self) -> TimestampValidationResult {
        TimestampValidationResult {
            sensor: self.sensor,
            is_valid: self.confidence > MIN_VALID_CONFIDENCE && self.issues.len() < MAX_VALID_ISSUES,
            normalized_timestamp: self.normalized,
            corrected_timestamp: self.corrected,
            confidence: self.confidence,
            issues: self.issues,
        }
    }
}
