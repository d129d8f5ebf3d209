//! Per-sensor interval statistics and stream cursors.

use contracts::{IntervalTracking, SensorKind, SensorTable, SensorTimingInfo};

/// Exponentially smoothed interval and jitter of one stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TimingTracker {
    info: SensorTimingInfo,
}

impl TimingTracker {
    pub fn new(sensor: SensorKind) -> Self {
        Self {
            info: SensorTimingInfo::for_sensor(sensor),
        }
    }

    /// Fold one observed forward interval into the averages
    pub fn update(&mut self, interval: f64, alpha: f64) {
        let info = &mut self.info;
        let expected = info.expected_interval;

        info.actual_interval = (1.0 - alpha) * info.actual_interval + alpha * interval;
        info.jitter = (1.0 - alpha) * info.jitter + alpha * (interval - expected).abs();
        // Jitter of half a nominal interval means no usable timing
        info.reliability = (1.0 - info.jitter / (expected * 0.5)).clamp(0.0, 1.0);
        info.samples += 1;
    }

    #[inline]
    pub fn info(&self) -> SensorTimingInfo {
        self.info
    }
}

/// Most recent in-order position of a stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StreamCursor {
    pub last_normalized: f64,
    pub last_corrected: f64,
    /// Last output before a backwards re-anchoring step; later outputs of
    /// the stream are held here until they pass it
    pub floor: Option<f64>,
}

/// Cursors used to measure inter-sample intervals
///
/// In `Shared` mode every sensor reads and writes the first slot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct IntervalCursors {
    mode: IntervalTracking,
    slots: SensorTable<Option<StreamCursor>>,
}

impl IntervalCursors {
    pub fn new(mode: IntervalTracking) -> Self {
        Self {
            mode,
            slots: SensorTable::default(),
        }
    }

    #[inline]
    fn slot(&self, sensor: SensorKind) -> SensorKind {
        match self.mode {
            IntervalTracking::PerSensor => sensor,
            IntervalTracking::Shared => SensorKind::Eeg,
        }
    }

    pub fn get(&self, sensor: SensorKind) -> Option<StreamCursor> {
        self.slots[self.slot(sensor)]
    }

    /// Record a processed sample; cursors never move backwards
    pub fn advance(&mut self, sensor: SensorKind, normalized: f64, corrected: f64) {
        let slot = self.slot(sensor);
        match &mut self.slots[slot] {
            Some(cursor) => {
                cursor.last_normalized = cursor.last_normalized.max(normalized);
                cursor.last_corrected = cursor.last_corrected.max(corrected);
                if cursor.floor.is_some_and(|floor| corrected > floor) {
                    cursor.floor = None;
                }
            }
            empty => {
                *empty = Some(StreamCursor {
                    last_normalized: normalized,
                    last_corrected: corrected,
                    floor: None,
                });
            }
        }
    }

    /// Move every cursor by the same offset (re-anchoring)
    ///
    /// A negative offset leaves each stream's last output behind as its floor.
    pub fn shift(&mut self, offset_ms: f64) {
        for cursor in self.slots.values_mut().flatten() {
            if offset_ms < 0.0 {
                let floor = cursor.floor.map_or(cursor.last_corrected, |f| f.max(cursor.last_corrected));
                cursor.floor = Some(floor);
            }
            cursor.last_normalized += offset_ms;
            cursor.last_corrected += offset_ms;
        }
    }

    pub fn clear(&mut self) {
        self.slots = SensorTable::default();
    }
}
