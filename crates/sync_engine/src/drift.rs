//! Clock drift estimation over a bounded history.

use std::fmt;

use ringbuf::{traits::*, HeapRb};
use serde::{Deserialize, Serialize};

/// One drift observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftSample {
    /// Normalized timestamp of the sample (ms)
    pub time: f64,
    /// Host elapsed minus device elapsed since the anchor (ms)
    pub drift: f64,
}

/// Observations folded into the next drift sample
#[derive(Debug, Clone, Copy)]
struct PendingSample {
    /// Normalized time of the first observation
    opened_at: f64,
    /// Observation with the smallest drift so far
    lowest: DriftSample,
}

/// Bounded drift history with a windowed slope estimate
///
/// Observations are grouped into periods of normalized time and each period
/// contributes its minimum drift (the least-delayed packet). The history
/// overwrites its oldest entry when full. The rate is only recomputed once
/// `window` samples are available.
pub(crate) struct DriftTracker {
    history: HeapRb<DriftSample>,
    window: usize,
    period_ms: f64,
    pending: Option<PendingSample>,
    rate: f64,
}

impl fmt::Debug for DriftTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriftTracker")
            .field("len", &self.history.occupied_len())
            .field("capacity", &self.history.capacity())
            .field("window", &self.window)
            .field("period_ms", &self.period_ms)
            .field("rate", &self.rate)
            .finish()
    }
}

impl DriftTracker {
    pub fn new(capacity: usize, window: usize, period_ms: f64) -> Self {
        let capacity = capacity.max(2);
        Self {
            history: HeapRb::new(capacity),
            window: window.clamp(2, capacity),
            period_ms: period_ms.max(0.0),
            pending: None,
            rate: 0.0,
        }
    }

    /// Fold one per-packet observation into the current period
    ///
    /// The period's minimum is recorded once the period has elapsed.
    pub fn observe(&mut self, observation: DriftSample) {
        if self.period_ms <= 0.0 {
            self.record(observation);
            return;
        }

        let pending = match self.pending.take() {
            Some(mut pending) => {
                if observation.drift < pending.lowest.drift {
                    pending.lowest = observation;
                }
                pending
            }
            None => PendingSample {
                opened_at: observation.time,
                lowest: observation,
            },
        };

        if observation.time - pending.opened_at >= self.period_ms {
            self.record(pending.lowest);
        } else {
            self.pending = Some(pending);
        }
    }

    /// Append a drift sample and refresh the rate estimate
    fn record(&mut self, sample: DriftSample) {
        self.history.push_overwrite(sample);
        if let Some(rate) = self.slope() {
            self.rate = rate;
        }
    }

    /// Drift rate in ms per second over the most recent `window` samples
    ///
    /// `None` until the window is filled or when the window spans no time.
    fn slope(&self) -> Option<f64> {
        let len = self.history.occupied_len();
        if len < self.window {
            return None;
        }

        let mut recent = self.history.iter().skip(len - self.window);
        let first = *recent.next()?;
        let last = recent.last().copied().unwrap_or(first);

        let span = last.time - first.time;
        if span.abs() < f64::EPSILON {
            return None;
        }
        Some(1000.0 * (last.drift - first.drift) / span)
    }

    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.history.occupied_len()
    }

    pub fn samples(&self) -> Vec<DriftSample> {
        self.history.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.pending = None;
        self.rate = 0.0;
    }
}
