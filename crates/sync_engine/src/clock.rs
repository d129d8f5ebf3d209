//! Host clock abstraction.
//!
//! The engine never reads wall time directly; tests and offline replays
//! drive it with a [`ManualClock`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of host time in milliseconds
pub trait HostClock: Send + Sync + fmt::Debug {
    /// Current host time (ms)
    fn now_ms(&self) -> f64;
}

/// Monotonic wall clock
///
/// Epoch milliseconds captured once at construction, advanced by a
/// monotonic `Instant` so NTP steps never move host time backwards.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    epoch_ms: f64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            epoch_ms: chrono::Utc::now().timestamp_micros() as f64 / 1000.0,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for SystemClock {
    #[inline]
    fn now_ms(&self) -> f64 {
        self.epoch_ms + self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock advanced explicitly by its owner
///
/// Clones share the same reading, so one handle can be given to the engine
/// while another drives time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now_bits: Arc::new(AtomicU64::new(start_ms.to_bits())),
        }
    }

    /// Jump to an absolute reading
    pub fn set(&self, now_ms: f64) {
        self.now_bits.store(now_ms.to_bits(), Ordering::Release);
    }

    /// Move forward by `delta_ms`
    pub fn advance(&self, delta_ms: f64) {
        // Single writer in practice; the CAS loop keeps concurrent advances exact.
        let _ = self
            .now_bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + delta_ms).to_bits())
            });
    }

    pub fn now(&self) -> f64 {
        f64::from_bits(self.now_bits.load(Ordering::Acquire))
    }
}

impl HostClock for ManualClock {
    #[inline]
    fn now_ms(&self) -> f64 {
        self.now()
    }
}
