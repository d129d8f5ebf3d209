//! Host/device time anchor.

/// Paired host and device readings defining the normalization mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TimeAnchor {
    /// Host time at anchoring (ms)
    pub master_time_base: f64,
    /// Device time at anchoring (ms)
    pub device_time_base: f64,
}

impl TimeAnchor {
    pub fn establish(device_timestamp: f64, host_now: f64) -> Self {
        Self {
            master_time_base: host_now,
            device_time_base: device_timestamp,
        }
    }

    /// Map a device timestamp onto host time
    #[inline]
    pub fn normalize(&self, device_timestamp: f64) -> f64 {
        self.master_time_base + (device_timestamp - self.device_time_base)
    }

    /// Host elapsed minus device elapsed since anchoring, for a sample
    /// whose device time maps to `normalized`
    ///
    /// Grows by the clock drift (plus any transport delay variation).
    #[inline]
    pub fn drift(&self, host_now: f64, normalized: f64) -> f64 {
        (host_now - self.master_time_base) - (normalized - self.master_time_base)
    }

    #[inline]
    pub fn offset(&self) -> f64 {
        self.master_time_base - self.device_time_base
    }
}
