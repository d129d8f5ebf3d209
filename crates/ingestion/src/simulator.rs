//! Wearable device simulator
//!
//! Produces the arrival schedule of a recording session: every sample with
//! the device timestamp the firmware attaches and the host time the
//! transport delivers it. Impairments (clock drift, latency jitter, loss,
//! late delivery, accelerometer timestamp cracking) come from the
//! [`DeviceProfile`]; a fixed seed makes sessions reproducible.

use contracts::{DeviceProfile, SensorKind, SensorSample, SensorTable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;

/// Odd accelerometer samples are stamped this many intervals early
const CRACK_SHIFT_INTERVALS: f64 = 0.8;

/// Extra delay of a late-delivered sample, in nominal intervals
const LATE_DELIVERY_INTERVALS: f64 = 4.0;

/// One delivered sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrival {
    /// Host time of delivery (ms)
    pub host_time_ms: f64,
    /// Sample as delivered
    pub sample: SensorSample,
}

/// Outcome of a simulated session
#[derive(Debug, Clone, Default)]
pub struct SimulatedSession {
    /// Deliveries in host time order
    pub arrivals: Vec<Arrival>,
    /// Samples produced by the device
    pub generated: SensorTable<u64>,
    /// Samples lost in transit
    pub lost: SensorTable<u64>,
    /// Samples delivered late
    pub delayed: SensorTable<u64>,
}

impl SimulatedSession {
    pub fn total_generated(&self) -> u64 {
        self.generated.values().sum()
    }

    pub fn total_lost(&self) -> u64 {
        self.lost.values().sum()
    }

    pub fn total_delayed(&self) -> u64 {
        self.delayed.values().sum()
    }
}

/// Deterministic device simulator
#[derive(Debug, Clone)]
pub struct DeviceSimulator {
    profile: DeviceProfile,
    host_start_ms: f64,
}

impl DeviceSimulator {
    pub fn new(profile: DeviceProfile) -> Self {
        Self {
            profile,
            host_start_ms: 0.0,
        }
    }

    /// Host time at which the device emits its first sample
    pub fn with_host_start(mut self, host_start_ms: f64) -> Self {
        self.host_start_ms = host_start_ms;
        self
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Generate the full session
    pub fn run(&self) -> SimulatedSession {
        let profile = &self.profile;
        let mut rng = StdRng::seed_from_u64(profile.seed);
        let mut session = SimulatedSession::default();

        // Host milliseconds elapsing per device millisecond
        let host_per_device = 1.0 + profile.clock_drift_ms_per_s / 1000.0;

        for &sensor in &profile.sensors {
            let expected = sensor.expected_interval_ms();
            let count = (profile.duration_s * sensor.nominal_rate_hz()).floor() as u64;

            for sequence in 0..count {
                let nominal = sequence as f64 * expected;
                session.generated[sensor] += 1;

                if rng.random::<f64>() < profile.loss_probability {
                    session.lost[sensor] += 1;
                    continue;
                }

                let mut host_time_ms = self.host_start_ms
                    + nominal * host_per_device
                    + profile.base_latency_ms
                    + self.latency_jitter(&mut rng);
                if rng.random::<f64>() < profile.reorder_probability {
                    host_time_ms += LATE_DELIVERY_INTERVALS * expected;
                    session.delayed[sensor] += 1;
                }

                session.arrivals.push(Arrival {
                    host_time_ms,
                    sample: SensorSample {
                        sensor,
                        device_timestamp: profile.device_clock_start_ms
                            + nominal
                            - self.stamp_error(sensor, sequence),
                        sequence: Some(sequence),
                    },
                });
            }
        }

        session.arrivals.sort_by(arrival_order);
        session
    }

    fn latency_jitter(&self, rng: &mut StdRng) -> f64 {
        let amplitude = self.profile.transport_jitter_ms;
        if amplitude > 0.0 {
            rng.random_range(-amplitude..=amplitude)
        } else {
            0.0
        }
    }

    fn stamp_error(&self, sensor: SensorKind, sequence: u64) -> f64 {
        if self.profile.acc_cracking && sensor == SensorKind::Acc && sequence % 2 == 1 {
            CRACK_SHIFT_INTERVALS * sensor.expected_interval_ms()
        } else {
            0.0
        }
    }
}

/// Host time order, ties broken by device time
fn arrival_order(a: &Arrival, b: &Arrival) -> Ordering {
    a.host_time_ms
        .total_cmp(&b.host_time_ms)
        .then(a.sample.device_timestamp.total_cmp(&b.sample.device_timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> DeviceProfile {
        DeviceProfile {
            duration_s: 2.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_nominal_counts() {
        let session = DeviceSimulator::new(profile()).run();
        assert_eq!(session.generated[SensorKind::Eeg], 500);
        assert_eq!(session.generated[SensorKind::Ppg], 100);
        assert_eq!(session.generated[SensorKind::Acc], 60);
        assert_eq!(session.arrivals.len(), 660);
        assert_eq!(session.total_lost(), 0);
    }

    #[test]
    fn test_arrivals_sorted_by_host_time() {
        let session = DeviceSimulator::new(DeviceProfile {
            transport_jitter_ms: 3.0,
            reorder_probability: 0.05,
            ..profile()
        })
        .run();
        for pair in session.arrivals.windows(2) {
            assert!(pair[0].host_time_ms <= pair[1].host_time_ms);
        }
        assert!(session.total_delayed() > 0);
    }

    #[test]
    fn test_same_seed_same_session() {
        let p = DeviceProfile {
            loss_probability: 0.1,
            transport_jitter_ms: 2.0,
            ..profile()
        };
        let a = DeviceSimulator::new(p.clone()).run();
        let b = DeviceSimulator::new(p).run();
        assert_eq!(a.arrivals, b.arrivals);
        assert!(a.total_lost() > 0);
    }

    #[test]
    fn test_drift_stretches_host_time() {
        let session = DeviceSimulator::new(DeviceProfile {
            sensors: vec![SensorKind::Ppg],
            clock_drift_ms_per_s: 10.0,
            base_latency_ms: 0.0,
            ..profile()
        })
        .with_host_start(1_000.0)
        .run();
        let last = session.arrivals.last().unwrap();
        let device_elapsed = last.sample.device_timestamp - 1_000.0;
        let host_elapsed = last.host_time_ms - 1_000.0;
        assert!((host_elapsed - device_elapsed * 1.01).abs() < 1e-9);
    }

    #[test]
    fn test_acc_cracking_alternates_spacing() {
        let session = DeviceSimulator::new(DeviceProfile {
            sensors: vec![SensorKind::Acc],
            acc_cracking: true,
            ..profile()
        })
        .run();
        let expected = SensorKind::Acc.expected_interval_ms();
        let stamps: Vec<f64> = session
            .arrivals
            .iter()
            .map(|a| a.sample.device_timestamp)
            .collect();
        assert!((stamps[1] - stamps[0] - 0.2 * expected).abs() < 1e-9);
        assert!((stamps[2] - stamps[1] - 1.8 * expected).abs() < 1e-9);
    }
}
