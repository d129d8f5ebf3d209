//! Mock 设备数据源
//!
//! 通过 `SampleSource` 接口回放模拟会话，用于无硬件环境的测试。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use contracts::{DeviceProfile, SampleCallback, SampleSource, SensorKind};
use tracing::{debug, trace};

use crate::simulator::{Arrival, DeviceSimulator, SimulatedSession};

/// Mock 设备数据源
///
/// 在后台线程按主机到达时间（按 `speed` 缩放）投递样本；
/// `speed` 为 `None` 时不限速。
pub struct MockDeviceSource {
    name: String,
    sensors: Vec<SensorKind>,
    arrivals: Arc<Vec<Arrival>>,
    speed: Option<f64>,
    listening: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MockDeviceSource {
    /// 创建回放 `session` 的数据源
    pub fn new(name: impl Into<String>, sensors: Vec<SensorKind>, session: SimulatedSession) -> Self {
        Self {
            name: name.into(),
            sensors,
            arrivals: Arc::new(session.arrivals),
            speed: Some(1.0),
            listening: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// 模拟 `profile` 并按实时速度回放
    pub fn from_profile(profile: &DeviceProfile) -> Self {
        let session = DeviceSimulator::new(profile.clone()).run();
        Self::new(profile.name.clone(), profile.sensors.clone(), session)
    }

    /// 以实时速度的 `speed` 倍回放
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = (speed.is_finite() && speed > 0.0).then_some(speed);
        self
    }

    /// 不限速回放
    pub fn unpaced(mut self) -> Self {
        self.speed = None;
        self
    }

    /// 回放将投递的样本数
    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }

    /// 阻塞直到回放线程结束
    pub fn wait(&self) {
        let handle = self.worker.lock().ok().and_then(|mut worker| worker.take());
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl SampleSource for MockDeviceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn sensors(&self) -> Vec<SensorKind> {
        self.sensors.clone()
    }

    fn listen(&self, callback: SampleCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let name = self.name.clone();
        let arrivals = self.arrivals.clone();
        let speed = self.speed;
        let listening = self.listening.clone();

        let handle = std::thread::spawn(move || {
            debug!(source = %name, samples = arrivals.len(), ?speed, "mock device replay started");

            let started = Instant::now();
            let origin = arrivals.first().map(|a| a.host_time_ms).unwrap_or_default();
            let mut delivered = 0usize;

            for arrival in arrivals.iter() {
                if !listening.load(Ordering::Relaxed) {
                    break;
                }
                if let Some(speed) = speed {
                    let due = Duration::from_secs_f64(
                        ((arrival.host_time_ms - origin) / speed / 1000.0).max(0.0),
                    );
                    if let Some(wait) = due.checked_sub(started.elapsed()) {
                        std::thread::sleep(wait);
                    }
                }
                callback(arrival.sample);
                delivered += 1;
            }

            listening.store(false, Ordering::SeqCst);
            trace!(source = %name, delivered, "mock device replay finished");
        });

        if let Ok(mut worker) = self.worker.lock() {
            *worker = Some(handle);
        }
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

impl Drop for MockDeviceSource {
    fn drop(&mut self) {
        self.stop();
        self.wait();
    }
}
