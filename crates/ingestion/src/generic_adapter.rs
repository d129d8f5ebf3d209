//! 通用数据源适配器
//!
//! 基于 `SampleSource` trait 的统一适配器实现。
//! 允许 IngestionPipeline 以统一方式处理模拟设备和真实设备。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use contracts::{SampleCallback, SampleSource, SensorKind, SensorSample};
use tracing::{debug, trace, warn};

use crate::adapter::SourceAdapter;
use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::send::send_sample;

/// 通用数据源适配器
///
/// 将 `SampleSource` trait 适配为 `SourceAdapter`。
pub struct GenericSourceAdapter {
    name: String,
    source: Box<dyn SampleSource>,
    config: BackpressureConfig,
    listening: Arc<AtomicBool>,
}

impl GenericSourceAdapter {
    /// 创建新的通用适配器
    pub fn new(source: Box<dyn SampleSource>, config: BackpressureConfig) -> Self {
        Self {
            name: source.name().to_string(),
            source,
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SourceAdapter for GenericSourceAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn sensors(&self) -> Vec<SensorKind> {
        self.source.sensors()
    }

    fn start(
        &self,
        tx: Sender<SensorSample>,
        evictor: Receiver<SensorSample>,
        metrics: Arc<IngestionMetrics>,
    ) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let name = self.name.clone();
        let drop_policy = self.config.drop_policy;
        let listening = self.listening.clone();

        debug!(source = %name, "starting generic adapter");

        let callback: SampleCallback = Arc::new(move |sample| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            metrics.record_received();
            trace!(source = %name, sensor = %sample.sensor, "generic adapter received sample");
            if let Err(e) = send_sample(&tx, &evictor, sample, &metrics, &name, drop_policy) {
                warn!(source = %name, error = %e, "sample not forwarded");
            }
        });

        self.source.listen(callback);
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(source = %self.name, "stopping generic adapter");
            self.source.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
