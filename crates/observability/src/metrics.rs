//! 同步引擎指标收集模块
//!
//! 通过 `metrics` facade 发布校验结果，并在内存中聚合，用于会话结束时的摘要输出。

use std::collections::BTreeMap;

use contracts::{
    SensorKind, SensorTable, SensorTimingInfo, SyncState, SyncStatus, TimestampValidationResult,
};
use metrics::{counter, gauge, histogram};
use serde::Serialize;

/// 记录单个校验结果的指标
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_validation;
///
/// let result = engine.normalize_timestamp(sample.device_timestamp, sample.sensor);
/// record_validation(&result);
/// ```
pub fn record_validation(result: &TimestampValidationResult) {
    let sensor = result.sensor.as_str();

    counter!("biosync_samples_total", "sensor" => sensor).increment(1);
    if !result.is_valid {
        counter!("biosync_samples_invalid_total", "sensor" => sensor).increment(1);
    }

    histogram!("biosync_sample_confidence", "sensor" => sensor).record(result.confidence);

    for issue in &result.issues {
        counter!(
            "biosync_timing_issues_total",
            "sensor" => sensor,
            "issue" => issue.label()
        )
        .increment(1);
    }

    let correction = result.corrected_timestamp - result.normalized_timestamp;
    if correction != 0.0 {
        histogram!("biosync_correction_ms", "sensor" => sensor).record(correction.abs());
    }
}

/// 以 gauge 形式发布引擎状态
pub fn record_sync_state(state: &SyncState) {
    gauge!("biosync_sync_quality").set(state.sync_quality);
    gauge!("biosync_drift_rate_ms_per_s").set(state.drift_rate);
    gauge!("biosync_device_time_offset_ms").set(state.device_time_offset);
    gauge!("biosync_packets_total").set(state.total_packets as f64);
    gauge!("biosync_packets_dropped").set(state.dropped_packets as f64);
    gauge!("biosync_packets_out_of_order").set(state.out_of_order_packets as f64);
    gauge!("biosync_resync_count").set(state.resync_count as f64);
    gauge!("biosync_drift_history_len").set(state.drift_samples as f64);
}

/// 发布健康摘要
pub fn record_sync_status(status: &SyncStatus) {
    gauge!("biosync_sync_healthy").set(if status.is_healthy { 1.0 } else { 0.0 });
    gauge!("biosync_sync_active_issues").set(status.issues.len() as f64);
}

/// 发布各传感器的时序统计
pub fn record_sensor_timings(timings: &SensorTable<SensorTimingInfo>) {
    for (sensor, info) in timings.iter() {
        let sensor = sensor.as_str();
        gauge!("biosync_sensor_actual_interval_ms", "sensor" => sensor).set(info.actual_interval);
        gauge!("biosync_sensor_jitter_ms", "sensor" => sensor).set(info.jitter);
        gauge!("biosync_sensor_reliability", "sensor" => sensor).set(info.reliability);
    }
}

/// 同步指标聚合器
///
/// 在内存中聚合校验结果，用于统计分析和摘要输出。
#[derive(Debug, Clone, Default)]
pub struct SyncMetricsAggregator {
    /// 总样本数
    pub total_samples: u64,

    /// 无效样本数 (`is_valid == false`)
    pub invalid_samples: u64,

    /// 各传感器样本数
    pub sensor_samples: SensorTable<u64>,

    /// 各类问题计数（按标签）
    pub issue_counts: BTreeMap<&'static str, u64>,

    /// 置信度统计
    pub confidence_stats: RunningStats,

    /// 网格校正幅度 (ms)
    pub correction_stats: RunningStats,

    /// 各传感器相邻校正时间戳间隔 (ms)
    pub spacing_stats: SensorTable<RunningStats>,

    /// 各传感器最近一次校正时间戳
    last_corrected: SensorTable<Option<f64>>,

    /// 最近观察到的引擎状态
    pub last_state: Option<SyncState>,
}

impl SyncMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, result: &TimestampValidationResult) {
        let sensor = result.sensor;
        self.total_samples += 1;
        self.sensor_samples[sensor] += 1;
        if !result.is_valid {
            self.invalid_samples += 1;
        }

        for issue in &result.issues {
            *self.issue_counts.entry(issue.label()).or_insert(0) += 1;
        }

        self.confidence_stats.push(result.confidence);

        let correction = result.corrected_timestamp - result.normalized_timestamp;
        if correction != 0.0 {
            self.correction_stats.push(correction.abs());
        }

        // 只统计向前的间隔
        let corrected = result.corrected_timestamp;
        match self.last_corrected[sensor] {
            Some(last) if corrected > last => {
                self.spacing_stats[sensor].push(corrected - last);
                self.last_corrected[sensor] = Some(corrected);
            }
            Some(_) => {}
            None => self.last_corrected[sensor] = Some(corrected),
        }
    }

    /// 记录最新引擎状态
    pub fn observe_state(&mut self, state: &SyncState) {
        self.last_state = Some(*state);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let state = self.last_state.unwrap_or_default();
        MetricsSummary {
            total_samples: self.total_samples,
            invalid_samples: self.invalid_samples,
            invalid_rate: percent(self.invalid_samples, self.total_samples),
            dropped_packets: state.dropped_packets,
            out_of_order_packets: state.out_of_order_packets,
            resync_count: state.resync_count,
            sync_quality: state.sync_quality,
            drift_rate: state.drift_rate,
            confidence: StatsSummary::from(&self.confidence_stats),
            correction_ms: StatsSummary::from(&self.correction_stats),
            sensors: SensorKind::ALL
                .iter()
                .filter(|&&sensor| self.sensor_samples[sensor] > 0)
                .map(|&sensor| SensorSummary {
                    sensor,
                    samples: self.sensor_samples[sensor],
                    spacing_ms: StatsSummary::from(&self.spacing_stats[sensor]),
                })
                .collect(),
            issue_counts: self.issue_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// 单传感器摘要
#[derive(Debug, Clone, Serialize)]
pub struct SensorSummary {
    pub sensor: SensorKind,
    pub samples: u64,
    pub spacing_ms: StatsSummary,
}

/// 指标摘要
#[derive(Debug, Clone, Serialize, Default)]
pub struct MetricsSummary {
    pub total_samples: u64,
    pub invalid_samples: u64,
    pub invalid_rate: f64,
    pub dropped_packets: u64,
    pub out_of_order_packets: u64,
    pub resync_count: u64,
    pub sync_quality: f64,
    pub drift_rate: f64,
    pub confidence: StatsSummary,
    pub correction_ms: StatsSummary,
    pub sensors: Vec<SensorSummary>,
    pub issue_counts: BTreeMap<&'static str, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Metrics Summary ===")?;
        writeln!(f, "Total samples: {}", self.total_samples)?;
        writeln!(
            f,
            "Invalid samples: {} ({:.2}%)",
            self.invalid_samples, self.invalid_rate
        )?;
        writeln!(f, "Estimated lost: {}", self.dropped_packets)?;
        writeln!(f, "Out-of-order: {}", self.out_of_order_packets)?;
        writeln!(f, "Resyncs: {}", self.resync_count)?;
        writeln!(f, "Sync quality: {:.3}", self.sync_quality)?;
        writeln!(f, "Drift rate: {:+.3} ms/s", self.drift_rate)?;
        writeln!(f, "Confidence: {}", self.confidence)?;
        writeln!(f, "Corrections (ms): {}", self.correction_ms)?;

        for sensor in &self.sensors {
            writeln!(
                f,
                "  {}: {} samples, spacing {}",
                sensor.sensor, sensor.samples, sensor.spacing_ms
            )?;
        }

        if !self.issue_counts.is_empty() {
            writeln!(f, "Issue counts:")?;
            for (issue, count) in &self.issue_counts {
                writeln!(f, "  {}: {}", issue, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Serialize, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
