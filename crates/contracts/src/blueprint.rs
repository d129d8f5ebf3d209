//! SessionBlueprint - Config Loader 输出
//!
//! 描述一次采集会话：(模拟) 设备、传感器流与传输损伤，以及同步引擎参数。

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{SensorKind, TimeSyncConfig};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的会话配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 会话标识 (用于日志和指标标签)
    #[serde(default = "default_session_id")]
    pub session_id: String,

    /// 设备与传输特性
    #[serde(default)]
    pub device: DeviceProfile,

    /// 同步引擎参数
    #[serde(default)]
    pub sync: TimeSyncConfig,

    /// Ingestion 通道设置
    #[serde(default)]
    pub ingestion: IngestionSettings,
}

impl Default for SessionBlueprint {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            session_id: default_session_id(),
            device: DeviceProfile::default(),
            sync: TimeSyncConfig::default(),
            ingestion: IngestionSettings::default(),
        }
    }
}

fn default_session_id() -> String {
    "session".to_string()
}

/// 可穿戴设备与传输损伤配置
///
/// 驱动设备模拟器；真实传输只使用 `name` 和 `sensors`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DeviceProfile {
    /// 设备名称
    #[validate(length(min = 1))]
    pub name: String,

    /// 启用的传感器流
    pub sensors: Vec<SensorKind>,

    /// 会话时长 (设备时钟秒)
    #[validate(range(exclusive_min = 0.0))]
    pub duration_s: f64,

    /// 上电时的设备时钟读数 (ms)
    #[validate(range(min = 0.0))]
    pub device_clock_start_ms: f64,

    /// 每设备秒多出的主机时间 (ms/s)；正值表示设备时钟偏慢
    pub clock_drift_ms_per_s: f64,

    /// 每个样本的基础传输延迟 (ms)
    #[validate(range(min = 0.0))]
    pub base_latency_ms: f64,

    /// 均匀分布的延迟抖动幅度 (ms)
    #[validate(range(min = 0.0))]
    pub transport_jitter_ms: f64,

    /// 加速度计时间戳间隔长短交替 (时间戳裂变)
    pub acc_cracking: bool,

    /// 传输中丢失样本的概率
    #[validate(range(min = 0.0, max = 1.0))]
    pub loss_probability: f64,

    /// 样本延迟到达 (晚于较新样本) 的概率
    #[validate(range(min = 0.0, max = 1.0))]
    pub reorder_probability: f64,

    /// 随机种子 (用于复现会话)
    pub seed: u64,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            name: "simulated-headband".to_string(),
            sensors: SensorKind::ALL.to_vec(),
            duration_s: 10.0,
            device_clock_start_ms: 1_000.0,
            clock_drift_ms_per_s: 0.0,
            base_latency_ms: 15.0,
            transport_jitter_ms: 0.0,
            acc_cracking: false,
            loss_probability: 0.0,
            reorder_probability: 0.0,
            seed: 42,
        }
    }
}

/// 数据源与引擎之间的有界通道配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct IngestionSettings {
    /// 通道容量 (样本数)
    #[validate(range(min = 1))]
    pub channel_capacity: usize,

    /// 通道满时的丢弃策略
    pub drop_policy: DropPolicy,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            drop_policy: DropPolicy::default(),
        }
    }
}

/// 通道满时的丢弃策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// 丢弃最旧的排队样本
    DropOldest,
    /// 丢弃新到达的样本
    #[default]
    DropNewest,
}
