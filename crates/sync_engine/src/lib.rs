//! # Sync Engine
//!
//! 可穿戴设备 EEG / PPG / 加速度计数据流的时间戳同步。
//!
//! 负责：
//! - 首个样本到达时将设备时钟锚定到主机时钟
//! - 校验每个样本（顺序、采样间隔、漂移）并给出置信度
//! - 将加速度计 "cracking" 修正回标称采样网格
//! - 跟踪时钟漂移，周期性或漂移过大时重新锚定
//! - 输出各传感器时序统计与整体健康状态
//!
//! ## 示例
//!
//! ```ignore
//! use sync_engine::{SensorKind, SyncEngine, TimeSyncConfig};
//!
//! let mut engine = SyncEngine::new(TimeSyncConfig::default());
//!
//! let result = engine.normalize_timestamp(packet.device_timestamp, SensorKind::Eeg);
//! if result.is_valid {
//!     store(result.corrected_timestamp, packet);
//! }
//! ```

mod anchor;
mod clock;
mod drift;
mod engine;
mod quality;
mod timing;
mod validator;

pub use clock::{HostClock, ManualClock, SystemClock};
pub use drift::DriftSample;
pub use engine::{EnginePhase, SyncEngine};

// Re-export contracts types
pub use contracts::{
    IntervalTracking, SensorKind, SensorTable, SensorTimingInfo, SyncState, SyncStatus,
    TimeSyncConfig, TimestampValidationResult, TimingIssue,
};
