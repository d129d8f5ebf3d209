//! Ingestion 错误类型

use contracts::SensorKind;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 样本携带的设备时间戳不可用
    #[error("invalid {sensor} timestamp from source {source_name}: {timestamp}")]
    InvalidTimestamp {
        /// 数据源名称
        source_name: String,
        /// 样本所属传感器流
        sensor: SensorKind,
        /// 无效的时间戳值
        timestamp: f64,
    },

    /// 通道已关闭
    #[error("channel closed for source {source_name}")]
    ChannelClosed {
        /// 数据源名称
        source_name: String,
    },

    /// 数据源已注册
    #[error("source {source_name} is already registered")]
    DuplicateSource {
        /// 数据源名称
        source_name: String,
    },
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
