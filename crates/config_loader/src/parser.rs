//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, SessionBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<SessionBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<SessionBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<SessionBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DropPolicy, IntervalTracking, SensorKind};

    #[test]
    fn test_parse_toml_sections() {
        let content = r#"
session_id = "bench-07"

[device]
name = "headband"
sensors = ["eeg", "acc"]
clock_drift_ms_per_s = 2.5
acc_cracking = true

[sync]
resync_interval_ms = 2000.0
interval_tracking = "shared"

[ingestion]
channel_capacity = 64
drop_policy = "drop_oldest"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.session_id, "bench-07");
        assert_eq!(bp.device.sensors, vec![SensorKind::Eeg, SensorKind::Acc]);
        assert!(bp.device.acc_cracking);
        assert_eq!(bp.device.seed, 42);
        assert_eq!(bp.sync.resync_interval_ms, 2000.0);
        assert_eq!(bp.sync.interval_tracking, IntervalTracking::Shared);
        assert_eq!(bp.sync.max_acceptable_jitter_ms, 10.0);
        assert_eq!(bp.ingestion.channel_capacity, 64);
        assert_eq!(bp.ingestion.drop_policy, DropPolicy::DropOldest);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "device": { "sensors": ["ppg"], "loss_probability": 0.01 },
            "sync": { "smoothing_factor": 0.2 }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.device.sensors, vec![SensorKind::Ppg]);
        assert_eq!(bp.sync.smoothing_factor, 0.2);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_unknown_sensor_rejected() {
        let result = parse_toml("[device]\nsensors = [\"gyro\"]\n");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
