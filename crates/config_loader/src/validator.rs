//! 配置校验模块
//!
//! 字段范围由 contracts 类型上的 `validator` 规则声明；跨字段规则在此校验：
//! - session_id 非空
//! - 至少启用一个传感器，且不重复
//! - drift_rate_window <= drift_history_capacity
//! - 传输抖动不超过基础延迟 (传输时间不能为负)

use std::collections::HashSet;

use contracts::{ContractError, SessionBlueprint};
use validator::{Validate, ValidationError};

/// 校验 SessionBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    validate_session_id(blueprint)?;
    validate_fields("device", &blueprint.device)?;
    validate_fields("sync", &blueprint.sync)?;
    validate_fields("ingestion", &blueprint.ingestion)?;
    validate_sensors(blueprint)?;
    validate_drift_window(blueprint)?;
    validate_latency(blueprint)?;
    Ok(())
}

/// 执行派生字段规则，报告按字母序第一个失败的字段
fn validate_fields(section: &str, target: &impl Validate) -> Result<(), ContractError> {
    let Err(errors) = target.validate() else {
        return Ok(());
    };

    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    match fields.first() {
        Some((field, field_errors)) => Err(ContractError::config_validation(
            format!("{section}.{field}"),
            field_errors
                .first()
                .map(describe)
                .unwrap_or_else(|| "invalid value".to_string()),
        )),
        None => Err(ContractError::config_validation(section, errors.to_string())),
    }
}

fn describe(error: &ValidationError) -> String {
    match error.params.get("value") {
        Some(value) => format!("{} rule violated (got {value})", error.code),
        None => format!("{} rule violated", error.code),
    }
}

/// 校验 session_id 非空
fn validate_session_id(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    if blueprint.session_id.trim().is_empty() {
        return Err(ContractError::config_validation(
            "session_id",
            "session_id cannot be empty",
        ));
    }
    Ok(())
}

/// 校验传感器列表 (非空且唯一)
fn validate_sensors(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let sensors = &blueprint.device.sensors;
    if sensors.is_empty() {
        return Err(ContractError::config_validation(
            "device.sensors",
            "at least one sensor must be enabled",
        ));
    }

    let mut seen = HashSet::new();
    for sensor in sensors {
        if !seen.insert(*sensor) {
            return Err(ContractError::config_validation(
                format!("device.sensors[{sensor}]"),
                "duplicate sensor",
            ));
        }
    }
    Ok(())
}

/// 校验漂移窗口不超过历史容量
fn validate_drift_window(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let sync = &blueprint.sync;
    if sync.drift_rate_window > sync.drift_history_capacity {
        return Err(ContractError::config_validation(
            "sync.drift_rate_window / sync.drift_history_capacity",
            format!(
                "drift_rate_window ({}) must be <= drift_history_capacity ({})",
                sync.drift_rate_window, sync.drift_history_capacity
            ),
        ));
    }
    Ok(())
}

/// 校验传输抖动与基础延迟
fn validate_latency(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let device = &blueprint.device;
    if device.transport_jitter_ms > device.base_latency_ms {
        return Err(ContractError::config_validation(
            "device.transport_jitter_ms",
            format!(
                "transport_jitter_ms ({}) must be <= base_latency_ms ({})",
                device.transport_jitter_ms, device.base_latency_ms
            ),
        ));
    }
    Ok(())
}
