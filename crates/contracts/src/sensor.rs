//! SensorKind / SensorSample - Ingestion 输出
//!
//! 设备只有三路传感器流，因此传感器是封闭枚举，每个传感器的状态存放在
//! 以其为索引的固定表中。

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// 可穿戴设备输出的生理信号流
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// 脑电 (EEG), 250 Hz
    Eeg,
    /// 光电容积脉搏波 (PPG), 50 Hz
    Ppg,
    /// 加速度计 (ACC), 30 Hz (易出现时间戳裂变)
    Acc,
}

impl SensorKind {
    /// 按表顺序排列的全部传感器
    pub const ALL: [SensorKind; 3] = [SensorKind::Eeg, SensorKind::Ppg, SensorKind::Acc];

    /// 传感器流数量
    pub const COUNT: usize = 3;

    /// Slot of this sensor in a [`SensorTable`]
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            SensorKind::Eeg => 0,
            SensorKind::Ppg => 1,
            SensorKind::Acc => 2,
        }
    }

    /// 设备固件的标称采样率 (Hz)
    #[inline]
    pub const fn nominal_rate_hz(self) -> f64 {
        match self {
            SensorKind::Eeg => 250.0,
            SensorKind::Ppg => 50.0,
            SensorKind::Acc => 30.0,
        }
    }

    /// 标称采样率下相邻样本的间隔 (ms)
    #[inline]
    pub fn expected_interval_ms(self) -> f64 {
        1000.0 / self.nominal_rate_hz()
    }

    /// 日志和指标标签使用的小写名称
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            SensorKind::Eeg => "eeg",
            SensorKind::Ppg => "ppg",
            SensorKind::Acc => "acc",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eeg" => Ok(SensorKind::Eeg),
            "ppg" => Ok(SensorKind::Ppg),
            "acc" | "accelerometer" => Ok(SensorKind::Acc),
            other => Err(ContractError::unknown_sensor(other)),
        }
    }
}

/// 固定大小的按传感器索引表
///
/// 以 [`SensorKind`] 为索引，每个传感器总有一个槽位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensorTable<T>([T; SensorKind::COUNT]);

impl<T> SensorTable<T> {
    /// Build a table by evaluating `f` for every sensor
    pub fn from_fn(f: impl FnMut(SensorKind) -> T) -> Self {
        Self(SensorKind::ALL.map(f))
    }

    /// Borrow the entry of a sensor
    #[inline]
    pub fn get(&self, sensor: SensorKind) -> &T {
        &self.0[sensor.index()]
    }

    /// Mutably borrow the entry of a sensor
    #[inline]
    pub fn get_mut(&mut self, sensor: SensorKind) -> &mut T {
        &mut self.0[sensor.index()]
    }

    /// Iterate `(sensor, entry)` pairs in table order
    pub fn iter(&self) -> impl Iterator<Item = (SensorKind, &T)> {
        SensorKind::ALL.into_iter().zip(self.0.iter())
    }

    /// Iterate entries in table order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }

    /// Mutably iterate entries in table order
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.0.iter_mut()
    }
}

impl<T> Index<SensorKind> for SensorTable<T> {
    type Output = T;

    #[inline]
    fn index(&self, sensor: SensorKind) -> &T {
        self.get(sensor)
    }
}

impl<T> IndexMut<SensorKind> for SensorTable<T> {
    #[inline]
    fn index_mut(&mut self, sensor: SensorKind) -> &mut T {
        self.get_mut(sensor)
    }
}

/// 传输层收到的单个样本 (或数据包)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// 来源传感器流
    pub sensor: SensorKind,

    /// 样本携带的设备时钟读数 (ms)
    pub device_timestamp: f64,

    /// 可选的流内序号 (仅用于诊断)
    #[serde(default)]
    pub sequence: Option<u64>,
}

impl SensorSample {
    /// 创建不带序号的样本
    pub fn new(sensor: SensorKind, device_timestamp: f64) -> Self {
        Self {
            sensor,
            device_timestamp,
            sequence: None,
        }
    }
}
