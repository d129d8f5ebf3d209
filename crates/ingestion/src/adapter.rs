//! 数据源适配器 trait

use std::sync::Arc;

use async_channel::{Receiver, Sender};
use contracts::{SensorKind, SensorSample};

use crate::config::IngestionMetrics;

/// 数据源适配器 trait
///
/// 为每个样本来源实现此 trait，负责：
/// 1. 注册数据源回调
/// 2. 丢弃无效样本
/// 3. 发送到通道（处理背压）
pub trait SourceAdapter: Send + Sync {
    /// 获取数据源名称
    fn name(&self) -> &str;

    /// 获取数据源产生的传感器流
    fn sensors(&self) -> Vec<SensorKind>;

    /// 启动样本转发
    ///
    /// # Arguments
    /// * `tx` - 样本发送通道
    /// * `evictor` - `DropOldest` 策略下用于淘汰旧样本的接收端
    /// * `metrics` - 共享的 ingestion 指标
    fn start(
        &self,
        tx: Sender<SensorSample>,
        evictor: Receiver<SensorSample>,
        metrics: Arc<IngestionMetrics>,
    );

    /// 停止样本转发
    fn stop(&self);

    /// 检查适配器是否正在转发
    fn is_listening(&self) -> bool;
}
