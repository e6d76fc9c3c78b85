//! 事件循环消息
//!
//! 所有异步完成（驱动调用结果、重试定时器、夹爪执行结束）都以 [`TeleopEvent`]
//! 投递回事件循环，会话状态只在事件循环内修改。

use std::future::Future;
use std::time::Duration;
use teleop_core::{GripperValue, Pose3D, SensorPose};
use teleop_driver::{DriverError, ResultCode};
use tokio::sync::mpsc;
use tracing::trace;

/// 事件循环消息
#[derive(Debug)]
pub enum TeleopEvent {
    /// 传感器采样
    SensorSample(SensorPose),
    /// 原始夹爪信号
    GripperSignal(Vec<i32>),
    /// 清错结果
    ClearErrorResult(Result<ResultCode, DriverError>),
    /// 使能结果
    EnableResult(Result<ResultCode, DriverError>),
    /// 清错重试定时器到期
    RetryClearError,
    /// 使能重试定时器到期
    RetryEnable,
    /// 机器人基准位姿应答
    RobotPose(Result<Pose3D, DriverError>),
    /// 夹爪执行序列结束（含稳定延迟）
    ActuationFinished {
        value: GripperValue,
        result: Result<(), DriverError>,
    },
    /// 丢弃基准，重新初始化
    ResetBaseline,
    /// 停止事件循环
    Shutdown,
}

/// 事件投递端
///
/// 事件循环退出后投递静默失败。
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<TeleopEvent>,
}

impl EventSender {
    pub fn new(tx: mpsc::UnboundedSender<TeleopEvent>) -> Self {
        EventSender { tx }
    }

    /// 创建事件通道
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TeleopEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSender { tx }, rx)
    }

    pub fn send(&self, event: TeleopEvent) {
        if let Err(e) = self.tx.send(event) {
            trace!("Event loop gone, dropping {:?}", e.0);
        }
    }

    /// 延迟投递（重试定时器）
    pub fn send_after(&self, delay: Duration, event: TeleopEvent) {
        let sender = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sender.send(event);
        });
    }

    /// 在后台执行一次驱动调用，施加超时后把结果包装成事件投递回来
    pub fn spawn_call<T, F>(
        &self,
        timeout: Duration,
        call: F,
        wrap: fn(Result<T, DriverError>) -> TeleopEvent,
    ) where
        T: Send + 'static,
        F: Future<Output = Result<T, DriverError>> + Send + 'static,
    {
        let sender = self.clone();
        tokio::spawn(async move {
            let result = with_timeout(timeout, call).await;
            sender.send(wrap(result));
        });
    }
}

/// 为驱动调用施加超时（驱动本身不保证超时）
pub async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, DriverError>
where
    F: Future<Output = Result<T, DriverError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(DriverError::Timeout))
}
