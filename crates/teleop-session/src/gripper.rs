//! 夹爪执行
//!
//! 状态机 `Idle → Actuating → Idle`。执行序列（去抖延迟 → 带超时的执行调用 → 稳定延迟）
//! 在独立的后台任务中运行，队列深度为 1；执行中的新触发直接拒绝，不排队。
//! 序列结束后后台任务只投递一条 [`TeleopEvent::ActuationFinished`]，状态由事件循环修改。

use crate::error::GripperError;
use crate::event::{EventSender, TeleopEvent, with_timeout};
use crate::metrics::SessionMetrics;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use teleop_core::{GripperConfig, GripperValue};
use teleop_driver::Actuator;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// 夹爪状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GripperState {
    #[default]
    Idle,
    Actuating,
}

impl fmt::Display for GripperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GripperState::Idle => f.write_str("Idle"),
            GripperState::Actuating => f.write_str("Actuating"),
        }
    }
}

/// 执行序列的时间参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuationTiming {
    /// 执行前去抖延迟
    pub pre_delay: Duration,
    /// 执行调用超时
    pub timeout: Duration,
    /// 执行后机械稳定延迟
    pub post_delay: Duration,
}

impl From<&GripperConfig> for ActuationTiming {
    fn from(config: &GripperConfig) -> Self {
        ActuationTiming {
            pre_delay: config.pre_delay(),
            timeout: config.timeout(),
            post_delay: config.post_delay(),
        }
    }
}

/// 夹爪执行器（事件循环侧）
pub struct GripperActuator {
    state: GripperState,
    value: GripperValue,
    worker_tx: mpsc::Sender<GripperValue>,
    metrics: Arc<SessionMetrics>,
}

impl GripperActuator {
    /// 创建执行器并启动后台执行任务
    ///
    /// 必须在 tokio 运行时内调用。
    pub fn spawn<A: Actuator>(
        actuator: Arc<A>,
        timing: ActuationTiming,
        events: EventSender,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        let (worker_tx, worker_rx) = mpsc::channel(1);
        tokio::spawn(actuation_worker(actuator, timing, worker_rx, events));
        GripperActuator {
            state: GripperState::Idle,
            value: GripperValue::default(),
            worker_tx,
            metrics,
        }
    }

    pub fn state(&self) -> GripperState {
        self.state
    }

    pub fn is_actuating(&self) -> bool {
        self.state == GripperState::Actuating
    }

    /// 最近一次命令的夹爪值（录制端使用）
    pub fn value(&self) -> GripperValue {
        self.value
    }

    /// 触发一次开合
    ///
    /// 受理后立即进入 Actuating 并更新夹爪值，物理执行在后台完成。
    pub fn trigger(&mut self, value: GripperValue) -> Result<(), GripperError> {
        if self.is_actuating() {
            SessionMetrics::incr(&self.metrics.gripper_rejected);
            debug!("Gripper {} rejected: still actuating", value);
            return Err(GripperError::Busy);
        }

        self.worker_tx.try_send(value).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => GripperError::Busy,
            mpsc::error::TrySendError::Closed(_) => GripperError::WorkerUnavailable,
        })?;

        self.state = GripperState::Actuating;
        self.value = value;
        SessionMetrics::incr(&self.metrics.gripper_triggers);
        info!("Gripper triggered: {}", value);
        Ok(())
    }

    /// 执行序列结束
    pub fn finish(&mut self) {
        self.state = GripperState::Idle;
    }
}

async fn actuation_worker<A: Actuator>(
    actuator: Arc<A>,
    timing: ActuationTiming,
    mut rx: mpsc::Receiver<GripperValue>,
    events: EventSender,
) {
    while let Some(value) = rx.recv().await {
        tokio::time::sleep(timing.pre_delay).await;

        let result = with_timeout(timing.timeout, actuator.actuate(value)).await;
        match &result {
            Ok(()) => debug!("Gripper {} actuated", value),
            Err(e) => error!("Gripper {} failed: {}", value, e),
        }

        tokio::time::sleep(timing.post_delay).await;
        events.send(TeleopEvent::ActuationFinished { value, result });
    }
    debug!("Actuation worker stopped");
}
