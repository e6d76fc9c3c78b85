//! Mock 协作者（feature = "mock"）
//!
//! 脚本化的机器人/执行器/录制端，用于测试和 `--dry-run`。
//! 所有时间戳使用 `tokio::time::Instant`，在 `start_paused` 测试中可精确断言退避间隔。

use crate::actuator::Actuator;
use crate::error::DriverError;
use crate::recorder::RecorderSink;
use crate::robot::{ResultCode, RobotDriver};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use teleop_core::{GripperValue, Pose3D, TargetMessage};
use tokio::time::Instant;

/// 机器人调用类型
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RobotCallKind {
    ClearError,
    Enable,
    MoveTo(Pose3D),
    GetPose,
}

/// 一次调用记录（调用开始时刻）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotCall {
    pub kind: RobotCallKind,
    pub at: Instant,
}

/// 脚本化的位姿应答
#[derive(Debug, Clone, PartialEq)]
pub enum PoseReply {
    Pose(Pose3D),
    Malformed(String),
    /// 永不返回（测试调用方超时）
    Hang,
}

/// 脚本化机器人
///
/// 清错/使能按脚本依次返回结果码，脚本耗尽后返回成功；
/// 位姿按脚本返回，耗尽后返回 `default_pose`。
pub struct MockRobot {
    clear_error_codes: Mutex<VecDeque<i32>>,
    enable_codes: Mutex<VecDeque<i32>>,
    pose_replies: Mutex<VecDeque<PoseReply>>,
    default_pose: Pose3D,
    latency: Duration,
    calls: Mutex<Vec<RobotCall>>,
}

impl MockRobot {
    pub fn new(default_pose: Pose3D) -> Self {
        MockRobot {
            clear_error_codes: Mutex::new(VecDeque::new()),
            enable_codes: Mutex::new(VecDeque::new()),
            pose_replies: Mutex::new(VecDeque::new()),
            default_pose,
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 每次调用的模拟延迟
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_clear_error_codes(self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.clear_error_codes.lock().extend(codes);
        self
    }

    pub fn with_enable_codes(self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.enable_codes.lock().extend(codes);
        self
    }

    pub fn with_pose_replies(self, replies: impl IntoIterator<Item = PoseReply>) -> Self {
        self.pose_replies.lock().extend(replies);
        self
    }

    /// 追加使能结果码（运行中注入故障）
    pub fn push_enable_codes(&self, codes: impl IntoIterator<Item = i32>) {
        self.enable_codes.lock().extend(codes);
    }

    /// 全部调用记录
    pub fn calls(&self) -> Vec<RobotCall> {
        self.calls.lock().clone()
    }

    /// 满足条件的调用时刻
    pub fn call_times(&self, pred: impl Fn(&RobotCallKind) -> bool) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|c| pred(&c.kind))
            .map(|c| c.at)
            .collect()
    }

    pub fn clear_error_count(&self) -> usize {
        self.call_times(|k| matches!(k, RobotCallKind::ClearError)).len()
    }

    pub fn enable_count(&self) -> usize {
        self.call_times(|k| matches!(k, RobotCallKind::Enable)).len()
    }

    pub fn get_pose_count(&self) -> usize {
        self.call_times(|k| matches!(k, RobotCallKind::GetPose)).len()
    }

    /// 已收到的伺服目标
    pub fn moves(&self) -> Vec<Pose3D> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c.kind {
                RobotCallKind::MoveTo(pose) => Some(pose),
                _ => None,
            })
            .collect()
    }

    fn record(&self, kind: RobotCallKind) {
        self.calls.lock().push(RobotCall {
            kind,
            at: Instant::now(),
        });
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl RobotDriver for MockRobot {
    async fn clear_error(&self) -> Result<ResultCode, DriverError> {
        self.record(RobotCallKind::ClearError);
        self.simulate_latency().await;
        let code = self.clear_error_codes.lock().pop_front().unwrap_or(0);
        Ok(ResultCode(code))
    }

    async fn enable(&self) -> Result<ResultCode, DriverError> {
        self.record(RobotCallKind::Enable);
        self.simulate_latency().await;
        let code = self.enable_codes.lock().pop_front().unwrap_or(0);
        Ok(ResultCode(code))
    }

    async fn move_to(&self, pose: Pose3D) -> Result<(), DriverError> {
        self.record(RobotCallKind::MoveTo(pose));
        self.simulate_latency().await;
        Ok(())
    }

    async fn get_current_pose(&self) -> Result<Pose3D, DriverError> {
        self.record(RobotCallKind::GetPose);
        self.simulate_latency().await;
        let reply = self.pose_replies.lock().pop_front();
        match reply {
            None => Ok(self.default_pose),
            Some(PoseReply::Pose(pose)) => Ok(pose),
            Some(PoseReply::Malformed(raw)) => Err(DriverError::MalformedResponse(raw)),
            Some(PoseReply::Hang) => {
                std::future::pending::<()>().await;
                Err(DriverError::Timeout)
            },
        }
    }
}

/// 脚本化夹爪执行器
pub struct MockActuator {
    latency: Duration,
    fail: AtomicBool,
    actuations: Mutex<Vec<(GripperValue, Instant)>>,
}

impl Default for MockActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockActuator {
    pub fn new() -> Self {
        MockActuator {
            latency: Duration::ZERO,
            fail: AtomicBool::new(false),
            actuations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 之后的调用全部失败
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// 执行记录（调用开始时刻）
    pub fn actuations(&self) -> Vec<(GripperValue, Instant)> {
        self.actuations.lock().clone()
    }
}

impl Actuator for MockActuator {
    async fn actuate(&self, value: GripperValue) -> Result<(), DriverError> {
        self.actuations.lock().push((value, Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(DriverError::HttpStatus(503));
        }
        Ok(())
    }
}

/// 内存录制端
#[derive(Default)]
pub struct VecRecorder {
    messages: Mutex<Vec<TargetMessage>>,
}

impl VecRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<TargetMessage> {
        self.messages.lock().clone()
    }
}

impl RecorderSink for VecRecorder {
    fn publish(&self, message: &TargetMessage) {
        self.messages.lock().push(*message);
    }
}
