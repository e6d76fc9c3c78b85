//! 会话层错误类型定义

use thiserror::Error;

/// 夹爪触发失败原因
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripperError {
    /// 上一次执行尚未结束（不排队，直接丢弃）
    #[error("Gripper is busy actuating")]
    Busy,

    /// 执行任务已退出
    #[error("Actuation worker unavailable")]
    WorkerUnavailable,
}
