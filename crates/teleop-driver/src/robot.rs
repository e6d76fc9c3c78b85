//! 机器人控制器接口
//!
//! 控制器是外部协作者，所有操作都是异步的且**不保证超时**，调用方必须自行施加超时。

use crate::error::DriverError;
use std::fmt;
use std::future::Future;
use teleop_core::Pose3D;

/// 控制器返回码（0 表示成功）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(pub i32);

impl ResultCode {
    pub const SUCCESS: Self = ResultCode(0);

    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 机器人控制器驱动
///
/// 返回的 future 必须是 `Send`，以便在运行时上派发而不阻塞事件循环。
pub trait RobotDriver: Send + Sync + 'static {
    /// 清除控制器错误状态
    fn clear_error(&self) -> impl Future<Output = Result<ResultCode, DriverError>> + Send;

    /// 使能机器人
    fn enable(&self) -> impl Future<Output = Result<ResultCode, DriverError>> + Send;

    /// 伺服到目标位姿（发后不管，只报告是否送达）
    fn move_to(&self, pose: Pose3D) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// 读取当前末端位姿
    fn get_current_pose(&self) -> impl Future<Output = Result<Pose3D, DriverError>> + Send;
}
