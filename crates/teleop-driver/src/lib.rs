//! # Teleop Driver - 外部协作者接口
//!
//! 遥操作循环依赖三个外部协作者，本 crate 定义它们的接口和默认实现：
//!
//! - [`RobotDriver`] - 机器人控制器（清错、使能、伺服、读位姿），默认实现 [`DashboardDriver`]
//! - [`Actuator`] - 夹爪执行器，默认实现 [`HttpActuator`]
//! - [`RecorderSink`] - 录制端，默认实现 [`ChannelRecorder`]
//!
//! 驱动调用**不保证超时**，超时由会话层施加。
//!
//! 启用 `mock` feature 可获得脚本化实现（`mock` 模块），用于测试和无硬件演练。

pub mod actuator;
pub mod dashboard;
mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod recorder;
pub mod response;
pub mod robot;

pub use actuator::{Actuator, HttpActuator};
pub use dashboard::{DashboardDriver, servo_command};
pub use error::DriverError;
pub use recorder::{ChannelRecorder, RecorderSink};
pub use response::{DashboardReply, parse_pose_response};
pub use robot::{ResultCode, RobotDriver};
