//! # Teleop Core - 遥操作纯算法层
//!
//! 无 I/O、无异步，只包含值类型与无状态算法：
//!
//! - `pose` - 位姿、四元数、传感器采样
//! - `envelope` - 安全包络（逐轴限幅）
//! - `filter` - 跳变/抖动双阈值过滤
//! - `mapper` - 传感器增量 → 机器人目标位姿
//! - `message` - 夹爪信号解码与录制消息
//! - `config` - TOML 配置
//!
//! 单帧处理流程：`PoseMapper::compute_target` → `SafetyEnvelope::clamp` → `MotionFilter::evaluate`。

pub mod config;
pub mod envelope;
mod error;
pub mod filter;
pub mod mapper;
pub mod message;
pub mod pose;

pub use config::{
    GripperConfig, HandshakeConfig, MappingConfig, MotionConfig, RecorderConfig, RobotConfig,
    TeleopConfig,
};
pub use envelope::{AxisRange, OrientationLimits, SafetyEnvelope};
pub use error::ConfigError;
pub use filter::{FilterVerdict, MotionFilter};
pub use mapper::{AxisMapping, AxisSource, PoseMapper, SessionBaseline};
pub use message::{GripperValue, TargetMessage};
pub use pose::{Axis, EulerDeg, Pose3D, Position3D, Quaternion, SensorPose};
