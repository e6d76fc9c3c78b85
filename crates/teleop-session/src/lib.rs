//! # Teleop Session - 遥操作状态层
//!
//! 在纯算法层（`teleop-core`）和外部协作者（`teleop-driver`）之上实现有状态的控制循环：
//!
//! - [`ConnectionHandshake`] - 清错 → 使能握手，固定间隔无限重试
//! - [`GripperActuator`] - 夹爪执行状态机 + 深度为 1 的后台执行任务
//! - [`TeleopSession`] - 门控、基准初始化、映射/限幅/过滤、下发与录制
//! - [`TeleopRuntime`] - 单任务事件循环，所有状态只在其中修改
//! - [`SessionMetrics`] - 原子计数器
//!
//! # 使用示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use teleop_core::{SensorPose, TeleopConfig};
//! use teleop_driver::{ChannelRecorder, DashboardDriver, HttpActuator};
//! use teleop_session::TeleopRuntime;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TeleopConfig::default();
//! let driver = DashboardDriver::new(&config.robot.dashboard_addr, config.robot.call_timeout());
//! let actuator = HttpActuator::new(&config.gripper)?;
//! let (recorder, _rx) = ChannelRecorder::new(config.recorder.capacity);
//!
//! let handle = TeleopRuntime::spawn(
//!     &config,
//!     Arc::new(driver),
//!     Arc::new(actuator),
//!     Arc::new(recorder),
//! );
//! handle.send_sample(SensorPose::at(0.0, 0.0, 0.0));
//! handle.shutdown();
//! handle.join().await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod event;
pub mod gripper;
pub mod guard;
pub mod handshake;
pub mod metrics;
pub mod runtime;
pub mod session;

pub use error::GripperError;
pub use event::{EventSender, TeleopEvent};
pub use gripper::{ActuationTiming, GripperActuator, GripperState};
pub use guard::PendingRequest;
pub use handshake::{ConnectionHandshake, RobotConnectionState};
pub use metrics::{SessionMetrics, SessionMetricsSnapshot};
pub use runtime::{TeleopHandle, TeleopRuntime};
pub use session::{SessionPhase, SessionStatus, TeleopSession};
