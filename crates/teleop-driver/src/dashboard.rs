//! Dashboard TCP 驱动
//!
//! 通过控制器 Dashboard 端口发送文本指令：
//!
//! | 操作 | 指令 |
//! |---|---|
//! | 清错 | `ClearError()` |
//! | 使能 | `EnableRobot()` |
//! | 读位姿 | `GetPose()` |
//! | 伺服 | `ServoP(x,y,z,rx,ry,rz)` |
//!
//! 应答以 `;` 结尾。同一连接上的请求串行执行。
//!
//! 调用方超时会在请求中途丢弃 future，此时连接上可能残留未读的应答；
//! 连接被标记为 `in_flight` 未清除，下一次请求会重建连接，避免应答错位。

use crate::error::DriverError;
use crate::response::DashboardReply;
use crate::robot::{ResultCode, RobotDriver};
use std::time::Duration;
use teleop_core::Pose3D;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct Connection {
    stream: BufReader<TcpStream>,
    in_flight: bool,
}

impl Connection {
    async fn open(addr: &str, timeout: Duration) -> Result<Self, DriverError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| DriverError::Timeout)??;
        stream.set_nodelay(true)?;
        info!("Connected to robot dashboard at {}", addr);
        Ok(Connection {
            stream: BufReader::new(stream),
            in_flight: false,
        })
    }

    async fn exchange(&mut self, command: &str) -> Result<DashboardReply, DriverError> {
        self.in_flight = true;

        self.stream.get_mut().write_all(command.as_bytes()).await?;

        let mut buf = Vec::with_capacity(128);
        let n = self.stream.read_until(b';', &mut buf).await?;
        if n == 0 {
            return Err(DriverError::ConnectionClosed);
        }

        self.in_flight = false;
        let text = String::from_utf8_lossy(&buf);
        debug!("dashboard: {} -> {}", command, text.trim());
        DashboardReply::parse(&text)
    }
}

/// Dashboard TCP 机器人驱动
pub struct DashboardDriver {
    addr: String,
    connect_timeout: Duration,
    conn: Mutex<Option<Connection>>,
}

impl DashboardDriver {
    /// 创建驱动（首次请求时连接）
    pub fn new(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        DashboardDriver {
            addr: addr.into(),
            connect_timeout,
            conn: Mutex::new(None),
        }
    }

    /// 创建驱动并立即连接
    pub async fn connect(
        addr: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, DriverError> {
        let driver = Self::new(addr, connect_timeout);
        let conn = Connection::open(&driver.addr, driver.connect_timeout).await?;
        *driver.conn.lock().await = Some(conn);
        Ok(driver)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn request(&self, command: &str) -> Result<DashboardReply, DriverError> {
        let mut guard = self.conn.lock().await;

        let stale = guard.as_ref().is_none_or(|c| c.in_flight);
        if stale {
            if guard.is_some() {
                warn!("Dropping dashboard connection with unfinished request");
            }
            *guard = Some(Connection::open(&self.addr, self.connect_timeout).await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(DriverError::ConnectionClosed);
        };

        let result = conn.exchange(command).await;
        if let Err(DriverError::Io(_) | DriverError::ConnectionClosed) = &result {
            *guard = None;
        }
        result
    }
}

/// 格式化伺服指令（毫米/度，保留三位小数）
pub fn servo_command(pose: &Pose3D) -> String {
    let [x, y, z, rx, ry, rz] = pose.to_array();
    format!("ServoP({x:.3},{y:.3},{z:.3},{rx:.3},{ry:.3},{rz:.3})")
}

impl RobotDriver for DashboardDriver {
    async fn clear_error(&self) -> Result<ResultCode, DriverError> {
        Ok(self.request("ClearError()").await?.code)
    }

    async fn enable(&self) -> Result<ResultCode, DriverError> {
        Ok(self.request("EnableRobot()").await?.code)
    }

    async fn move_to(&self, pose: Pose3D) -> Result<(), DriverError> {
        let reply = self.request(&servo_command(&pose)).await?;
        if reply.code.is_success() {
            Ok(())
        } else {
            Err(DriverError::ResultCode {
                command: reply.command,
                code: reply.code.0,
            })
        }
    }

    async fn get_current_pose(&self) -> Result<Pose3D, DriverError> {
        self.request("GetPose()").await?.pose()
    }
}
