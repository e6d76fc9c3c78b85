//! 夹爪执行器接口
//!
//! 执行器是一次网络调用：提交一个小的定长数值载荷选择张开/闭合，
//! 结果只用于记录日志，失败不重试。

use crate::error::DriverError;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use teleop_core::{GripperConfig, GripperValue};
use tracing::debug;

/// 夹爪执行器
pub trait Actuator: Send + Sync + 'static {
    /// 执行一次开合
    fn actuate(&self, value: GripperValue) -> impl Future<Output = Result<(), DriverError>> + Send;
}

#[derive(Serialize)]
struct ToolDataRequest<'a> {
    value: &'a [u8],
}

/// HTTP 工具数据交换执行器
///
/// 以 JSON `{"value": [..]}` POST 到控制器的工具数据交换接口，
/// 载荷是透传给末端工具的 Modbus RTU 帧。
pub struct HttpActuator {
    client: reqwest::Client,
    endpoint: String,
    open_payload: Vec<u8>,
    close_payload: Vec<u8>,
}

impl HttpActuator {
    /// 根据配置创建执行器
    pub fn new(config: &GripperConfig) -> Result<Self, DriverError> {
        Self::with_timeout(config, config.timeout())
    }

    pub fn with_timeout(config: &GripperConfig, timeout: Duration) -> Result<Self, DriverError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpActuator {
            client,
            endpoint: config.endpoint.clone(),
            open_payload: config.open_payload.clone(),
            close_payload: config.close_payload.clone(),
        })
    }

    /// 某个状态对应的载荷
    pub fn payload(&self, value: GripperValue) -> &[u8] {
        match value {
            GripperValue::Open => &self.open_payload,
            GripperValue::Closed => &self.close_payload,
        }
    }
}

impl Actuator for HttpActuator {
    async fn actuate(&self, value: GripperValue) -> Result<(), DriverError> {
        let body = ToolDataRequest {
            value: self.payload(value),
        };
        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::HttpStatus(status.as_u16()));
        }
        debug!("Gripper {} acknowledged ({})", value, status);
        Ok(())
    }
}
