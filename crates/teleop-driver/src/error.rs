//! 驱动层错误类型定义

use thiserror::Error;

/// 驱动层错误类型
///
/// 所有错误都不会终止控制循环：清错/使能失败一律重试，
/// 基准位姿相关错误只导致当前采样被丢弃。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 调用超时（由调用方施加）
    #[error("Operation timeout")]
    Timeout,

    /// 网络 IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP 请求失败
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 非 2xx 状态码
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// 控制器返回非零错误码
    #[error("{command} returned error code {code}")]
    ResultCode { command: String, code: i32 },

    /// 无法解析的应答
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// 连接已关闭
    #[error("Connection closed by controller")]
    ConnectionClosed,
}
