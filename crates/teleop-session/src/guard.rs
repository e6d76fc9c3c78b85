//! 在途请求守卫
//!
//! 同一类异步请求在应答返回前只允许发出一次。
//! 只在事件循环内使用，因此不需要原子操作。

/// 在途请求守卫
#[derive(Debug, Default)]
pub struct PendingRequest {
    in_flight: bool,
    issued: u64,
}

impl PendingRequest {
    pub const fn new() -> Self {
        PendingRequest {
            in_flight: false,
            issued: 0,
        }
    }

    /// 尝试占用；已有在途请求时返回 `false`
    #[must_use]
    pub fn begin(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        self.issued += 1;
        true
    }

    /// 占用但不计为一次请求（例如等待重试定时器）
    pub fn hold(&mut self) {
        self.in_flight = true;
    }

    /// 应答已返回（成功或失败）
    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight
    }

    /// 累计发出的请求数（含首次，不含 `hold`）
    pub fn issued(&self) -> u64 {
        self.issued
    }
}
