//! 会话指标
//!
//! 原子计数器，事件循环写入，任意线程读取快照。
//! 高频丢样是正常现象，这里只计数不记日志。

use std::sync::atomic::{AtomicU64, Ordering};

/// 会话实时指标
#[derive(Debug, Default)]
pub struct SessionMetrics {
    /// 收到的传感器采样总数
    pub samples_received: AtomicU64,
    /// 机器人未就绪丢弃的采样
    pub dropped_not_ready: AtomicU64,
    /// 夹爪执行中丢弃的采样
    pub dropped_gripper_busy: AtomicU64,
    /// 限速丢弃的采样
    pub dropped_rate_limited: AtomicU64,
    /// 用于建立基准的采样（请求机器人基准 / 记录传感器基准）
    pub baseline_samples: AtomicU64,
    /// 候选位姿含非有限值而丢弃
    pub dropped_non_finite: AtomicU64,
    /// 跳变过大被拒绝
    pub rejected_jump: AtomicU64,
    /// 移动过小被拒绝
    pub rejected_jitter: AtomicU64,
    /// 已下发的运动命令
    pub commands_accepted: AtomicU64,
    /// 运动队列已满而丢弃的目标（未写入录制端）
    pub dropped_motion_backlog: AtomicU64,
    /// 已受理的夹爪触发
    pub gripper_triggers: AtomicU64,
    /// 执行中被拒绝的夹爪触发
    pub gripper_rejected: AtomicU64,
    /// 清错/使能重试次数
    pub handshake_retries: AtomicU64,
    /// 机器人基准请求失败次数
    pub baseline_failures: AtomicU64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 读取快照
    pub fn snapshot(&self) -> SessionMetricsSnapshot {
        SessionMetricsSnapshot {
            samples_received: self.samples_received.load(Ordering::Relaxed),
            dropped_not_ready: self.dropped_not_ready.load(Ordering::Relaxed),
            dropped_gripper_busy: self.dropped_gripper_busy.load(Ordering::Relaxed),
            dropped_rate_limited: self.dropped_rate_limited.load(Ordering::Relaxed),
            baseline_samples: self.baseline_samples.load(Ordering::Relaxed),
            dropped_non_finite: self.dropped_non_finite.load(Ordering::Relaxed),
            rejected_jump: self.rejected_jump.load(Ordering::Relaxed),
            rejected_jitter: self.rejected_jitter.load(Ordering::Relaxed),
            commands_accepted: self.commands_accepted.load(Ordering::Relaxed),
            dropped_motion_backlog: self.dropped_motion_backlog.load(Ordering::Relaxed),
            gripper_triggers: self.gripper_triggers.load(Ordering::Relaxed),
            gripper_rejected: self.gripper_rejected.load(Ordering::Relaxed),
            handshake_retries: self.handshake_retries.load(Ordering::Relaxed),
            baseline_failures: self.baseline_failures.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionMetricsSnapshot {
    pub samples_received: u64,
    pub dropped_not_ready: u64,
    pub dropped_gripper_busy: u64,
    pub dropped_rate_limited: u64,
    pub baseline_samples: u64,
    pub dropped_non_finite: u64,
    pub rejected_jump: u64,
    pub rejected_jitter: u64,
    pub commands_accepted: u64,
    pub dropped_motion_backlog: u64,
    pub gripper_triggers: u64,
    pub gripper_rejected: u64,
    pub handshake_retries: u64,
    pub baseline_failures: u64,
}

impl SessionMetricsSnapshot {
    /// 被三道门控丢弃的采样总数
    pub fn gated_total(&self) -> u64 {
        self.dropped_not_ready + self.dropped_gripper_busy + self.dropped_rate_limited
    }

    /// 被跳变过滤器拒绝的总数
    pub fn filtered_total(&self) -> u64 {
        self.rejected_jump + self.rejected_jitter
    }
}
