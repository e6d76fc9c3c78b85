//! 跳变过滤器
//!
//! 双阈值死区：距离上次**已发送**目标过远（传感器跟踪丢失/瞬移）或过近（噪声抖动）
//! 的候选位置都会被拒绝。该判定对距离不是单调的。
//!
//! 两个比较都是严格不等式：距离恰好等于 `min_move` 或 `max_jump` 时接受。

use crate::pose::Pose3D;

/// 过滤判定结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterVerdict {
    /// 没有上次目标（初始化后或复位后首条命令），无条件接受
    First,
    /// 距离在死区之外、跳变阈值之内
    Accept { distance: f64 },
    /// 距离超过 `max_jump`
    TooFar { distance: f64 },
    /// 距离小于 `min_move`
    TooSmall { distance: f64 },
}

impl FilterVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterVerdict::First | FilterVerdict::Accept { .. })
    }
}

/// 跳变过滤器（无状态）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionFilter {
    max_jump: f64,
    min_move: f64,
}

impl MotionFilter {
    /// 创建过滤器
    ///
    /// 阈值合法性由 `TeleopConfig::validate()` 保证。
    pub const fn new(max_jump: f64, min_move: f64) -> Self {
        MotionFilter { max_jump, min_move }
    }

    pub fn max_jump(&self) -> f64 {
        self.max_jump
    }

    pub fn min_move(&self) -> f64 {
        self.min_move
    }

    /// 判定候选目标（只比较位置）
    pub fn evaluate(&self, candidate: &Pose3D, last_sent: Option<&Pose3D>) -> FilterVerdict {
        let Some(last) = last_sent else {
            return FilterVerdict::First;
        };

        let distance = candidate.position.distance(&last.position);
        if distance > self.max_jump {
            FilterVerdict::TooFar { distance }
        } else if distance < self.min_move {
            FilterVerdict::TooSmall { distance }
        } else {
            FilterVerdict::Accept { distance }
        }
    }

    pub fn accept(&self, candidate: &Pose3D, last_sent: Option<&Pose3D>) -> bool {
        self.evaluate(candidate, last_sent).is_accepted()
    }
}

/// 函数形式的过滤判定
pub fn accept(candidate: &Pose3D, last_sent: Option<&Pose3D>, max_jump: f64, min_move: f64) -> bool {
    MotionFilter::new(max_jump, min_move).accept(candidate, last_sent)
}
