//! 夹爪信号与录制消息
//!
//! - 离散夹爪信号：两元素二值向量，`(1,0)` 闭合、`(0,1)` 张开，其余忽略
//! - 录制消息：`[x, y, z, rx, ry, rz, gripper]`，张开 = 1.0，闭合 = 0.0

use crate::pose::Pose3D;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 夹爪离散状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GripperValue {
    /// 张开（默认）
    #[default]
    Open,
    /// 闭合
    Closed,
}

impl GripperValue {
    /// 录制消息中的数值表示
    pub const fn as_f32(self) -> f32 {
        match self {
            GripperValue::Open => 1.0,
            GripperValue::Closed => 0.0,
        }
    }

    /// 解码离散信号
    ///
    /// 只看前两个元素；不足两个元素或其他组合返回 `None`。
    pub fn from_signal(data: &[i32]) -> Option<Self> {
        match data {
            [1, 0, ..] => Some(GripperValue::Closed),
            [0, 1, ..] => Some(GripperValue::Open),
            _ => None,
        }
    }
}

impl fmt::Display for GripperValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GripperValue::Open => f.write_str("open"),
            GripperValue::Closed => f.write_str("closed"),
        }
    }
}

/// 录制端收到的目标消息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetMessage {
    pub target: Pose3D,
    pub gripper: GripperValue,
}

impl TargetMessage {
    pub const fn new(target: Pose3D, gripper: GripperValue) -> Self {
        TargetMessage { target, gripper }
    }

    /// 7 元素向量 `[x, y, z, rx, ry, rz, gripper]`
    pub fn to_vec(&self) -> [f32; 7] {
        let p = self.target.to_array();
        [
            p[0] as f32,
            p[1] as f32,
            p[2] as f32,
            p[3] as f32,
            p[4] as f32,
            p[5] as f32,
            self.gripper.as_f32(),
        ]
    }
}
