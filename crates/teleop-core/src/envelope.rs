//! # 安全包络
//!
//! 对目标位姿逐轴做闭区间限幅。包络在构造时校验，之后不可变。
//!
//! 默认只限制位置；姿态限幅是显式的可选配置（`orientation`），
//! 未配置时姿态原样通过。

use crate::error::ConfigError;
use crate::pose::{EulerDeg, Pose3D, Position3D};
use serde::{Deserialize, Serialize};

/// 闭区间 `[min, max]`
///
/// 不变量：`min <= max` 且两端均为有限值。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct AxisRange {
    min: f64,
    max: f64,
}

impl AxisRange {
    /// 创建区间
    ///
    /// # 错误
    ///
    /// - `ConfigError::InvalidRange`: `min > max` 或任一端非有限值
    pub fn new(min: f64, max: f64) -> Result<Self, ConfigError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(ConfigError::InvalidRange {
                name: "axis".to_string(),
                min,
                max,
            });
        }
        Ok(AxisRange { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// 限幅到区间内
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// 是否在区间内（含端点）
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl TryFrom<[f64; 2]> for AxisRange {
    type Error = ConfigError;

    fn try_from(v: [f64; 2]) -> Result<Self, Self::Error> {
        AxisRange::new(v[0], v[1])
    }
}

impl From<AxisRange> for [f64; 2] {
    fn from(r: AxisRange) -> Self {
        [r.min, r.max]
    }
}

/// 姿态限幅（度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationLimits {
    pub rx: AxisRange,
    pub ry: AxisRange,
    pub rz: AxisRange,
}

/// 安全包络
///
/// 位置三轴各一个闭区间（毫米），可选的姿态三轴区间（度）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyEnvelope {
    x: AxisRange,
    y: AxisRange,
    z: AxisRange,
    /// 姿态限幅；`None` 表示不限制姿态
    #[serde(default, skip_serializing_if = "Option::is_none")]
    orientation: Option<OrientationLimits>,
}

impl SafetyEnvelope {
    /// 创建仅限制位置的包络
    ///
    /// 每个参数为 `(min, max)`。
    pub fn new(x: (f64, f64), y: (f64, f64), z: (f64, f64)) -> Result<Self, ConfigError> {
        Ok(SafetyEnvelope {
            x: named_range("x", x)?,
            y: named_range("y", y)?,
            z: named_range("z", z)?,
            orientation: None,
        })
    }

    /// 附加姿态限幅
    pub fn with_orientation_limits(
        mut self,
        rx: (f64, f64),
        ry: (f64, f64),
        rz: (f64, f64),
    ) -> Result<Self, ConfigError> {
        self.orientation = Some(OrientationLimits {
            rx: named_range("rx", rx)?,
            ry: named_range("ry", ry)?,
            rz: named_range("rz", rz)?,
        });
        Ok(self)
    }

    pub fn x(&self) -> AxisRange {
        self.x
    }

    pub fn y(&self) -> AxisRange {
        self.y
    }

    pub fn z(&self) -> AxisRange {
        self.z
    }

    pub fn orientation_limits(&self) -> Option<&OrientationLimits> {
        self.orientation.as_ref()
    }

    /// 位置是否在包络内
    pub fn contains(&self, position: &Position3D) -> bool {
        self.x.contains(position.x) && self.y.contains(position.y) && self.z.contains(position.z)
    }

    /// 逐轴限幅
    ///
    /// 位置三轴独立限幅；姿态仅在配置了 `orientation` 时限幅。
    pub fn clamp(&self, pose: &Pose3D) -> Pose3D {
        let position = Position3D::new(
            self.x.clamp(pose.position.x),
            self.y.clamp(pose.position.y),
            self.z.clamp(pose.position.z),
        );

        let orientation = match &self.orientation {
            Some(limits) => EulerDeg::new(
                limits.rx.clamp(pose.orientation.rx),
                limits.ry.clamp(pose.orientation.ry),
                limits.rz.clamp(pose.orientation.rz),
            ),
            None => pose.orientation,
        };

        Pose3D::new(position, orientation)
    }
}

impl Default for SafetyEnvelope {
    fn default() -> Self {
        // CR5 工作台部署值（毫米）
        SafetyEnvelope {
            x: AxisRange {
                min: -800.0,
                max: 0.0,
            },
            y: AxisRange {
                min: -500.0,
                max: 500.0,
            },
            z: AxisRange {
                min: 155.0,
                max: 750.0,
            },
            orientation: None,
        }
    }
}

fn named_range(name: &str, (min, max): (f64, f64)) -> Result<AxisRange, ConfigError> {
    AxisRange::new(min, max).map_err(|_| ConfigError::InvalidRange {
        name: name.to_string(),
        min,
        max,
    })
}
