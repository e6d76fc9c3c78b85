//! # 位姿映射
//!
//! 把传感器坐标系下相对基准的增量映射为机器人坐标系下的目标位姿。纯函数，无副作用。
//!
//! ## 位置
//!
//! ```text
//! delta = (sensor.position - baseline.sensor.position) * position_scale
//! target[axis] = baseline.robot[axis] + sign * delta[source_axis]
//! ```
//!
//! 轴置换与符号（`AxisMapping`）描述传感器相对机器人基座的安装朝向，按部署配置。
//! 默认值对应手机竖持、屏幕朝向操作者：x ← −z, y ← −x, z ← +y。
//!
//! ## 姿态
//!
//! 传感器四元数按静态 XYZ 约定转换为 `[roll, pitch, yaw]`（弧度），
//! 逐轴增量乘以 `rotation_scale`（弧度 → 度）后叠加到基准机器人欧拉角上，
//! 轴置换由独立的 `rotation_axes` 描述（默认 rx ← pitch, ry ← yaw, rz ← roll）。
//! 这里不做四元数增量合成；万向节锁附近的结果不可靠。
//!
//! 退化四元数（模接近 0 或含 NaN）没有对应的欧拉角：这样的采样不产生目标，
//! 也不能作为传感器基准。

use crate::error::ConfigError;
use crate::pose::{Axis, EulerDeg, Pose3D, Position3D, SensorPose};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// 单个机器人轴的数据来源：传感器轴 + 符号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AxisSource {
    pub axis: Axis,
    pub negate: bool,
}

impl AxisSource {
    pub const fn plus(axis: Axis) -> Self {
        AxisSource {
            axis,
            negate: false,
        }
    }

    pub const fn minus(axis: Axis) -> Self {
        AxisSource { axis, negate: true }
    }

    fn pick(&self, v: &[f64; 3]) -> f64 {
        let value = v[self.axis.index()];
        if self.negate { -value } else { value }
    }
}

impl FromStr for AxisSource {
    type Err = String;

    /// 解析 `"x"`, `"+y"`, `"-z"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negate, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let axis = match name.to_ascii_lowercase().as_str() {
            "x" => Axis::X,
            "y" => Axis::Y,
            "z" => Axis::Z,
            _ => return Err(format!("invalid axis source '{s}', expected [+|-]x|y|z")),
        };
        Ok(AxisSource { axis, negate })
    }
}

impl TryFrom<String> for AxisSource {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AxisSource> for String {
    fn from(s: AxisSource) -> Self {
        s.to_string()
    }
}

impl fmt::Display for AxisSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.negate { "-" } else { "+" }, self.axis)
    }
}

/// 传感器坐标系 → 机器人坐标系的轴置换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisMapping {
    pub x: AxisSource,
    pub y: AxisSource,
    pub z: AxisSource,
}

impl AxisMapping {
    /// 恒等映射
    pub const IDENTITY: Self = AxisMapping {
        x: AxisSource::plus(Axis::X),
        y: AxisSource::plus(Axis::Y),
        z: AxisSource::plus(Axis::Z),
    };

    /// 默认位置映射：x ← −z, y ← −x, z ← +y
    pub const DEFAULT_POSITION: Self = AxisMapping {
        x: AxisSource::minus(Axis::Z),
        y: AxisSource::minus(Axis::X),
        z: AxisSource::plus(Axis::Y),
    };

    /// 默认姿态映射：rx ← pitch, ry ← yaw, rz ← roll
    pub const DEFAULT_ROTATION: Self = AxisMapping {
        x: AxisSource::plus(Axis::Y),
        y: AxisSource::plus(Axis::Z),
        z: AxisSource::plus(Axis::X),
    };

    /// 校验是否为置换（每个传感器轴恰好使用一次）
    pub fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        let mut used = [false; 3];
        for source in [self.x, self.y, self.z] {
            let slot = &mut used[source.axis.index()];
            if *slot {
                return Err(ConfigError::DuplicateAxis {
                    name,
                    axis: source.axis,
                });
            }
            *slot = true;
        }
        Ok(())
    }

    /// 把传感器坐标系向量映射到机器人坐标系
    pub fn apply(&self, v: [f64; 3]) -> [f64; 3] {
        [self.x.pick(&v), self.y.pick(&v), self.z.pick(&v)]
    }
}

/// 会话基准
///
/// 使能后采集的机器人位姿 + 随后第一帧有效传感器位姿。整体替换，不做局部修改。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionBaseline {
    robot: Pose3D,
    sensor: SensorPose,
    sensor_euler: [f64; 3],
}

impl SessionBaseline {
    /// 建立基准；传感器位置非有限或姿态退化时返回 `None`
    pub fn new(robot: Pose3D, sensor: SensorPose) -> Option<Self> {
        if !sensor.position.is_finite() {
            return None;
        }
        let sensor_euler = sensor.orientation.to_euler()?;
        Some(SessionBaseline {
            robot,
            sensor,
            sensor_euler,
        })
    }

    pub fn robot_pose(&self) -> &Pose3D {
        &self.robot
    }

    pub fn sensor_pose(&self) -> &SensorPose {
        &self.sensor
    }
}

/// 位姿映射器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseMapper {
    position_scale: f64,
    rotation_scale: f64,
    position_axes: AxisMapping,
    rotation_axes: AxisMapping,
    wrap_rotation_delta: bool,
}

impl Default for PoseMapper {
    fn default() -> Self {
        PoseMapper {
            position_scale: 900.0,
            rotation_scale: 180.0 / PI,
            position_axes: AxisMapping::DEFAULT_POSITION,
            rotation_axes: AxisMapping::DEFAULT_ROTATION,
            wrap_rotation_delta: true,
        }
    }
}

impl PoseMapper {
    pub fn new(
        position_scale: f64,
        rotation_scale: f64,
        position_axes: AxisMapping,
        rotation_axes: AxisMapping,
    ) -> Self {
        PoseMapper {
            position_scale,
            rotation_scale,
            position_axes,
            rotation_axes,
            wrap_rotation_delta: true,
        }
    }

    /// 是否把姿态增量折叠到 `[-π, π)`
    ///
    /// 关闭时 yaw 越过 ±180° 会产生约 360° 的增量。
    pub fn with_rotation_wrap(mut self, wrap: bool) -> Self {
        self.wrap_rotation_delta = wrap;
        self
    }

    pub fn position_scale(&self) -> f64 {
        self.position_scale
    }

    pub fn rotation_scale(&self) -> f64 {
        self.rotation_scale
    }

    /// 计算目标位姿
    ///
    /// 传感器姿态退化时返回 `None`。位置含 NaN 时仍返回结果，由调用方检查有限性。
    pub fn compute_target(
        &self,
        sensor: &SensorPose,
        baseline: &SessionBaseline,
    ) -> Option<Pose3D> {
        let robot = baseline.robot_pose();

        let d = sensor.position.sub(&baseline.sensor_pose().position);
        let delta = [
            d.x * self.position_scale,
            d.y * self.position_scale,
            d.z * self.position_scale,
        ];
        let mapped = self.position_axes.apply(delta);
        let position = Position3D::new(
            robot.position.x + mapped[0],
            robot.position.y + mapped[1],
            robot.position.z + mapped[2],
        );

        let euler = sensor.orientation.to_euler()?;
        let mut rot_delta = [0.0; 3];
        for axis in Axis::ALL {
            let i = axis.index();
            let raw = euler[i] - baseline.sensor_euler[i];
            let raw = if self.wrap_rotation_delta { wrap_angle(raw) } else { raw };
            rot_delta[i] = raw * self.rotation_scale;
        }
        let mapped = self.rotation_axes.apply(rot_delta);
        let orientation = EulerDeg::new(
            robot.orientation.rx + mapped[0],
            robot.orientation.ry + mapped[1],
            robot.orientation.rz + mapped[2],
        );

        Some(Pose3D::new(position, orientation))
    }
}

/// 折叠到 `[-π, π)`
fn wrap_angle(a: f64) -> f64 {
    (a + PI).rem_euclid(2.0 * PI) - PI
}
