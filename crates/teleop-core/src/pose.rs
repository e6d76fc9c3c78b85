//! 位姿类型
//!
//! 机器人侧使用毫米 + 欧拉角（度），传感器侧使用传感器原生单位 + 四元数。
//!
//! # 欧拉角约定
//!
//! 四元数 → 欧拉角统一采用 **静态 XYZ（roll, pitch, yaw）** 约定，
//! 即 `R = Rz(yaw) · Ry(pitch) · Rx(roll)`。pitch 接近 ±90° 时存在万向节锁，
//! 此时 roll 与 yaw 不再唯一，映射结果可能跳变（由跳变过滤器兜底）。

use nalgebra::{Quaternion as NaQuaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 四元数模平方阈值（避免除零）
const QUATERNION_NORM_THRESHOLD: f64 = 1e-10;

/// 三维坐标轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// 全部坐标轴（按 x, y, z 顺序）
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// 轴索引（x=0, y=1, z=2）
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// 三维位置向量
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position3D {
    /// 创建新的三维位置
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Position3D { x, y, z }
    }

    /// 零向量
    pub const ZERO: Self = Position3D::new(0.0, 0.0, 0.0);

    /// 按轴读取分量
    pub const fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// 逐分量相减
    pub fn sub(&self, other: &Position3D) -> Position3D {
        Position3D::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// 到另一点的欧氏距离
    pub fn distance(&self, other: &Position3D) -> f64 {
        let d = self.sub(other);
        (d.x * d.x + d.y * d.y + d.z * d.z).sqrt()
    }

    /// 以 `[x, y, z]` 数组形式返回
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Position3D {
    fn from(v: [f64; 3]) -> Self {
        Position3D::new(v[0], v[1], v[2])
    }
}

impl fmt::Display for Position3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// 欧拉角姿态（度）
///
/// `rx`/`ry`/`rz` 分别绕机器人基座 x/y/z 轴。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EulerDeg {
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
}

impl EulerDeg {
    pub const fn new(rx: f64, ry: f64, rz: f64) -> Self {
        EulerDeg { rx, ry, rz }
    }

    /// 按轴读取分量（x→rx, y→ry, z→rz）
    pub const fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.rx,
            Axis::Y => self.ry,
            Axis::Z => self.rz,
        }
    }
}

/// 机器人末端位姿
///
/// 位置单位为毫米，姿态为欧拉角（度）。不可变值类型。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose3D {
    pub position: Position3D,
    pub orientation: EulerDeg,
}

impl Pose3D {
    pub const fn new(position: Position3D, orientation: EulerDeg) -> Self {
        Pose3D {
            position,
            orientation,
        }
    }

    /// 从 `[x, y, z, rx, ry, rz]` 创建
    pub const fn from_array(v: [f64; 6]) -> Self {
        Pose3D {
            position: Position3D::new(v[0], v[1], v[2]),
            orientation: EulerDeg::new(v[3], v[4], v[5]),
        }
    }

    /// 以 `[x, y, z, rx, ry, rz]` 形式返回
    pub const fn to_array(&self) -> [f64; 6] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.orientation.rx,
            self.orientation.ry,
            self.orientation.rz,
        ]
    }

    /// 所有分量均为有限值
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// 替换位置分量（姿态不变）
    pub const fn with_position(self, position: Position3D) -> Self {
        Pose3D {
            position,
            orientation: self.orientation,
        }
    }
}

impl fmt::Display for Pose3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{:.2}°, {:.2}°, {:.2}°]",
            self.position, self.orientation.rx, self.orientation.ry, self.orientation.rz
        )
    }
}

/// 四元数（x, y, z, w 顺序，与常见中间件消息一致）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::IDENTITY
    }
}

impl Quaternion {
    /// 单位四元数（无旋转）
    pub const IDENTITY: Self = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Quaternion { x, y, z, w }
    }

    /// 从欧拉角（弧度，静态 XYZ）构造
    pub fn from_euler(roll: f64, pitch: f64, yaw: f64) -> Self {
        let q = UnitQuaternion::from_euler_angles(roll, pitch, yaw);
        Quaternion::new(q.i, q.j, q.k, q.w)
    }

    /// 转换为欧拉角（弧度）
    ///
    /// 返回 `[roll, pitch, yaw]`。模接近 0 或含非有限分量的四元数不表示任何旋转，返回 `None`；
    /// 非单位四元数先归一化。
    pub fn to_euler(self) -> Option<[f64; 3]> {
        if self.is_degenerate() {
            return None;
        }

        let q = UnitQuaternion::from_quaternion(NaQuaternion::new(self.w, self.x, self.y, self.z));
        let (roll, pitch, yaw) = q.euler_angles();
        Some([roll, pitch, yaw])
    }

    /// 模接近 0 或含非有限分量
    pub fn is_degenerate(&self) -> bool {
        let norm_sq = self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z;
        !norm_sq.is_finite() || norm_sq < QUATERNION_NORM_THRESHOLD
    }
}

/// 传感器位姿采样
///
/// 手持设备（手机 AR）发布的 6-DoF 位姿；位置单位为传感器原生单位（通常为米）。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorPose {
    /// 发布端时间戳（微秒），仅用于记录，节流使用本地接收时间
    #[serde(default)]
    pub timestamp_us: u64,
    pub position: Position3D,
    pub orientation: Quaternion,
}

impl SensorPose {
    pub const fn new(position: Position3D, orientation: Quaternion) -> Self {
        SensorPose {
            timestamp_us: 0,
            position,
            orientation,
        }
    }

    /// 位置 + 单位姿态
    pub const fn at(x: f64, y: f64, z: f64) -> Self {
        SensorPose::new(Position3D::new(x, y, z), Quaternion::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance() {
        let a = Position3D::new(0.0, 0.0, 0.0);
        let b = Position3D::new(3.0, 4.0, 0.0);
        assert_relative_eq!(a.distance(&b), 5.0);
        assert_relative_eq!(b.distance(&a), 5.0);
    }

    #[test]
    fn test_pose_array_layout() {
        let pose = Pose3D::from_array([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(pose.position, Position3D::new(1.0, 2.0, 3.0));
        assert_eq!(pose.orientation, EulerDeg::new(4.0, 5.0, 6.0));
        assert_eq!(pose.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_identity_quaternion_is_zero_euler() {
        let e = Quaternion::IDENTITY.to_euler().unwrap();
        assert_relative_eq!(e[0], 0.0);
        assert_relative_eq!(e[1], 0.0);
        assert_relative_eq!(e[2], 0.0);
    }

    #[test]
    fn test_euler_roundtrip_away_from_gimbal_lock() {
        let q = Quaternion::from_euler(0.3, -0.4, 1.2);
        let e = q.to_euler().unwrap();
        assert_relative_eq!(e[0], 0.3, epsilon = 1e-9);
        assert_relative_eq!(e[1], -0.4, epsilon = 1e-9);
        assert_relative_eq!(e[2], 1.2, epsilon = 1e-9);
    }

    #[test]
    fn test_pure_yaw_quaternion() {
        // 绕 z 轴 90°
        let half = std::f64::consts::FRAC_PI_4;
        let q = Quaternion::new(0.0, 0.0, half.sin(), half.cos());
        let e = q.to_euler().unwrap();
        assert_relative_eq!(e[2], std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_quaternion_has_no_euler() {
        assert!(Quaternion::new(0.0, 0.0, 0.0, 0.0).is_degenerate());
        assert_eq!(Quaternion::new(0.0, 0.0, 0.0, 0.0).to_euler(), None);
        assert_eq!(Quaternion::new(f64::NAN, 0.0, 0.0, 1.0).to_euler(), None);
        assert_eq!(Quaternion::new(0.0, f64::INFINITY, 0.0, 1.0).to_euler(), None);
        assert!(!Quaternion::IDENTITY.is_degenerate());
    }

    #[test]
    fn test_unnormalized_quaternion_is_normalized() {
        let q = Quaternion::from_euler(0.0, 0.0, 0.5);
        let scaled = Quaternion::new(q.x * 3.0, q.y * 3.0, q.z * 3.0, q.w * 3.0);
        assert_relative_eq!(scaled.to_euler().unwrap()[2], 0.5, epsilon = 1e-9);
    }
}
