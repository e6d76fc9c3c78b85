//! # 遥操作配置
//!
//! 所有参数均有默认值（对应 CR5 工作台部署），可从 TOML 覆盖：
//!
//! ```toml
//! [robot]
//! dashboard_addr = "192.168.1.6:29999"
//! call_timeout_ms = 2000
//!
//! [motion]
//! min_command_interval_ms = 33
//! max_jump = 40.0
//! min_move = 2.0
//!
//! [mapping]
//! position_scale = 900.0
//! position_axes = { x = "-z", y = "-x", z = "+y" }
//!
//! [envelope]
//! x = [-800.0, 0.0]
//! y = [-500.0, 500.0]
//! z = [155.0, 750.0]
//! ```

use crate::envelope::SafetyEnvelope;
use crate::error::ConfigError;
use crate::filter::MotionFilter;
use crate::mapper::{AxisMapping, PoseMapper};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 遥操作完整配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleopConfig {
    pub robot: RobotConfig,
    pub handshake: HandshakeConfig,
    pub motion: MotionConfig,
    pub mapping: MappingConfig,
    pub envelope: SafetyEnvelope,
    pub gripper: GripperConfig,
    pub recorder: RecorderConfig,
}

impl TeleopConfig {
    /// 从 TOML 文件加载并校验
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TeleopConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 校验配置
    ///
    /// 包络区间在反序列化时已校验，这里检查跨字段约束。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.motion;
        if !(m.min_move.is_finite() && m.max_jump.is_finite())
            || m.min_move < 0.0
            || m.min_move >= m.max_jump
        {
            return Err(ConfigError::InvalidThresholds {
                min_move: m.min_move,
                max_jump: m.max_jump,
            });
        }

        let map = &self.mapping;
        for (name, value) in [
            ("position_scale", map.position_scale),
            ("rotation_scale", map.rotation_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidScale { name, value });
            }
        }
        map.position_axes.validate("position_axes")?;
        map.rotation_axes.validate("rotation_axes")?;

        for (name, value_ms) in [
            ("robot.call_timeout_ms", self.robot.call_timeout_ms),
            ("handshake.retry_delay_ms", self.handshake.retry_delay_ms),
            ("gripper.timeout_ms", self.gripper.timeout_ms),
        ] {
            if value_ms == 0 {
                return Err(ConfigError::InvalidDuration { name, value_ms });
            }
        }

        if self.recorder.capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                name: "recorder.capacity",
            });
        }

        Ok(())
    }

    /// 根据配置构造位姿映射器
    pub fn mapper(&self) -> PoseMapper {
        PoseMapper::new(
            self.mapping.position_scale,
            self.mapping.rotation_scale,
            self.mapping.position_axes,
            self.mapping.rotation_axes,
        )
        .with_rotation_wrap(self.mapping.wrap_rotation_delta)
    }

    /// 根据配置构造跳变过滤器
    pub fn filter(&self) -> MotionFilter {
        MotionFilter::new(self.motion.max_jump, self.motion.min_move)
    }
}

/// 机器人控制器连接
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Dashboard TCP 地址
    pub dashboard_addr: String,
    /// 单次驱动调用超时（毫秒），驱动本身不保证超时
    pub call_timeout_ms: u64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            dashboard_addr: "192.168.1.6:29999".to_string(),
            call_timeout_ms: 2000,
        }
    }
}

impl RobotConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// 握手重试
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// 清错/使能失败后的固定重试间隔（毫秒），无重试上限
    pub retry_delay_ms: u64,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 1000,
        }
    }
}

impl HandshakeConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// 运动节流与跳变过滤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// 两条已接受命令之间的最小间隔（毫秒），33ms ≈ 30Hz
    pub min_command_interval_ms: u64,
    /// 跳变阈值（毫米）
    pub max_jump: f64,
    /// 最小移动量（毫米）
    pub min_move: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            min_command_interval_ms: 33,
            max_jump: 40.0,
            min_move: 2.0,
        }
    }
}

impl MotionConfig {
    pub fn min_command_interval(&self) -> Duration {
        Duration::from_millis(self.min_command_interval_ms)
    }
}

/// 传感器 → 机器人映射参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// 位置增益（传感器单位 → 毫米）
    pub position_scale: f64,
    /// 角度增益（传感器角度单位 → 度）
    pub rotation_scale: f64,
    /// 姿态增量是否折叠到 `[-π, π)`
    pub wrap_rotation_delta: bool,
    pub position_axes: AxisMapping,
    pub rotation_axes: AxisMapping,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            position_scale: 900.0,
            rotation_scale: 180.0 / std::f64::consts::PI,
            wrap_rotation_delta: true,
            position_axes: AxisMapping::DEFAULT_POSITION,
            rotation_axes: AxisMapping::DEFAULT_ROTATION,
        }
    }
}

/// 夹爪执行器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GripperConfig {
    /// 工具数据交换 HTTP 接口
    pub endpoint: String,
    /// 执行前去抖延迟（毫秒）
    pub pre_delay_ms: u64,
    /// 执行后机械稳定延迟（毫秒）
    pub post_delay_ms: u64,
    /// HTTP 请求超时（毫秒）
    pub timeout_ms: u64,
    /// 闭合指令（Modbus RTU 帧）
    pub close_payload: Vec<u8>,
    /// 张开指令（Modbus RTU 帧）
    pub open_payload: Vec<u8>,
}

impl Default for GripperConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://192.168.1.6:22000/interface/toolDataExchange".to_string(),
            pre_delay_ms: 300,
            post_delay_ms: 1000,
            timeout_ms: 2000,
            // 写寄存器 0x0103 = 0 / 1000，末两字节为 CRC
            close_payload: vec![1, 6, 1, 3, 0, 0, 120, 54],
            open_payload: vec![1, 6, 1, 3, 3, 232, 120, 136],
        }
    }
}

impl GripperConfig {
    pub fn pre_delay(&self) -> Duration {
        Duration::from_millis(self.pre_delay_ms)
    }

    pub fn post_delay(&self) -> Duration {
        Duration::from_millis(self.post_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 录制通道
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// 有界队列容量，满时丢弃
    pub capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Axis;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = TeleopConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.motion.min_command_interval(), Duration::from_millis(33));
        assert_eq!(config.handshake.retry_delay(), Duration::from_secs(1));
        assert_eq!(config.gripper.close_payload.len(), 8);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TeleopConfig::from_toml_str(
            r#"
            [motion]
            max_jump = 60.0
            "#,
        )
        .unwrap();
        assert_eq!(config.motion.max_jump, 60.0);
        assert_eq!(config.motion.min_move, 2.0);
        assert_eq!(config.mapping.position_scale, 900.0);
    }

    #[test]
    fn test_axis_mapping_from_toml() {
        let config = TeleopConfig::from_toml_str(
            r#"
            [mapping]
            position_axes = { x = "+x", y = "+y", z = "+z" }
            "#,
        )
        .unwrap();
        assert_eq!(config.mapping.position_axes, AxisMapping::IDENTITY);
    }

    #[test]
    fn test_duplicate_axis_rejected() {
        let err = TeleopConfig::from_toml_str(
            r#"
            [mapping]
            rotation_axes = { x = "+x", y = "+x", z = "+z" }
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateAxis {
                name: "rotation_axes",
                axis: Axis::X
            }
        ));
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let mut config = TeleopConfig::default();
        config.motion.min_move = 50.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds { .. })
        ));

        config.motion.min_move = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let mut config = TeleopConfig::default();
        config.mapping.position_scale = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidScale {
                name: "position_scale",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_retry_delay_rejected() {
        let mut config = TeleopConfig::default();
        config.handshake.retry_delay_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_toml_roundtrip_preserves_config() {
        let config = TeleopConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = TeleopConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[robot]\ndashboard_addr = \"10.0.0.2:29999\"").unwrap();
        let config = TeleopConfig::load(file.path()).unwrap();
        assert_eq!(config.robot.dashboard_addr, "10.0.0.2:29999");

        assert!(matches!(
            TeleopConfig::load("/nonexistent/teleop.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
