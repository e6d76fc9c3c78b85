//! 配置错误类型定义

use crate::pose::Axis;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 区间下限大于上限，或边界不是有限值
    #[error("Invalid range for {name}: [{min}, {max}]")]
    InvalidRange { name: String, min: f64, max: f64 },

    /// 比例系数非法（非有限值或 ≤ 0）
    #[error("Invalid scale for {name}: {value}")]
    InvalidScale { name: &'static str, value: f64 },

    /// 跳变过滤阈值非法
    #[error("Invalid motion thresholds: min_move={min_move}, max_jump={max_jump}")]
    InvalidThresholds { min_move: f64, max_jump: f64 },

    /// 轴映射不是置换（某个源轴被重复使用）
    #[error("Axis mapping '{name}' uses sensor axis {axis} more than once")]
    DuplicateAxis { name: &'static str, axis: Axis },

    /// 时间参数非法
    #[error("Invalid duration for {name}: {value_ms} ms")]
    InvalidDuration { name: &'static str, value_ms: u64 },

    /// 队列容量为 0
    #[error("Capacity for {name} must be positive")]
    InvalidCapacity { name: &'static str },

    /// 读取配置文件失败
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML 解析失败
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML 序列化失败
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
