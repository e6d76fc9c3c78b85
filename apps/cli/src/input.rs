//! JSON Lines 输入
//!
//! 每行一个对象：
//!
//! ```text
//! {"pose": {"position": [x, y, z], "orientation": [qx, qy, qz, qw]}}
//! {"gripper": [1, 0]}
//! {"reset": true}
//! ```
//!
//! 空行和 `#` 开头的行被跳过；`orientation` 缺省为单位四元数。

use serde::Deserialize;
use teleop_core::{Position3D, Quaternion, SensorPose};

/// 传感器位姿输入
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PoseInput {
    pub position: [f64; 3],
    #[serde(default = "identity_orientation")]
    pub orientation: [f64; 4],
    #[serde(default)]
    pub timestamp_us: u64,
}

fn identity_orientation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl From<PoseInput> for SensorPose {
    fn from(input: PoseInput) -> Self {
        let [qx, qy, qz, qw] = input.orientation;
        SensorPose {
            timestamp_us: input.timestamp_us,
            position: Position3D::from(input.position),
            orientation: Quaternion::new(qx, qy, qz, qw),
        }
    }
}

/// 一行输入
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputLine {
    Pose(PoseInput),
    Gripper(Vec<i32>),
    Reset(bool),
}

/// 解析一行；空行和注释返回 `Ok(None)`
pub fn parse_line(line: &str) -> Result<Option<InputLine>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pose() {
        let line = r#"{"pose": {"position": [0.1, 0.2, 0.3], "orientation": [0, 0, 0.7071068, 0.7071068]}}"#;
        let Some(InputLine::Pose(pose)) = parse_line(line).unwrap() else {
            panic!("expected pose");
        };
        let sample = SensorPose::from(pose);
        assert_eq!(sample.position, Position3D::new(0.1, 0.2, 0.3));
        assert_eq!(sample.orientation.w, 0.7071068);
    }

    #[test]
    fn test_default_orientation() {
        let Some(InputLine::Pose(pose)) = parse_line(r#"{"pose":{"position":[0,0,0]}}"#).unwrap()
        else {
            panic!("expected pose");
        };
        assert_eq!(SensorPose::from(pose).orientation, Quaternion::IDENTITY);
    }

    #[test]
    fn test_parse_gripper_and_reset() {
        assert_eq!(
            parse_line(r#"{"gripper": [1, 0]}"#).unwrap(),
            Some(InputLine::Gripper(vec![1, 0]))
        );
        assert_eq!(
            parse_line(r#"{"reset": true}"#).unwrap(),
            Some(InputLine::Reset(true))
        );
    }

    #[test]
    fn test_skip_and_errors() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# comment").unwrap(), None);
        assert!(parse_line("{not json").is_err());
        assert!(parse_line(r#"{"teleport": 1}"#).is_err());
        assert!(parse_line(r#"{"pose": {"position": [1, 2]}}"#).is_err());
    }
}
