//! 控制器应答解析
//!
//! Dashboard 应答格式：`ErrorID,{value},Command();`，例如
//!
//! ```text
//! 0,{},EnableRobot();
//! 0,{-300.000,0.000,400.000,180.000,0.000,90.000},GetPose();
//! ```

use crate::error::DriverError;
use crate::robot::ResultCode;
use teleop_core::Pose3D;

/// 解析后的 Dashboard 应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardReply {
    pub code: ResultCode,
    /// 花括号内的内容（不含花括号）
    pub body: String,
    /// 回显的命令名（不含末尾分号）
    pub command: String,
}

impl DashboardReply {
    /// 解析一条应答
    pub fn parse(raw: &str) -> Result<Self, DriverError> {
        let text = raw.trim();
        let malformed = || DriverError::MalformedResponse(text.to_string());

        let (code_str, rest) = text.split_once(',').ok_or_else(malformed)?;
        let code: i32 = code_str.trim().parse().map_err(|_| malformed())?;

        let open = rest.find('{').ok_or_else(malformed)?;
        let close = rest.rfind('}').ok_or_else(malformed)?;
        if close < open {
            return Err(malformed());
        }
        let body = rest[open + 1..close].trim().to_string();

        let command = rest[close + 1..]
            .trim()
            .trim_start_matches(',')
            .trim()
            .trim_end_matches(';')
            .to_string();

        Ok(DashboardReply {
            code: ResultCode(code),
            body,
            command,
        })
    }

    /// 把应答体解析为位姿（要求返回码为 0）
    pub fn pose(&self) -> Result<Pose3D, DriverError> {
        if !self.code.is_success() {
            return Err(DriverError::ResultCode {
                command: self.command.clone(),
                code: self.code.0,
            });
        }
        parse_pose_values(&self.body)
    }
}

/// 解析机器人位姿应答
///
/// 接受裸 `{x,y,z,rx,ry,rz}` 或完整 Dashboard 应答。
/// 少于 6 个值或存在非数字值时返回 `MalformedResponse`；多余的值忽略。
pub fn parse_pose_response(raw: &str) -> Result<Pose3D, DriverError> {
    let text = raw.trim();
    if text.starts_with('{') {
        let body = text
            .trim_end_matches(';')
            .trim_start_matches('{')
            .trim_end_matches('}');
        parse_pose_values(body)
    } else {
        DashboardReply::parse(text)?.pose()
    }
}

fn parse_pose_values(body: &str) -> Result<Pose3D, DriverError> {
    let malformed = || DriverError::MalformedResponse(format!("{{{body}}}"));

    let values = body
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|_| malformed())?;

    if values.len() < 6 || values.iter().take(6).any(|v| !v.is_finite()) {
        return Err(malformed());
    }

    Ok(Pose3D::from_array([
        values[0], values[1], values[2], values[3], values[4], values[5],
    ]))
}
