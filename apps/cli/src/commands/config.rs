//! 配置管理命令
//!
//! 打印生效配置或校验配置文件

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use teleop_core::TeleopConfig;

/// 加载配置；未指定文件时使用默认值
pub fn load_config(path: Option<&Path>) -> Result<TeleopConfig> {
    match path {
        Some(path) => TeleopConfig::load(path)
            .with_context(|| format!("加载配置文件失败: {}", path.display())),
        None => Ok(TeleopConfig::default()),
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 以 TOML 打印生效配置（未指定文件时为默认值）
    Show {
        /// 配置文件路径
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 校验配置文件
    Check {
        /// 配置文件路径
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show { config } => Self::show_(config.as_deref()),

            ConfigCommand::Check { config } => Self::check_(&config),
        }
    }

    fn show_(path: Option<&Path>) -> Result<()> {
        let config = load_config(path)?;
        let text = config.to_toml_string().context("序列化配置失败")?;
        print!("{}", text);
        Ok(())
    }

    fn check_(path: &Path) -> Result<()> {
        let config = load_config(Some(path))?;

        println!("✅ 配置有效: {}", path.display());
        println!("  控制器: {}", config.robot.dashboard_addr);
        println!(
            "  包络: x {:?} y {:?} z {:?}",
            <[f64; 2]>::from(config.envelope.x()),
            <[f64; 2]>::from(config.envelope.y()),
            <[f64; 2]>::from(config.envelope.z()),
        );
        match config.envelope.orientation_limits() {
            Some(_) => println!("  姿态限幅: 启用"),
            None => println!("  姿态限幅: 未启用"),
        }
        println!(
            "  过滤: max_jump {} / min_move {}，最小命令间隔 {}ms",
            config.motion.max_jump, config.motion.min_move, config.motion.min_command_interval_ms
        );
        println!("  夹爪: {}", config.gripper.endpoint);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_default() {
        let config = load_config(None).unwrap();
        assert_eq!(config, TeleopConfig::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[motion]\nmax_jump = 1.0\nmin_move = 2.0").unwrap();
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("加载配置文件失败"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_config(Some(Path::new("/nonexistent/teleop.toml"))).is_err());
    }
}
