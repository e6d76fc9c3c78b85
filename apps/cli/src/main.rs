//! # Teleop CLI
//!
//! 手机 AR 位姿 → 六轴机械臂遥操作的命令行入口。
//!
//! ```bash
//! # 无硬件演练：从文件回放采样，录制消息写到 stdout
//! teleop-cli run --dry-run --input samples.jsonl --interval-ms 40
//!
//! # 连接真实控制器，采样从 stdin 流入
//! teleop-cli run --config cr5.toml --output targets.jsonl
//!
//! # 查看/校验配置
//! teleop-cli config show
//! teleop-cli config check --config cr5.toml
//! ```
//!
//! 日志写到 stderr，级别由 `RUST_LOG` 控制。

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod input;

use commands::{ConfigCommand, RunCommand};

/// Teleop CLI - 机械臂遥操作工具
#[derive(Parser, Debug)]
#[command(name = "teleop-cli")]
#[command(about = "Phone-driven teleoperation for a 6-axis robot arm", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 运行遥操作循环
    Run {
        #[command(flatten)]
        args: RunCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("teleop_cli=info,teleop_session=info")
                }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),
        Commands::Run { args } => args.execute().await,
    }
}
