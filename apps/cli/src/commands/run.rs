//! run 命令
//!
//! 启动遥操作循环：输入线程读 JSON Lines，录制线程把消息写成 JSON 数组，
//! Ctrl-C 或输入结束后停止循环并打印指标。

use crate::commands::config::load_config;
use crate::input::{InputLine, parse_line};
use anyhow::{Context, Result};
use clap::Args;
use crossbeam_channel::Receiver;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use teleop_core::{Pose3D, TargetMessage, TeleopConfig};
use teleop_driver::mock::{MockActuator, MockRobot};
use teleop_driver::{Actuator, ChannelRecorder, DashboardDriver, HttpActuator, RobotDriver};
use teleop_session::{GripperState, SessionMetricsSnapshot, TeleopRuntime};
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};

/// `--dry-run` 时 Mock 机器人的当前位姿
const DRY_RUN_POSE: [f64; 6] = [-300.0, 0.0, 400.0, 180.0, 0.0, 90.0];

/// 输入结束后等待夹爪执行完成的上限
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// 遥操作运行参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 配置文件路径（缺省使用默认配置）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 输入文件（`-` 为 stdin）
    #[arg(short, long, default_value = "-")]
    pub input: String,

    /// 录制输出文件（`-` 为 stdout）
    #[arg(short, long, default_value = "-")]
    pub output: String,

    /// 使用 Mock 机器人和夹爪（不连接硬件）
    #[arg(long)]
    pub dry_run: bool,

    /// 位姿输入节拍（毫秒），回放文件时使用；缺省不节拍
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

impl RunCommand {
    pub async fn execute(&self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;

        let (recorder, records) = ChannelRecorder::new(config.recorder.capacity);
        let recorder = Arc::new(recorder);
        let writer = spawn_writer(&self.output, records)?;

        let metrics = if self.dry_run {
            info!("Dry run: using mock robot and gripper");
            let robot = MockRobot::new(Pose3D::from_array(DRY_RUN_POSE));
            self.drive(&config, Arc::new(robot), Arc::new(MockActuator::new()), &recorder)
                .await?
        } else {
            let driver =
                DashboardDriver::new(&config.robot.dashboard_addr, config.robot.call_timeout());
            let actuator = HttpActuator::new(&config.gripper).context("创建夹爪执行器失败")?;
            info!("Controller at {}", driver.addr());
            self.drive(&config, Arc::new(driver), Arc::new(actuator), &recorder)
                .await?
        };

        let recorder_dropped = recorder.dropped_messages().load(Ordering::Relaxed);
        // 释放最后一个发送端，录制线程随之退出
        drop(recorder);
        let written = writer
            .join()
            .map_err(|_| anyhow::anyhow!("录制线程异常退出"))??;

        print_summary(&metrics, written, recorder_dropped);
        Ok(())
    }

    async fn drive<D, A>(
        &self,
        config: &TeleopConfig,
        driver: Arc<D>,
        actuator: Arc<A>,
        recorder: &Arc<ChannelRecorder>,
    ) -> Result<SessionMetricsSnapshot>
    where
        D: RobotDriver,
        A: Actuator,
    {
        let handle = TeleopRuntime::spawn(config, driver, actuator, Arc::clone(recorder));
        let signals = handle.signal_sender();

        let (line_tx, mut lines) = mpsc::channel(64);
        spawn_reader(&self.input, line_tx)?;

        let (stop_tx, mut stop_rx) = mpsc::unbounded_channel();
        ctrlc::set_handler(move || {
            let _ = stop_tx.send(());
        })
        .context("注册 Ctrl-C 处理失败")?;

        let mut pacer = self.interval_ms.map(|ms| pacing_interval(Duration::from_millis(ms)));
        // 发出位姿后等待节拍，期间不读下一行
        let mut pacing = false;
        let mut interrupted = false;
        loop {
            tokio::select! {
                biased;

                _ = stop_rx.recv() => {
                    info!("Interrupted");
                    interrupted = true;
                    break;
                },
                _ = next_tick(&mut pacer), if pacing => pacing = false,
                line = lines.recv(), if !pacing => match line {
                    Some(InputLine::Pose(pose)) => {
                        handle.send_sample(pose.into());
                        pacing = pacer.is_some();
                    },
                    Some(InputLine::Gripper(data)) => {
                        if signals.send(data).await.is_err() {
                            warn!("Event loop stopped, gripper signal dropped");
                        }
                    },
                    Some(InputLine::Reset(true)) => handle.reset_baseline(),
                    Some(InputLine::Reset(false)) => {},
                    None => {
                        info!("Input finished");
                        break;
                    },
                },
            }
        }

        if !interrupted {
            // 让进行中的夹爪动作走完稳定和恢复流程
            let mut status = handle.status_receiver();
            let idle = status.wait_for(|s| s.gripper == GripperState::Idle);
            if tokio::time::timeout(DRAIN_TIMEOUT, idle).await.is_err() {
                warn!("Gripper still actuating after {:?}, stopping anyway", DRAIN_TIMEOUT);
            }
        }

        let metrics = handle.metrics();
        handle.shutdown();
        handle.join().await.context("事件循环异常退出")?;
        Ok(metrics)
    }
}

/// 位姿节拍；首个节拍在一个周期之后
fn pacing_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(pacer: &mut Option<Interval>) {
    match pacer {
        Some(interval) => {
            interval.tick().await;
        },
        None => std::future::pending().await,
    }
}

/// 输入线程：逐行解析后送入事件通道
fn spawn_reader(input: &str, tx: mpsc::Sender<InputLine>) -> Result<()> {
    let reader: Box<dyn BufRead + Send> = if input == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = File::open(input).with_context(|| format!("打开输入文件失败: {input}"))?;
        Box::new(BufReader::new(file))
    };

    thread::Builder::new()
        .name("teleop-input".into())
        .spawn(move || {
            for (index, line) in reader.lines().enumerate() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Input read error: {}", e);
                        break;
                    },
                };
                match parse_line(&line) {
                    Ok(Some(parsed)) => {
                        if tx.blocking_send(parsed).is_err() {
                            break;
                        }
                    },
                    Ok(None) => {},
                    Err(e) => warn!("Skipping input line {}: {}", index + 1, e),
                }
            }
        })
        .context("启动输入线程失败")?;
    Ok(())
}

/// 录制线程：每条消息写一行 `[x, y, z, rx, ry, rz, gripper]`，返回写出的条数
fn spawn_writer(
    output: &str,
    records: Receiver<TargetMessage>,
) -> Result<thread::JoinHandle<Result<u64>>> {
    let sink: Box<dyn Write + Send> = if output == "-" {
        Box::new(std::io::stdout())
    } else {
        let file = File::create(Path::new(output))
            .with_context(|| format!("创建输出文件失败: {output}"))?;
        Box::new(file)
    };

    let handle = thread::Builder::new()
        .name("teleop-recorder".into())
        .spawn(move || -> Result<u64> {
            let mut out = BufWriter::new(sink);
            let mut written = 0u64;
            for message in records.iter() {
                serde_json::to_writer(&mut out, &message.to_vec())?;
                out.write_all(b"\n")?;
                out.flush()?;
                written += 1;
            }
            Ok(written)
        })
        .context("启动录制线程失败")?;
    Ok(handle)
}

fn print_summary(metrics: &SessionMetricsSnapshot, written: u64, recorder_dropped: u64) {
    eprintln!();
    eprintln!("📊 会话统计:");
    eprintln!("  采样: {}", metrics.samples_received);
    eprintln!(
        "  门控丢弃: {} (未就绪 {} / 夹爪 {} / 限速 {})",
        metrics.gated_total(),
        metrics.dropped_not_ready,
        metrics.dropped_gripper_busy,
        metrics.dropped_rate_limited
    );
    eprintln!("  基准采样: {}", metrics.baseline_samples);
    eprintln!(
        "  过滤拒绝: {} (跳变 {} / 抖动 {})",
        metrics.filtered_total(),
        metrics.rejected_jump,
        metrics.rejected_jitter
    );
    eprintln!(
        "  已下发命令: {} (队列满丢弃 {})",
        metrics.commands_accepted, metrics.dropped_motion_backlog
    );
    eprintln!(
        "  夹爪: 触发 {} / 拒绝 {}",
        metrics.gripper_triggers, metrics.gripper_rejected
    );
    eprintln!("  握手重试: {}", metrics.handshake_retries);
    eprintln!("  录制: 写出 {} / 丢弃 {}", written, recorder_dropped);
}
