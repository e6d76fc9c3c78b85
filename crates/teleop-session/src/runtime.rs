//! 事件循环
//!
//! 单个 tokio 任务串行处理三路输入：
//!
//! - 内部事件（驱动调用结果、重试定时器、夹爪执行结束、复位、停止），优先处理
//! - 夹爪信号（有界 mpsc）
//! - 传感器采样（`watch`，只保留最新一帧，处理不过来时旧帧被覆盖）
//!
//! 会话状态只在该任务内修改；对外通过 [`TeleopHandle`] 投递输入、读取状态和指标。

use crate::event::{EventSender, TeleopEvent};
use crate::metrics::{SessionMetrics, SessionMetricsSnapshot};
use crate::session::{SessionStatus, TeleopSession};
use std::sync::Arc;
use teleop_core::{SensorPose, TeleopConfig};
use teleop_driver::{Actuator, RecorderSink, RobotDriver};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 夹爪信号队列容量
const SIGNAL_QUEUE_CAPACITY: usize = 8;

/// 遥操作运行时
pub struct TeleopRuntime;

impl TeleopRuntime {
    /// 在当前 tokio 运行时上启动事件循环，握手自动开始
    ///
    /// 丢弃返回的句柄不会停止事件循环，需显式调用 [`TeleopHandle::shutdown`]。
    pub fn spawn<D, A, R>(
        config: &TeleopConfig,
        driver: Arc<D>,
        actuator: Arc<A>,
        recorder: Arc<R>,
    ) -> TeleopHandle
    where
        D: RobotDriver,
        A: Actuator,
        R: RecorderSink,
    {
        let metrics = Arc::new(SessionMetrics::new());
        let (events, events_rx) = EventSender::channel();
        let (sensor_tx, sensor_rx) = watch::channel(None);
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_QUEUE_CAPACITY);

        let session = TeleopSession::new(
            config,
            driver,
            actuator,
            recorder,
            events.clone(),
            Arc::clone(&metrics),
        );
        let (status_tx, status_rx) = watch::channel(session.status());

        let task = tokio::spawn(event_loop(
            session, events_rx, sensor_rx, signal_rx, status_tx,
        ));

        TeleopHandle {
            sensor_tx,
            signal_tx,
            events,
            metrics,
            status_rx,
            task,
        }
    }
}

async fn event_loop<D: RobotDriver, R: RecorderSink>(
    mut session: TeleopSession<D, R>,
    mut events_rx: mpsc::UnboundedReceiver<TeleopEvent>,
    mut sensor_rx: watch::Receiver<Option<SensorPose>>,
    mut signal_rx: mpsc::Receiver<Vec<i32>>,
    status_tx: watch::Sender<SessionStatus>,
) {
    session.start();
    publish_status(&session, &status_tx);

    loop {
        let event = tokio::select! {
            biased;
            Some(event) = events_rx.recv() => event,
            Some(signal) = signal_rx.recv() => TeleopEvent::GripperSignal(signal),
            Ok(()) = sensor_rx.changed() => {
                let sample = *sensor_rx.borrow_and_update();
                match sample {
                    Some(sample) => TeleopEvent::SensorSample(sample),
                    None => continue,
                }
            },
            else => break,
        };

        if let TeleopEvent::Shutdown = event {
            info!("Teleop event loop shutting down");
            break;
        }
        session.handle_event(event);
        publish_status(&session, &status_tx);
    }
    debug!("Final metrics: {:?}", session.metrics().snapshot());
}

fn publish_status<D: RobotDriver, R: RecorderSink>(
    session: &TeleopSession<D, R>,
    status_tx: &watch::Sender<SessionStatus>,
) {
    let status = session.status();
    status_tx.send_if_modified(|current| {
        if *current == status {
            return false;
        }
        *current = status;
        true
    });
}

/// 事件循环句柄
pub struct TeleopHandle {
    sensor_tx: watch::Sender<Option<SensorPose>>,
    signal_tx: mpsc::Sender<Vec<i32>>,
    events: EventSender,
    metrics: Arc<SessionMetrics>,
    status_rx: watch::Receiver<SessionStatus>,
    task: JoinHandle<()>,
}

impl TeleopHandle {
    /// 传感器采样输入（只保留最新一帧）
    pub fn sensor_sender(&self) -> watch::Sender<Option<SensorPose>> {
        self.sensor_tx.clone()
    }

    /// 夹爪信号输入
    pub fn signal_sender(&self) -> mpsc::Sender<Vec<i32>> {
        self.signal_tx.clone()
    }

    /// 投递一帧传感器采样
    pub fn send_sample(&self, sample: SensorPose) {
        self.sensor_tx.send_replace(Some(sample));
    }

    /// 丢弃基准，下一帧重新初始化
    pub fn reset_baseline(&self) {
        self.events.send(TeleopEvent::ResetBaseline);
    }

    pub fn metrics(&self) -> SessionMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 最近一次发布的会话状态
    pub fn status(&self) -> SessionStatus {
        *self.status_rx.borrow()
    }

    /// 状态订阅
    pub fn status_receiver(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    /// 请求停止事件循环（已排队的内部事件先处理）
    pub fn shutdown(&self) {
        self.events.send(TeleopEvent::Shutdown);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// 等待事件循环退出
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.task.await
    }
}
