//! 遥操作会话（编排器）
//!
//! 会话拥有全部可变状态，只由事件循环调用。每个传感器采样依次经过：
//!
//! 1. 三道独立门控：机器人未 Ready / 夹爪执行中 / 距上条命令不足最小间隔，任一命中即静默丢弃
//! 2. 初始化阶段：`Uninitialized → AwaitingRobotBaseline → AwaitingSensorBaseline → Initialized`
//! 3. 已初始化：映射 → 限幅 → 跳变过滤 → 下发到机器人和录制端
//!
//! 运动命令经有界队列按序逐条下发；只有成功入队的目标才算被接受并写入录制端，
//! 因此录制内容与机器人收到的命令一一对应。

use crate::event::{EventSender, TeleopEvent};
use crate::gripper::{ActuationTiming, GripperActuator, GripperState};
use crate::guard::PendingRequest;
use crate::handshake::{ConnectionHandshake, RobotConnectionState};
use crate::metrics::SessionMetrics;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use teleop_core::{
    FilterVerdict, GripperValue, MotionFilter, Pose3D, PoseMapper, SafetyEnvelope, SensorPose,
    SessionBaseline, TargetMessage, TeleopConfig,
};
use teleop_driver::{Actuator, DriverError, RecorderSink, RobotDriver};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// 运动命令队列深度（约 0.5 s 的 30 Hz 命令）
const MOTION_QUEUE_DEPTH: usize = 16;

/// 会话初始化阶段
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    /// 已请求机器人当前位姿，等待应答
    AwaitingRobotBaseline,
    /// 机器人基准已记录，下一条采样作为传感器基准
    AwaitingSensorBaseline { robot: Pose3D },
    Initialized(SessionBaseline),
}

impl SessionPhase {
    pub fn is_initialized(&self) -> bool {
        matches!(self, SessionPhase::Initialized(_))
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Uninitialized => f.write_str("Uninitialized"),
            SessionPhase::AwaitingRobotBaseline => f.write_str("AwaitingRobotBaseline"),
            SessionPhase::AwaitingSensorBaseline { .. } => f.write_str("AwaitingSensorBaseline"),
            SessionPhase::Initialized(_) => f.write_str("Initialized"),
        }
    }
}

/// 对外可观察的会话状态
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionStatus {
    pub connection: RobotConnectionState,
    pub gripper: GripperState,
    pub gripper_value: GripperValue,
    pub phase: SessionPhase,
    pub last_sent: Option<Pose3D>,
}

/// 遥操作会话
pub struct TeleopSession<D, R> {
    driver: Arc<D>,
    recorder: Arc<R>,
    events: EventSender,
    metrics: Arc<SessionMetrics>,

    mapper: PoseMapper,
    envelope: SafetyEnvelope,
    filter: MotionFilter,
    min_command_interval: Duration,
    call_timeout: Duration,

    handshake: ConnectionHandshake<D>,
    gripper: GripperActuator,
    phase: SessionPhase,
    baseline_request: PendingRequest,
    last_sent: Option<Pose3D>,
    last_command_at: Option<Instant>,
    /// 运动命令队列（按序下发）
    motion_tx: mpsc::Sender<Pose3D>,
}

impl<D: RobotDriver, R: RecorderSink> TeleopSession<D, R> {
    /// 创建会话
    ///
    /// 启动夹爪执行任务和运动下发任务，必须在 tokio 运行时内调用。
    /// 握手不会自动开始，需调用 [`start`](Self::start)。
    pub fn new<A: Actuator>(
        config: &TeleopConfig,
        driver: Arc<D>,
        actuator: Arc<A>,
        recorder: Arc<R>,
        events: EventSender,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        let call_timeout = config.robot.call_timeout();
        let handshake = ConnectionHandshake::new(
            Arc::clone(&driver),
            events.clone(),
            Arc::clone(&metrics),
            config.handshake.retry_delay(),
            call_timeout,
        );
        let gripper = GripperActuator::spawn(
            actuator,
            ActuationTiming::from(&config.gripper),
            events.clone(),
            Arc::clone(&metrics),
        );

        let (motion_tx, motion_rx) = mpsc::channel(MOTION_QUEUE_DEPTH);
        tokio::spawn(motion_dispatcher(
            Arc::clone(&driver),
            motion_rx,
            call_timeout,
        ));

        TeleopSession {
            driver,
            recorder,
            events,
            metrics,
            mapper: config.mapper(),
            envelope: config.envelope.clone(),
            filter: config.filter(),
            min_command_interval: config.motion.min_command_interval(),
            call_timeout,
            handshake,
            gripper,
            phase: SessionPhase::Uninitialized,
            baseline_request: PendingRequest::new(),
            last_sent: None,
            last_command_at: None,
            motion_tx,
        }
    }

    /// 开始握手
    pub fn start(&mut self) {
        info!("Starting robot handshake");
        self.handshake.start();
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn connection_state(&self) -> RobotConnectionState {
        self.handshake.state()
    }

    pub fn gripper_state(&self) -> GripperState {
        self.gripper.state()
    }

    pub fn last_sent(&self) -> Option<&Pose3D> {
        self.last_sent.as_ref()
    }

    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        &self.metrics
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            connection: self.handshake.state(),
            gripper: self.gripper.state(),
            gripper_value: self.gripper.value(),
            phase: self.phase,
            last_sent: self.last_sent,
        }
    }

    /// 处理一条事件
    pub fn handle_event(&mut self, event: TeleopEvent) {
        match event {
            TeleopEvent::SensorSample(sample) => self.on_sensor_sample(sample),
            TeleopEvent::GripperSignal(data) => self.on_gripper_signal(&data),
            TeleopEvent::ClearErrorResult(result) => self.handshake.on_clear_error_result(result),
            TeleopEvent::EnableResult(result) => self.handshake.on_enable_result(result),
            retry @ (TeleopEvent::RetryClearError | TeleopEvent::RetryEnable) => {
                self.handshake.on_retry(&retry)
            },
            TeleopEvent::RobotPose(result) => self.on_robot_pose(result),
            TeleopEvent::ActuationFinished { value, result } => {
                self.on_actuation_finished(value, result)
            },
            TeleopEvent::ResetBaseline => self.reset_baseline(),
            TeleopEvent::Shutdown => {},
        }
    }

    /// 处理一个传感器采样
    pub fn on_sensor_sample(&mut self, sample: SensorPose) {
        SessionMetrics::incr(&self.metrics.samples_received);

        if !self.handshake.is_ready() {
            SessionMetrics::incr(&self.metrics.dropped_not_ready);
            trace!("Sample dropped: robot {}", self.handshake.state());
            return;
        }
        if self.gripper.is_actuating() {
            SessionMetrics::incr(&self.metrics.dropped_gripper_busy);
            trace!("Sample dropped: gripper actuating");
            return;
        }
        if self
            .last_command_at
            .is_some_and(|at| at.elapsed() < self.min_command_interval)
        {
            SessionMetrics::incr(&self.metrics.dropped_rate_limited);
            trace!("Sample dropped: rate limited");
            return;
        }

        match self.phase {
            SessionPhase::Uninitialized => {
                SessionMetrics::incr(&self.metrics.baseline_samples);
                self.request_robot_baseline();
            },
            SessionPhase::AwaitingRobotBaseline => {
                SessionMetrics::incr(&self.metrics.baseline_samples);
                trace!("Sample dropped: robot baseline pending");
            },
            SessionPhase::AwaitingSensorBaseline { robot } => {
                SessionMetrics::incr(&self.metrics.baseline_samples);
                match SessionBaseline::new(robot, sample) {
                    Some(baseline) => {
                        self.phase = SessionPhase::Initialized(baseline);
                        info!("Teleop initialized: robot baseline {}", robot);
                    },
                    None => {
                        SessionMetrics::incr(&self.metrics.dropped_non_finite);
                        warn!(
                            "Degenerate sensor baseline {:?}, waiting for next sample",
                            sample
                        );
                    },
                }
            },
            SessionPhase::Initialized(baseline) => self.track(&sample, &baseline),
        }
    }

    fn request_robot_baseline(&mut self) {
        if !self.baseline_request.begin() {
            debug!("Robot baseline request already in flight");
            return;
        }
        self.phase = SessionPhase::AwaitingRobotBaseline;
        debug!("Requesting robot baseline pose");

        let driver = Arc::clone(&self.driver);
        self.events.spawn_call(
            self.call_timeout,
            async move { driver.get_current_pose().await },
            TeleopEvent::RobotPose,
        );
    }

    /// 机器人基准位姿应答
    pub fn on_robot_pose(&mut self, result: Result<Pose3D, DriverError>) {
        self.baseline_request.finish();

        if self.phase != SessionPhase::AwaitingRobotBaseline {
            debug!("Ignoring robot pose in phase {}", self.phase);
            return;
        }

        match result {
            Ok(robot) if robot.is_finite() => {
                info!("Robot baseline captured: {}", robot);
                self.phase = SessionPhase::AwaitingSensorBaseline { robot };
            },
            Ok(robot) => {
                SessionMetrics::incr(&self.metrics.baseline_failures);
                warn!("Robot baseline is not finite ({}), will retry", robot);
                self.phase = SessionPhase::Uninitialized;
            },
            Err(e) => {
                SessionMetrics::incr(&self.metrics.baseline_failures);
                warn!("Robot baseline request failed: {}, will retry", e);
                self.phase = SessionPhase::Uninitialized;
            },
        }
    }

    fn track(&mut self, sample: &SensorPose, baseline: &SessionBaseline) {
        let Some(candidate) = self.mapper.compute_target(sample, baseline) else {
            SessionMetrics::incr(&self.metrics.dropped_non_finite);
            debug!("Sample dropped: degenerate orientation {:?}", sample.orientation);
            return;
        };
        if !candidate.is_finite() {
            SessionMetrics::incr(&self.metrics.dropped_non_finite);
            debug!("Sample dropped: non-finite target {}", candidate);
            return;
        }
        let target = self.envelope.clamp(&candidate);

        match self.filter.evaluate(&target, self.last_sent.as_ref()) {
            FilterVerdict::TooFar { distance } => {
                SessionMetrics::incr(&self.metrics.rejected_jump);
                debug!("Target rejected: jump of {:.1}mm", distance);
            },
            FilterVerdict::TooSmall { distance } => {
                SessionMetrics::incr(&self.metrics.rejected_jitter);
                trace!("Target rejected: jitter of {:.2}mm", distance);
            },
            FilterVerdict::First | FilterVerdict::Accept { .. } => self.dispatch(target),
        }
    }

    fn dispatch(&mut self, target: Pose3D) {
        match self.motion_tx.try_send(target) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => {
                SessionMetrics::incr(&self.metrics.dropped_motion_backlog);
                debug!("Target dropped: motion queue full");
                return;
            },
            Err(TrySendError::Closed(_)) => {
                SessionMetrics::incr(&self.metrics.dropped_motion_backlog);
                warn!("Target dropped: motion dispatcher stopped");
                return;
            },
        }
        self.recorder
            .publish(&TargetMessage::new(target, self.gripper.value()));

        self.last_sent = Some(target);
        self.last_command_at = Some(Instant::now());
        SessionMetrics::incr(&self.metrics.commands_accepted);
        trace!("Target sent: {}", target);
    }

    /// 处理原始夹爪信号
    pub fn on_gripper_signal(&mut self, data: &[i32]) {
        let Some(value) = GripperValue::from_signal(data) else {
            trace!("Ignoring gripper signal {:?}", data);
            return;
        };
        if let Err(e) = self.gripper.trigger(value) {
            debug!("Gripper signal {} ignored: {}", value, e);
        }
    }

    fn on_actuation_finished(&mut self, value: GripperValue, result: Result<(), DriverError>) {
        if let Err(e) = result {
            warn!("Gripper {} sequence finished with error: {}", value, e);
        }
        // 机械臂可能在执行期间有微小移动，清空后下一条命令不会被误判为跳变
        self.last_sent = None;
        self.handshake.restart_enable();
        self.gripper.finish();
        info!("Gripper {} settled, teleop resumed", value);
    }

    /// 丢弃基准和上次目标，重新初始化
    ///
    /// 机器人基准请求仍在途时回到 AwaitingRobotBaseline，沿用其应答；否则回到 Uninitialized。
    pub fn reset_baseline(&mut self) {
        info!("Resetting session baseline (was {})", self.phase);
        self.phase = if self.baseline_request.is_pending() {
            SessionPhase::AwaitingRobotBaseline
        } else {
            SessionPhase::Uninitialized
        };
        self.last_sent = None;
    }
}

/// 运动下发任务
///
/// 按入队顺序逐条下发，每条调用单独限时。
async fn motion_dispatcher<D: RobotDriver>(
    driver: Arc<D>,
    mut rx: mpsc::Receiver<Pose3D>,
    call_timeout: Duration,
) {
    while let Some(pose) = rx.recv().await {
        if let Err(e) = crate::event::with_timeout(call_timeout, driver.move_to(pose)).await {
            warn!("ServoP to {} failed: {}", pose, e);
        }
    }
    debug!("Motion dispatcher stopped");
}
