//! 连接握手状态机
//!
//! ```text
//! Disconnected ──start──▶ ClearingError ──ok──▶ Enabling ──ok──▶ Ready
//!                          │    ▲                │    ▲            │
//!                          └fail┘ (固定间隔重试)  └fail┘           │
//!                                                     ▲            │
//!                                                     └─restart_enable (夹爪执行后)
//! ```
//!
//! 所有非成功结果（错误码、超时、IO 错误）一律按可重试处理，无重试上限。

use crate::event::{EventSender, TeleopEvent};
use crate::guard::PendingRequest;
use crate::metrics::SessionMetrics;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use teleop_driver::{DriverError, ResultCode, RobotDriver};
use tracing::{debug, info, warn};

/// 控制器连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RobotConnectionState {
    #[default]
    Disconnected,
    ClearingError,
    Enabling,
    Ready,
}

impl fmt::Display for RobotConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RobotConnectionState::Disconnected => "Disconnected",
            RobotConnectionState::ClearingError => "ClearingError",
            RobotConnectionState::Enabling => "Enabling",
            RobotConnectionState::Ready => "Ready",
        };
        f.write_str(name)
    }
}

/// 清错 → 使能 握手
pub struct ConnectionHandshake<D> {
    driver: Arc<D>,
    events: EventSender,
    metrics: Arc<SessionMetrics>,
    retry_delay: Duration,
    call_timeout: Duration,
    state: RobotConnectionState,
    /// 覆盖"请求在途"和"重试定时器等待中"两段
    pending: PendingRequest,
    clear_error_attempts: u32,
    enable_attempts: u32,
}

impl<D: RobotDriver> ConnectionHandshake<D> {
    pub fn new(
        driver: Arc<D>,
        events: EventSender,
        metrics: Arc<SessionMetrics>,
        retry_delay: Duration,
        call_timeout: Duration,
    ) -> Self {
        ConnectionHandshake {
            driver,
            events,
            metrics,
            retry_delay,
            call_timeout,
            state: RobotConnectionState::Disconnected,
            pending: PendingRequest::new(),
            clear_error_attempts: 0,
            enable_attempts: 0,
        }
    }

    pub fn state(&self) -> RobotConnectionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == RobotConnectionState::Ready
    }

    /// 当前阶段的尝试次数（清错, 使能）
    pub fn attempts(&self) -> (u32, u32) {
        (self.clear_error_attempts, self.enable_attempts)
    }

    /// 开始握手（已在进行中则忽略）
    pub fn start(&mut self) {
        if self.state != RobotConnectionState::Disconnected {
            debug!("Handshake already running ({})", self.state);
            return;
        }
        self.attempt_clear_error();
    }

    /// 发起一次清错
    pub fn attempt_clear_error(&mut self) {
        if !self.pending.begin() {
            debug!("ClearError already in flight");
            return;
        }
        self.state = RobotConnectionState::ClearingError;
        self.clear_error_attempts += 1;
        debug!("ClearError attempt #{}", self.clear_error_attempts);

        let driver = Arc::clone(&self.driver);
        self.events.spawn_call(
            self.call_timeout,
            async move { driver.clear_error().await },
            TeleopEvent::ClearErrorResult,
        );
    }

    /// 发起一次使能
    pub fn attempt_enable(&mut self) {
        if !self.pending.begin() {
            debug!("EnableRobot already in flight");
            return;
        }
        self.state = RobotConnectionState::Enabling;
        self.enable_attempts += 1;
        debug!("EnableRobot attempt #{}", self.enable_attempts);

        let driver = Arc::clone(&self.driver);
        self.events.spawn_call(
            self.call_timeout,
            async move { driver.enable().await },
            TeleopEvent::EnableResult,
        );
    }

    /// 重新执行使能步骤（夹爪执行后恢复控制器）
    ///
    /// 握手尚未完成时不做任何事，进行中的流程会自行到达 Ready。
    pub fn restart_enable(&mut self) {
        if self.state != RobotConnectionState::Ready {
            debug!("Handshake in progress ({}), not restarting enable", self.state);
            return;
        }
        self.enable_attempts = 0;
        self.attempt_enable();
    }

    /// 清错结果
    pub fn on_clear_error_result(&mut self, result: Result<ResultCode, DriverError>) {
        if self.state != RobotConnectionState::ClearingError {
            debug!("Ignoring stale ClearError result in state {}", self.state);
            return;
        }
        self.pending.finish();

        match result {
            Ok(code) if code.is_success() => {
                info!(
                    "Controller error cleared after {} attempt(s)",
                    self.clear_error_attempts
                );
                self.attempt_enable();
            },
            other => {
                warn!(
                    "ClearError attempt #{} failed ({}), retrying in {:?}",
                    self.clear_error_attempts,
                    describe_failure(&other),
                    self.retry_delay
                );
                self.schedule_retry(TeleopEvent::RetryClearError);
            },
        }
    }

    /// 使能结果
    pub fn on_enable_result(&mut self, result: Result<ResultCode, DriverError>) {
        if self.state != RobotConnectionState::Enabling {
            debug!("Ignoring stale EnableRobot result in state {}", self.state);
            return;
        }
        self.pending.finish();

        match result {
            Ok(code) if code.is_success() => {
                self.state = RobotConnectionState::Ready;
                info!("Robot enabled after {} attempt(s)", self.enable_attempts);
            },
            other => {
                warn!(
                    "EnableRobot attempt #{} failed ({}), retrying in {:?}",
                    self.enable_attempts,
                    describe_failure(&other),
                    self.retry_delay
                );
                self.schedule_retry(TeleopEvent::RetryEnable);
            },
        }
    }

    /// 重试定时器到期
    pub fn on_retry(&mut self, event: &TeleopEvent) {
        self.pending.finish();
        match event {
            TeleopEvent::RetryClearError => self.attempt_clear_error(),
            TeleopEvent::RetryEnable => self.attempt_enable(),
            _ => {},
        }
    }

    fn schedule_retry(&mut self, event: TeleopEvent) {
        SessionMetrics::incr(&self.metrics.handshake_retries);
        // 等待期间保持占用，避免重复发起
        self.pending.hold();
        self.events.send_after(self.retry_delay, event);
    }
}

fn describe_failure(result: &Result<ResultCode, DriverError>) -> String {
    match result {
        Ok(code) => format!("result code {code}"),
        Err(e) => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teleop_core::Pose3D;
    use teleop_driver::mock::{MockRobot, RobotCallKind};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn handshake(robot: MockRobot) -> (
        ConnectionHandshake<MockRobot>,
        Arc<MockRobot>,
        UnboundedReceiver<TeleopEvent>,
    ) {
        let robot = Arc::new(robot);
        let (events, rx) = EventSender::channel();
        let hs = ConnectionHandshake::new(
            Arc::clone(&robot),
            events,
            Arc::new(SessionMetrics::new()),
            Duration::from_secs(1),
            Duration::from_secs(2),
        );
        (hs, robot, rx)
    }

    /// 把事件喂回状态机，直到 Ready
    async fn drive_until_ready(
        hs: &mut ConnectionHandshake<MockRobot>,
        rx: &mut UnboundedReceiver<TeleopEvent>,
    ) {
        while !hs.is_ready() {
            match rx.recv().await.unwrap() {
                TeleopEvent::ClearErrorResult(r) => hs.on_clear_error_result(r),
                TeleopEvent::EnableResult(r) => hs.on_enable_result(r),
                retry @ (TeleopEvent::RetryClearError | TeleopEvent::RetryEnable) => {
                    hs.on_retry(&retry)
                },
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path() {
        let (mut hs, robot, mut rx) = handshake(MockRobot::new(Pose3D::default()));
        hs.start();
        assert_eq!(hs.state(), RobotConnectionState::ClearingError);

        drive_until_ready(&mut hs, &mut rx).await;
        assert_eq!(hs.attempts(), (1, 1));
        assert_eq!(robot.clear_error_count(), 1);
        assert_eq!(robot.enable_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_fixed_backoff() {
        let robot = MockRobot::new(Pose3D::default())
            .with_clear_error_codes([-1, -1])
            .with_enable_codes([-2]);
        let (mut hs, robot, mut rx) = handshake(robot);
        hs.start();
        drive_until_ready(&mut hs, &mut rx).await;

        assert_eq!(hs.attempts(), (3, 2));
        assert_eq!(hs.metrics.snapshot().handshake_retries, 3);
        // 重试等待不计入请求数
        assert_eq!(hs.pending.issued(), 5);

        let calls = robot.calls();
        let kinds: Vec<_> = calls.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RobotCallKind::ClearError,
                RobotCallKind::ClearError,
                RobotCallKind::ClearError,
                RobotCallKind::Enable,
                RobotCallKind::Enable,
            ]
        );

        let clears = robot.call_times(|k| matches!(k, RobotCallKind::ClearError));
        for pair in clears.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_secs(1) && gap < Duration::from_millis(1010));
        }
        let enables = robot.call_times(|k| matches!(k, RobotCallKind::Enable));
        let gap = enables[1] - enables[0];
        assert!(gap >= Duration::from_secs(1) && gap < Duration::from_millis(1010));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_start_ignored() {
        let (mut hs, robot, mut rx) = handshake(MockRobot::new(Pose3D::default()));
        hs.start();
        hs.start();
        hs.attempt_clear_error();
        drive_until_ready(&mut hs, &mut rx).await;
        assert_eq!(robot.clear_error_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retried() {
        let robot = MockRobot::new(Pose3D::default()).with_latency(Duration::from_secs(3));
        let (mut hs, robot, mut rx) = handshake(robot);
        hs.start();

        match rx.recv().await.unwrap() {
            TeleopEvent::ClearErrorResult(r) => {
                assert!(matches!(r, Err(DriverError::Timeout)));
                hs.on_clear_error_result(r);
            },
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(hs.state(), RobotConnectionState::ClearingError);
        assert!(matches!(rx.recv().await.unwrap(), TeleopEvent::RetryClearError));
        assert_eq!(robot.clear_error_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_enable_only_when_ready() {
        let (mut hs, robot, mut rx) = handshake(MockRobot::new(Pose3D::default()));
        hs.restart_enable();
        assert_eq!(hs.state(), RobotConnectionState::Disconnected);

        hs.start();
        drive_until_ready(&mut hs, &mut rx).await;

        hs.restart_enable();
        assert_eq!(hs.state(), RobotConnectionState::Enabling);
        drive_until_ready(&mut hs, &mut rx).await;
        assert_eq!(robot.clear_error_count(), 1);
        assert_eq!(robot.enable_count(), 2);
    }
}
