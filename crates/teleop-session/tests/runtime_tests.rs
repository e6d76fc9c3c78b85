//! 事件循环集成测试
//!
//! 通过 `TeleopHandle` 驱动完整控制循环，机器人/执行器/录制端使用 Mock。
//! 全部在 tokio 虚拟时间下运行。

use std::sync::Arc;
use std::time::Duration;
use teleop_core::{AxisMapping, GripperValue, Pose3D, SafetyEnvelope, SensorPose, TeleopConfig};
use teleop_driver::ChannelRecorder;
use teleop_driver::mock::{MockActuator, MockRobot, PoseReply, RobotCallKind, VecRecorder};
use teleop_session::{
    GripperState, RobotConnectionState, SessionPhase, SessionStatus, TeleopHandle, TeleopRuntime,
};

fn config() -> TeleopConfig {
    let mut config = TeleopConfig::default();
    config.mapping.position_axes = AxisMapping::IDENTITY;
    config.envelope =
        SafetyEnvelope::new((-1000.0, 1000.0), (-1000.0, 1000.0), (-1000.0, 1000.0)).unwrap();
    config
}

fn robot() -> MockRobot {
    MockRobot::new(Pose3D::from_array([0.0, 0.0, 0.0, 180.0, 0.0, 90.0]))
}

/// 沿 x 轴移动 `mm` 毫米对应的传感器采样（900 倍增益）
fn sample_x(mm: f64) -> SensorPose {
    SensorPose::at(mm / 900.0, 0.0, 0.0)
}

async fn wait_status(handle: &TeleopHandle, pred: impl Fn(&SessionStatus) -> bool) {
    let mut rx = handle.status_receiver();
    rx.wait_for(|s| pred(s)).await.unwrap();
}

async fn step(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// 等待就绪并完成基准初始化
async fn initialize(handle: &TeleopHandle) {
    wait_status(handle, |s| s.connection == RobotConnectionState::Ready).await;
    handle.send_sample(sample_x(0.0));
    wait_status(handle, |s| {
        matches!(s.phase, SessionPhase::AwaitingSensorBaseline { .. })
    })
    .await;
    handle.send_sample(sample_x(0.0));
    wait_status(handle, |s| s.phase.is_initialized()).await;
}

#[tokio::test(start_paused = true)]
async fn test_handshake_retries_until_ready() {
    let robot = Arc::new(
        robot()
            .with_clear_error_codes([-1, -1])
            .with_enable_codes([-2]),
    );
    let handle = TeleopRuntime::spawn(
        &config(),
        Arc::clone(&robot),
        Arc::new(MockActuator::new()),
        Arc::new(VecRecorder::new()),
    );

    // 未就绪时采样被丢弃，不会请求基准
    handle.send_sample(sample_x(0.0));
    step(10).await;
    assert_eq!(robot.get_pose_count(), 0);

    wait_status(&handle, |s| s.connection == RobotConnectionState::Ready).await;

    let kinds: Vec<_> = robot
        .calls()
        .iter()
        .map(|c| c.kind)
        .filter(|k| matches!(k, RobotCallKind::ClearError | RobotCallKind::Enable))
        .collect();
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

    let times: Vec<_> = robot
        .calls()
        .iter()
        .filter(|c| matches!(c.kind, RobotCallKind::ClearError | RobotCallKind::Enable))
        .map(|c| c.at)
        .collect();
    // 重试间隔为 1s；第三次清错成功后立即使能
    for (i, gap) in times.windows(2).map(|w| w[1] - w[0]).enumerate() {
        if i == 2 {
            assert!(gap < Duration::from_millis(10), "gap {i}: {gap:?}");
        } else {
            assert!(
                gap >= Duration::from_secs(1) && gap < Duration::from_millis(1010),
                "gap {i}: {gap:?}"
            );
        }
    }

    let metrics = handle.metrics();
    assert_eq!(metrics.handshake_retries, 3);
    assert_eq!(metrics.dropped_not_ready, 1);

    handle.shutdown();
    handle.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_filter_scenario_end_to_end() {
    let robot = Arc::new(robot());
    let recorder = Arc::new(VecRecorder::new());
    let handle = TeleopRuntime::spawn(
        &config(),
        Arc::clone(&robot),
        Arc::new(MockActuator::new()),
        Arc::clone(&recorder),
    );
    initialize(&handle).await;

    for mm in [10.0, 15.0, 16.0, 66.0] {
        step(40).await;
        handle.send_sample(sample_x(mm));
    }
    step(40).await;

    let metrics = handle.metrics();
    assert_eq!(metrics.commands_accepted, 2);
    assert_eq!(metrics.rejected_jitter, 1);
    assert_eq!(metrics.rejected_jump, 1);

    let xs: Vec<f64> = recorder
        .messages()
        .iter()
        .map(|m| m.target.position.x)
        .collect();
    assert_eq!(xs.len(), 2);
    approx::assert_relative_eq!(xs[0], 10.0, epsilon = 1e-9);
    approx::assert_relative_eq!(xs[1], 15.0, epsilon = 1e-9);

    let moves = robot.moves();
    assert_eq!(moves.len(), 2);
    approx::assert_relative_eq!(moves[1].position.x, 15.0, epsilon = 1e-9);
    // 姿态保持机器人基准
    assert_eq!(moves[1].orientation, Pose3D::from_array([0.0, 0.0, 0.0, 180.0, 0.0, 90.0]).orientation);

    handle.shutdown();
    handle.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_drops_fast_samples() {
    let handle = TeleopRuntime::spawn(
        &config(),
        Arc::new(robot()),
        Arc::new(MockActuator::new()),
        Arc::new(VecRecorder::new()),
    );
    initialize(&handle).await;

    handle.send_sample(sample_x(10.0));
    step(10).await;
    handle.send_sample(sample_x(20.0));
    step(10).await;
    handle.send_sample(sample_x(30.0));
    step(20).await;
    handle.send_sample(sample_x(30.0));
    step(1).await;

    let metrics = handle.metrics();
    assert_eq!(metrics.dropped_rate_limited, 2);
    assert_eq!(metrics.commands_accepted, 2);

    handle.shutdown();
    handle.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_gripper_cycle_blocks_motion_and_reenables() {
    let robot = Arc::new(robot());
    let actuator = Arc::new(MockActuator::new());
    let recorder = Arc::new(VecRecorder::new());
    let handle = TeleopRuntime::spawn(
        &config(),
        Arc::clone(&robot),
        Arc::clone(&actuator),
        Arc::clone(&recorder),
    );
    initialize(&handle).await;

    handle.send_sample(sample_x(10.0));
    wait_status(&handle, |s| s.last_sent.is_some()).await;

    let signals = handle.signal_sender();
    signals.send(vec![1, 0]).await.unwrap();
    wait_status(&handle, |s| s.gripper == GripperState::Actuating).await;
    assert_eq!(handle.status().gripper_value, GripperValue::Closed);

    // 执行期间的采样和夹爪信号都被拒绝
    step(100).await;
    handle.send_sample(sample_x(20.0));
    signals.send(vec![0, 1]).await.unwrap();
    step(100).await;

    wait_status(&handle, |s| s.gripper == GripperState::Idle).await;
    let status = handle.status();
    assert!(status.last_sent.is_none());

    wait_status(&handle, |s| s.connection == RobotConnectionState::Ready).await;
    assert_eq!(robot.enable_count(), 2);

    let actuations = actuator.actuations();
    assert_eq!(actuations.len(), 1);
    assert_eq!(actuations[0].0, GripperValue::Closed);

    let metrics = handle.metrics();
    assert_eq!(metrics.dropped_gripper_busy, 1);
    assert_eq!(metrics.gripper_triggers, 1);
    assert_eq!(metrics.gripper_rejected, 1);

    // 恢复后远距离目标作为首条命令被接受
    handle.send_sample(sample_x(200.0));
    wait_status(&handle, |s| s.last_sent.is_some()).await;
    let last = recorder.messages().last().copied().unwrap();
    approx::assert_relative_eq!(last.target.position.x, 200.0, epsilon = 1e-9);
    assert_eq!(last.to_vec()[6], 0.0);

    handle.shutdown();
    handle.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_malformed_baseline_then_retry() {
    let robot = Arc::new(robot().with_pose_replies([
        PoseReply::Malformed("{1,2,3}".to_string()),
        PoseReply::Pose(Pose3D::from_array([-300.0, 10.0, 400.0, 180.0, 0.0, 90.0])),
    ]));
    let handle = TeleopRuntime::spawn(
        &config(),
        Arc::clone(&robot),
        Arc::new(MockActuator::new()),
        Arc::new(VecRecorder::new()),
    );
    wait_status(&handle, |s| s.connection == RobotConnectionState::Ready).await;

    handle.send_sample(sample_x(0.0));
    step(10).await;
    assert_eq!(handle.status().phase, SessionPhase::Uninitialized);
    assert_eq!(handle.metrics().baseline_failures, 1);

    handle.send_sample(sample_x(0.0));
    wait_status(&handle, |s| {
        matches!(s.phase, SessionPhase::AwaitingSensorBaseline { .. })
    })
    .await;
    assert_eq!(robot.get_pose_count(), 2);
    match handle.status().phase {
        SessionPhase::AwaitingSensorBaseline { robot } => {
            assert_eq!(robot.to_array(), [-300.0, 10.0, 400.0, 180.0, 0.0, 90.0]);
        },
        other => panic!("unexpected phase {other}"),
    }

    handle.shutdown();
    handle.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_baseline_request_timeout_is_retried() {
    let robot = Arc::new(robot().with_pose_replies([PoseReply::Hang]));
    let handle = TeleopRuntime::spawn(
        &config(),
        Arc::clone(&robot),
        Arc::new(MockActuator::new()),
        Arc::new(VecRecorder::new()),
    );
    wait_status(&handle, |s| s.connection == RobotConnectionState::Ready).await;

    handle.send_sample(sample_x(0.0));
    wait_status(&handle, |s| s.phase == SessionPhase::AwaitingRobotBaseline).await;
    // 调用超时 2s 后回到 Uninitialized
    wait_status(&handle, |s| s.phase == SessionPhase::Uninitialized).await;

    handle.send_sample(sample_x(0.0));
    wait_status(&handle, |s| {
        matches!(s.phase, SessionPhase::AwaitingSensorBaseline { .. })
    })
    .await;
    assert_eq!(robot.get_pose_count(), 2);

    handle.shutdown();
    handle.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reset_baseline_reinitializes() {
    let robot = Arc::new(robot());
    let handle = TeleopRuntime::spawn(
        &config(),
        Arc::clone(&robot),
        Arc::new(MockActuator::new()),
        Arc::new(VecRecorder::new()),
    );
    initialize(&handle).await;
    handle.send_sample(sample_x(10.0));
    wait_status(&handle, |s| s.last_sent.is_some()).await;

    handle.reset_baseline();
    wait_status(&handle, |s| s.phase == SessionPhase::Uninitialized).await;
    assert!(handle.status().last_sent.is_none());

    step(40).await;
    handle.send_sample(sample_x(10.0));
    wait_status(&handle, |s| {
        matches!(s.phase, SessionPhase::AwaitingSensorBaseline { .. })
    })
    .await;
    assert_eq!(robot.get_pose_count(), 2);

    handle.shutdown();
    handle.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_channel_recorder_receives_vectors() {
    let (recorder, rx) = ChannelRecorder::new(16);
    let recorder = Arc::new(recorder);
    let handle = TeleopRuntime::spawn(
        &config(),
        Arc::new(robot()),
        Arc::new(MockActuator::new()),
        Arc::clone(&recorder),
    );
    initialize(&handle).await;

    handle.send_sample(sample_x(10.0));
    step(40).await;
    handle.send_sample(sample_x(20.0));
    step(40).await;

    let vectors: Vec<[f32; 7]> = rx.try_iter().map(|m| m.to_vec()).collect();
    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0][0], 10.0);
    assert_eq!(vectors[1][0], 20.0);
    assert_eq!(&vectors[1][3..], &[180.0, 0.0, 90.0, 1.0]);

    handle.shutdown();
    handle.join().await.unwrap();
}
