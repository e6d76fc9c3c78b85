//! 录制端接口
//!
//! 每条被接受的运动命令都会镜像给录制端（下游的数据集采集进程）。
//! 发布必须非阻塞：录制端跟不上时丢消息，而不是拖慢控制循环。
//!
//! # 使用示例
//!
//! ```rust
//! use teleop_driver::recorder::{ChannelRecorder, RecorderSink};
//! use teleop_core::{GripperValue, Pose3D, TargetMessage};
//!
//! let (recorder, rx) = ChannelRecorder::new(1024);
//! let dropped = recorder.dropped_messages().clone();
//!
//! recorder.publish(&TargetMessage::new(Pose3D::default(), GripperValue::Open));
//!
//! std::thread::spawn(move || {
//!     while let Ok(msg) = rx.recv() {
//!         println!("{:?}", msg.to_vec());
//!     }
//! });
//! println!("丢了 {} 条", dropped.load(std::sync::atomic::Ordering::Relaxed));
//! ```

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use teleop_core::TargetMessage;
use tracing::warn;

/// 录制端
///
/// - **非阻塞**: 实现必须立即返回
/// - **至多一次**: 丢弃是允许的，重复不允许
pub trait RecorderSink: Send + Sync + 'static {
    fn publish(&self, message: &TargetMessage);
}

/// 基于有界 Channel 的录制端
pub struct ChannelRecorder {
    tx: Sender<TargetMessage>,
    dropped_messages: Arc<AtomicU64>,
    published_messages: Arc<AtomicU64>,
}

impl ChannelRecorder {
    /// 创建录制端
    ///
    /// 返回 `(recorder, rx)`；队列满时新消息被丢弃并计数。
    pub fn new(capacity: usize) -> (Self, Receiver<TargetMessage>) {
        let (tx, rx) = bounded(capacity);
        (
            ChannelRecorder {
                tx,
                dropped_messages: Arc::new(AtomicU64::new(0)),
                published_messages: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// 丢弃计数器
    pub fn dropped_messages(&self) -> &Arc<AtomicU64> {
        &self.dropped_messages
    }

    /// 成功入队计数器
    pub fn published_messages(&self) -> &Arc<AtomicU64> {
        &self.published_messages
    }
}

impl RecorderSink for ChannelRecorder {
    fn publish(&self, message: &TargetMessage) {
        match self.tx.try_send(*message) {
            Ok(()) => {
                self.published_messages.fetch_add(1, Ordering::Relaxed);
            },
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped_messages.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped.is_power_of_two() {
                    warn!("Recorder queue full, {} messages dropped so far", dropped);
                }
            },
            Err(TrySendError::Disconnected(_)) => {
                self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            },
        }
    }
}
