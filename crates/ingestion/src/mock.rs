//! Mock 双目图像源
//!
//! 生成带纹理的合成图像对，用于无相机环境的测试。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use bytes::Bytes;
use contracts::{CameraInfo, MockSourceConfig, MonoImage, StereoFrame};
use tracing::{debug, trace};

use crate::config::{BackpressureConfig, DropPolicy, IngestionMetrics};

const SOURCE_NAME: &str = "mock";

/// Horizontal texture shift per frame (pixels)
const SHIFT_PER_FRAME: u32 = 2;

/// Disparity between left and right images (pixels)
const DISPARITY: u32 = 8;

/// Mock 双目图像源
///
/// 时间戳由帧序号和频率推导 (`sequence / frequency_hz`)，不依赖墙钟。
pub struct MockStereoSource {
    config: MockSourceConfig,
    left_info: CameraInfo,
    right_info: CameraInfo,
    running: Arc<AtomicBool>,
}

impl MockStereoSource {
    /// 创建新的 Mock 源
    pub fn new(config: MockSourceConfig) -> Self {
        let (mut left_info, mut right_info) = config.camera_infos();
        left_info.frame_id = "/camera_left".into();
        right_info.frame_id = "/camera_right".into();

        Self {
            config,
            left_info,
            right_info,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 生成第 `sequence` 帧 (纯函数，便于测试)
    pub fn frame(&self, sequence: u64) -> StereoFrame {
        let width = self.config.intrinsics.width;
        let height = self.config.intrinsics.height;
        let shift = (sequence as u32).wrapping_mul(SHIFT_PER_FRAME);

        StereoFrame {
            sequence,
            timestamp: sequence as f64 / self.config.frequency_hz,
            left: textured(width, height, shift),
            right: textured(width, height, shift.wrapping_add(DISPARITY)),
            left_info: self.left_info.clone(),
            right_info: self.right_info.clone(),
        }
    }

    /// 启动 Mock 源，返回数据流接收端
    ///
    /// 达到 `frame_count` 或调用 [`stop`](Self::stop) 后通道关闭。
    pub fn start(
        &self,
        backpressure: BackpressureConfig,
        metrics: Option<Arc<IngestionMetrics>>,
    ) -> Receiver<StereoFrame> {
        let (tx, rx) = bounded(backpressure.channel_capacity.max(1));
        let metrics = metrics.unwrap_or_else(|| Arc::new(IngestionMetrics::new()));
        let source = Self {
            config: self.config.clone(),
            left_info: self.left_info.clone(),
            right_info: self.right_info.clone(),
            running: self.running.clone(),
        };

        self.running.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            source.run(tx, backpressure.drop_policy, metrics).await;
        });

        rx
    }

    async fn run(self, tx: Sender<StereoFrame>, policy: DropPolicy, metrics: Arc<IngestionMetrics>) {
        let interval = Duration::from_secs_f64(1.0 / self.config.frequency_hz);
        let mut ticker = tokio::time::interval(interval);
        let mut sequence: u64 = 0;

        debug!(
            frequency_hz = self.config.frequency_hz,
            width = self.config.intrinsics.width,
            height = self.config.intrinsics.height,
            frame_count = ?self.config.frame_count,
            "mock stereo source started"
        );

        while self.running.load(Ordering::Relaxed) {
            if self.config.frame_count.is_some_and(|limit| sequence >= limit) {
                break;
            }
            ticker.tick().await;

            let frame = self.frame(sequence);
            sequence += 1;

            if !send_frame(&tx, frame, policy, &metrics, SOURCE_NAME).await {
                debug!("mock stereo channel closed");
                break;
            }
            trace!(sequence, "mock stereo frame sent");
        }

        self.running.store(false, Ordering::SeqCst);
        debug!(frames = sequence, "mock stereo source stopped");
    }

    /// 停止 Mock 源
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// 检查是否正在运行
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// Send one frame under the given policy. Returns `false` once the
/// receiver is gone.
pub(crate) async fn send_frame(
    tx: &Sender<StereoFrame>,
    frame: StereoFrame,
    policy: DropPolicy,
    metrics: &IngestionMetrics,
    source: &'static str,
) -> bool {
    let sequence = frame.sequence;
    let sent = match policy {
        DropPolicy::Block => tx.send(frame).await.map_err(|_| ()),
        DropPolicy::DropNewest => match tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                metrics.record_dropped(source);
                trace!(sequence, "frame dropped (channel full)");
                return true;
            }
            Err(TrySendError::Closed(_)) => Err(()),
        },
    };

    match sent {
        Ok(()) => {
            metrics.record_emitted(source);
            metrics.update_queue_len(tx.len());
            true
        }
        Err(()) => false,
    }
}

/// Diagonal stripe texture with a block pattern, shifted horizontally.
fn textured(width: u32, height: u32, shift: u32) -> MonoImage {
    let mut data = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let u = x.wrapping_add(shift);
            let stripe = (u.wrapping_add(y) % 32) * 4;
            let block = if ((u / 16) + (y / 16)) % 2 == 0 { 64 } else { 0 };
            data.push((stripe + block).min(255) as u8);
        }
    }
    MonoImage::mono8(width, height, Bytes::from(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CameraIntrinsics, PixelEncoding};

    fn config(frame_count: Option<u64>) -> MockSourceConfig {
        MockSourceConfig {
            frequency_hz: 200.0,
            frame_count,
            intrinsics: CameraIntrinsics {
                fx: 100.0,
                fy: 100.0,
                cx: 16.0,
                cy: 12.0,
                width: 32,
                height: 24,
            },
            baseline: 0.1,
        }
    }

    #[test]
    fn test_frame_layout() {
        let source = MockStereoSource::new(config(None));
        let frame = source.frame(4);

        assert_eq!(frame.sequence, 4);
        assert!((frame.timestamp - 0.02).abs() < 1e-12);
        assert_eq!(frame.left.encoding, PixelEncoding::Mono8);
        assert_eq!(frame.left.data.len(), 32 * 24);
        assert_eq!(frame.right.step, 32);
        assert!((frame.right_info.tx + 10.0).abs() < 1e-12);
        assert_eq!(frame.left_info.tx, 0.0);
        assert_ne!(frame.left.data, frame.right.data);
    }

    #[test]
    fn test_texture_moves_between_frames() {
        let source = MockStereoSource::new(config(None));
        assert_ne!(source.frame(0).left.data, source.frame(1).left.data);
    }

    #[tokio::test]
    async fn test_frame_count_closes_channel() {
        let source = MockStereoSource::new(config(Some(3)));
        let metrics = Arc::new(IngestionMetrics::new());
        let rx = source.start(
            BackpressureConfig::new(8, DropPolicy::Block),
            Some(metrics.clone()),
        );

        let mut sequences = Vec::new();
        while let Ok(frame) = rx.recv().await {
            sequences.push(frame.sequence);
        }
        assert_eq!(sequences, vec![0, 1, 2]);
        assert_eq!(metrics.snapshot().frames_emitted, 3);
        assert!(!source.is_running());
    }

    #[tokio::test]
    async fn test_stop_ends_stream() {
        let source = MockStereoSource::new(config(None));
        let rx = source.start(BackpressureConfig::default(), None);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.sequence, 0);
        source.stop();

        // drains whatever was queued, then closes
        let mut remaining = 0;
        while rx.recv().await.is_ok() {
            remaining += 1;
            assert!(remaining < 1000);
        }
    }
}
