//! Replay 图像源
//!
//! 从录制目录回放双目序列：
//!
//! ```text
//! <root>/calibration.json   {"left": CameraInfo, "right": CameraInfo}
//! <root>/frames.jsonl       {"timestamp": 0.0, "left": "left/000000.png", "right": "right/000000.png"}
//! ```
//!
//! 图像路径相对于 `<root>`。任何 `image` 支持的格式均可，解码后转换为 mono8。

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_channel::{bounded, Receiver, Sender};
use bytes::Bytes;
use contracts::{CameraInfo, MonoImage, PixelEncoding, ReplaySourceConfig, StereoFrame};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::{BackpressureConfig, DropPolicy, IngestionMetrics};
use crate::convert::to_mono8;
use crate::error::{IngestionError, Result};
use crate::mock::send_frame;

const SOURCE_NAME: &str = "replay";
const CALIBRATION_FILE: &str = "calibration.json";
const INDEX_FILE: &str = "frames.jsonl";

/// Calibration stored alongside a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedCalibration {
    pub left: CameraInfo,
    pub right: CameraInfo,
}

/// One line of `frames.jsonl`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEntry {
    pub timestamp: f64,
    pub left: PathBuf,
    pub right: PathBuf,
}

#[derive(Debug)]
struct ReplayIndex {
    root: PathBuf,
    calibration: RecordedCalibration,
    entries: Vec<FrameEntry>,
}

/// Replay 图像源
pub struct ReplaySource {
    index: Arc<ReplayIndex>,
    config: ReplaySourceConfig,
    running: Arc<AtomicBool>,
}

impl ReplaySource {
    /// 打开录制目录，读取标定与帧索引 (图像延迟加载)
    #[instrument(name = "replay_open", skip(config), fields(path = %config.path.display()))]
    pub fn open(config: ReplaySourceConfig) -> Result<Self> {
        let root = config.path.clone();
        let calibration = read_calibration(&root.join(CALIBRATION_FILE))?;
        let entries = read_index(&root.join(INDEX_FILE))?;

        info!(frames = entries.len(), "replay sequence opened");
        Ok(Self {
            index: Arc::new(ReplayIndex {
                root,
                calibration,
                entries,
            }),
            config,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// 帧数
    pub fn len(&self) -> usize {
        self.index.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.entries.is_empty()
    }

    pub fn calibration(&self) -> &RecordedCalibration {
        &self.index.calibration
    }

    /// 同步加载第 `index` 帧
    pub fn load_frame(&self, index: usize) -> Result<StereoFrame> {
        self.index.load(index, index as u64, 0.0)
    }

    /// 启动回放，返回数据流接收端
    ///
    /// 回放按录制时间间隔除以 `speed_multiplier` 节流 (0 表示不限速)。
    /// 循环回放时时间戳持续递增。
    pub fn start(
        &self,
        backpressure: BackpressureConfig,
        metrics: Option<Arc<IngestionMetrics>>,
    ) -> Receiver<StereoFrame> {
        let (tx, rx) = bounded(backpressure.channel_capacity.max(1));
        let metrics = metrics.unwrap_or_else(|| Arc::new(IngestionMetrics::new()));
        let index = Arc::clone(&self.index);
        let running = Arc::clone(&self.running);
        let speed = self.config.speed_multiplier;
        let loop_playback = self.config.loop_playback;

        running.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            run(
                index,
                tx,
                backpressure.drop_policy,
                metrics,
                running.clone(),
                speed,
                loop_playback,
            )
            .await;
            running.store(false, Ordering::SeqCst);
        });

        rx
    }

    /// 停止回放
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// 检查是否正在运行
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

async fn run(
    index: Arc<ReplayIndex>,
    tx: Sender<StereoFrame>,
    policy: DropPolicy,
    metrics: Arc<IngestionMetrics>,
    running: Arc<AtomicBool>,
    speed: f64,
    loop_playback: bool,
) {
    let total = index.entries.len();
    if total == 0 {
        warn!("replay sequence is empty");
        return;
    }

    let period = index.loop_period();
    let mut sequence: u64 = 0;
    let mut offset = 0.0;
    let mut previous: Option<f64> = None;

    'outer: loop {
        for i in 0..total {
            if !running.load(Ordering::Relaxed) {
                break 'outer;
            }

            let timestamp = index.entries[i].timestamp + offset;
            if speed > 0.0 {
                if let Some(prev) = previous {
                    let wait = (timestamp - prev) / speed;
                    if wait > 0.0 {
                        tokio::time::sleep(Duration::from_secs_f64(wait)).await;
                    }
                }
            }
            previous = Some(timestamp);

            let loader = Arc::clone(&index);
            let seq = sequence;
            let loaded = tokio::task::spawn_blocking(move || loader.load(i, seq, offset)).await;
            sequence += 1;

            let frame = match loaded {
                Ok(Ok(frame)) => frame,
                Ok(Err(e)) => {
                    metrics.record_decode_error();
                    warn!(index = i, error = %e, "skipping unreadable replay frame");
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "replay loader task failed");
                    break 'outer;
                }
            };

            if !send_frame(&tx, frame, policy, &metrics, SOURCE_NAME).await {
                debug!("replay channel closed");
                break 'outer;
            }
        }

        if !loop_playback {
            break;
        }
        offset += period;
        debug!(offset, "replay looping");
    }

    debug!(frames = sequence, "replay finished");
}

impl ReplayIndex {
    fn load(&self, index: usize, sequence: u64, time_offset: f64) -> Result<StereoFrame> {
        let entry = self.entries.get(index).ok_or_else(|| {
            IngestionError::format(format!(
                "frame {index} out of range ({} frames)",
                self.entries.len()
            ))
        })?;

        Ok(StereoFrame {
            sequence,
            timestamp: entry.timestamp + time_offset,
            left: load_image(&self.root.join(&entry.left))?,
            right: load_image(&self.root.join(&entry.right))?,
            left_info: self.calibration.left.clone(),
            right_info: self.calibration.right.clone(),
        })
    }

    /// Time shift applied per loop so stamps keep increasing
    fn loop_period(&self) -> f64 {
        let (Some(first), Some(last)) = (self.entries.first(), self.entries.last()) else {
            return 0.0;
        };
        let span = last.timestamp - first.timestamp;
        let n = self.entries.len();
        let step = if n > 1 { span / (n - 1) as f64 } else { 0.1 };
        span + step
    }
}

/// Decode an image file into mono8
pub fn load_image(path: &Path) -> Result<MonoImage> {
    let decoded = image::open(path).map_err(|e| IngestionError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match decoded {
        DynamicImage::ImageLuma8(gray) => {
            let (width, height) = gray.dimensions();
            Ok(MonoImage::mono8(width, height, Bytes::from(gray.into_raw())))
        }
        other => {
            let rgba = other.to_rgba8();
            let (width, height) = rgba.dimensions();
            to_mono8(&MonoImage {
                width,
                height,
                step: width * 4,
                encoding: PixelEncoding::Rgba8,
                data: Bytes::from(rgba.into_raw()),
            })
        }
    }
}

fn read_calibration(path: &Path) -> Result<RecordedCalibration> {
    let content = fs::read_to_string(path).map_err(|e| IngestionError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| IngestionError::Manifest {
        path: path.to_path_buf(),
        line: e.line(),
        message: e.to_string(),
    })
}

fn read_index(path: &Path) -> Result<Vec<FrameEntry>> {
    let file = fs::File::open(path).map_err(|e| IngestionError::io(path, e))?;
    let mut entries = Vec::new();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| IngestionError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: FrameEntry =
            serde_json::from_str(&line).map_err(|e| IngestionError::Manifest {
                path: path.to_path_buf(),
                line: idx + 1,
                message: e.to_string(),
            })?;
        if let Some(prev) = entries.last().map(|p: &FrameEntry| p.timestamp) {
            if entry.timestamp < prev {
                return Err(IngestionError::Manifest {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    message: format!("timestamp {} goes backwards (previous {prev})", entry.timestamp),
                });
            }
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Write frames as a replayable sequence (PNG images + index + calibration).
pub fn record_sequence(root: &Path, frames: &[StereoFrame]) -> Result<()> {
    let Some(first) = frames.first() else {
        return Err(IngestionError::format("cannot record an empty sequence"));
    };

    for side in ["left", "right"] {
        let dir = root.join(side);
        fs::create_dir_all(&dir).map_err(|e| IngestionError::io(&dir, e))?;
    }

    let calibration = RecordedCalibration {
        left: first.left_info.clone(),
        right: first.right_info.clone(),
    };
    let calibration_path = root.join(CALIBRATION_FILE);
    let json = serde_json::to_string_pretty(&calibration)
        .map_err(|e| IngestionError::format(e.to_string()))?;
    fs::write(&calibration_path, json).map_err(|e| IngestionError::io(&calibration_path, e))?;

    let index_path = root.join(INDEX_FILE);
    let file = fs::File::create(&index_path).map_err(|e| IngestionError::io(&index_path, e))?;
    let mut writer = BufWriter::new(file);

    for (i, frame) in frames.iter().enumerate() {
        let entry = FrameEntry {
            timestamp: frame.timestamp,
            left: PathBuf::from(format!("left/{i:06}.png")),
            right: PathBuf::from(format!("right/{i:06}.png")),
        };
        save_mono8(&root.join(&entry.left), &frame.left)?;
        save_mono8(&root.join(&entry.right), &frame.right)?;

        let line = serde_json::to_string(&entry).map_err(|e| IngestionError::format(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| IngestionError::io(&index_path, e))?;
    }
    writer.flush().map_err(|e| IngestionError::io(&index_path, e))?;
    Ok(())
}

fn save_mono8(path: &Path, image: &MonoImage) -> Result<()> {
    let packed = to_mono8(image)?;
    let gray = image::GrayImage::from_raw(packed.width, packed.height, packed.data.to_vec())
        .ok_or_else(|| IngestionError::format("image buffer smaller than its dimensions"))?;
    gray.save(path).map_err(|e| IngestionError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
