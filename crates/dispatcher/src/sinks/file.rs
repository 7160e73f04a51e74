//! FileSink - writes odometry records to disk
//!
//! 目录结构:
//! - `odometry.jsonl` / `pose.jsonl` / `transform.jsonl`: 每个订阅通道一行一条记录
//! - `trajectory.txt`: TUM 格式轨迹 (`stamp x y z qx qy qz qw`)，随 pose 通道写出

use contracts::{ContractError, DataSink, OdometryOutput, OutputChannel, Pose};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::channels::ChannelSet;

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
    /// Write the TUM trajectory file
    pub trajectory: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));
        let trajectory = params
            .get("trajectory")
            .map(|v| v != "false")
            .unwrap_or(true);

        Self {
            base_path,
            trajectory,
        }
    }
}

/// Sink that appends odometry records to files
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    odometry: Option<BufWriter<File>>,
    pose: Option<BufWriter<File>>,
    transform: Option<BufWriter<File>>,
    trajectory: Option<BufWriter<File>>,
}

impl FileSink {
    /// Create a new FileSink, truncating any previous output
    pub fn new(
        name: impl Into<String>,
        config: FileSinkConfig,
        channels: ChannelSet,
    ) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        let base = config.base_path.as_path();
        let open_if = |enabled: bool, file: &str| -> std::io::Result<Option<BufWriter<File>>> {
            if enabled {
                Ok(Some(create_writer(&base.join(file))?))
            } else {
                Ok(None)
            }
        };

        let odometry = open_if(channels.contains(OutputChannel::Odometry), "odometry.jsonl")?;
        let pose = open_if(channels.contains(OutputChannel::Pose), "pose.jsonl")?;
        let transform = open_if(channels.contains(OutputChannel::Transform), "transform.jsonl")?;
        let trajectory = open_if(
            config.trajectory && channels.contains(OutputChannel::Pose),
            "trajectory.txt",
        )?;

        Ok(Self {
            name: name.into(),
            config,
            odometry,
            pose,
            transform,
            trajectory,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
        channels: ChannelSet,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config, channels)
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    fn write_output(&mut self, output: &OdometryOutput) -> std::io::Result<()> {
        if let Some(writer) = self.odometry.as_mut() {
            write_json_line(writer, &output.odometry)?;
        }
        if let Some(writer) = self.pose.as_mut() {
            write_json_line(writer, &output.pose)?;
        }
        if let (Some(writer), Some(tf)) = (self.transform.as_mut(), output.transform.as_ref()) {
            write_json_line(writer, tf)?;
        }
        if let Some(writer) = self.trajectory.as_mut() {
            write_tum_line(writer, output.pose.header.stamp, &output.pose.pose)?;
        }
        Ok(())
    }

    fn writers(&mut self) -> impl Iterator<Item = &mut BufWriter<File>> + '_ {
        [
            self.odometry.as_mut(),
            self.pose.as_mut(),
            self.transform.as_mut(),
            self.trajectory.as_mut(),
        ]
        .into_iter()
        .flatten()
    }
}

fn create_writer(path: &Path) -> std::io::Result<BufWriter<File>> {
    debug!(path = %path.display(), "Opening output file");
    Ok(BufWriter::new(File::create(path)?))
}

fn write_json_line<T: Serialize>(writer: &mut BufWriter<File>, record: &T) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, record)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writer.write_all(b"\n")
}

/// `timestamp tx ty tz qx qy qz qw`
fn write_tum_line(writer: &mut BufWriter<File>, stamp: f64, pose: &Pose) -> std::io::Result<()> {
    let p = &pose.position;
    let q = &pose.orientation;
    writeln!(
        writer,
        "{:.6} {:.9} {:.9} {:.9} {:.9} {:.9} {:.9} {:.9}",
        stamp, p.x, p.y, p.z, q.x, q.y, q.z, q.w
    )
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, output),
        fields(sink = %self.name, sequence = output.sequence)
    )]
    async fn write(&mut self, output: &OdometryOutput) -> Result<(), ContractError> {
        self.write_output(output)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        for writer in self.writers() {
            writer.flush()?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        self.odometry = None;
        self.pose = None;
        self.transform = None;
        self.trajectory = None;
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_output;
    use contracts::{Odometry, TransformStamped};
    use tempfile::tempdir;

    fn sink_in(dir: &Path, channels: ChannelSet) -> FileSink {
        let config = FileSinkConfig {
            base_path: dir.to_path_buf(),
            trajectory: true,
        };
        FileSink::new("test_file", config, channels).unwrap()
    }

    #[tokio::test]
    async fn test_file_sink_writes_all_channels() {
        let dir = tempdir().unwrap();
        let mut sink = sink_in(dir.path(), ChannelSet::all());

        for i in 0..3 {
            sink.write(&sample_output(i, i != 1)).await.unwrap();
        }
        sink.close().await.unwrap();

        let odometry = fs::read_to_string(dir.path().join("odometry.jsonl")).unwrap();
        let records: Vec<Odometry> = odometry
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].header.frame_id, "odom");
        assert_eq!(records[2].twist_covariance.len(), 36);

        let transforms = fs::read_to_string(dir.path().join("transform.jsonl")).unwrap();
        let transforms: Vec<TransformStamped> = transforms
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(transforms.len(), 2);

        let pose = fs::read_to_string(dir.path().join("pose.jsonl")).unwrap();
        assert_eq!(pose.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_file_sink_trajectory_is_tum() {
        let dir = tempdir().unwrap();
        let mut sink = sink_in(dir.path(), ChannelSet::from_channels(&[OutputChannel::Pose]));

        sink.write(&sample_output(2, false)).await.unwrap();
        sink.close().await.unwrap();

        let trajectory = fs::read_to_string(dir.path().join("trajectory.txt")).unwrap();
        let fields: Vec<f64> = trajectory
            .trim()
            .split(' ')
            .map(|f| f.parse().unwrap())
            .collect();
        assert_eq!(fields.len(), 8);
        assert!((fields[0] - 0.2).abs() < 1e-9);
        assert!((fields[1] - 0.2).abs() < 1e-9);
        assert_eq!(fields[7], 1.0);

        assert!(!dir.path().join("odometry.jsonl").exists());
        assert!(!dir.path().join("transform.jsonl").exists());
    }

    #[test]
    fn test_file_sink_config_defaults() {
        let config = FileSinkConfig::from_params(&HashMap::new());
        assert_eq!(config.base_path, PathBuf::from("./output"));
        assert!(config.trajectory);

        let mut params = HashMap::new();
        params.insert("trajectory".to_string(), "false".to_string());
        assert!(!FileSinkConfig::from_params(&params).trajectory);
    }
}
