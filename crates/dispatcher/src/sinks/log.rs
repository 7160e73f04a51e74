//! LogSink - logs odometry summary via tracing

use contracts::{ContractError, DataSink, OdometryOutput, OutputChannel};
use tracing::{info, instrument};

use crate::channels::ChannelSet;

/// Sink that logs pose and velocity summaries for debugging
pub struct LogSink {
    name: String,
    channels: ChannelSet,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>, channels: ChannelSet) -> Self {
        Self {
            name: name.into(),
            channels,
        }
    }

    fn log_output_summary(&self, output: &OdometryOutput) {
        if self.channels.contains(OutputChannel::Odometry) {
            let odom = &output.odometry;
            let (vx, vy, vz, wz) = odom
                .twist
                .map(|t| (t.linear.x, t.linear.y, t.linear.z, t.angular.z))
                .unwrap_or((f64::NAN, f64::NAN, f64::NAN, f64::NAN));
            info!(
                sink = %self.name,
                sequence = output.sequence,
                stamp = odom.header.stamp,
                frame = %odom.header.frame_id,
                child = %odom.child_frame_id,
                x = odom.pose.position.x,
                y = odom.pose.position.y,
                z = odom.pose.position.z,
                vx,
                vy,
                vz,
                wz,
                "Odometry"
            );
        }

        if self.channels.contains(OutputChannel::Pose) {
            let pose = &output.pose;
            info!(
                sink = %self.name,
                sequence = output.sequence,
                frame = %pose.header.frame_id,
                x = pose.pose.position.x,
                y = pose.pose.position.y,
                z = pose.pose.position.z,
                "Pose"
            );
        }

        if self.channels.contains(OutputChannel::Transform) {
            if let Some(tf) = &output.transform {
                info!(
                    sink = %self.name,
                    sequence = output.sequence,
                    parent = %tf.header.frame_id,
                    child = %tf.child_frame_id,
                    x = tf.transform.position.x,
                    y = tf.transform.position.y,
                    z = tf.transform.position.z,
                    "Transform"
                );
            }
        }
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, output),
        fields(sink = %self.name, sequence = output.sequence)
    )]
    async fn write(&mut self, output: &OdometryOutput) -> Result<(), ContractError> {
        self.log_output_summary(output);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_output;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log", ChannelSet::all());
        assert!(sink.write(&sample_output(1, true)).await.is_ok());
        assert!(sink.write(&sample_output(2, false)).await.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger", ChannelSet::all());
        assert_eq!(sink.name(), "my_logger");
    }
}
