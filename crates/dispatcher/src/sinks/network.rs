//! NetworkSink - UDP fire-and-forget streaming
//!
//! One datagram per subscribed record, tagged with its channel name.

use contracts::{
    ContractError, DataSink, Odometry, OdometryOutput, OutputChannel, PoseStamped,
    TransformStamped,
};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

use crate::channels::ChannelSet;

/// Payload encoding of each datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    #[default]
    Json,
    /// bincode 1.x, little-endian fixed-width integers
    Bincode,
}

impl FromStr for NetworkFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "bincode" => Ok(Self::Bincode),
            other => Err(format!("unknown format '{other}' (expected json or bincode)")),
        }
    }
}

/// Largest UDP payload over IPv4
const MAX_UDP_PAYLOAD: usize = 65_507;

#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    pub addr: SocketAddr,
    pub format: NetworkFormat,
    /// Records that serialize larger than this are skipped
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    /// Params: `addr` (required), `format`, `max_packet_size`.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr = params
            .get("addr")
            .ok_or("missing 'addr' parameter")?
            .parse::<SocketAddr>()
            .map_err(|e| format!("invalid 'addr': {e}"))?;

        let format = params
            .get("format")
            .map(|f| f.parse::<NetworkFormat>())
            .transpose()?
            .unwrap_or_default();

        let max_packet_size = match params.get("max_packet_size") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| format!("invalid 'max_packet_size': {e}"))?
                .min(MAX_UDP_PAYLOAD),
            None => MAX_UDP_PAYLOAD,
        };

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Wire envelope, keyed by channel name
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum NetworkMessage<'a> {
    Odometry(&'a Odometry),
    Pose(&'a PoseStamped),
    Transform(&'a TransformStamped),
}

/// Sink that sends odometry records over UDP
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    channels: ChannelSet,
    socket: Option<UdpSocket>,
}

impl NetworkSink {
    /// Create a new NetworkSink
    #[instrument(name = "network_sink_new", skip(name, config, channels))]
    pub async fn new(
        name: impl Into<String>,
        config: NetworkSinkConfig,
        channels: ChannelSet,
    ) -> std::io::Result<Self> {
        let name = name.into();
        let bind_addr = if config.addr.is_ipv6() {
            "[::]:0"
        } else {
            "0.0.0.0:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(&config.addr).await?;

        debug!(
            sink = %name,
            target = %config.addr,
            "NetworkSink connected"
        );

        Ok(Self {
            name,
            config,
            channels,
            socket: Some(socket),
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "network_sink_from_params", skip(name, params, channels))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
        channels: ChannelSet,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::sink_write(&name, e))?;

        Self::new(name.clone(), config, channels)
            .await
            .map_err(|e| ContractError::SinkConnection {
                sink_name: name,
                message: e.to_string(),
            })
    }

    fn messages<'a>(&self, output: &'a OdometryOutput) -> Vec<NetworkMessage<'a>> {
        let mut messages = Vec::with_capacity(3);
        if self.channels.contains(OutputChannel::Odometry) {
            messages.push(NetworkMessage::Odometry(&output.odometry));
        }
        if self.channels.contains(OutputChannel::Pose) {
            messages.push(NetworkMessage::Pose(&output.pose));
        }
        if self.channels.contains(OutputChannel::Transform) {
            if let Some(tf) = &output.transform {
                messages.push(NetworkMessage::Transform(tf));
            }
        }
        messages
    }

    fn serialize_message(&self, message: &NetworkMessage<'_>) -> Result<Vec<u8>, String> {
        match self.config.format {
            NetworkFormat::Json => {
                serde_json::to_vec(message).map_err(|e| format!("json error: {}", e))
            }
            NetworkFormat::Bincode => {
                bincode::serialize(message).map_err(|e| format!("bincode error: {}", e))
            }
        }
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_write(&self.name, "socket not connected"))
    }

    /// Serialized payload, or `None` when it exceeds the packet limit
    fn prepare_payload(&self, message: &NetworkMessage<'_>) -> Result<Option<Vec<u8>>, ContractError> {
        let data = self
            .serialize_message(message)
            .map_err(|e| ContractError::sink_write(&self.name, e))?;

        if data.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Packet too large, skipped"
            );
            return Ok(None);
        }

        Ok(Some(data))
    }

    async fn transmit(&self, socket: &UdpSocket, data: &[u8], sequence: u64) {
        match socket.send(data).await {
            Ok(sent) => {
                debug!(sink = %self.name, sequence, bytes = sent, "Sent");
            }
            Err(e) => {
                // UDP is best-effort
                error!(sink = %self.name, error = %e, "UDP send failed");
            }
        }
    }
}

impl DataSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_write",
        skip(self, output),
        fields(sink = %self.name, sequence = output.sequence)
    )]
    async fn write(&mut self, output: &OdometryOutput) -> Result<(), ContractError> {
        let socket = self.socket()?;
        for message in self.messages(output) {
            if let Some(data) = self.prepare_payload(&message)? {
                self.transmit(socket, &data, output.sequence).await;
            }
        }
        Ok(())
    }

    #[instrument(name = "network_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // UDP doesn't buffer
        Ok(())
    }

    #[instrument(name = "network_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, "NetworkSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_output;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_network_sink_config_parsing() {
        let mut params = HashMap::new();
        params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
        params.insert("format".to_string(), "bincode".to_string());

        let config = NetworkSinkConfig::from_params(&params).unwrap();
        assert_eq!(config.addr.port(), 9999);
        assert_eq!(config.format, NetworkFormat::Bincode);
        assert_eq!(config.max_packet_size, MAX_UDP_PAYLOAD);

        params.insert("max_packet_size".to_string(), "100000".to_string());
        let config = NetworkSinkConfig::from_params(&params).unwrap();
        assert_eq!(config.max_packet_size, MAX_UDP_PAYLOAD);

        params.insert("format".to_string(), "xml".to_string());
        assert!(NetworkSinkConfig::from_params(&params).is_err());
    }

    #[tokio::test]
    async fn test_network_sink_write_without_receiver() {
        let config = NetworkSinkConfig {
            addr: "127.0.0.1:19998".parse().unwrap(),
            format: NetworkFormat::Json,
            max_packet_size: 65000,
        };

        let mut sink = NetworkSink::new("test_net", config, ChannelSet::all())
            .await
            .unwrap();

        // Should not fail even with no receiver
        assert!(sink.write(&sample_output(1, true)).await.is_ok());
    }

    #[tokio::test]
    async fn test_network_sink_sends_subscribed_records() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = NetworkSinkConfig {
            addr: receiver.local_addr().unwrap(),
            format: NetworkFormat::Json,
            max_packet_size: 65000,
        };
        let channels = ChannelSet::from_channels(&[OutputChannel::Odometry]);
        let mut sink = NetworkSink::new("udp", config, channels).await.unwrap();

        sink.write(&sample_output(4, true)).await.unwrap();

        let mut buf = vec![0u8; 65536];
        let len = timeout(Duration::from_secs(1), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf[..len]).unwrap();
        let odometry = value.get("odometry").unwrap();
        assert_eq!(odometry["header"]["frame_id"], "/odom");
        assert_eq!(odometry["child_frame_id"], "/base_link");
    }

    #[tokio::test]
    async fn test_network_sink_skips_oversized_packets() {
        let config = NetworkSinkConfig {
            addr: "127.0.0.1:19997".parse().unwrap(),
            format: NetworkFormat::Bincode,
            max_packet_size: 8,
        };
        let sink = NetworkSink::new("tiny", config, ChannelSet::all())
            .await
            .unwrap();

        let output = sample_output(0, true);
        let message = NetworkMessage::Pose(&output.pose);
        assert!(sink.prepare_payload(&message).unwrap().is_none());
    }
}
