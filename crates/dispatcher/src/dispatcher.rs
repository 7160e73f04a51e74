//! Dispatcher: fan-out of `OdometryOutput` to the configured sinks

use std::collections::HashSet;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{OdometryOutput, SinkConfig, SinkType};

use crate::channels::ChannelSet;
use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::{MetricsSnapshot, SendOutcome};
use crate::sinks::{FileSink, LogSink, NetworkSink};

/// Per-sink metrics reported when the dispatcher stops, in configuration order.
pub type SinkReport = Vec<(String, MetricsSnapshot)>;

/// Open one sink and start its worker.
#[instrument(
    name = "open_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub async fn open_sink(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    let channels = ChannelSet::from_channels(&config.channels);
    let capacity = config.queue_capacity;
    let name = config.name.as_str();

    let handle = match config.sink_type {
        SinkType::Log => SinkHandle::spawn(LogSink::new(name, channels), capacity, channels),
        SinkType::File => {
            let sink = FileSink::from_params(name, &config.params, channels)
                .map_err(|e| DispatcherError::sink_creation(name, e))?;
            SinkHandle::spawn(sink, capacity, channels)
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(name, &config.params, channels)
                .await
                .map_err(|e| DispatcherError::sink_creation(name, e))?;
            SinkHandle::spawn(sink, capacity, channels)
        }
    };
    debug!(channels = ?config.channels, capacity, "Sink opened");
    Ok(handle)
}

pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<OdometryOutput>,
}

impl Dispatcher {
    /// Wrap already-running sink handles.
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<OdometryOutput>,
    ) -> Self {
        Self { handles, input_rx }
    }

    pub fn metrics(&self) -> SinkReport {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Fan out until the input channel closes, then shut every sink down.
    #[instrument(name = "dispatcher_run", skip(self), fields(sinks = self.handles.len()))]
    pub async fn run(mut self) -> SinkReport {
        info!("Dispatcher started");

        let mut received: u64 = 0;
        let mut unrouted: u64 = 0;

        while let Some(output) = self.input_rx.recv().await {
            received += 1;
            if !self.dispatch(output) {
                unrouted += 1;
            }
            if received.is_multiple_of(100) {
                debug!(received, unrouted, "Dispatcher progress");
            }
        }

        let report = self.metrics();
        for handle in self.handles {
            handle.shutdown().await;
        }

        info!(received, unrouted, "Dispatcher stopped");
        report
    }

    pub fn spawn(self) -> JoinHandle<SinkReport> {
        tokio::spawn(self.run())
    }

    /// Returns false when no sink queued the output.
    fn dispatch(&self, output: OdometryOutput) -> bool {
        let mut queued = false;
        if let Some((last, rest)) = self.handles.split_last() {
            for handle in rest {
                queued |= handle.try_send(output.clone()).is_queued();
            }
            queued |= last.try_send(output) == SendOutcome::Queued;
        }
        queued
    }
}

/// Open every configured sink, failing fast on the first one that cannot be opened.
#[instrument(name = "create_dispatcher", skip_all, fields(sinks = sink_configs.len()))]
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<OdometryOutput>,
) -> Result<Dispatcher, DispatcherError> {
    let mut seen = HashSet::new();
    let mut handles = Vec::with_capacity(sink_configs.len());
    for config in &sink_configs {
        if !seen.insert(config.name.as_str()) {
            return Err(DispatcherError::DuplicateSink(config.name.clone()));
        }
        handles.push(open_sink(config).await?);
    }
    Ok(Dispatcher::with_handles(handles, input_rx))
}
