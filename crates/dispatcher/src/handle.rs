//! SinkHandle: 一个 sink 独占一个有界队列和一个 worker task
//!
//! 生产者只调用 `try_send`，永不等待；慢 sink 只会丢弃自己的输出。

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{DataSink, OdometryOutput};

use crate::channels::ChannelSet;
use crate::metrics::{SendOutcome, SinkMetrics};

pub struct SinkHandle {
    name: String,
    channels: ChannelSet,
    tx: mpsc::Sender<OdometryOutput>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker for `sink` on the current tokio runtime.
    pub fn spawn<S: DataSink + Send + 'static>(
        sink: S,
        queue_capacity: usize,
        channels: ChannelSet,
    ) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker = tokio::spawn(sink_worker(sink, rx, Arc::clone(&metrics)));

        Self {
            name,
            channels,
            tx,
            metrics,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channels(&self) -> ChannelSet {
        self.channels
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Offer an output without waiting.
    pub fn try_send(&self, output: OdometryOutput) -> SendOutcome {
        let outcome = if !self.channels.accepts(&output) {
            SendOutcome::Filtered
        } else {
            match self.tx.try_send(output) {
                Ok(()) => SendOutcome::Queued,
                Err(TrySendError::Full(output)) => {
                    warn!(sink = %self.name, sequence = output.sequence, "Queue full, output dropped");
                    SendOutcome::Dropped
                }
                Err(TrySendError::Closed(_)) => {
                    error!(sink = %self.name, "Sink worker closed unexpectedly");
                    SendOutcome::Closed
                }
            }
        };

        let queued = self.tx.max_capacity() - self.tx.capacity();
        self.metrics.record_offer(outcome, queued);
        outcome
    }

    /// Close the queue, then wait for the worker to drain, flush and close the sink.
    #[instrument(name = "sink_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            error!(sink = %self.name, error = ?e, "Sink worker panicked");
        }
    }
}

/// Writes until the queue closes. Flushes whenever the queue runs empty so
/// buffered sinks stay close to real time without flushing every record.
#[instrument(name = "sink_worker", skip_all, fields(sink = %sink.name()))]
async fn sink_worker<S: DataSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<OdometryOutput>,
    metrics: Arc<SinkMetrics>,
) {
    debug!("Sink worker started");

    while let Some(output) = rx.recv().await {
        let result = sink.write(&output).await;
        metrics.record_write(result.is_ok(), rx.len());
        if let Err(e) = result {
            // 单次失败不终止 worker
            error!(sequence = output.sequence, error = %e, "Write failed");
        }

        if rx.is_empty() {
            if let Err(e) = sink.flush().await {
                warn!(error = %e, "Flush failed");
            }
        }
    }

    if let Err(e) = sink.close().await {
        error!(error = %e, "Close failed on shutdown");
    }
    debug!("Sink worker stopped");
}
