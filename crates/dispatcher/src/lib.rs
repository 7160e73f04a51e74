//! # Dispatcher
//!
//! 里程计输出分发模块。
//!
//! 负责：
//! - 消费 `OdometryOutput`
//! - 按订阅通道 fan-out 到多个 sinks
//! - 隔离慢 sink，不阻塞主链路

pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use channels::ChannelSet;
pub use contracts::{DataSink, OdometryOutput};
pub use dispatcher::{create_dispatcher, open_sink, Dispatcher, SinkReport};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SendOutcome, SinkMetrics};
pub use sinks::{FileSink, LogSink, NetworkFormat, NetworkSink, NetworkSinkConfig};
