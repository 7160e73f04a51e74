//! Output sink interface
//!
//! A sink receives every `OdometryOutput` whose channels it subscribes to,
//! on its own worker task. Implementations pick the records they care about
//! (odometry, pose-only, transform) from the output.

use crate::{ContractError, OdometryOutput};

/// `DataSink` is the `Send` variant used by the dispatcher workers.
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Stable name, used as the metrics and log key
    fn name(&self) -> &str;

    /// Persist or forward the subscribed records of one output.
    ///
    /// A failed write is counted and logged by the caller; the sink keeps
    /// receiving later outputs.
    async fn write(&mut self, output: &OdometryOutput) -> Result<(), ContractError>;

    /// 刷新缓冲；队列清空时调用
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// 队列关闭后调用一次
    async fn close(&mut self) -> Result<(), ContractError>;
}
