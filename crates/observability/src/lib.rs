//! # Observability
//!
//! 日志与指标的统一入口：`tracing-subscriber` 初始化、Prometheus 导出、
//! 以及里程计运行摘要 ([`OdometryMetricsAggregator`])。
//!
//! ```ignore
//! use observability::{LogConfig, LogFormat, OdometryMetricsAggregator};
//!
//! observability::init_logging(&LogConfig::from_verbosity(1, false, LogFormat::Compact))?;
//!
//! let mut aggregator = OdometryMetricsAggregator::new();
//! match odometer.process(&frame) {
//!     Ok(output) => aggregator.record_output(&output),
//!     Err(e) => aggregator.record_failure(e.status_label()),
//! }
//! println!("{}", aggregator.summary());
//! ```

pub mod metrics;

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_processing_latency_ms, record_queue_depth, OdometryMetricsAggregator,
    OdometrySummary, RunningStats, StatsSummary,
};

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志 (带线程与源码位置)
    Json,
    /// 多行可读格式
    Pretty,
    /// 单行格式
    #[default]
    Compact,
}

/// 日志初始化参数
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `RUST_LOG` 未设置时使用的过滤指令
    pub default_directive: String,
    /// 为 true 时忽略 `RUST_LOG`
    pub force_directive: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from_verbosity(0, false, LogFormat::default())
    }
}

impl LogConfig {
    /// `-v` 次数映射到日志级别；`quiet` 固定为 warn
    pub fn from_verbosity(verbose: u8, quiet: bool, format: LogFormat) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        Self {
            format,
            default_directive: level.to_string(),
            force_directive: quiet,
        }
    }

    fn filter(&self) -> EnvFilter {
        if self.force_directive {
            return EnvFilter::new(&self.default_directive);
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_directive))
    }
}

/// 安装全局 tracing subscriber，进程内只能成功一次
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

/// Install the Prometheus recorder with an HTTP scrape endpoint on `0.0.0.0:port`.
///
/// Counters recorded before this call are lost; install before the odometer
/// processes its first frame.
pub fn init_metrics(port: u16) -> Result<SocketAddr> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on {addr}"))?;

    tracing::info!(%addr, "Prometheus metrics endpoint initialized");
    Ok(addr)
}
