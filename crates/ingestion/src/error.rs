//! Ingestion 错误类型

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 回放序列索引 (frames.jsonl) 解析失败
    #[error("invalid frame index {path}:{line}: {message}")]
    Manifest {
        /// 索引文件
        path: PathBuf,
        /// 行号 (从 1 开始)
        line: usize,
        /// 错误消息
        message: String,
    },

    /// 图像解码失败
    #[error("failed to decode image {path}: {message}")]
    Decode {
        /// 图像文件
        path: PathBuf,
        /// 错误消息
        message: String,
    },

    /// 像素缓冲与声明的布局不符
    #[error("invalid pixel buffer: {message}")]
    Format {
        /// 错误消息
        message: String,
    },

    /// 通道已关闭
    #[error("channel closed for source {source_name}")]
    ChannelClosed {
        /// 来源名称
        source_name: String,
    },

    /// IO 错误
    #[error("io error at {path}: {source}")]
    Io {
        /// 出错的路径
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 契约层错误
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl IngestionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Contract(inner) => inner,
            IngestionError::Format { message } => ContractError::frame_format(message),
            other => ContractError::source("ingestion", other.to_string()),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
