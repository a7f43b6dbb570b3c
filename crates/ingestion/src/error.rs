//! Ingestion 错误类型

use std::path::PathBuf;

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 回放文件无法打开
    #[error("failed to open replay file {path}: {source}")]
    ReplayOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 单行读数解析失败
    #[error("line {line}: {message}")]
    ParseFailed {
        /// 行号（从 1 开始）
        line: usize,
        /// 错误消息
        message: String,
    },

    /// 值类型不受支持（null / array / object）
    #[error("line {line}: {source}")]
    Unsupported {
        line: usize,
        #[source]
        source: contracts::ContractError,
    },

    /// 没有可模拟的 tag
    #[error("no tags to simulate")]
    NoTags,
}

impl IngestionError {
    pub fn parse_failed(line: usize, message: impl Into<String>) -> Self {
        Self::ParseFailed {
            line,
            message: message.into(),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
