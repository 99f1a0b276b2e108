//! # Error Types Module / 错误类型模块
//!
//! Errors that stop a matrix run. A failing test suite inside a container is
//! not one of them: it is recorded as a non-zero status in the ledger.
//!
//! 终止矩阵运行的错误。容器内测试失败不属于此类：它作为非零状态记录在账本中。

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a matrix run.
/// 矩阵运行的顶级错误类型。
#[derive(Error, Debug)]
pub enum MatrixError {
    /// The spec file or the settings file is missing, unreadable or malformed.
    /// Raised before any container starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An image could not be pulled, a container could not be started, or the
    /// backing services could not be brought up.
    #[error("provisioning failed for {target}: {reason}")]
    Provisioning { target: String, reason: String },

    /// A log directory could not be compressed into its archive.
    #[error("failed to archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    /// IO error on the host side (ledger, log root, ...).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was interrupted by the operator.
    #[error("run interrupted")]
    Interrupted,
}

impl MatrixError {
    pub fn provisioning(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Provisioning {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn archive(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Archive {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for matrix operations.
pub type Result<T> = std::result::Result<T, MatrixError>;
