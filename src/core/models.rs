//! # Data Models Module / 数据模型模块
//!
//! Per-entry paths and outcomes produced while running the matrix.
//!
//! 运行矩阵时产生的每个条目的路径和结果。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log file name inside an entry's log directory.
pub const LOG_FILE_NAME: &str = "test.log";
/// Freeze snapshot file name inside an entry's log directory.
pub const SNAPSHOT_FILE_NAME: &str = "freeze.txt";
/// Status recorded when the in-container status file cannot be read.
pub const STATUS_UNREADABLE: i32 = 255;

/// Host and in-container locations used by one matrix entry.
/// 一个矩阵条目使用的主机端和容器内路径。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPaths {
    /// Unique directory name, also the ledger identifier.
    /// 唯一的目录名，同时也是账本中的标识。
    pub key: String,
    pub log_dir: PathBuf,
    pub log_file: PathBuf,
    pub snapshot: PathBuf,
    pub archive: PathBuf,
    /// The log directory as seen through the container's bind mount.
    pub container_log_dir: String,
}

impl EntryPaths {
    pub fn container_log_file(&self) -> String {
        format!("{}/{}", self.container_log_dir, LOG_FILE_NAME)
    }

    pub fn container_snapshot(&self) -> String {
        format!("{}/{}", self.container_log_dir, SNAPSHOT_FILE_NAME)
    }
}

/// Raw outcome of one entry's install and test run.
///
/// `status` is read back before the archive is written. A non-zero status is
/// a test failure, which is data, not an error.
///
/// 单个条目安装与测试运行的原始结果。`status` 在写入归档之前读取。
/// 非零状态表示测试失败，它是数据而不是错误。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub key: String,
    pub log_dir: PathBuf,
    pub snapshot: PathBuf,
    pub archive: PathBuf,
    pub status: i32,
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        self.status == 0
    }
}

/// Aggregate result of a completed run.
/// 已完成运行的汇总结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunVerdict {
    Passed,
    Failed,
}

impl RunVerdict {
    /// The orchestrator's exit status for this verdict.
    pub fn exit_code(self) -> u8 {
        match self {
            RunVerdict::Passed => 0,
            RunVerdict::Failed => 1,
        }
    }
}
