//! # Result Ledger Module / 结果账本模块
//!
//! Append-only record of per-entry outcomes. Each line is
//! `<log-directory-identifier>==<exit-status>`. Lines are appended right after
//! an entry finishes, so an interrupted run keeps a consistent prefix.
//!
//! 每个条目结果的仅追加记录。每一行为 `<日志目录标识>==<退出状态>`。
//! 条目完成后立即追加，因此中断的运行会保留一致的前缀。

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::error::Result;
use crate::core::models::RunVerdict;

const SEPARATOR: &str = "==";

/// One ledger record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLine {
    pub identifier: String,
    pub status: i32,
}

impl LedgerLine {
    pub fn new(identifier: impl Into<String>, status: i32) -> Self {
        Self {
            identifier: identifier.into(),
            status,
        }
    }

    pub fn render(&self) -> String {
        format!("{}{}{}", self.identifier, SEPARATOR, self.status)
    }

    /// Parses a rendered line. The status is taken after the last `==`.
    pub fn parse(line: &str) -> Option<Self> {
        let (identifier, status) = line.trim().rsplit_once(SEPARATOR)?;
        Some(Self::new(identifier, status.trim().parse().ok()?))
    }

    pub fn passed(&self) -> bool {
        self.status == 0
    }
}

/// The ledger file of a run.
/// 一次运行的账本文件。
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line and flushes it to disk before returning.
    pub fn append(&self, line: &LedgerLine) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line.render())?;
        file.sync_data()?;
        tracing::debug!(path = %self.path.display(), line = %line.render(), "ledger append");
        Ok(())
    }

    /// The raw ledger text; empty if nothing has been recorded yet.
    pub fn read(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The parsed non-blank lines of ledger text. Unparseable lines map to `None`.
pub fn parse_lines(content: &str) -> Vec<Option<LedgerLine>> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(LedgerLine::parse)
        .collect()
}

/// Number of lines that do not record a `0` status. A line that cannot be
/// parsed counts as failed.
pub fn failed_count(content: &str) -> usize {
    parse_lines(content)
        .iter()
        .filter(|line| !line.as_ref().is_some_and(LedgerLine::passed))
        .count()
}

/// Passed if and only if every line records status `0`.
/// 当且仅当每一行的状态都为 `0` 时通过。
pub fn aggregate(content: &str) -> RunVerdict {
    if failed_count(content) == 0 {
        RunVerdict::Passed
    } else {
        RunVerdict::Failed
    }
}
