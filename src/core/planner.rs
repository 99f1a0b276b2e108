//! # Run Planner Module / 运行计划模块
//!
//! Turns the run options into a plan: either one ad hoc entry built from
//! the command line, or the full matrix loaded from the spec file.
//!
//! 将运行选项转换为计划：要么是由命令行构建的单个临时条目，
//! 要么是从规格文件加载的完整矩阵。

use std::path::{Path, PathBuf};

use crate::core::config::Settings;
use crate::core::error::Result;
use crate::core::spec::{MatrixEntry, load_specs};

/// Already-validated invocation options.
/// 已验证的调用选项。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Spec file override.
    pub specs: Option<PathBuf>,
    /// Ad hoc mode: run this image only, bypassing the spec file.
    pub image: Option<String>,
    pub tests: Option<String>,
    pub extras: Option<String>,
    pub pipreq: Option<String>,
    pub pipopts: Option<String>,
    pub label: Option<String>,
    /// Force a reset even in ad hoc mode.
    pub clean: bool,
    /// Open a shell in each container before it is disposed.
    pub shell: bool,
}

/// Where the entries of a run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    AdHoc,
    Full { specs: PathBuf },
}

/// Represents a complete execution plan for a run.
/// 表示一次运行的完整执行计划。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub mode: RunMode,
    /// Entries in execution order.
    pub entries: Vec<MatrixEntry>,
    /// Whether build outputs and the log root are reset first.
    pub reset: bool,
    pub shell: bool,
}

/// Creates the plan for a run.
///
/// A full run always resets; an ad hoc run resets only when `clean` is set,
/// so repeated single-entry runs accumulate artifacts and ledger lines.
///
/// # Errors
/// `MatrixError::Configuration` if the spec file cannot be read or parsed,
/// or the ad hoc image is empty.
///
/// 创建运行计划。完整运行总是重置；临时运行仅在设置 `clean` 时重置。
pub fn plan_run(options: &RunOptions, settings: &Settings, project_dir: &Path) -> Result<RunPlan> {
    if let Some(image) = &options.image {
        let entry = MatrixEntry::from_fields(
            image,
            options.tests.as_deref(),
            options.extras.as_deref(),
            options.pipreq.as_deref(),
            options.pipopts.as_deref(),
            options.label.as_deref(),
        )?;
        return Ok(RunPlan {
            mode: RunMode::AdHoc,
            entries: vec![entry],
            reset: options.clean,
            shell: options.shell,
        });
    }

    let specs = options
        .specs
        .clone()
        .unwrap_or_else(|| project_dir.join(&settings.specs));
    let entries = load_specs(&specs)?;

    Ok(RunPlan {
        mode: RunMode::Full { specs },
        entries,
        reset: true,
        shell: options.shell,
    })
}
