//! # File System Operations Module / 文件系统操作模块
//!
//! Host-side file work: resetting build outputs and the log root before a
//! run, and compressing each entry's log directory into an archive.
//!
//! 主机端文件操作：运行前重置构建输出和日志根目录，以及将每个条目的日志目录压缩为归档。

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::core::error::{MatrixError, Result};
use crate::core::models::EntryPaths;
use crate::infra::command::{Invocation, ProcessRunner};

/// Resolves a project-relative path, refusing anything that would leave the
/// project directory.
fn inside(project_dir: &Path, relative: &Path) -> Result<PathBuf> {
    let escapes = relative.as_os_str().is_empty()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(MatrixError::Configuration(format!(
            "refusing to clean {}: not a sub-directory of {}",
            relative.display(),
            project_dir.display()
        )));
    }
    Ok(project_dir.join(relative))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Prepares the host side of a run.
///
/// With `reset`, the build output directories and the entire log root are
/// deleted first. In every case an (empty, after a reset) log root exists
/// afterwards.
///
/// # Arguments
/// * `project_dir` - Host source directory
/// * `log_root` - Absolute log root, inside `project_dir`
/// * `clean_dirs` - Build output directories, relative to `project_dir`
/// * `reset` - Whether to delete prior outputs
///
/// 准备运行的主机端环境。`reset` 为真时先删除构建输出目录和整个日志根目录。
/// 完成后日志根目录一定存在。
pub fn prepare_environment(
    project_dir: &Path,
    log_root: &Path,
    clean_dirs: &[PathBuf],
    reset: bool,
) -> Result<()> {
    if reset {
        let targets = clean_dirs
            .iter()
            .map(|dir| inside(project_dir, dir))
            .collect::<Result<Vec<_>>>()?;
        for target in &targets {
            remove_if_exists(target)?;
        }
        remove_if_exists(log_root)?;
    }
    fs::create_dir_all(log_root)?;
    Ok(())
}

/// Compresses an entry's log directory into its archive and removes the
/// directory once the archive is confirmed on disk.
///
/// # Errors
/// `MatrixError::Archive` if `tar` cannot run, fails, or leaves no archive.
/// The log directory is kept in that case.
///
/// 将条目的日志目录压缩为归档，并在确认归档写入磁盘后删除该目录。
/// 失败时保留日志目录。
pub async fn archive_log_dir(
    runner: &dyn ProcessRunner,
    log_root: &Path,
    paths: &EntryPaths,
) -> Result<PathBuf> {
    let archive = &paths.archive;
    let tar = Invocation::new("tar")
        .arg("-czf")
        .arg(archive.to_string_lossy())
        .arg("-C")
        .arg(log_root.to_string_lossy())
        .arg(paths.key.as_str());

    let output = runner
        .run(&tar)
        .await
        .map_err(|e| MatrixError::archive(&paths.log_dir, e.to_string()))?;
    if !output.success() {
        return Err(MatrixError::archive(
            &paths.log_dir,
            format!("tar exited with {:?}: {}", output.code, output.output.trim()),
        ));
    }

    match fs::metadata(archive) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {}
        _ => {
            return Err(MatrixError::archive(
                &paths.log_dir,
                format!("archive {} was not written", archive.display()),
            ));
        }
    }

    remove_if_exists(&paths.log_dir)?;
    Ok(archive.clone())
}
