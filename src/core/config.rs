//! # Settings Module / 设置模块
//!
//! Optional `ImageMatrix.toml` settings. Every field has a default, so an
//! absent file or an empty one behaves identically.
//!
//! 可选的 `ImageMatrix.toml` 设置。每个字段都有默认值，因此缺少文件或空文件的行为相同。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{MatrixError, Result};

/// Name of the settings file looked up in the project directory.
pub const SETTINGS_FILE_NAME: &str = "ImageMatrix.toml";

/// Orchestrator settings loaded from TOML.
/// 从 TOML 加载的编排器设置。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// Overrides system detection, but not `--lang`.
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。覆盖系统检测，但不覆盖 `--lang`。
    pub language: Option<String>,
    /// Spec file, relative to the project directory.
    pub specs: PathBuf,
    /// Log root, relative to the project directory. Must stay inside it so the
    /// container can write logs through the bind mount.
    pub log_root: PathBuf,
    /// Ledger file name inside the log root.
    pub ledger_file: String,
    /// Where the project sources are mounted inside the container.
    pub mount_path: String,
    /// Fixed name reserved for the test container.
    pub container_name: String,
    /// Fixed in-container path of the exit status file.
    pub status_file: String,
    /// Build output directories removed by a reset, relative to the project.
    pub clean_dirs: Vec<PathBuf>,
    /// Command that runs the test suite; the entry's selector is appended.
    pub test_command: Vec<String>,
    /// Command that writes the dependency snapshot. Empty means
    /// `<pipreq> freeze`, which only suits pip-compatible installers
    /// (`pip`, `uv pip`, `python -m pip`). The install step has the same
    /// shape, `<pipreq> install <pipopts> -e .[extras]`.
    pub freeze_command: Vec<String>,
    /// Remove each entry's image after its container is disposed.
    pub remove_images: bool,
    /// Run the container as the invoking host user.
    pub run_as_host_user: bool,
    pub docker: DockerSettings,
    pub services: ServiceSettings,
    pub toolchain: ToolchainSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: None,
            specs: PathBuf::from("testspecs.txt"),
            log_root: PathBuf::from("testlogs"),
            ledger_file: "summary.log".to_string(),
            mount_path: "/project".to_string(),
            container_name: "image-matrix-test".to_string(),
            status_file: "/tmp/image-matrix.status".to_string(),
            clean_dirs: vec![PathBuf::from("build"), PathBuf::from("dist")],
            test_command: vec!["python".into(), "-m".into(), "pytest".into()],
            freeze_command: Vec::new(),
            remove_images: false,
            run_as_host_user: true,
            docker: DockerSettings::default(),
            services: ServiceSettings::default(),
            toolchain: ToolchainSettings::default(),
        }
    }
}

/// Docker CLI settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DockerSettings {
    /// The docker-compatible CLI binary (`docker`, `podman`, ...).
    pub binary: String,
    /// Network the test container joins to reach the backing services.
    pub network: String,
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            network: "host".to_string(),
        }
    }
}

/// Backing services (data store, message broker) shared by every entry.
/// 所有条目共享的后端服务（数据存储、消息代理）。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub enabled: bool,
    /// Started once before the first entry, from the project directory.
    pub up: Vec<String>,
    /// Run once after the last entry, and on every abnormal exit path.
    pub down: Vec<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            up: vec!["docker".into(), "compose".into(), "up".into(), "-d".into()],
            down: vec!["docker".into(), "compose".into(), "down".into()],
        }
    }
}

/// Native build toolchain probe and on-demand install, both run with `sh -c`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolchainSettings {
    pub probe: String,
    pub install: String,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            probe: "command -v gcc".to_string(),
            install: "(apt-get update && apt-get install -y build-essential) \
                      || apk add --no-cache build-base \
                      || yum install -y gcc gcc-c++ make"
                .to_string(),
        }
    }
}

impl Settings {
    /// Parses settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| MatrixError::Configuration(format!("invalid settings: {e}")))
    }

    /// Loads settings for a project.
    ///
    /// An explicit path must exist. Without one, `ImageMatrix.toml` in the
    /// project directory is used if present, defaults otherwise.
    ///
    /// 加载项目设置。显式指定的路径必须存在；否则使用项目目录中的
    /// `ImageMatrix.toml`（如果存在），不存在时使用默认值。
    pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = project_dir.join(SETTINGS_FILE_NAME);
                if !candidate.is_file() {
                    tracing::debug!("no settings file, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let content = fs::read_to_string(&path).map_err(|e| {
            MatrixError::Configuration(format!("cannot read settings {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Self::from_toml(&content)
    }

    /// Absolute log root for a project directory.
    pub fn log_root_in(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.log_root)
    }
}
