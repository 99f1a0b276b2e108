//! # Run Context Module / 运行上下文模块
//!
//! The state shared by every entry of one orchestrator invocation: host
//! paths, the in-container mount point, the invoking user, and the backing
//! services (data store, message broker) that are started once before the
//! first entry and torn down after the last one.
//!
//! 一次编排器调用中所有条目共享的状态：主机路径、容器内挂载点、调用用户，
//! 以及在第一个条目之前启动一次、在最后一个条目之后关闭的后端服务。

use chrono::Local;
use colored::*;
use std::path::{Component, Path, PathBuf};

use crate::core::config::Settings;
use crate::core::error::{MatrixError, Result};
use crate::core::models::{EntryPaths, LOG_FILE_NAME, SNAPSHOT_FILE_NAME};
use crate::core::spec::MatrixEntry;
use crate::infra::command::{Invocation, ProcessRunner, SharedRunner};
use crate::infra::docker::Docker;
use crate::infra::t;

/// Shared state for one run. Dropping a context whose services are still up
/// tears them down as a last resort; call [`RunContext::shutdown`] on the
/// normal path.
///
/// 一次运行的共享状态。丢弃仍有服务运行的上下文时会尽力关闭它们；
/// 正常路径上应调用 [`RunContext::shutdown`]。
pub struct RunContext {
    pub source_dir: PathBuf,
    pub log_root: PathBuf,
    pub ledger_path: PathBuf,
    /// `uid:gid` the container runs as, when resolved.
    pub host_user: Option<String>,
    pub settings: Settings,
    /// The log root relative to the source dir, `/`-joined.
    log_root_rel: String,
    runner: SharedRunner,
    services_up: bool,
}

impl RunContext {
    /// Builds a context without touching the system.
    ///
    /// # Errors
    /// `MatrixError::Configuration` if the log root escapes the source dir,
    /// since the container could not write logs into it.
    pub fn new(source_dir: PathBuf, settings: Settings, runner: SharedRunner) -> Result<Self> {
        let log_root = settings.log_root_in(&source_dir);
        let rel = log_root.strip_prefix(&source_dir).map_err(|_| {
            MatrixError::Configuration(format!(
                "log root {} must be inside the project directory {}",
                log_root.display(),
                source_dir.display()
            ))
        })?;
        if rel.as_os_str().is_empty() || rel.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(MatrixError::Configuration(format!(
                "log root {} must be a sub-directory of the project directory",
                log_root.display()
            )));
        }
        let log_root_rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        Ok(Self {
            ledger_path: log_root.join(&settings.ledger_file),
            log_root,
            log_root_rel,
            source_dir,
            host_user: None,
            settings,
            runner,
            services_up: false,
        })
    }

    pub fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }

    pub fn docker(&self) -> Docker<'_> {
        Docker::new(self.runner(), &self.settings.docker.binary)
    }

    pub fn container_name(&self) -> &str {
        &self.settings.container_name
    }

    /// Resolves `uid:gid` of the invoking user with `id`, unless disabled.
    /// Failure leaves the container running as the image's default user.
    pub async fn resolve_host_user(&mut self) {
        if !self.settings.run_as_host_user {
            return;
        }
        let uid = self.id_field("-u").await;
        let gid = self.id_field("-g").await;
        match (uid, gid) {
            (Some(uid), Some(gid)) => self.host_user = Some(format!("{uid}:{gid}")),
            _ => tracing::warn!("could not resolve the host user; containers run as image default"),
        }
    }

    async fn id_field(&self, flag: &str) -> Option<String> {
        let output = self.runner.run(&Invocation::new("id").arg(flag)).await.ok()?;
        let value = output.output.trim();
        (output.success() && !value.is_empty()).then(|| value.to_string())
    }

    /// Brings up the backing services once for the whole run.
    ///
    /// The context counts the services as up before the command returns, so a
    /// half-started stack is still torn down.
    ///
    /// # Errors
    /// `MatrixError::Provisioning` if the start command fails.
    pub async fn start_services(&mut self) -> Result<()> {
        let services = &self.settings.services;
        if !services.enabled {
            return Ok(());
        }
        let Some(up) = Invocation::from_argv(&services.up) else {
            return Ok(());
        };

        println!("{}", t!("run.services_starting").blue());
        self.services_up = true;
        let up = up.current_dir(&self.source_dir);
        match self.runner.run(&up).await {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(MatrixError::provisioning(
                "backing services",
                format!("'{up}' exited with {:?}: {}", output.code, output.output.trim()),
            )),
            Err(e) => Err(MatrixError::provisioning("backing services", e.to_string())),
        }
    }

    /// Tears the backing services down. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        let Some(down) = self.take_teardown() else {
            return;
        };
        println!("{}", t!("run.services_stopping").blue());
        match self.runner.run(&down).await {
            Ok(output) if output.success() => {}
            Ok(output) => tracing::warn!(code = ?output.code, "service teardown failed: {}", output.output.trim()),
            Err(e) => tracing::warn!("service teardown failed: {e}"),
        }
    }

    fn take_teardown(&mut self) -> Option<Invocation> {
        if !std::mem::take(&mut self.services_up) {
            return None;
        }
        Invocation::from_argv(&self.settings.services.down)
            .map(|down| down.current_dir(&self.source_dir))
    }

    pub fn services_up(&self) -> bool {
        self.services_up
    }

    /// Allocates the log directory, archive and in-container paths for an
    /// entry. The key is `<image-key>[-<label-key>]-<timestamp>`, suffixed with a
    /// counter if a directory or archive by that name already exists.
    ///
    /// 为条目分配日志目录、归档和容器内路径。
    pub fn entry_paths(&self, entry: &MatrixEntry) -> EntryPaths {
        let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let mut base = entry.image_key();
        let label = entry.label_key();
        if !label.is_empty() {
            base.push('-');
            base.push_str(&label);
        }
        base.push('-');
        base.push_str(&stamp);

        let mut key = base.clone();
        let mut counter = 1;
        while self.log_root.join(&key).exists() || self.archive_path(&key).exists() {
            counter += 1;
            key = format!("{base}-{counter}");
        }

        let log_dir = self.log_root.join(&key);
        EntryPaths {
            log_file: log_dir.join(LOG_FILE_NAME),
            snapshot: log_dir.join(SNAPSHOT_FILE_NAME),
            archive: self.archive_path(&key),
            container_log_dir: format!(
                "{}/{}/{}",
                self.settings.mount_path.trim_end_matches('/'),
                self.log_root_rel,
                key
            ),
            log_dir,
            key,
        }
    }

    fn archive_path(&self, key: &str) -> PathBuf {
        self.log_root.join(format!("{key}.tar.gz"))
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        let Some(down) = self.take_teardown() else {
            return;
        };
        // Only a multi-threaded runtime can block here without stalling the
        // reactor that drives the child process.
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => handle,
            _ => {
                tracing::warn!(command = %down, "backing services left running; run the teardown manually");
                return;
            }
        };
        let runner = self.runner.clone();
        tokio::task::block_in_place(|| {
            if let Err(e) = handle.block_on(runner.run(&down)) {
                tracing::warn!("service teardown failed: {e}");
            }
        });
    }
}
