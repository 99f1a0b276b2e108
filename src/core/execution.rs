//! # Image Test Executor Module / 镜像测试执行模块
//!
//! Runs exactly one matrix entry end to end: provision the container, make
//! sure a build toolchain exists, install and test the project in a single
//! composite command, then read back the exit status and a dependency
//! snapshot.
//!
//! Only provisioning problems (pull, start, unreachable daemon) are errors.
//! A failing test suite yields a [`TestOutcome`] with a non-zero status.
//!
//! 端到端运行一个矩阵条目：准备容器，确保存在构建工具链，在一个组合命令中
//! 安装并测试项目，然后读回退出状态和依赖快照。
//! 只有准备阶段的问题才是错误；测试失败会产生状态非零的 [`TestOutcome`]。

use colored::*;
use std::fs;

use crate::core::context::RunContext;
use crate::core::error::{MatrixError, Result};
use crate::core::models::{EntryPaths, STATUS_UNREADABLE, TestOutcome};
use crate::core::spec::MatrixEntry;
use crate::core::steps::{
    CompositeCommand, FreezeStep, InstallStep, StatusCapture, TestStep, parse_status, shell_argv,
};
use crate::infra::command::ProcessOutput;
use crate::infra::docker::ContainerSpec;
use crate::infra::t;

/// User the toolchain install runs as.
const ROOT_USER: &str = "root";
/// Shell opened for interactive inspection.
const INTERACTIVE_SHELL: &str = "bash";

fn describe(output: &ProcessOutput) -> String {
    let text = output.output.trim();
    match output.code {
        Some(code) if text.is_empty() => format!("exit status {code}"),
        Some(code) => format!("exit status {code}: {text}"),
        None => format!("terminated by signal: {text}"),
    }
}

/// Executes matrix entries against a shared [`RunContext`].
/// 针对共享的 [`RunContext`] 执行矩阵条目。
pub struct ImageTestExecutor<'a> {
    ctx: &'a RunContext,
}

impl<'a> ImageTestExecutor<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Builds the composite install+test command for an entry.
    pub fn composite_command(&self, entry: &MatrixEntry, paths: &EntryPaths) -> CompositeCommand {
        let settings = &self.ctx.settings;
        CompositeCommand {
            workdir: settings.mount_path.clone(),
            install: InstallStep::for_entry(entry),
            test: TestStep::new(&settings.test_command, &entry.tests),
            log_file: paths.container_log_file(),
            status: self.status_capture(),
        }
    }

    fn status_capture(&self) -> StatusCapture {
        StatusCapture {
            status_file: self.ctx.settings.status_file.clone(),
        }
    }

    /// Runs one entry. The container is left running for the caller to
    /// inspect and dispose.
    ///
    /// # Errors
    /// `MatrixError::Provisioning` if the image cannot be obtained, the
    /// container cannot be started, or docker itself cannot be invoked.
    /// `MatrixError::Io` if the host log directory cannot be created. The
    /// directory is only created once the container is running.
    pub async fn execute(&self, entry: &MatrixEntry, paths: &EntryPaths) -> Result<TestOutcome> {
        let docker = self.ctx.docker();
        let name = self.ctx.container_name();
        let image = entry.image.as_str();
        let unreachable = |e: std::io::Error| MatrixError::provisioning(image, e.to_string());

        // A leftover container from an earlier or interrupted run.
        let removed = docker.remove_container(name).await.map_err(unreachable)?;
        tracing::debug!(container = name, code = ?removed.code, "removed previous container");

        println!("{}", t!("run.pulling", image = image).blue());
        let pulled = docker.pull(image).await.map_err(unreachable)?;
        if !pulled.success() {
            if docker.image_exists(image).await.map_err(unreachable)? {
                println!("{}", t!("run.pull_cached", image = image).yellow());
            } else {
                return Err(MatrixError::provisioning(image, describe(&pulled)));
            }
        }

        println!("{}", t!("run.starting_container", name = name).blue());
        let spec = ContainerSpec {
            name,
            image,
            network: &self.ctx.settings.docker.network,
            source_dir: self.ctx.source_dir(),
            mount_path: &self.ctx.settings.mount_path,
            user: self.ctx.host_user.as_deref(),
        };
        let started = docker.run_detached(&spec).await.map_err(unreachable)?;
        if !started.success() {
            return Err(MatrixError::provisioning(image, describe(&started)));
        }
        fs::create_dir_all(&paths.log_dir)?;

        self.ensure_toolchain().await.map_err(unreachable)?;

        let composite = self.composite_command(entry, paths);
        println!(
            "{}",
            t!("run.running_tests", log = paths.log_file.display()).blue()
        );
        tracing::debug!(script = %composite.render(), "running composite command");
        let ran = docker
            .exec(name, None, &composite.argv())
            .await
            .map_err(unreachable)?;
        tracing::debug!(code = ?ran.code, "composite command returned");

        let status = self.read_status().await.map_err(unreachable)?;
        self.capture_snapshot(entry, paths).await.map_err(unreachable)?;

        Ok(TestOutcome {
            key: paths.key.clone(),
            log_dir: paths.log_dir.clone(),
            snapshot: paths.snapshot.clone(),
            archive: paths.archive.clone(),
            status,
        })
    }

    /// Installs a native toolchain as root if the probe finds none. A failed
    /// install is reported and the run continues; the install step will
    /// surface the problem in the entry's log.
    async fn ensure_toolchain(&self) -> std::io::Result<()> {
        let docker = self.ctx.docker();
        let name = self.ctx.container_name();
        let toolchain = &self.ctx.settings.toolchain;

        let probe = docker.exec(name, None, &shell_argv(&toolchain.probe)).await?;
        if probe.success() {
            return Ok(());
        }

        println!("{}", t!("run.toolchain_missing").yellow());
        let installed = docker
            .exec(name, Some(ROOT_USER), &shell_argv(&toolchain.install))
            .await?;
        if !installed.success() {
            println!("{}", t!("run.toolchain_install_failed").yellow());
            tracing::warn!("toolchain install failed: {}", describe(&installed));
        }
        Ok(())
    }

    async fn read_status(&self) -> std::io::Result<i32> {
        let capture = self.status_capture();
        let read = self
            .ctx
            .docker()
            .exec(self.ctx.container_name(), None, &capture.read_argv())
            .await?;
        let status = read
            .success()
            .then(|| parse_status(&read.output))
            .flatten();
        Ok(status.unwrap_or_else(|| {
            println!(
                "{}",
                t!("run.status_unreadable", status = STATUS_UNREADABLE).yellow()
            );
            STATUS_UNREADABLE
        }))
    }

    async fn capture_snapshot(&self, entry: &MatrixEntry, paths: &EntryPaths) -> std::io::Result<()> {
        let settings = &self.ctx.settings;
        let freeze = FreezeStep::for_entry(
            &settings.mount_path,
            &settings.freeze_command,
            entry,
            paths.container_snapshot(),
        );
        let frozen = self
            .ctx
            .docker()
            .exec(self.ctx.container_name(), None, &shell_argv(&freeze.render()))
            .await?;
        if !frozen.success() {
            println!("{}", t!("run.freeze_failed").yellow());
            tracing::warn!("freeze failed: {}", describe(&frozen));
        }
        Ok(())
    }

    /// Opens an interactive shell in the still-running container.
    pub async fn open_shell(&self) -> Result<()> {
        let name = self.ctx.container_name();
        println!("{}", t!("run.opening_shell", name = name).cyan());
        self.ctx
            .docker()
            .exec_interactive(name, INTERACTIVE_SHELL)
            .await?;
        Ok(())
    }

    /// Removes the test container, and the entry's image if configured.
    /// Failures are reported, never raised: the next entry removes the
    /// container again before starting.
    pub async fn dispose(&self, entry: &MatrixEntry) {
        let docker = self.ctx.docker();
        let name = self.ctx.container_name();
        match docker.remove_container(name).await {
            Ok(output) if output.success() => {}
            Ok(output) => {
                println!("{}", t!("run.dispose_failed", name = name).yellow());
                tracing::warn!("container removal failed: {}", describe(&output));
            }
            Err(e) => {
                println!("{}", t!("run.dispose_failed", name = name).yellow());
                tracing::warn!("container removal failed: {e}");
            }
        }

        if self.ctx.settings.remove_images {
            match docker.remove_image(&entry.image).await {
                Ok(output) if output.success() => {}
                Ok(output) => tracing::warn!(image = %entry.image, "image removal failed: {}", describe(&output)),
                Err(e) => tracing::warn!(image = %entry.image, "image removal failed: {e}"),
            }
        }
    }
}
