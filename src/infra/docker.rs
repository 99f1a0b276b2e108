//! # Docker Client Module / Docker 客户端模块
//!
//! Thin typed wrapper over the docker CLI. Each method builds one
//! [`Invocation`] and hands it to the configured [`ProcessRunner`].
//!
//! docker CLI 的轻量类型化封装。每个方法构建一个 [`Invocation`] 并交给 [`ProcessRunner`]。

use std::path::Path;

use crate::infra::command::{Invocation, ProcessOutput, ProcessRunner};

/// Options for starting the long-lived test container.
/// 启动长期运行的测试容器的选项。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec<'a> {
    pub name: &'a str,
    pub image: &'a str,
    pub network: &'a str,
    /// Host source directory, bind-mounted read-write.
    pub source_dir: &'a Path,
    pub mount_path: &'a str,
    /// `uid:gid` to run as, if any.
    pub user: Option<&'a str>,
}

/// Docker CLI bound to a process runner.
pub struct Docker<'a> {
    runner: &'a dyn ProcessRunner,
    binary: &'a str,
}

impl<'a> Docker<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, binary: &'a str) -> Self {
        Self { runner, binary }
    }

    fn command(&self) -> Invocation {
        Invocation::new(self.binary)
    }

    async fn run(&self, invocation: Invocation) -> std::io::Result<ProcessOutput> {
        self.runner.run(&invocation).await
    }

    /// `docker rm -f <name>`. A missing container is not an error for the
    /// caller; the output is returned for logging only.
    pub async fn remove_container(&self, name: &str) -> std::io::Result<ProcessOutput> {
        self.run(self.command().args(["rm", "-f", name])).await
    }

    pub async fn pull(&self, image: &str) -> std::io::Result<ProcessOutput> {
        self.run(self.command().args(["pull", image])).await
    }

    /// Whether the image is present in the local cache.
    pub async fn image_exists(&self, image: &str) -> std::io::Result<bool> {
        let output = self
            .run(self.command().args(["image", "inspect", image]))
            .await?;
        Ok(output.success())
    }

    /// Starts the container detached with an interactive TTY so it stays up
    /// until removed.
    pub async fn run_detached(&self, spec: &ContainerSpec<'_>) -> std::io::Result<ProcessOutput> {
        self.run(run_detached_invocation(self.binary, spec)).await
    }

    /// `docker exec [-u user] <name> <argv...>`
    pub async fn exec(
        &self,
        name: &str,
        user: Option<&str>,
        argv: &[String],
    ) -> std::io::Result<ProcessOutput> {
        self.run(exec_invocation(self.binary, name, user, argv)).await
    }

    /// Opens an interactive session in the container.
    pub async fn exec_interactive(&self, name: &str, shell: &str) -> std::io::Result<Option<i32>> {
        let invocation = self.command().args(["exec", "-it", name, shell]);
        self.runner.run_interactive(&invocation).await
    }

    pub async fn remove_image(&self, image: &str) -> std::io::Result<ProcessOutput> {
        self.run(self.command().args(["rmi", image])).await
    }
}

/// Builds the `docker run` invocation for the test container.
pub fn run_detached_invocation(binary: &str, spec: &ContainerSpec<'_>) -> Invocation {
    let volume = format!("{}:{}:rw", spec.source_dir.display(), spec.mount_path);
    let mut invocation = Invocation::new(binary).args([
        "run",
        "-d",
        "-it",
        "--name",
        spec.name,
        "--network",
        spec.network,
        "-v",
        volume.as_str(),
        "-w",
        spec.mount_path,
    ]);
    if let Some(user) = spec.user {
        invocation = invocation.args(["--user", user]);
    }
    invocation.arg(spec.image)
}

/// Builds a `docker exec` invocation.
pub fn exec_invocation(binary: &str, name: &str, user: Option<&str>, argv: &[String]) -> Invocation {
    let mut invocation = Invocation::new(binary).arg("exec");
    if let Some(user) = user {
        invocation = invocation.args(["-u", user]);
    }
    invocation.arg(name).args(argv.iter().cloned())
}
