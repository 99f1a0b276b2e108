//! # Command Execution Module / 命令执行模块
//!
//! Every external process the orchestrator starts goes through the
//! [`ProcessRunner`] trait, so the container protocol can be exercised with a
//! fake runner instead of a real docker daemon.
//!
//! 编排器启动的每个外部进程都通过 [`ProcessRunner`] trait，
//! 因此可以用假的运行器代替真实的 docker 守护进程来测试容器协议。

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// A fully specified external command.
/// 一个完全指定的外部命令。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; inherits the orchestrator's when `None`.
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Builds an invocation from an argv list. Returns `None` for an empty list.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        match shlex::try_join(words) {
            Ok(joined) => f.write_str(&joined),
            Err(_) => write!(f, "{} {}", self.program, self.args.join(" ")),
        }
    }
}

/// Exit code and combined stdout/stderr of a finished process.
/// 已结束进程的退出码以及合并后的 stdout/stderr。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Process-execution capability.
/// 进程执行能力。
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs a command to completion, capturing its output.
    async fn run(&self, invocation: &Invocation) -> std::io::Result<ProcessOutput>;

    /// Runs a command attached to the operator's terminal and returns its exit code.
    async fn run_interactive(&self, invocation: &Invocation) -> std::io::Result<Option<i32>>;
}

/// The real runner, backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<ProcessOutput> {
        tracing::debug!(command = %invocation, "spawning");
        let (status, output) = spawn_and_capture(to_command(invocation)).await;
        let status = status?;
        tracing::debug!(command = %invocation, code = ?status.code(), "finished");
        Ok(ProcessOutput {
            code: status.code(),
            output,
        })
    }

    async fn run_interactive(&self, invocation: &Invocation) -> std::io::Result<Option<i32>> {
        tracing::debug!(command = %invocation, "spawning interactive");
        let status = to_command(invocation)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await?;
        Ok(status.code())
    }
}

fn to_command(invocation: &Invocation) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(&invocation.program);
    cmd.args(&invocation.args).kill_on_drop(true);
    if let Some(dir) = &invocation.cwd {
        cmd.current_dir(dir);
    }
    cmd
}

/// A shared, dynamically dispatched runner.
pub type SharedRunner = Arc<dyn ProcessRunner>;

/// Spawns a command, captures its stdout and stderr.
/// The output streams are read concurrently and combined into a single string.
///
/// # Returns
/// A tuple containing:
/// - The `ExitStatus` of the process wrapped in an `io::Result`.
/// - The combined stdout and stderr as a `String`.
///
/// 派生一个命令，捕获其 stdout 和 stderr。
/// 输出流被并发读取并合并到一个字符串中。
pub async fn spawn_and_capture(
    mut cmd: tokio::process::Command,
) -> (std::io::Result<std::process::ExitStatus>, String) {
    let mut child = match cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return (Err(e), String::new()),
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return (
            Err(std::io::Error::other("failed to capture process output")),
            String::new(),
        );
    };

    // Both readers append to the same buffer.
    // 两个读取任务写入同一个缓冲区。
    let output = Arc::new(tokio::sync::Mutex::new(String::new()));

    let stdout_output = Arc::clone(&output);
    let stdout_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut output = stdout_output.lock().await;
            output.push_str(&line);
            output.push('\n');
        }
    });

    let stderr_output = Arc::clone(&output);
    let stderr_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut output = stderr_output.lock().await;
            output.push_str(&line);
            output.push('\n');
        }
    });

    let status = child.wait().await;

    // Drain both readers so no trailing output is lost.
    if let Err(e) = stdout_handle.await {
        tracing::warn!("failed to join stdout task: {e}");
    }
    if let Err(e) = stderr_handle.await {
        tracing::warn!("failed to join stderr task: {e}");
    }

    let output = output.lock().await.clone();
    (status, output)
}
