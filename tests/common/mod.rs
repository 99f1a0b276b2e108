// Shared test helpers for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use image_matrix::config::Settings;
use image_matrix::core::context::RunContext;
use image_matrix::core::planner::{RunMode, RunPlan};
use image_matrix::infra::command::{Invocation, ProcessOutput, ProcessRunner, SharedRunner};
use image_matrix::spec::MatrixEntry;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::{TempDir, tempdir};
use tokio_util::sync::CancellationToken;

/// A scripted stand-in for docker, `tar` and the service commands.
/// Every invocation is recorded in order.
///
/// 用于替代 docker、`tar` 和服务命令的脚本化运行器，按顺序记录每次调用。
pub struct FakeRunner {
    pub calls: Mutex<Vec<Invocation>>,
    /// Replies to the status-file `cat`, one per entry. `None` makes the
    /// read fail. An exhausted queue answers `0`.
    pub statuses: Mutex<VecDeque<Option<i32>>>,
    pub pull_ok: bool,
    pub image_cached: bool,
    pub start_ok: bool,
    pub services_ok: bool,
    pub toolchain_present: bool,
    pub tar_writes_archive: bool,
    /// Cancels the token during the n-th install+test exec (1-based), as an
    /// operator pressing Ctrl-C mid-entry would.
    pub cancel_on_test_run: Option<(usize, CancellationToken)>,
    pub test_runs: Mutex<usize>,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            statuses: Mutex::new(VecDeque::new()),
            pull_ok: true,
            image_cached: false,
            start_ok: true,
            services_ok: true,
            toolchain_present: true,
            tar_writes_archive: true,
            cancel_on_test_run: None,
            test_runs: Mutex::new(0),
        }
    }
}

fn reply(code: i32, output: &str) -> ProcessOutput {
    ProcessOutput {
        code: Some(code),
        output: output.to_string(),
    }
}

/// The composite install+test `docker exec`. The root toolchain install is
/// excluded.
fn is_test_run(args: &[&str]) -> bool {
    args.first() == Some(&"exec")
        && args.get(1) != Some(&"-u")
        && args.last().is_some_and(|script| script.contains(" install "))
}

fn outcome(ok: bool) -> ProcessOutput {
    if ok { reply(0, "") } else { reply(1, "simulated failure") }
}

impl FakeRunner {
    pub fn with_statuses(self, statuses: &[Option<i32>]) -> Self {
        *self.statuses.lock().unwrap() = statuses.iter().copied().collect();
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Command lines joined with plain spaces, in call order.
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| std::iter::once(c.program.clone()).chain(c.args.iter().cloned()).collect::<Vec<_>>().join(" "))
            .collect()
    }

    /// Index of the first recorded command containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.commands().iter().position(|c| c.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.commands().iter().filter(|c| c.contains(needle)).count()
    }

    fn exec(&self, rest: &[&str]) -> ProcessOutput {
        let rest = match rest {
            ["-u", _, tail @ ..] => tail,
            _ => rest,
        };
        // Skip the container name.
        let argv = rest.get(1..).unwrap_or_default();
        match argv {
            ["cat", ..] => match self.statuses.lock().unwrap().pop_front() {
                Some(Some(status)) => reply(0, &format!("{status}\n")),
                Some(None) => reply(1, "cat: no such file"),
                None => reply(0, "0\n"),
            },
            ["sh", "-c", script] if *script == Settings::default().toolchain.probe => {
                outcome(self.toolchain_present)
            }
            _ => reply(0, ""),
        }
    }

    fn tar(&self, args: &[&str]) -> io::Result<ProcessOutput> {
        if let ["-czf", archive, ..] = args {
            if self.tar_writes_archive {
                fs::write(archive, b"fake archive")?;
            }
        }
        Ok(reply(0, ""))
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
        if is_test_run(&args) {
            let run = {
                let mut runs = self.test_runs.lock().unwrap();
                *runs += 1;
                *runs
            };
            if let Some((at, token)) = &self.cancel_on_test_run {
                if *at == run {
                    token.cancel();
                    // Give the driver a chance to observe the cancellation.
                    tokio::task::yield_now().await;
                }
            }
        }
        let output = match (invocation.program.as_str(), args.as_slice()) {
            ("id", _) => reply(0, "1000\n"),
            ("tar", args) => self.tar(args)?,
            ("docker", ["compose", "up", ..]) => outcome(self.services_ok),
            ("docker", ["pull", ..]) => outcome(self.pull_ok),
            ("docker", ["image", "inspect", ..]) => outcome(self.image_cached),
            ("docker", ["run", ..]) => outcome(self.start_ok),
            ("docker", ["exec", rest @ ..]) => self.exec(rest),
            _ => reply(0, ""),
        };
        Ok(output)
    }

    async fn run_interactive(&self, invocation: &Invocation) -> io::Result<Option<i32>> {
        self.calls.lock().unwrap().push(invocation.clone());
        Ok(Some(0))
    }
}

pub fn project() -> TempDir {
    tempdir().expect("Failed to create temporary directory")
}

pub fn context(project_dir: &Path, settings: Settings, runner: &Arc<FakeRunner>) -> RunContext {
    let shared: SharedRunner = runner.clone();
    RunContext::new(project_dir.to_path_buf(), settings, shared)
        .expect("Failed to build run context")
}

pub fn entry(image: &str, tests: &str, label: &str) -> MatrixEntry {
    MatrixEntry::from_fields(image, Some(tests), None, None, None, Some(label)).unwrap()
}

pub fn full_plan(entries: Vec<MatrixEntry>) -> RunPlan {
    RunPlan {
        mode: RunMode::Full {
            specs: PathBuf::from("testspecs.txt"),
        },
        entries,
        reset: true,
        shell: false,
    }
}

pub fn adhoc_plan(entry: MatrixEntry, clean: bool) -> RunPlan {
    RunPlan {
        mode: RunMode::AdHoc,
        entries: vec![entry],
        reset: clean,
        shell: false,
    }
}

/// Names of the `.tar.gz` archives in the log root, sorted.
pub fn archives(log_root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(log_root)
        .map(|dir| {
            dir.filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|name| name.ends_with(".tar.gz"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
