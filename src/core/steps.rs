//! # In-Container Steps Module / 容器内步骤模块
//!
//! Typed builders for the commands run inside a test container. The install
//! step, test step and status capture are composed into one shell script
//! that is passed to `sh -c`, so the whole suite runs in a single `exec`.
//!
//! 容器内命令的类型化构建器。安装步骤、测试步骤和状态捕获被组合成
//! 一个传给 `sh -c` 的 shell 脚本，整个测试套件在一次 `exec` 中运行。

use crate::core::spec::MatrixEntry;

fn quote(word: &str) -> String {
    shlex::try_quote(word)
        .map(|q| q.into_owned())
        // Only NUL bytes fail to quote; strip them.
        .unwrap_or_else(|_| format!("'{}'", word.replace(['\0', '\''], "")))
}

fn join(words: &[String]) -> String {
    words.iter().map(|w| quote(w)).collect::<Vec<_>>().join(" ")
}

/// Splits a configured command string into words, falling back to
/// whitespace splitting if it has unbalanced quotes.
fn split_words(raw: &str) -> Vec<String> {
    shlex::split(raw).unwrap_or_else(|| raw.split_whitespace().map(str::to_string).collect())
}

/// Editable install of the project with its extras.
/// 以可编辑模式安装项目及其 extras。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStep {
    /// Install mechanism words, e.g. `["pip"]` or `["uv", "pip"]`.
    pub installer: Vec<String>,
    pub options: Vec<String>,
    pub extras: Vec<String>,
}

impl InstallStep {
    pub fn for_entry(entry: &MatrixEntry) -> Self {
        Self {
            installer: split_words(&entry.pipreq),
            options: split_words(&entry.pipopts),
            extras: entry
                .extras
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// The editable target, `.` or `.[a,b]`.
    pub fn target(&self) -> String {
        if self.extras.is_empty() {
            ".".to_string()
        } else {
            format!(".[{}]", self.extras.join(","))
        }
    }

    pub fn argv(&self) -> Vec<String> {
        let mut argv = self.installer.clone();
        argv.push("install".to_string());
        argv.extend(self.options.iter().cloned());
        argv.push("-e".to_string());
        argv.push(self.target());
        argv
    }

    pub fn render(&self) -> String {
        join(&self.argv())
    }
}

/// Runs the test suite, or a selected part of it.
/// 运行测试套件或其中被选中的部分。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestStep {
    pub command: Vec<String>,
    /// Empty selects the project's default suite.
    pub selector: Vec<String>,
}

impl TestStep {
    pub fn new(command: &[String], tests: &str) -> Self {
        Self {
            command: command.to_vec(),
            selector: split_words(tests),
        }
    }

    pub fn argv(&self) -> Vec<String> {
        let mut argv = self.command.clone();
        argv.extend(self.selector.iter().cloned());
        argv
    }

    pub fn render(&self) -> String {
        join(&self.argv())
    }
}

/// Writes the exit status of the preceding command group to a fixed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCapture {
    pub status_file: String,
}

impl StatusCapture {
    pub fn render(&self) -> String {
        format!("echo $? > {}", quote(&self.status_file))
    }

    /// Command that reads the captured status back.
    pub fn read_argv(&self) -> Vec<String> {
        vec!["cat".to_string(), self.status_file.clone()]
    }
}

/// Parses the content of a status file.
pub fn parse_status(raw: &str) -> Option<i32> {
    raw.trim().parse().ok()
}

/// Captures the installed dependency list with exact versions.
/// 捕获已安装依赖及其精确版本的列表。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreezeStep {
    pub workdir: String,
    /// Full command whose output is the snapshot, e.g. `pip freeze`.
    pub command: Vec<String>,
    /// In-container path of the snapshot file.
    pub snapshot: String,
}

impl FreezeStep {
    /// `<installer> freeze` unless an explicit command is configured.
    pub fn for_entry(workdir: &str, configured: &[String], entry: &MatrixEntry, snapshot: String) -> Self {
        let command = if configured.is_empty() {
            let mut argv = InstallStep::for_entry(entry).installer;
            argv.push("freeze".to_string());
            argv
        } else {
            configured.to_vec()
        };
        Self {
            workdir: workdir.to_string(),
            command,
            snapshot,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "cd {} && {} > {} 2>&1",
            quote(&self.workdir),
            join(&self.command),
            quote(&self.snapshot)
        )
    }
}

/// Install, test and status capture composed into one script.
///
/// ```text
/// cd <workdir> && { <install> && <test> ; } > <log> 2>&1; echo $? > <status>
/// ```
///
/// The status written is that of the last command the group ran, so an
/// install failure is reported without running the tests.
///
/// 组合成一个脚本的安装、测试和状态捕获。写入的状态是命令组中最后执行的命令的状态，
/// 因此安装失败时不会运行测试并直接报告失败。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeCommand {
    pub workdir: String,
    pub install: InstallStep,
    pub test: TestStep,
    /// In-container path of the log file.
    pub log_file: String,
    pub status: StatusCapture,
}

impl CompositeCommand {
    pub fn render(&self) -> String {
        format!(
            "cd {} && {{ {} && {} ; }} > {} 2>&1; {}",
            quote(&self.workdir),
            self.install.render(),
            self.test.render(),
            quote(&self.log_file),
            self.status.render()
        )
    }

    /// The argv handed to `docker exec`.
    pub fn argv(&self) -> Vec<String> {
        shell_argv(&self.render())
    }
}

/// Wraps a script as `sh -c <script>`.
pub fn shell_argv(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}
