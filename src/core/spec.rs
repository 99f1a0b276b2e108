//! # Spec Loader Module / 规格加载模块
//!
//! Parses the `;`-delimited spec file into an ordered list of matrix entries.
//! Each non-blank line that does not start with `#` is one record:
//!
//! ```text
//! image;tests;extras;pipreq;pipopts;label
//! ```
//!
//! Only `image` is mandatory. Missing or empty fields take their defaults.
//!
//! 将以 `;` 分隔的规格文件解析为有序的矩阵条目列表。
//! 只有 `image` 是必需的，缺失或为空的字段使用默认值。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{MatrixError, Result};

/// Default optional dependency groups installed with the project.
pub const DEFAULT_EXTRAS: &str = "dev";
/// Default install mechanism.
pub const DEFAULT_PIPREQ: &str = "pip";

const FIELD_SEPARATOR: char = ';';
const COMMENT_PREFIX: char = '#';

/// One configured (image, test selector, install options) unit to execute.
/// 一个配置好的（镜像、测试选择器、安装选项）执行单元。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixEntry {
    /// Container image reference. Never empty.
    /// 容器镜像引用，永不为空。
    pub image: String,
    /// Test selector; empty runs the project's default suite.
    /// 测试选择器；为空时运行项目的默认测试套件。
    pub tests: String,
    /// Comma-separated optional dependency groups.
    /// 以逗号分隔的可选依赖组。
    pub extras: String,
    /// Install mechanism, e.g. `pip` or `uv pip`.
    /// 安装机制，例如 `pip` 或 `uv pip`。
    pub pipreq: String,
    /// Extra install flags.
    /// 额外的安装参数。
    pub pipopts: String,
    /// Human identifier used in log directory and archive names.
    /// 用于日志目录和归档名称的可读标识。
    pub label: String,
}

impl MatrixEntry {
    /// Builds an entry from optional raw fields, applying defaults to any
    /// field that is missing or empty.
    ///
    /// 从可选的原始字段构建条目，对缺失或为空的字段应用默认值。
    pub fn from_fields(
        image: &str,
        tests: Option<&str>,
        extras: Option<&str>,
        pipreq: Option<&str>,
        pipopts: Option<&str>,
        label: Option<&str>,
    ) -> Result<Self> {
        let image = image.trim();
        if image.is_empty() {
            return Err(MatrixError::Configuration(
                "a matrix entry requires a non-empty image".to_string(),
            ));
        }

        fn field(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|v| !v.is_empty())
        }
        let tests = field(tests).unwrap_or_default().to_string();
        let label = match field(label) {
            Some(label) => label.to_string(),
            None => derive_label(&tests),
        };

        Ok(Self {
            image: image.to_string(),
            extras: field(extras).unwrap_or(DEFAULT_EXTRAS).to_string(),
            pipreq: field(pipreq).unwrap_or(DEFAULT_PIPREQ).to_string(),
            pipopts: field(pipopts).unwrap_or_default().to_string(),
            tests,
            label,
        })
    }

    /// Shorthand for an entry with only an image; every other field defaults.
    pub fn for_image(image: &str) -> Result<Self> {
        Self::from_fields(image, None, None, None, None, None)
    }

    /// The image reference flattened into a file-name-safe key, keeping its
    /// path components in order, e.g. `ghcr.io/org/py:3.11` becomes
    /// `ghcr.io_org_py_3.11`.
    pub fn image_key(&self) -> String {
        path_safe(&self.image)
    }

    /// The label flattened the same way, so it can never add a path
    /// component to the log directory key.
    pub fn label_key(&self) -> String {
        path_safe(&self.label)
    }

    /// `image/label`, or just the image when the label is empty.
    pub fn display_name(&self) -> String {
        if self.label.is_empty() {
            self.image.clone()
        } else {
            format!("{}/{}", self.image, self.label)
        }
    }
}

/// Keeps `[A-Za-z0-9._-]` and maps everything else to `_`. A result made
/// only of dots is mapped to underscores as well.
fn path_safe(value: &str) -> String {
    let flat: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !flat.is_empty() && flat.chars().all(|c| c == '.') {
        flat.replace('.', "_")
    } else {
        flat
    }
}

/// Derives a label from a test selector by replacing every non-alphanumeric
/// character with `_`. An empty selector yields an empty label.
///
/// 通过将测试选择器中所有非字母数字字符替换为 `_` 来派生标签。
pub fn derive_label(tests: &str) -> String {
    tests.replace(|c: char| !c.is_alphanumeric(), "_")
}

/// Parses spec file content into matrix entries, preserving line order.
///
/// # Errors
/// Returns `MatrixError::Configuration` for a record whose image field is empty.
///
/// 将规格文件内容解析为矩阵条目，保持行顺序。
pub fn parse_specs(content: &str) -> Result<Vec<MatrixEntry>> {
    let mut entries = Vec::new();

    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
            continue;
        }

        // The label keeps any further separators.
        let mut fields = line.splitn(6, FIELD_SEPARATOR);
        let image = fields.next().unwrap_or_default();
        if image.trim().is_empty() {
            return Err(MatrixError::Configuration(format!(
                "line {}: missing image in record '{}'",
                index + 1,
                line
            )));
        }

        let entry = MatrixEntry::from_fields(
            image,
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        )?;
        entries.push(entry);
    }

    Ok(entries)
}

/// Reads and parses a spec file. `~` and environment variables in the path
/// are expanded first.
///
/// # Errors
/// Returns `MatrixError::Configuration` if the file cannot be read or a
/// record is malformed.
///
/// 读取并解析规格文件。路径中的 `~` 和环境变量会先被展开。
pub fn load_specs(path: &Path) -> Result<Vec<MatrixEntry>> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .map_err(|e| MatrixError::Configuration(format!("cannot expand '{raw}': {e}")))?;
    let path = Path::new(expanded.as_ref());

    let content = fs::read_to_string(path).map_err(|e| {
        MatrixError::Configuration(format!("cannot read spec file {}: {}", path.display(), e))
    })?;

    tracing::debug!(path = %path.display(), "loading matrix specs");
    parse_specs(&content)
}
