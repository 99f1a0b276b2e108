//! # Image Matrix Library / Image Matrix 库
//!
//! This library provides the core functionality for the Image Matrix tool,
//! a sequential test-matrix orchestrator that installs and tests a project
//! inside a list of container images and summarizes the results.
//!
//! 此库为 Image Matrix 工具提供核心功能，
//! 这是一个顺序执行的测试矩阵编排器，在一组容器镜像中安装并测试项目并汇总结果。
//!
//! ## Modules / 模块
//!
//! - `core` - Spec loading, settings, planning and the execution engine
//! - `infra` - Process execution, docker CLI and file system operations
//! - `reporting` - The result ledger and its console and HTML renderings
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 规格加载、设置、计划和执行引擎
//! - `infra` - 进程执行、docker CLI 和文件系统操作
//! - `reporting` - 结果账本及其控制台和 HTML 呈现
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::models;
pub use core::spec;

/// Resolves a requested locale against the bundled translations.
///
/// It attempts to match the full locale (e.g., "zh-CN"), then just the
/// language code (e.g., "en"), and finally falls back to "en".
pub fn resolve_locale(requested: &str) -> String {
    let available_locales = rust_i18n::available_locales!();

    if available_locales.contains(&requested) {
        return requested.to_string();
    }
    requested
        .split(['-', '_'])
        .next()
        .filter(|lang_code| available_locales.contains(lang_code))
        .unwrap_or("en")
        .to_string()
}

/// Initializes the application's internationalization (i18n).
///
/// An explicit language wins; otherwise the system locale is detected.
pub fn init(language: Option<&str>) -> String {
    let requested = match language {
        Some(lang) => lang.to_string(),
        None => sys_locale::get_locale().unwrap_or_else(|| "en".to_string()),
    };
    let lang = resolve_locale(&requested);
    rust_i18n::set_locale(&lang);
    lang
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
