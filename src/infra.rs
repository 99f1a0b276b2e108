//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for Image Matrix:
//! process execution, the docker CLI wrapper, file system operations,
//! and i18n support.
//!
//! 此模块为 Image Matrix 提供基础设施服务：
//! 进程执行、docker CLI 封装、文件系统操作和国际化支持。

pub mod command;
pub mod docker;
pub mod fs;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
