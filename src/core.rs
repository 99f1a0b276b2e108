//! # Core Module / 核心模块
//!
//! This module contains the orchestration engine of Image Matrix:
//! spec loading, settings, run planning, the in-container step builder,
//! the per-image executor and the sequential matrix driver.
//!
//! 此模块包含 Image Matrix 的编排引擎：
//! 规格加载、设置、运行计划、容器内步骤构建器、单镜像执行器和顺序矩阵驱动。

pub mod config;
pub mod context;
pub mod error;
pub mod execution;
pub mod matrix;
pub mod models;
pub mod planner;
pub mod spec;
pub mod steps;

// Re-exports
pub use config::Settings;
pub use context::RunContext;
pub use error::MatrixError;
pub use matrix::run_matrix;
pub use spec::MatrixEntry;
