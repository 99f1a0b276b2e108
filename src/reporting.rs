//! # Reporting Module / 报告模块
//!
//! The run ledger and its renderings: a coloured console summary and an
//! optional HTML page.
//!
//! 运行账本及其呈现方式：带颜色的控制台摘要和可选的 HTML 页面。

pub mod console;
pub mod html;
pub mod ledger;

// Re-export common reporting functions
pub use console::print_summary;
pub use html::generate_html_report;
pub use ledger::{Ledger, LedgerLine};
