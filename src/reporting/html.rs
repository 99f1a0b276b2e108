//! # HTML Reporting Module / HTML 报告模块
//!
//! Renders the ledger of a completed run as a standalone HTML page.
//!
//! 将已完成运行的账本渲染为独立的 HTML 页面。

use maud::{DOCTYPE, Markup, html};
use std::fs;
use std::path::Path;

use crate::core::error::Result;
use crate::infra::t;
use crate::reporting::ledger::{LedgerLine, parse_lines};

const HTML_STYLE: &str = "\
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; }
th, td { border: 1px solid #ccc; padding: 4px 12px; text-align: left; }
.status-Passed { color: #2a7a2a; }
.status-Failed { color: #b02020; font-weight: bold; }
";

/// Builds the report markup from ledger text.
pub fn render_report(ledger: &str) -> Markup {
    let lines = parse_lines(ledger);
    let total = lines.len();
    let passed = lines
        .iter()
        .filter(|l| l.as_ref().is_some_and(LedgerLine::passed))
        .count();

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title")) }
                style { (HTML_STYLE) }
            }
            body {
                h1 { (t!("html_report.main_header")) }
                p { (t!("html_report.stats", passed = passed, total = total)) }
                table {
                    thead {
                        tr {
                            th { (t!("html_report.col_entry")) }
                            th { (t!("html_report.col_status")) }
                        }
                    }
                    tbody {
                        @for (index, line) in lines.iter().enumerate() {
                            @match line {
                                Some(line) => {
                                    tr class=(if line.passed() { "status-Passed" } else { "status-Failed" }) {
                                        td { (line.identifier) }
                                        td { (line.status) }
                                    }
                                }
                                None => {
                                    tr class="status-Failed" {
                                        td { (t!("html_report.unparseable", line = index + 1)) }
                                        td { "?" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Writes the HTML report for ledger text to `output_path`.
///
/// 将账本文本的 HTML 报告写入 `output_path`。
pub fn generate_html_report(ledger: &str, output_path: &Path) -> Result<()> {
    fs::write(output_path, render_report(ledger).into_string())?;
    Ok(())
}
