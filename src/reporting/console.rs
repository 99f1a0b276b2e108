//! # Console Reporting Module / 控制台报告模块
//!
//! Prints the ledger verbatim followed by a coloured verdict.
//!
//! 原样打印账本，然后打印带颜色的结论。

use colored::*;

use crate::core::models::RunVerdict;
use crate::infra::t;
use crate::reporting::ledger::{aggregate, failed_count};

/// Prints the summary of a completed run and returns its verdict.
///
/// # Output Format / 输出格式
/// ```text
/// --- Matrix Summary ---
/// python_3.11-tests_unit-20260101-120000==0
/// python_3.8-tests_unit-20260101-120412==1
///
/// MATRIX FAILED: 1 of 2 entries did not pass
/// ```
///
/// 打印已完成运行的摘要并返回结论。
pub fn print_summary(ledger: &str) -> RunVerdict {
    println!("\n{}", t!("summary.banner").bold());
    print!("{ledger}");
    if !ledger.is_empty() && !ledger.ends_with('\n') {
        println!();
    }

    let verdict = aggregate(ledger);
    match verdict {
        RunVerdict::Passed => {
            println!("\n{}", t!("summary.passed").green().bold());
        }
        RunVerdict::Failed => {
            let total = ledger.lines().filter(|l| !l.trim().is_empty()).count();
            println!(
                "\n{}",
                t!("summary.failed", count = failed_count(ledger), total = total)
                    .red()
                    .bold()
            );
        }
    }
    verdict
}
