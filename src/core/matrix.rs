//! # Matrix Driver Module / 矩阵驱动模块
//!
//! Runs the planned entries strictly in order, one container at a time:
//! execute, archive, record in the ledger, optionally open a shell, dispose.
//! Backing services are started once before the first entry and stopped
//! after the last, whichever way the run ends.
//!
//! 严格按顺序逐个运行计划中的条目，每次只有一个容器：执行、归档、记录账本、
//! 可选地打开 shell、清理。后端服务在第一个条目之前启动一次，无论运行如何结束都会在最后停止。

use colored::*;
use tokio_util::sync::CancellationToken;

use crate::core::context::RunContext;
use crate::core::error::{MatrixError, Result};
use crate::core::execution::ImageTestExecutor;
use crate::core::models::{RunVerdict, TestOutcome};
use crate::core::planner::RunPlan;
use crate::infra::fs::{archive_log_dir, prepare_environment};
use crate::infra::t;
use crate::reporting::ledger::{Ledger, LedgerLine, aggregate};

/// What a completed run leaves behind.
/// 一次完成的运行留下的结果。
#[derive(Debug, Clone)]
pub struct MatrixReport {
    /// Outcomes of the entries run by this invocation, in order.
    pub outcomes: Vec<TestOutcome>,
    /// Full ledger text, including lines from earlier ad hoc runs.
    pub ledger: String,
    pub verdict: RunVerdict,
}

/// Runs a plan against a context.
///
/// # Errors
/// Configuration, provisioning and archive errors abort the run; so does
/// cancellation, which leaves the current container running. Backing
/// services are torn down in every case.
///
/// 针对上下文运行计划。配置、准备和归档错误会中止运行；取消也会中止运行并保留当前容器。
/// 任何情况下都会关闭后端服务。
pub async fn run_matrix(
    ctx: &mut RunContext,
    plan: &RunPlan,
    cancel: CancellationToken,
) -> Result<MatrixReport> {
    if plan.reset {
        println!(
            "{}",
            t!("run.resetting", path = ctx.log_root.display()).cyan()
        );
    }
    prepare_environment(
        &ctx.source_dir,
        &ctx.log_root,
        &ctx.settings.clean_dirs,
        plan.reset,
    )?;

    let ledger = Ledger::new(&ctx.ledger_path);
    if plan.entries.is_empty() {
        println!("{}", t!("run.no_entries").green());
        return finish(&ledger, Vec::new());
    }

    ctx.resolve_host_user().await;

    let started = ctx.start_services().await;
    let result = match started {
        Ok(()) => {
            let ctx = &*ctx;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(MatrixError::Interrupted),
                outcomes = run_entries(ctx, plan, &ledger) => outcomes,
            }
        }
        Err(e) => Err(e),
    };
    ctx.shutdown().await;

    finish(&ledger, result?)
}

fn finish(ledger: &Ledger, outcomes: Vec<TestOutcome>) -> Result<MatrixReport> {
    let text = ledger.read()?;
    Ok(MatrixReport {
        verdict: aggregate(&text),
        ledger: text,
        outcomes,
    })
}

async fn run_entries(ctx: &RunContext, plan: &RunPlan, ledger: &Ledger) -> Result<Vec<TestOutcome>> {
    let executor = ImageTestExecutor::new(ctx);
    let total = plan.entries.len();
    let mut outcomes = Vec::with_capacity(total);

    for (index, entry) in plan.entries.iter().enumerate() {
        println!(
            "\n{}",
            t!(
                "run.entry_header",
                index = index + 1,
                total = total,
                name = entry.display_name()
            )
            .bold()
        );

        let paths = ctx.entry_paths(entry);
        let outcome = executor.execute(entry, &paths).await?;
        if outcome.passed() {
            println!("{}", t!("run.entry_passed", name = entry.display_name()).green());
        } else {
            println!(
                "{}",
                t!("run.entry_failed", name = entry.display_name(), status = outcome.status).red()
            );
        }

        let archive = archive_log_dir(ctx.runner(), &ctx.log_root, &paths).await?;
        println!("{}", t!("run.archived", path = archive.display()).dimmed());

        ledger.append(&LedgerLine::new(&outcome.key, outcome.status))?;

        if plan.shell {
            if let Err(e) = executor.open_shell().await {
                tracing::warn!("interactive shell failed: {e}");
            }
        }
        executor.dispose(entry).await;
        outcomes.push(outcome);
    }

    Ok(outcomes)
}
