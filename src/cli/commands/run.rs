// src/cli/commands/run.rs

use anyhow::{Context, Result};
use colored::*;
use std::{fs, path::PathBuf, sync::Arc};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::Settings,
        context::RunContext,
        error::MatrixError,
        matrix::run_matrix,
        models::RunVerdict,
        planner::{self, RunMode, RunOptions},
    },
    infra::{command::TokioProcessRunner, t},
    reporting::{generate_html_report, print_summary},
};

/// Runs the matrix (or a single ad hoc entry) and prints the summary.
///
/// Returns the verdict of the completed run. Configuration, provisioning and
/// archive errors, and an interrupt, return `Err` with no summary printed.
pub async fn execute(
    options: RunOptions,
    project_dir: PathBuf,
    config: Option<PathBuf>,
    html: Option<PathBuf>,
    explicit_language: Option<String>,
) -> Result<RunVerdict> {
    let project_root = fs::canonicalize(&project_dir)
        .with_context(|| t!("run.project_dir_not_found", path = project_dir.display()).to_string())?;

    let settings = Settings::load(&project_root, config.as_deref())?;
    if explicit_language.is_none() {
        if let Some(language) = &settings.language {
            rust_i18n::set_locale(&crate::resolve_locale(language));
        }
    }

    println!(
        "{}",
        t!("run.project_root_detected", path = project_root.display())
    );

    let plan = planner::plan_run(&options, &settings, &project_root)?;
    match &plan.mode {
        RunMode::AdHoc => {
            println!(
                "{}",
                t!("run.adhoc_mode", image = plan.entries[0].display_name()).bold()
            );
        }
        RunMode::Full { specs } => {
            println!("{}", t!("run.loading_specs", path = specs.display()));
            println!(
                "{}",
                t!("run.entries_loaded", count = plan.entries.len()).bold()
            );
        }
    }

    let mut ctx = RunContext::new(project_root, settings, Arc::new(TokioProcessRunner))?;
    let cancel = setup_signal_handler();

    let report = match run_matrix(&mut ctx, &plan, cancel).await {
        Ok(report) => report,
        Err(MatrixError::Interrupted) => {
            println!("\n{}", t!("run.interrupted").yellow());
            anyhow::bail!(MatrixError::Interrupted);
        }
        Err(e) => return Err(e.into()),
    };

    let verdict = print_summary(&report.ledger);

    if let Some(report_path) = &html {
        match generate_html_report(&report.ledger, report_path) {
            Ok(()) => println!(
                "\n{}",
                t!("summary.html_written", path = report_path.display())
            ),
            Err(e) => eprintln!("{} {}", t!("summary.html_failed").red(), e),
        }
    }

    Ok(verdict)
}

fn setup_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("\n{}", t!("run.shutdown_signal").yellow());
                token_clone.cancel();
            }
            Err(e) => tracing::warn!("failed to listen for Ctrl-C: {e}"),
        }
    });

    token
}
