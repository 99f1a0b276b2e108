use image_matrix::{cli, models::RunVerdict};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Diagnostics go to stderr; progress and the summary go to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli::run().await {
        Ok(RunVerdict::Passed) => ExitCode::SUCCESS,
        Ok(verdict @ RunVerdict::Failed) => ExitCode::from(verdict.exit_code()),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
