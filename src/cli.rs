// src/cli.rs
use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::core::models::RunVerdict;
use crate::core::planner::RunOptions;
use crate::infra::t;

pub mod commands;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` or `--lang=<VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        return args.get(pos + 1).cloned();
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("--lang=").map(str::to_string))
}

fn string_arg(name: &'static str, value_name: &'static str, help: String) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .value_name(value_name)
        .action(ArgAction::Set)
}

fn flag_arg(name: &'static str, help: String) -> Arg {
    Arg::new(name).long(name).help(help).action(ArgAction::SetTrue)
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("image-matrix")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about", locale = locale).to_string())
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.run_about", locale = locale).to_string())
                .arg(
                    string_arg("specs", "SPECS", t!("cli.arg_specs", locale = locale).to_string())
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(string_arg("image", "IMAGE", t!("cli.arg_image", locale = locale).to_string()))
                .arg(
                    string_arg("tests", "TESTS", t!("cli.arg_tests", locale = locale).to_string())
                        .requires("image"),
                )
                .arg(
                    string_arg("extras", "EXTRAS", t!("cli.arg_extras", locale = locale).to_string())
                        .requires("image"),
                )
                .arg(
                    string_arg("pipreq", "PIPREQ", t!("cli.arg_pipreq", locale = locale).to_string())
                        .requires("image"),
                )
                .arg(
                    string_arg("pipopts", "PIPOPTS", t!("cli.arg_pipopts", locale = locale).to_string())
                        .requires("image")
                        .allow_hyphen_values(true),
                )
                .arg(
                    string_arg("label", "LABEL", t!("cli.arg_label", locale = locale).to_string())
                        .requires("image"),
                )
                .arg(flag_arg("clean", t!("cli.arg_clean", locale = locale).to_string()))
                .arg(flag_arg("shell", t!("cli.arg_shell", locale = locale).to_string()))
                .arg(
                    Arg::new("project-dir")
                        .long("project-dir")
                        .help(t!("cli.arg_project_dir", locale = locale).to_string())
                        .value_name("PROJECT_DIR")
                        .default_value(".")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help(t!("cli.arg_config", locale = locale).to_string())
                        .value_name("CONFIG")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("cli.arg_html", locale = locale).to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cli.init_about", locale = locale).to_string())
                .arg(flag_arg(
                    "non-interactive",
                    t!("cli.arg_non_interactive", locale = locale).to_string(),
                )),
        )
}

fn run_options(matches: &ArgMatches) -> RunOptions {
    let text = |name: &str| matches.get_one::<String>(name).cloned();
    RunOptions {
        specs: matches.get_one::<PathBuf>("specs").cloned(),
        image: text("image"),
        tests: text("tests"),
        extras: text("extras"),
        pipreq: text("pipreq"),
        pipopts: text("pipopts"),
        label: text("label"),
        clean: matches.get_flag("clean"),
        shell: matches.get_flag("shell"),
    }
}

/// Parses the command line and runs the selected command.
/// Returns the verdict of a completed run; other commands report `Passed`.
pub async fn run() -> Result<RunVerdict> {
    // Pre-parse language and initialize i18n first.
    let explicit_language = pre_parse_language();
    let language = crate::init(explicit_language.as_deref());

    let matches = build_cli(&language).get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let project_dir = run_matches
                .get_one::<PathBuf>("project-dir")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("."));
            let config = run_matches.get_one::<PathBuf>("config").cloned();
            let html = run_matches.get_one::<PathBuf>("html").cloned();

            commands::run::execute(
                run_options(run_matches),
                project_dir,
                config,
                html,
                explicit_language,
            )
            .await
        }
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");
            commands::init::run_init_wizard(&language, non_interactive)?;
            Ok(RunVerdict::Passed)
        }
        _ => {
            build_cli(&language).print_help()?;
            Ok(RunVerdict::Passed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli("en").debug_assert();
    }

    #[test]
    fn run_options_collects_ad_hoc_fields() {
        let matches = build_cli("en").get_matches_from([
            "image-matrix", "run", "--image", "python:3.11", "--tests", "tests/unit", "--clean",
        ]);
        let (_, run_matches) = matches.subcommand().unwrap();
        let options = run_options(run_matches);
        assert_eq!(options.image.as_deref(), Some("python:3.11"));
        assert_eq!(options.tests.as_deref(), Some("tests/unit"));
        assert!(options.clean);
        assert!(!options.shell);
        assert!(options.specs.is_none());
    }
}
