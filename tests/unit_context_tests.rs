//! # Run Context & Planner Unit Tests / 运行上下文与计划单元测试

mod common;

use common::{FakeRunner, context, entry, project};
use image_matrix::config::Settings;
use image_matrix::core::context::RunContext;
use image_matrix::core::error::MatrixError;
use image_matrix::core::planner::{RunMode, RunOptions, plan_run};
use image_matrix::infra::command::SharedRunner;
use image_matrix::infra::fs::prepare_environment;
use std::fs;
use std::path::PathBuf;

#[test]
fn test_entry_paths_layout() {
    let dir = project();
    let runner = FakeRunner::default().shared();
    let ctx = context(dir.path(), Settings::default(), &runner);

    let paths = ctx.entry_paths(&entry("ghcr.io/org/py:3.11", "", "unit"));

    assert!(paths.key.starts_with("ghcr.io_org_py_3.11-unit-"));
    assert_eq!(paths.log_dir, dir.path().join("testlogs").join(&paths.key));
    assert_eq!(paths.log_file, paths.log_dir.join("test.log"));
    assert_eq!(paths.snapshot, paths.log_dir.join("freeze.txt"));
    assert_eq!(
        paths.archive,
        dir.path().join("testlogs").join(format!("{}.tar.gz", paths.key))
    );
    assert_eq!(paths.container_log_dir, format!("/project/testlogs/{}", paths.key));
    assert_eq!(paths.container_log_file(), format!("/project/testlogs/{}/test.log", paths.key));
}

#[test]
fn test_label_separators_are_flattened_in_key() {
    let dir = project();
    let runner = FakeRunner::default().shared();
    let ctx = context(dir.path(), Settings::default(), &runner);

    let paths = ctx.entry_paths(&entry("img", "", "py3/unit"));

    assert!(paths.key.starts_with("img-py3_unit-"));
    assert_eq!(paths.log_dir.parent(), Some(ctx.log_root.as_path()));
    assert_eq!(paths.archive.parent(), Some(ctx.log_root.as_path()));
}

#[test]
fn test_label_cannot_climb_out_of_log_root() {
    let dir = project();
    let runner = FakeRunner::default().shared();
    let ctx = context(dir.path(), Settings::default(), &runner);

    for label in ["x/../../escaped", "..", "../..", "a\\..\\b"] {
        let paths = ctx.entry_paths(&entry("img", "", label));

        assert!(!paths.key.contains('/') && !paths.key.contains('\\'), "{}", paths.key);
        assert_eq!(paths.log_dir.parent(), Some(ctx.log_root.as_path()));
        assert_eq!(paths.archive.parent(), Some(ctx.log_root.as_path()));
        assert!(paths.container_log_dir.starts_with("/project/testlogs/"));
        assert!(!paths.container_log_dir.contains("/../"));
    }
}

#[test]
fn test_entry_paths_are_unique_when_archive_exists() {
    let dir = project();
    let runner = FakeRunner::default().shared();
    let ctx = context(dir.path(), Settings::default(), &runner);
    fs::create_dir_all(&ctx.log_root).unwrap();

    let first = ctx.entry_paths(&entry("img", "", "x"));
    fs::write(&first.archive, b"archive").unwrap();
    let second = ctx.entry_paths(&entry("img", "", "x"));

    assert_ne!(first.key, second.key);
    assert!(!second.archive.exists());
}

#[test]
fn test_log_root_outside_project_is_rejected() {
    let dir = project();
    let runner: SharedRunner = FakeRunner::default().shared();
    let mut settings = Settings::default();
    settings.log_root = PathBuf::from("../logs");
    let result = RunContext::new(dir.path().to_path_buf(), settings, runner);
    assert!(matches!(result, Err(MatrixError::Configuration(_))));
}

#[test]
fn test_nested_log_root_maps_into_container() {
    let dir = project();
    let runner = FakeRunner::default().shared();
    let mut settings = Settings::default();
    settings.log_root = PathBuf::from("ci/logs");
    settings.mount_path = "/src/".to_string();
    let ctx = context(dir.path(), settings, &runner);

    let paths = ctx.entry_paths(&entry("img", "", "x"));
    assert_eq!(paths.container_log_dir, format!("/src/ci/logs/{}", paths.key));
    assert_eq!(ctx.ledger_path, dir.path().join("ci/logs/summary.log"));
}

#[test]
fn test_prepare_refuses_clean_dirs_outside_project() {
    let dir = project();
    let outside = vec![PathBuf::from("../elsewhere")];
    let err = prepare_environment(dir.path(), &dir.path().join("testlogs"), &outside, true).unwrap_err();
    assert!(matches!(err, MatrixError::Configuration(_)));
    // Nothing was created or removed.
    assert!(!dir.path().join("testlogs").exists());
}

#[test]
fn test_prepare_without_reset_only_ensures_log_root() {
    let dir = project();
    let log_root = dir.path().join("testlogs");
    fs::create_dir_all(dir.path().join("build")).unwrap();
    prepare_environment(dir.path(), &log_root, &[PathBuf::from("build")], false).unwrap();
    assert!(log_root.is_dir());
    assert!(dir.path().join("build").is_dir());
}

#[test]
fn test_plan_adhoc_entry_does_not_reset_by_default() {
    let dir = project();
    let options = RunOptions {
        image: Some("python:3.12".into()),
        tests: Some("tests/unit".into()),
        ..RunOptions::default()
    };
    let plan = plan_run(&options, &Settings::default(), dir.path()).unwrap();

    assert_eq!(plan.mode, RunMode::AdHoc);
    assert!(!plan.reset);
    assert_eq!(plan.entries.len(), 1);
    assert_eq!(plan.entries[0].label, "tests_unit");
    assert_eq!(plan.entries[0].extras, "dev");
}

#[test]
fn test_plan_adhoc_clean_resets() {
    let dir = project();
    let options = RunOptions {
        image: Some("python:3.12".into()),
        clean: true,
        ..RunOptions::default()
    };
    assert!(plan_run(&options, &Settings::default(), dir.path()).unwrap().reset);
}

#[test]
fn test_plan_full_loads_project_specs() {
    let dir = project();
    fs::write(dir.path().join("testspecs.txt"), "img-a;;;;;a\nimg-b;;;;;b\n").unwrap();

    let plan = plan_run(&RunOptions::default(), &Settings::default(), dir.path()).unwrap();

    assert!(plan.reset);
    assert_eq!(
        plan.mode,
        RunMode::Full {
            specs: dir.path().join("testspecs.txt")
        }
    );
    assert_eq!(plan.entries.len(), 2);
}

#[test]
fn test_plan_full_with_missing_specs_fails_before_any_reset() {
    let dir = project();
    fs::create_dir_all(dir.path().join("testlogs")).unwrap();
    fs::write(dir.path().join("testlogs/summary.log"), "k==0\n").unwrap();

    let err = plan_run(&RunOptions::default(), &Settings::default(), dir.path()).unwrap_err();

    assert!(matches!(err, MatrixError::Configuration(_)));
    assert!(dir.path().join("testlogs/summary.log").exists());
}
