//! # Spec Loader Unit Tests / 规格加载单元测试

use image_matrix::core::error::MatrixError;
use image_matrix::spec::{DEFAULT_EXTRAS, DEFAULT_PIPREQ, MatrixEntry, derive_label, load_specs, parse_specs};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_parse_specs_skips_comments_and_applies_defaults() {
    let content = "img-a;pkg.testA;;;;labelA\n# comment\nimg-b;pkg.testB;extra1;conda;;labelB\n";
    let entries = parse_specs(content).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].image, "img-a");
    assert_eq!(entries[0].tests, "pkg.testA");
    assert_eq!(entries[0].extras, "dev");
    assert_eq!(entries[0].pipreq, "pip");
    assert_eq!(entries[0].pipopts, "");
    assert_eq!(entries[0].label, "labelA");

    assert_eq!(entries[1].image, "img-b");
    assert_eq!(entries[1].extras, "extra1");
    assert_eq!(entries[1].pipreq, "conda");
    assert_eq!(entries[1].label, "labelB");
}

#[test]
fn test_image_only_line_takes_every_default() {
    let entries = parse_specs("python:3.11\n").unwrap();
    assert_eq!(
        entries,
        vec![MatrixEntry {
            image: "python:3.11".to_string(),
            tests: String::new(),
            extras: DEFAULT_EXTRAS.to_string(),
            pipreq: DEFAULT_PIPREQ.to_string(),
            pipopts: String::new(),
            label: String::new(),
        }]
    );
}

#[test]
fn test_empty_label_is_derived_from_tests() {
    let entries = parse_specs("img;tests/unit::test_x\n").unwrap();
    assert_eq!(entries[0].label, "tests_unit__test_x");
    assert_eq!(derive_label("a.b-c"), "a_b_c");
    assert_eq!(derive_label(""), "");
}

#[test]
fn test_blank_lines_and_whitespace_are_ignored() {
    let content = "\n   \n  # indented comment\n  img-a ; pkg.t ; ; ; --pre ; lbl  \n";
    let entries = parse_specs(content).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].image, "img-a");
    assert_eq!(entries[0].tests, "pkg.t");
    assert_eq!(entries[0].extras, "dev");
    assert_eq!(entries[0].pipopts, "--pre");
    assert_eq!(entries[0].label, "lbl");
}

#[test]
fn test_label_keeps_extra_separators() {
    let entries = parse_specs("img;t;e;pip;;a;b\n").unwrap();
    assert_eq!(entries[0].label, "a;b");
}

#[test]
fn test_order_is_preserved() {
    let entries = parse_specs("c\na\nb\n").unwrap();
    let images: Vec<_> = entries.iter().map(|e| e.image.as_str()).collect();
    assert_eq!(images, vec!["c", "a", "b"]);
}

#[test]
fn test_missing_image_names_the_line() {
    let err = parse_specs("img-a\n;tests\n").unwrap_err();
    match err {
        MatrixError::Configuration(message) => assert!(message.contains("line 2"), "{message}"),
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

#[test]
fn test_load_specs_reads_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("testspecs.txt");
    fs::write(&path, "# header\nimg-a;;;;;one\n").unwrap();

    let entries = load_specs(&path).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].label, "one");
}

#[test]
fn test_load_specs_missing_file_is_configuration_error() {
    let dir = tempdir().unwrap();
    let err = load_specs(&dir.path().join("absent.txt")).unwrap_err();
    assert!(matches!(err, MatrixError::Configuration(_)));
}

#[test]
fn test_image_key_and_display_name() {
    let entry = MatrixEntry::from_fields("ghcr.io/org/py:3.11", Some("t"), None, None, None, Some("x")).unwrap();
    assert_eq!(entry.image_key(), "ghcr.io_org_py_3.11");
    assert_eq!(entry.display_name(), "ghcr.io/org/py:3.11/x");
    assert_eq!(MatrixEntry::for_image("img").unwrap().display_name(), "img");
}

#[test]
fn test_from_fields_rejects_blank_image() {
    assert!(matches!(
        MatrixEntry::for_image("   "),
        Err(MatrixError::Configuration(_))
    ));
}

#[test]
fn test_label_key_is_a_single_path_component() {
    let key = |label: &str| {
        MatrixEntry::from_fields("img", None, None, None, None, Some(label))
            .unwrap()
            .label_key()
    };
    assert_eq!(key("py3/unit"), "py3_unit");
    assert_eq!(key("x/../../escaped"), "x_.._.._escaped");
    assert_eq!(key(".."), "__");
    assert_eq!(key("."), "_");
    assert_eq!(key("fast-1.2"), "fast-1.2");
}

#[test]
fn test_whitespace_only_fields_take_defaults() {
    let entry = MatrixEntry::from_fields("img", Some("  "), Some(" "), Some("\t"), Some(" "), Some("  ")).unwrap();
    assert_eq!(entry.tests, "");
    assert_eq!(entry.extras, DEFAULT_EXTRAS);
    assert_eq!(entry.pipreq, DEFAULT_PIPREQ);
    assert_eq!(entry.pipopts, "");
    assert_eq!(entry.label, "");
}
