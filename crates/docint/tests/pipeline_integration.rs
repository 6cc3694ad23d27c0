//! End-to-end pipeline tests: batch isolation, single-file propagation, input
//! filtering and the built-in finders chained with the validator.

mod common;

use common::{Echo, doc, grid_page, list_page, echoed_threshold, settings, write_doc};
use docint::plugins::{Component, register_component, unregister_component};
use docint::{DocintError, PipeSettings, Pipeline, TableErrorName};
use serial_test::serial;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::tempdir;

fn register_echo() {
    register_component("echo", Arc::new(|| Arc::new(Echo) as Arc<dyn Component>)).unwrap();
}

#[test]
#[serial]
fn test_batch_drops_failing_file_and_continues() {
    register_echo();
    let dir = tempdir().unwrap();
    let inputs: Vec<PathBuf> = ["alpha", "broken", "gamma"]
        .iter()
        .map(|name| write_doc(&dir.path().join("in"), &doc(name, vec![grid_page(0)])))
        .collect();

    let echo = PipeSettings::new("echo", "echo").with_value("fail_on", "broken");
    let mut pipeline = Pipeline::from_settings_with_env(settings(dir.path(), vec![echo]), Vec::new()).unwrap();

    let names: Vec<String> = pipeline
        .run(&inputs)
        .unwrap()
        .map(|file| file.unwrap().name().to_string())
        .collect();
    assert_eq!(names, vec!["alpha", "gamma"]);

    let log = std::fs::read_to_string(dir.path().join("logs").join("broken.echo.log")).unwrap();
    assert!(log.contains("failed"));
    assert!(pipeline.pipes()[0].config().is_at_base());

    unregister_component("echo").unwrap();
}

#[test]
#[serial]
fn test_batch_survives_validation_error_from_component() {
    register_echo();
    let dir = tempdir().unwrap();
    let inputs: Vec<PathBuf> = ["f1", "f2", "f3"]
        .iter()
        .map(|name| write_doc(&dir.path().join("in"), &doc(name, vec![])))
        .collect();

    let echo = PipeSettings::new("echo", "echo").with_value("reject_on", "f2");
    let mut pipeline = Pipeline::from_settings_with_env(settings(dir.path(), vec![echo]), Vec::new()).unwrap();

    let names: Vec<String> = pipeline
        .run(&inputs)
        .unwrap()
        .map(|file| file.unwrap().name().to_string())
        .collect();
    assert_eq!(names, vec!["f1", "f3"]);

    let log = std::fs::read_to_string(dir.path().join("logs").join("f2.echo.log")).unwrap();
    assert!(log.contains("bad data in f2"));

    let err = pipeline.process_file(&inputs[1]).unwrap_err();
    assert!(matches!(err, DocintError::Plugin { ref component, .. } if component == "echo"));
    assert!(!err.is_fatal());

    unregister_component("echo").unwrap();
}

#[test]
fn test_component_events_reach_document_log() {
    let dir = tempdir().unwrap();
    let path = write_doc(dir.path(), &doc("menu", vec![grid_page(0)]));

    let pipes = vec![
        PipeSettings::new("grid", "grid_table_finder"),
        PipeSettings::new("check", "table_validator").with_value("expected_cols", 3),
    ];
    let mut pipeline = Pipeline::from_settings_with_env(settings(dir.path(), pipes), Vec::new()).unwrap();
    pipeline.process_file(&path).unwrap();

    let log = std::fs::read_to_string(dir.path().join("logs").join("menu.check.log")).unwrap();
    assert!(log.contains("TableMismatchColsError at p0.t0.h0: expected 3 cells, found 2"));
    assert!(log.contains("TableMismatchColsError at p0.t0.b0"));
    assert!(log.contains("table errors: TableMismatchColsError: 2"));

    let grid_log = std::fs::read_to_string(dir.path().join("logs").join("menu.grid.log")).unwrap();
    assert!(grid_log.contains("done"));
    assert!(!grid_log.contains("TableMismatchColsError"));
}

#[test]
#[serial]
fn test_single_file_propagates_error() {
    register_echo();
    let dir = tempdir().unwrap();
    let path = write_doc(dir.path(), &doc("broken", vec![]));

    let echo = PipeSettings::new("echo", "echo").with_value("fail_on", "broken");
    let mut pipeline = Pipeline::from_settings_with_env(settings(dir.path(), vec![echo]), Vec::new()).unwrap();

    let err = pipeline.process_file(&path).unwrap_err();
    assert!(matches!(err, DocintError::Plugin { ref component, .. } if component == "echo"));
    assert!(!err.is_fatal());

    unregister_component("echo").unwrap();
}

#[test]
#[serial]
fn test_unreadable_input_dropped_in_batch() {
    register_echo();
    let dir = tempdir().unwrap();
    let good = write_doc(dir.path(), &doc("good", vec![]));
    let missing = dir.path().join("missing.json");

    let mut pipeline = Pipeline::from_settings_with_env(
        settings(dir.path(), vec![PipeSettings::new("echo", "echo")]),
        Vec::new(),
    )
    .unwrap();
    let files: Vec<_> = pipeline.run(&[missing, good]).unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name(), "good");

    unregister_component("echo").unwrap();
}

#[test]
fn test_ignore_docs_skips_matching_paths() {
    let dir = tempdir().unwrap();
    let kept = write_doc(&dir.path().join("in"), &doc("invoice", vec![]));
    let skipped = write_doc(&dir.path().join("in"), &doc("invoice-draft", vec![]));

    let mut config = settings(dir.path(), vec![PipeSettings::new("check", "table_validator")]);
    config.ignore_docs = vec!["draft".to_string()];
    let mut pipeline = Pipeline::from_settings_with_env(config, Vec::new()).unwrap();

    let names: Vec<String> = pipeline
        .run(&[kept, skipped])
        .unwrap()
        .map(|f| f.unwrap().name().to_string())
        .collect();
    assert_eq!(names, vec!["invoice"]);
    assert!(!dir.path().join("logs").join("invoice-draft.check.log").exists());
}

#[test]
fn test_unsupported_extension_is_fatal() {
    let dir = tempdir().unwrap();
    let mut pipeline = Pipeline::from_settings_with_env(settings(dir.path(), vec![]), Vec::new()).unwrap();
    let err = pipeline.run(&[PathBuf::from("notes.txt")]).err().unwrap();
    assert!(matches!(err, DocintError::UnsupportedFormat(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_grid_finder_then_validator() {
    let dir = tempdir().unwrap();
    let path = write_doc(dir.path(), &doc("menu", vec![grid_page(0), grid_page(1)]));

    let pipes = vec![
        PipeSettings::new("grid", "grid_table_finder"),
        PipeSettings::new("check", "table_validator").with_value("expected_cols", 3),
    ];
    let mut pipeline = Pipeline::from_settings_with_env(settings(dir.path(), pipes), Vec::new()).unwrap();
    let file = pipeline.process_file(&path).unwrap();

    assert_eq!(file.state().pipe_names, vec!["grid", "check"]);
    let doc = file.as_doc().unwrap();
    let tables: Vec<_> = doc.tables().collect();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].2.header_rows.len(), 1);
    assert_eq!(tables[1].2.header_rows.len(), 0);

    let errors = file.errors("check");
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|e| e.name() == TableErrorName::MismatchCols));
    assert!(errors.iter().any(|e| e.path.starts_with("p0.t0")));
}

#[test]
fn test_list_finder_builds_gap_table() {
    let dir = tempdir().unwrap();
    let path = write_doc(dir.path(), &doc("ledger", vec![list_page(0)]));

    let mut pipeline = Pipeline::from_settings_with_env(
        settings(dir.path(), vec![PipeSettings::new("lists", "list_table_finder")]),
        Vec::new(),
    )
    .unwrap();
    let file = pipeline.process_file(&path).unwrap();

    let table = &file.as_doc().unwrap().pages[0].tables[0];
    assert_eq!(
        table.body_rows[0].texts(),
        vec![Some("1.".to_string()), Some("Rent".to_string()), Some("900".to_string())]
    );
}

#[test]
#[serial]
fn test_echo_default_threshold_and_saved_output() {
    register_echo();
    let dir = tempdir().unwrap();
    let path = write_doc(dir.path(), &doc("plain", vec![]));

    let mut pipeline = Pipeline::from_settings_with_env(
        settings(dir.path(), vec![PipeSettings::new("echo", "echo")]),
        Vec::new(),
    )
    .unwrap();
    let file = pipeline.process_file(&path).unwrap();
    assert_eq!(echoed_threshold(&file, "echo"), Some(1));

    let saved = file.save_json(&dir.path().join("output")).unwrap();
    let reloaded = Pipeline::from_settings_with_env(settings(dir.path(), vec![]), Vec::new())
        .unwrap()
        .process_file(&saved)
        .unwrap();
    assert_eq!(reloaded.state().edits, file.state().edits);

    unregister_component("echo").unwrap();
}
